use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RAGCHAT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        self.paths.project_root.join("config.yml")
    }

    /// Loads `config.yml`, layers environment overrides on top and validates the result.
    pub fn load_config(&self) -> Result<AppConfig, ApiError> {
        let file_config = load_yaml_file(&self.config_path())?;
        let merged = deep_merge(&file_config, &env_overrides(|key| env::var(key).ok()));
        let config: AppConfig = serde_json::from_value(merged).map_err(|e| {
            ApiError::BadRequest(format!(
                "Invalid config at '{}': {}",
                self.config_path().display(),
                e
            ))
        })?;

        validate_config(&config)?;
        Ok(config)
    }

    /// The provider credential. Only ever read from the environment.
    pub fn api_key(&self) -> Option<String> {
        env::var(API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ApiError> {
    if !path.exists() {
        tracing::debug!("No config file at {}; using defaults", path.display());
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ApiError::BadRequest(format!("Failed to read config {}: {}", path.display(), e))
    })?;
    let value = serde_yaml::from_str::<Value>(&contents).map_err(|e| {
        ApiError::BadRequest(format!("Failed to parse config {}: {}", path.display(), e))
    })?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': root must be a mapping",
            path.display()
        ))),
    }
}

fn env_overrides<F>(lookup: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let mut overrides = json!({});

    if let Some(host) = lookup("HOST").filter(|v| !v.trim().is_empty()) {
        overrides["server"]["host"] = json!(host.trim());
    }
    match lookup("PORT").map(|v| v.trim().parse::<u16>()) {
        Some(Ok(port)) => overrides["server"]["port"] = json!(port),
        Some(Err(err)) => tracing::warn!("Ignoring invalid PORT: {}", err),
        None => {}
    }
    if let Some(base_url) = lookup("OPENAI_BASE_URL").filter(|v| !v.trim().is_empty()) {
        overrides["llm"]["base_url"] = json!(base_url.trim());
    }

    overrides
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in override_map {
                let next = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, value) => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "server": { "host": "0.0.0.0", "port": 9000 },
            "llm": { "chat_model": "gpt-4o-mini" }
        });
        let override_value = json!({
            "server": { "port": 8123 },
            "store": { "collection": "poems" }
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "server": { "host": "0.0.0.0", "port": 8123 },
                "llm": { "chat_model": "gpt-4o-mini" },
                "store": { "collection": "poems" }
            })
        );
    }

    #[test]
    fn env_overrides_pick_up_port_host_and_base_url() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("OPENAI_BASE_URL", "http://127.0.0.1:1234"),
        ]);

        let overrides = env_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(overrides["server"]["host"], "0.0.0.0");
        assert_eq!(overrides["server"]["port"], 8080);
        assert_eq!(overrides["llm"]["base_url"], "http://127.0.0.1:1234");
    }

    #[test]
    fn invalid_port_is_ignored() {
        let overrides = env_overrides(|key| (key == "PORT").then(|| "not-a-port".to_string()));
        assert!(overrides.get("server").is_none());
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yml");
        fs::write(&path, "retrieval:\n  top_k: 7\nstore:\n  collection: aparichita\n").unwrap();

        let value = load_yaml_file(&path).unwrap();
        let config: AppConfig = serde_json::from_value(value).unwrap();

        assert_eq!(config.retrieval.top_k, 7);
        assert_eq!(config.store.collection, "aparichita");
        assert_eq!(config.corpus.chunk_size, 1000);
        assert_eq!(config.clarification.threshold, 0.3);
    }

    #[test]
    fn missing_file_yields_empty_mapping() {
        let tmp = tempfile::tempdir().unwrap();
        let value = load_yaml_file(&tmp.path().join("absent.yml")).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn non_mapping_root_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yml");
        fs::write(&path, "- just\n- a list\n").unwrap();

        assert!(load_yaml_file(&path).is_err());
    }
}
