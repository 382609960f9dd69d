use super::settings::AppConfig;
use crate::core::errors::ApiError;

pub fn validate_config(config: &AppConfig) -> Result<(), ApiError> {
    validate_required_string("server.host", &config.server.host)?;

    validate_required_string("corpus.path", &config.corpus.path)?;
    validate_usize_field("corpus.chunk_size", config.corpus.chunk_size, 1, 1_000_000)?;
    if config.corpus.chunk_overlap >= config.corpus.chunk_size {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at 'corpus.chunk_overlap': must be smaller than corpus.chunk_size ({})",
            config.corpus.chunk_size
        )));
    }

    validate_required_string("store.collection", &config.store.collection)?;

    validate_usize_field("retrieval.top_k", config.retrieval.top_k, 1, 1_000)?;
    validate_usize_field(
        "retrieval.max_context_tokens",
        config.retrieval.max_context_tokens,
        1,
        10_000_000,
    )?;

    validate_required_string("llm.base_url", &config.llm.base_url)?;
    validate_required_string("llm.chat_model", &config.llm.chat_model)?;
    validate_required_string("llm.embedding_model", &config.llm.embedding_model)?;
    validate_f64_field("llm.temperature", config.llm.temperature, 0.0, 2.0)?;
    validate_usize_field("llm.embed_batch_size", config.llm.embed_batch_size, 1, 2_048)?;
    if let Some(timeout) = config.llm.request_timeout_secs {
        if timeout == 0 {
            return Err(ApiError::BadRequest(
                "Invalid config at 'llm.request_timeout_secs': must be positive".to_string(),
            ));
        }
    }

    validate_f64_field(
        "clarification.threshold",
        f64::from(config.clarification.threshold),
        -1.0,
        1.0,
    )?;
    validate_required_string("clarification.message", &config.clarification.message)?;

    Ok(())
}

fn validate_required_string(path: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value is required",
            path
        )));
    }
    Ok(())
}

fn validate_usize_field(path: &str, value: usize, min: usize, max: usize) -> Result<(), ApiError> {
    if value < min || value > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(path: &str, value: f64, min: f64, max: f64) -> Result<(), ApiError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}
