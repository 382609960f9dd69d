//! Typed application settings.
//!
//! Every field has a default so an absent `config.yml` (or a partial one)
//! still yields a runnable configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CLARIFICATION_MESSAGE: &str =
    "I'm not sure I understood your question. Could you rephrase it or add more detail?";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub corpus: CorpusConfig,
    pub store: StoreConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    pub clarification: ClarificationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Corpus text file, relative to the project root unless absolute.
    pub path: String,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: "data/extracted_text_gemini/cleaned_gemini_output.txt".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection: "example_collection".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Upper bound on the estimated tokens of retrieved context sent to the chat model.
    pub max_context_tokens: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_context_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub embed_batch_size: usize,
    pub request_timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            temperature: 0.5,
            embed_batch_size: 64,
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClarificationConfig {
    pub enabled: bool,
    pub threshold: f32,
    pub message: String,
}

impl Default for ClarificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.3,
            message: DEFAULT_CLARIFICATION_MESSAGE.to_string(),
        }
    }
}
