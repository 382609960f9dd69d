use thiserror::Error;

use crate::core::config::service::API_KEY_ENV;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("{} is not set; add it to the environment or a .env file", API_KEY_ENV)]
    MissingApiKey,

    #[error("Failed to load corpus: {0}")]
    Corpus(#[source] anyhow::Error),

    #[error("Failed to initialize RAG store: {0}")]
    Rag(#[source] anyhow::Error),

    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[source] anyhow::Error),
}
