use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::rag::{
    load_corpus, CorpusIndexer, RAGConfig, RAGEngine, RagService, RagStore, SqliteRagStore,
};

pub mod error;

use error::InitializationError;

/// Application state shared by every route.
///
/// Built once at startup; handlers only read from it.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub provider: Arc<dyn LlmProvider>,
    pub rag_store: Arc<dyn RagStore>,
    pub rag: Arc<RagService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Loading and validating configuration
    /// 2. Creating the OpenAI-compatible provider
    /// 3. Opening the vector store
    /// 4. Chunking the corpus and indexing it unless the collection is already populated
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config_service = ConfigService::new(paths.clone());
        let config = config_service
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;
        let api_key = config_service
            .api_key()
            .ok_or(InitializationError::MissingApiKey)?;

        let timeout = config.llm.request_timeout_secs.map(Duration::from_secs);
        let provider: Arc<dyn LlmProvider> = Arc::new(
            OpenAiProvider::new(&config.llm.base_url, Some(api_key), timeout)
                .map_err(|e| InitializationError::Llm(e.into()))?,
        );

        let rag_store: Arc<dyn RagStore> = Arc::new(
            SqliteRagStore::new(paths.as_ref())
                .await
                .map_err(|e| InitializationError::Rag(e.into()))?,
        );

        let corpus_path = paths.resolve(&config.corpus.path);
        let corpus = load_corpus(&corpus_path)
            .await
            .map_err(|e| InitializationError::Corpus(e.into()))?;
        let source = corpus_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.corpus.path.clone());
        let chunks = RAGEngine::new(RAGConfig::from(&config.corpus)).collect_from_text(&corpus, &source);
        tracing::info!(
            "Loaded corpus {} ({} bytes, {} chunks)",
            corpus_path.display(),
            corpus.len(),
            chunks.len()
        );

        CorpusIndexer::new(
            rag_store.clone(),
            provider.clone(),
            config.store.collection.clone(),
            config.llm.embedding_model.clone(),
            config.llm.embed_batch_size,
        )
        .ensure_indexed(&chunks)
        .await
        .map_err(|e| InitializationError::Rag(e.into()))?;

        Ok(Self::from_parts(config, provider, rag_store))
    }

    /// Assembles the state from already constructed components.
    pub fn from_parts(
        config: AppConfig,
        provider: Arc<dyn LlmProvider>,
        rag_store: Arc<dyn RagStore>,
    ) -> Arc<Self> {
        let rag = Arc::new(RagService::from_config(
            &config,
            provider.clone(),
            rag_store.clone(),
        ));

        Arc::new(AppState {
            config,
            provider,
            rag_store,
            rag,
            started_at: Utc::now(),
        })
    }
}
