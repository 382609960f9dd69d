//! Corpus loading and one-time indexing into the vector store.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use sha2::{Digest, Sha256};

use super::engine::TextChunk;
use super::store::{RagStore, StoredChunk};
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

/// Reads the whole corpus file. A missing or unreadable file is a startup error.
pub async fn load_corpus(path: &Path) -> Result<String, ApiError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        ApiError::Internal(format!(
            "Failed to read corpus file {}: {}",
            path.display(),
            e
        ))
    })
}

/// Stable chunk identity: the same corpus always produces the same IDs.
pub fn chunk_id(collection: &str, chunk: &TextChunk) -> String {
    let mut hasher = Sha256::new();
    hasher.update(collection.as_bytes());
    hasher.update([0u8]);
    hasher.update(chunk.chunk_index.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(chunk.text.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The collection already held chunks; nothing was embedded.
    AlreadyPopulated { chunks: usize },
    Inserted { chunks: usize },
}

pub struct CorpusIndexer {
    store: Arc<dyn RagStore>,
    provider: Arc<dyn LlmProvider>,
    collection: String,
    embedding_model: String,
    batch_size: usize,
}

impl CorpusIndexer {
    pub fn new(
        store: Arc<dyn RagStore>,
        provider: Arc<dyn LlmProvider>,
        collection: impl Into<String>,
        embedding_model: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            provider,
            collection: collection.into(),
            embedding_model: embedding_model.into(),
            batch_size: batch_size.max(1),
        }
    }

    /// Embeds and stores `chunks` unless the collection is already populated
    /// with vectors from the configured embedding model.
    pub async fn ensure_indexed(&self, chunks: &[TextChunk]) -> Result<IndexOutcome, ApiError> {
        match self.store.count(&self.collection).await {
            Ok(0) => {}
            Ok(existing) => {
                if !self.needs_reindex().await? {
                    tracing::info!(
                        "Collection '{}' already holds {} chunks; skipping indexing",
                        self.collection,
                        existing
                    );
                    return Ok(IndexOutcome::AlreadyPopulated { chunks: existing });
                }
            }
            Err(err) => {
                tracing::warn!(
                    "Could not count chunks in '{}' ({}); indexing anyway",
                    self.collection,
                    err
                );
            }
        }

        if chunks.is_empty() {
            tracing::warn!("Corpus produced no chunks; collection '{}' stays empty", self.collection);
            return Ok(IndexOutcome::Inserted { chunks: 0 });
        }

        let mut inserted = 0;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.provider.embed(&texts, &self.embedding_model).await?;
            if embeddings.len() != batch.len() {
                return Err(ApiError::Upstream(format!(
                    "embedding count mismatch: {} != {}",
                    embeddings.len(),
                    batch.len()
                )));
            }

            let items: Vec<(StoredChunk, Vec<f32>)> = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| (self.to_stored(chunk), embedding))
                .collect();
            self.store.insert_batch(items).await?;

            inserted += batch.len();
            tracing::debug!("Indexed {}/{} chunks", inserted, chunks.len());
        }

        self.store
            .set_embedding_model(&self.collection, &self.embedding_model)
            .await?;

        tracing::info!(
            "Indexed {} chunks into collection '{}' with {}",
            inserted,
            self.collection,
            self.embedding_model
        );
        Ok(IndexOutcome::Inserted { chunks: inserted })
    }

    /// A populated collection is indexed again when it was embedded with a different
    /// model, or when no model was recorded because an earlier run stopped midway.
    async fn needs_reindex(&self) -> Result<bool, ApiError> {
        match self.store.embedding_model(&self.collection).await {
            Ok(Some(model)) if model != self.embedding_model => {
                tracing::warn!(
                    "Collection '{}' was embedded with {}, configured model is {}; rebuilding",
                    self.collection,
                    model,
                    self.embedding_model
                );
                self.store
                    .reindex_with_model(&self.collection, &self.embedding_model)
                    .await?;
                Ok(true)
            }
            Ok(Some(_)) => Ok(false),
            Ok(None) => {
                tracing::warn!(
                    "Collection '{}' has no recorded embedding model; resuming interrupted indexing",
                    self.collection
                );
                Ok(true)
            }
            Err(err) => {
                tracing::warn!("Failed to read embedding model metadata: {}", err);
                Ok(false)
            }
        }
    }

    fn to_stored(&self, chunk: &TextChunk) -> StoredChunk {
        StoredChunk {
            chunk_id: chunk_id(&self.collection, chunk),
            collection: self.collection.clone(),
            content: chunk.text.clone(),
            source: chunk.source.clone(),
            metadata: Some(json!({
                "chunk_index": chunk.chunk_index,
                "start_offset": chunk.start_offset,
            })),
        }
    }
}
