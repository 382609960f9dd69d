//! RagStore trait: abstract interface for RAG storage backends.
//!
//! The implementation used by the server is `SqliteRagStore` in the `sqlite`
//! module. Chunks are grouped by collection name so several corpora can share
//! one database file.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored RAG chunk with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// Collection the chunk belongs to.
    pub collection: String,
    /// The text content of the chunk.
    pub content: String,
    /// Source identifier (corpus file name).
    pub source: String,
    /// Optional metadata (JSON), e.g. `chunk_index` and `start_offset`.
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Similarity score (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait RagStore: Send + Sync {
    /// Insert multiple chunks in batch. Re-inserting an existing `chunk_id` replaces it.
    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), ApiError>;

    /// Search a collection for chunks similar to the query embedding, best first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        collection: &str,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    /// Number of chunks stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize, ApiError>;

    /// Embedding model the collection's vectors were produced with, if recorded.
    async fn embedding_model(&self, collection: &str) -> Result<Option<String>, ApiError>;

    /// Record the embedding model for a collection without touching its chunks.
    async fn set_embedding_model(&self, collection: &str, model: &str) -> Result<(), ApiError>;

    /// Drop every chunk of the collection and record the new embedding model.
    ///
    /// Used when the embedding model changes and all vectors are invalidated.
    async fn reindex_with_model(&self, collection: &str, model: &str) -> Result<(), ApiError>;
}
