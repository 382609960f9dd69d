//! SQLite-backed RAG store implementation.
//!
//! In-process vector store using SQLite for chunk rows and
//! brute-force cosine similarity for search.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkSearchResult, RagStore, StoredChunk};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;
use crate::vector_math::cosine_similarity;

pub struct SqliteRagStore {
    pool: SqlitePool,
}

impl SqliteRagStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.vector_store_path()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        if let Some(parent) = db_path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!(
                    "Failed to create vector store directory {}: {}",
                    parent.display(),
                    err
                );
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                chunk_id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_rag_collection ON rag_chunks(collection)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_meta (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (collection, key)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<Value>(&metadata_str).ok();

        StoredChunk {
            chunk_id: row.get("chunk_id"),
            collection: row.get("collection"),
            content: row.get("content"),
            source: row.get("source"),
            metadata,
        }
    }

    async fn write_meta(&self, collection: &str, key: &str, value: &str) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT OR REPLACE INTO rag_meta (collection, key, value, updated_at)
             VALUES (?1, ?2, ?3, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(collection)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = chunk
                .metadata
                .as_ref()
                .map(|m| serde_json::to_string(m).unwrap_or_default())
                .unwrap_or_else(|| "{}".to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO rag_chunks (chunk_id, collection, content, source, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.collection)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        collection: &str,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let rows = sqlx::query(
            "SELECT chunk_id, collection, content, source, metadata, embedding
             FROM rag_chunks
             WHERE collection = ?1",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let embedding_bytes: Vec<u8> = row.get("embedding");
            if embedding_bytes.is_empty() {
                continue;
            }
            let stored_emb = Self::deserialize_embedding(&embedding_bytes);
            // A mismatch means the store and the provider disagree, not a bad request.
            let score = cosine_similarity(query_embedding, &stored_emb).map_err(|err| {
                ApiError::Internal(format!(
                    "stored embedding for chunk '{}' cannot be compared with the query: {}",
                    row.get::<String, _>("chunk_id"),
                    err
                ))
            })?;

            scored.push(ChunkSearchResult {
                chunk: Self::row_to_chunk(row),
                score,
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_chunks WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }

    async fn embedding_model(&self, collection: &str) -> Result<Option<String>, ApiError> {
        sqlx::query_scalar(
            "SELECT value FROM rag_meta WHERE collection = ?1 AND key = 'embedding_model'",
        )
        .bind(collection)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::internal)
    }

    async fn set_embedding_model(&self, collection: &str, model: &str) -> Result<(), ApiError> {
        self.write_meta(collection, "embedding_model", model).await
    }

    async fn reindex_with_model(&self, collection: &str, model: &str) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM rag_chunks WHERE collection = ?1")
            .bind(collection)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        self.write_meta(collection, "embedding_model", model).await
    }
}
