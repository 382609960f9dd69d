//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `RAGEngine`: Splits the corpus into overlapping chunks
//! - `CorpusIndexer`: Embeds chunks once and stores them in a collection
//! - `RAGContextBuilder`: Builds the chat prompt from retrieved chunks
//! - `AnswerGenerator`: Retrieval plus chat completion for one question
//! - `ClarificationGuard`: Replaces answers that the corpus does not support
//! - `RagService`: The pipeline used by the HTTP handlers

mod clarify;
mod context_builder;
mod corpus;
mod engine;
mod generator;
mod service;
mod sqlite;
mod store;
#[cfg(test)]
pub(crate) mod testing;

pub use clarify::{ClarificationGuard, ReviewedAnswer};
pub use context_builder::{format_history, ContextBuilderConfig, RAGContextBuilder};
pub use corpus::{chunk_id, load_corpus, CorpusIndexer, IndexOutcome};
pub use engine::{RAGConfig, RAGEngine, TextChunk};
pub use generator::{AnswerGenerator, GeneratedAnswer, GeneratorSettings, Query};
pub use service::{Answer, RagService};
pub use sqlite::SqliteRagStore;
pub use store::{ChunkSearchResult, RagStore, StoredChunk};
