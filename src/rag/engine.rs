//! Corpus chunking.
//!
//! Splits text recursively on a list of separators (paragraphs, lines,
//! words, characters) and merges the pieces back into chunks of at most
//! `chunk_size` characters, with up to `chunk_overlap` characters carried
//! over between neighbouring chunks.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::config::CorpusConfig;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Configuration for the RAG engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RAGConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks
    pub chunk_overlap: usize,
}

impl Default for RAGConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl From<&CorpusConfig> for RAGConfig {
    fn from(config: &CorpusConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

/// A text chunk with source information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    /// The text content
    pub text: String,
    /// Source identifier (file name)
    pub source: String,
    /// Byte offset in original document
    pub start_offset: usize,
    /// Chunk index within the source
    pub chunk_index: usize,
}

/// RAG Engine for splitting corpus text into chunks.
pub struct RAGEngine {
    config: RAGConfig,
}

impl RAGEngine {
    pub fn new(config: RAGConfig) -> Self {
        Self { config }
    }

    /// Collect chunks from text content.
    pub fn collect_from_text(&self, text: &str, source: &str) -> Vec<TextChunk> {
        let pieces = self.split_text(text, &DEFAULT_SEPARATORS);

        let mut chunks = Vec::with_capacity(pieces.len());
        let mut search_from = 0;
        for (chunk_index, piece) in pieces.into_iter().enumerate() {
            let start_offset = text[search_from..]
                .find(&piece)
                .map(|pos| search_from + pos)
                .or_else(|| text.find(&piece))
                .unwrap_or(search_from);

            // Overlapping chunks always start after the previous chunk's first character.
            search_from = start_offset
                + piece.chars().next().map(char::len_utf8).unwrap_or(0);

            chunks.push(TextChunk {
                text: piece,
                source: source.to_string(),
                start_offset,
                chunk_index,
            });
        }

        chunks
    }

    fn split_text(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut remaining: &[&str] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = candidate;
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut final_chunks = Vec::new();
        let mut good_splits: Vec<String> = Vec::new();

        for split in split_keeping_separator(text, separator) {
            if char_len(&split) < self.config.chunk_size {
                good_splits.push(split);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }
            if remaining.is_empty() {
                final_chunks.push(split);
            } else {
                final_chunks.extend(self.split_text(&split, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits));
        }

        final_chunks
    }

    /// Greedily packs splits into chunks, keeping a tail of at most
    /// `chunk_overlap` characters as the head of the next chunk.
    fn merge_splits(&self, splits: &[String]) -> Vec<String> {
        let chunk_size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for split in splits {
            let len = char_len(split);
            if total + len > chunk_size && !current.is_empty() {
                if let Some(doc) = join_pieces(&current) {
                    docs.push(doc);
                }
                while total > overlap || (total + len > chunk_size && total > 0) {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(front);
                }
            }
            current.push_back(split);
            total += len;
        }

        if let Some(doc) = join_pieces(&current) {
            docs.push(doc);
        }

        docs
    }
}

/// Splits on `separator`, re-attaching it to the start of every following piece.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut pieces = Vec::new();
    for (i, part) in text.split(separator).enumerate() {
        let piece = if i == 0 {
            part.to_string()
        } else {
            format!("{}{}", separator, part)
        };
        if !piece.is_empty() {
            pieces.push(piece);
        }
    }
    pieces
}

fn join_pieces(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
