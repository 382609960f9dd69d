//! RAG Context Builder.
//!
//! Turns retrieved chunks into the prompt sent to the chat model:
//! 1. Drops the lowest-ranked chunks until the context fits the token budget
//! 2. Concatenates the remaining chunks into one system message
//! 3. Appends the question as the user message

use serde::{Deserialize, Serialize};

use super::store::ChunkSearchResult;
use crate::llm::ChatMessage;

const QA_SYSTEM_PROMPT: &str = "Answer the user's question using only the context below. \
If the context does not contain the answer, say that you don't know instead of making one up.";

const CONTEXT_DELIMITER: &str = "----------------";

const CONDENSE_PROMPT: &str = "Given the conversation below and a follow-up question, rewrite the \
follow-up as a standalone question that can be understood without the conversation. Keep the \
language of the follow-up question. Reply with the standalone question only.";

/// Configuration for context building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBuilderConfig {
    /// Maximum estimated tokens of retrieved context
    pub max_context_tokens: usize,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 4096,
        }
    }
}

pub struct RAGContextBuilder {
    config: ContextBuilderConfig,
}

impl RAGContextBuilder {
    pub fn new(config: ContextBuilderConfig) -> Self {
        Self { config }
    }

    /// Keeps the best-ranked prefix of `results` whose estimated size fits the budget.
    pub fn fit_to_token_limit(&self, mut results: Vec<ChunkSearchResult>) -> Vec<ChunkSearchResult> {
        let mut total: usize = results
            .iter()
            .map(|r| estimate_tokens(&r.chunk.content))
            .sum();

        while total > self.config.max_context_tokens {
            let Some(dropped) = results.pop() else {
                break;
            };
            total -= estimate_tokens(&dropped.chunk.content);
        }

        results
    }

    pub fn build_context(&self, results: &[ChunkSearchResult]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// System message carrying the context, followed by the question.
    pub fn build_messages(&self, results: &[ChunkSearchResult], question: &str) -> Vec<ChatMessage> {
        let system = format!(
            "{}\n{}\n{}",
            QA_SYSTEM_PROMPT,
            CONTEXT_DELIMITER,
            self.build_context(results)
        );
        vec![ChatMessage::system(system), ChatMessage::user(question)]
    }

    /// Prompt asking the model to fold `history` into a standalone version of `question`.
    pub fn build_condense_messages(&self, history: &[String], question: &str) -> Vec<ChatMessage> {
        let prompt = format!(
            "{}\n\nChat history:\n{}\n\nFollow-up question: {}\nStandalone question:",
            CONDENSE_PROMPT,
            format_history(history),
            question
        );
        vec![ChatMessage::user(prompt)]
    }
}

/// History entries alternate user and assistant turns, starting with the user.
pub fn format_history(history: &[String]) -> String {
    history
        .iter()
        .enumerate()
        .map(|(i, turn)| {
            let speaker = if i % 2 == 0 { "Human" } else { "Assistant" };
            format!("{}: {}", speaker, turn)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rough token estimate: about four bytes per token.
fn estimate_tokens(text: &str) -> usize {
    (text.len() + 3) / 4
}
