//! Clarification check run after generation.
//!
//! When none of the retrieved chunks is close enough to the question, or the
//! model produced nothing, the answer is replaced by a request to rephrase.
//! Embedding failures never block an answer: the generated text is returned.

use std::sync::Arc;

use super::store::ChunkSearchResult;
use crate::core::config::ClarificationConfig;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::vector_math::max_cosine;

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewedAnswer {
    pub text: String,
    /// Set when `text` is the clarification message rather than the generated answer.
    pub vague: bool,
}

pub struct ClarificationGuard {
    provider: Arc<dyn LlmProvider>,
    embedding_model: String,
    threshold: f32,
    message: String,
}

impl ClarificationGuard {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        embedding_model: impl Into<String>,
        config: &ClarificationConfig,
    ) -> Self {
        Self {
            provider,
            embedding_model: embedding_model.into(),
            threshold: config.threshold,
            message: config.message.clone(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub async fn review(
        &self,
        question: &str,
        sources: &[ChunkSearchResult],
        answer: String,
    ) -> ReviewedAnswer {
        match self.is_vague(question, sources, &answer).await {
            Ok(true) => ReviewedAnswer {
                text: self.message.clone(),
                vague: true,
            },
            Ok(false) => ReviewedAnswer {
                text: answer,
                vague: false,
            },
            Err(err) => {
                tracing::warn!("Clarification check failed, keeping generated answer: {}", err);
                ReviewedAnswer {
                    text: answer,
                    vague: false,
                }
            }
        }
    }

    async fn is_vague(
        &self,
        question: &str,
        sources: &[ChunkSearchResult],
        answer: &str,
    ) -> Result<bool, ApiError> {
        if answer.trim().is_empty() {
            tracing::debug!("Generated answer is empty; asking for clarification");
            return Ok(true);
        }

        let max_similarity = self.max_similarity(question, sources).await?;
        let vague = max_similarity < self.threshold;
        tracing::debug!(
            "Max question/chunk similarity {:.3} (threshold {:.3}, vague: {})",
            max_similarity,
            self.threshold,
            vague
        );
        Ok(vague)
    }

    async fn max_similarity(
        &self,
        question: &str,
        sources: &[ChunkSearchResult],
    ) -> Result<f32, ApiError> {
        if sources.is_empty() {
            return Ok(0.0);
        }

        let mut inputs = Vec::with_capacity(sources.len() + 1);
        inputs.push(question.to_string());
        inputs.extend(sources.iter().map(|s| s.chunk.content.clone()));

        let mut embeddings = self.provider.embed(&inputs, &self.embedding_model).await?;
        if embeddings.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "embedding count mismatch: {} != {}",
                embeddings.len(),
                inputs.len()
            )));
        }

        let chunk_embeddings = embeddings.split_off(1);
        max_cosine(&embeddings[0], &chunk_embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::settings::DEFAULT_CLARIFICATION_MESSAGE;
    use crate::rag::store::StoredChunk;
    use crate::rag::testing::FakeProvider;

    fn source(content: &str) -> ChunkSearchResult {
        ChunkSearchResult {
            chunk: StoredChunk {
                chunk_id: content.to_string(),
                collection: "docs".to_string(),
                content: content.to_string(),
                source: "story.txt".to_string(),
                metadata: None,
            },
            score: 0.0,
        }
    }

    fn guard(provider: FakeProvider) -> (Arc<FakeProvider>, ClarificationGuard) {
        let provider = Arc::new(provider);
        let guard = ClarificationGuard::new(
            provider.clone(),
            "embed",
            &ClarificationConfig::default(),
        );
        (provider, guard)
    }

    #[tokio::test]
    async fn relevant_context_keeps_answer_unchanged() {
        let (_, guard) = guard(FakeProvider::new().with_keywords(&["kalyani", "train"]));

        let reviewed = guard
            .review(
                "Who is Kalyani?",
                &[source("The train scene."), source("Kalyani refuses the marriage.")],
                "Kalyani is the heroine.".to_string(),
            )
            .await;

        assert_eq!(
            reviewed,
            ReviewedAnswer {
                text: "Kalyani is the heroine.".to_string(),
                vague: false
            }
        );
    }

    #[tokio::test]
    async fn unrelated_context_asks_for_clarification() {
        let (_, guard) = guard(FakeProvider::new().with_keywords(&["kalyani", "train"]));

        let reviewed = guard
            .review(
                "Who is Kalyani?",
                &[source("The train scene.")],
                "Probably someone.".to_string(),
            )
            .await;

        assert!(reviewed.vague);
        assert_eq!(reviewed.text, DEFAULT_CLARIFICATION_MESSAGE);
    }

    #[tokio::test]
    async fn no_sources_asks_for_clarification_without_embedding() {
        let (provider, guard) = guard(FakeProvider::new());

        let reviewed = guard
            .review("Who is Kalyani?", &[], "Kalyani is the heroine.".to_string())
            .await;

        assert!(reviewed.vague);
        assert_eq!(provider.embed_call_count(), 0);
    }

    #[tokio::test]
    async fn blank_answer_asks_for_clarification_despite_similarity() {
        let (_, guard) = guard(FakeProvider::new().with_keywords(&["kalyani"]));

        let reviewed = guard
            .review(
                "Who is Kalyani?",
                &[source("Kalyani refuses the marriage.")],
                "  \n\t ".to_string(),
            )
            .await;

        assert!(reviewed.vague);
        assert_eq!(reviewed.text, DEFAULT_CLARIFICATION_MESSAGE);
    }

    #[tokio::test]
    async fn embedding_failure_returns_generated_answer() {
        let (_, guard) = guard(FakeProvider::new().failing_embeddings("timeout"));

        let reviewed = guard
            .review(
                "Who is Kalyani?",
                &[source("The train scene.")],
                "Kalyani is the heroine.".to_string(),
            )
            .await;

        assert!(!reviewed.vague);
        assert_eq!(reviewed.text, "Kalyani is the heroine.");
    }

    #[tokio::test]
    async fn similarity_error_returns_generated_answer() {
        // Question and chunk vectors differ in length, so cosine scoring fails.
        let provider = FakeProvider::new().with_embedder(|text| {
            if text.starts_with("Who") {
                vec![1.0, 0.0]
            } else {
                vec![1.0, 0.0, 0.0]
            }
        });
        let (_, guard) = guard(provider);

        let reviewed = guard
            .review(
                "Who is Kalyani?",
                &[source("The train scene.")],
                "Kalyani is the heroine.".to_string(),
            )
            .await;

        assert!(!reviewed.vague);
        assert_eq!(reviewed.text, "Kalyani is the heroine.");
    }

    #[tokio::test]
    async fn similarity_equal_to_threshold_is_not_vague() {
        let provider = Arc::new(FakeProvider::new().with_keywords(&["kalyani"]));
        let guard = ClarificationGuard::new(
            provider,
            "embed",
            &ClarificationConfig {
                threshold: 1.0,
                ..ClarificationConfig::default()
            },
        );

        let reviewed = guard
            .review("Kalyani?", &[source("Kalyani")], "answer".to_string())
            .await;
        assert!(!reviewed.vague);
        assert_eq!(guard.threshold(), 1.0);
    }
}
