//! Question answering pipeline: generation followed by the clarification check.

use std::sync::Arc;

use super::clarify::ClarificationGuard;
use super::generator::{AnswerGenerator, GeneratorSettings, Query};
use super::store::{ChunkSearchResult, RagStore};
use crate::core::config::AppConfig;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<ChunkSearchResult>,
    pub vague: bool,
}

pub struct RagService {
    generator: AnswerGenerator,
    guard: Option<ClarificationGuard>,
}

impl RagService {
    pub fn new(generator: AnswerGenerator, guard: Option<ClarificationGuard>) -> Self {
        Self { generator, guard }
    }

    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn RagStore>,
    ) -> Self {
        let generator =
            AnswerGenerator::new(provider.clone(), store, GeneratorSettings::from(config));
        let guard = config.clarification.enabled.then(|| {
            ClarificationGuard::new(
                provider,
                config.llm.embedding_model.clone(),
                &config.clarification,
            )
        });
        if guard.is_none() {
            tracing::info!("Clarification check disabled");
        }
        Self::new(generator, guard)
    }

    pub async fn ask(&self, query: &Query) -> Result<Answer, ApiError> {
        let generated = self.generator.generate(query).await?;

        let Some(guard) = &self.guard else {
            return Ok(Answer {
                text: generated.text,
                sources: generated.sources,
                vague: false,
            });
        };

        // Scored against what the user typed, not the condensed question.
        let reviewed = guard
            .review(&query.question, &generated.sources, generated.text)
            .await;

        Ok(Answer {
            text: reviewed.text,
            sources: generated.sources,
            vague: reviewed.vague,
        })
    }
}
