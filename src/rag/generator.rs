//! Answer generation: retrieve the closest chunks and ask the chat model.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context_builder::{ContextBuilderConfig, RAGContextBuilder};
use super::store::{ChunkSearchResult, RagStore};
use crate::core::config::AppConfig;
use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, LlmProvider};

/// A user question plus the prior turns of the conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    pub question: String,
    #[serde(default)]
    pub history: Vec<String>,
}

impl Query {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub text: String,
    pub sources: Vec<ChunkSearchResult>,
    /// The question retrieval ran with; equals the user's question without history.
    pub standalone_question: String,
}

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub collection: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub top_k: usize,
    pub max_context_tokens: usize,
}

impl From<&AppConfig> for GeneratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            collection: config.store.collection.clone(),
            chat_model: config.llm.chat_model.clone(),
            embedding_model: config.llm.embedding_model.clone(),
            temperature: config.llm.temperature,
            top_k: config.retrieval.top_k,
            max_context_tokens: config.retrieval.max_context_tokens,
        }
    }
}

pub struct AnswerGenerator {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn RagStore>,
    context: RAGContextBuilder,
    settings: GeneratorSettings,
}

impl AnswerGenerator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn RagStore>,
        settings: GeneratorSettings,
    ) -> Self {
        let context = RAGContextBuilder::new(ContextBuilderConfig {
            max_context_tokens: settings.max_context_tokens,
        });
        Self {
            provider,
            store,
            context,
            settings,
        }
    }

    pub async fn generate(&self, query: &Query) -> Result<GeneratedAnswer, ApiError> {
        let standalone_question = self.condense_question(query).await?;

        let query_embedding = self
            .provider
            .embed(std::slice::from_ref(&standalone_question), &self.settings.embedding_model)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("embedding response was empty".to_string()))?;

        let retrieved = self
            .store
            .search(&query_embedding, self.settings.top_k, &self.settings.collection)
            .await?;
        let sources = self.context.fit_to_token_limit(retrieved);
        tracing::debug!(
            "Retrieved {} chunks (best score {:?})",
            sources.len(),
            sources.first().map(|s| s.score)
        );

        let messages = self.context.build_messages(&sources, &standalone_question);
        let request = ChatRequest::new(messages).with_temperature(self.settings.temperature);
        let text = self
            .provider
            .chat(request, &self.settings.chat_model)
            .await?;

        Ok(GeneratedAnswer {
            text,
            sources,
            standalone_question,
        })
    }

    async fn condense_question(&self, query: &Query) -> Result<String, ApiError> {
        if query.history.is_empty() {
            return Ok(query.question.clone());
        }

        let messages = self
            .context
            .build_condense_messages(&query.history, &query.question);
        let request = ChatRequest::new(messages).with_temperature(self.settings.temperature);
        let rewritten = self
            .provider
            .chat(request, &self.settings.chat_model)
            .await?;

        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            Ok(query.question.clone())
        } else {
            tracing::debug!("Condensed follow-up question to: {}", rewritten);
            Ok(rewritten.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::sqlite::SqliteRagStore;
    use crate::rag::store::StoredChunk;
    use crate::rag::testing::FakeProvider;

    fn settings(top_k: usize) -> GeneratorSettings {
        GeneratorSettings {
            collection: "docs".to_string(),
            chat_model: "chat".to_string(),
            embedding_model: "embed".to_string(),
            temperature: 0.5,
            top_k,
            max_context_tokens: 4096,
        }
    }

    fn chunk(id: &str, content: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            collection: "docs".to_string(),
            content: content.to_string(),
            source: "story.txt".to_string(),
            metadata: None,
        }
    }

    async fn seeded_store(tmp: &tempfile::TempDir) -> Arc<SqliteRagStore> {
        let store = SqliteRagStore::with_path(tmp.path().join("rag.db"))
            .await
            .unwrap();
        store
            .insert_batch(vec![
                (chunk("c1", "Kalyani symbolizes dignity."), vec![1.0, 0.0]),
                (chunk("c2", "The train scene."), vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn question_without_history_goes_straight_to_retrieval() {
        let tmp = tempfile::tempdir().unwrap();
        let store = seeded_store(&tmp).await;
        let provider = Arc::new(
            FakeProvider::new()
                .with_keywords(&["symbol", "train"])
                .with_chat_reply("Dignity."),
        );

        let generator = AnswerGenerator::new(provider.clone(), store, settings(1));
        let answer = generator
            .generate(&Query::new("What does the title character symbolize?"))
            .await
            .unwrap();

        assert_eq!(answer.text, "Dignity.");
        assert_eq!(answer.standalone_question, "What does the title character symbolize?");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].chunk.chunk_id, "c1");

        assert_eq!(provider.chat_call_count(), 1);
        let requests = provider.chat_requests.lock().unwrap();
        assert!(requests[0].messages[0].content.contains("Kalyani symbolizes dignity."));
        assert_eq!(requests[0].temperature, Some(0.5));
    }

    #[tokio::test]
    async fn history_is_condensed_before_retrieval() {
        let tmp = tempfile::tempdir().unwrap();
        let store = seeded_store(&tmp).await;
        let provider = Arc::new(
            FakeProvider::new()
                .with_keywords(&["symbol", "train"])
                .with_chat_reply("Where does the train scene happen?")
                .with_chat_reply("At a station."),
        );

        let generator = AnswerGenerator::new(provider.clone(), store, settings(1));
        let query = Query {
            question: "Where does it happen?".to_string(),
            history: vec![
                "Tell me about the train scene.".to_string(),
                "Anupam meets Kalyani on a train.".to_string(),
            ],
        };
        let answer = generator.generate(&query).await.unwrap();

        assert_eq!(answer.standalone_question, "Where does the train scene happen?");
        assert_eq!(answer.sources[0].chunk.chunk_id, "c2");
        assert_eq!(answer.text, "At a station.");
        assert_eq!(provider.chat_call_count(), 2);

        let embedded = provider.embed_inputs.lock().unwrap();
        assert_eq!(embedded[0], vec!["Where does the train scene happen?".to_string()]);
    }

    #[tokio::test]
    async fn chat_failure_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        let store = seeded_store(&tmp).await;
        let provider = Arc::new(FakeProvider::new().with_chat_failure("service down"));

        let generator = AnswerGenerator::new(provider, store, settings(5));
        let result = generator.generate(&Query::new("Anything?")).await;

        assert!(matches!(result, Err(ApiError::Upstream(msg)) if msg == "service down"));
    }

    #[tokio::test]
    async fn empty_collection_still_asks_the_model() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(
            SqliteRagStore::with_path(tmp.path().join("rag.db"))
                .await
                .unwrap(),
        );
        let provider = Arc::new(FakeProvider::new().with_chat_reply("I don't know."));

        let generator = AnswerGenerator::new(provider, store, settings(5));
        let answer = generator.generate(&Query::new("Anything?")).await.unwrap();

        assert!(answer.sources.is_empty());
        assert_eq!(answer.text, "I don't know.");
    }
}
