//! Test doubles for the provider seam.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, LlmProvider};

type Embedder = Box<dyn Fn(&str) -> Vec<f32> + Send + Sync>;

/// Scripted provider: embeddings come from a closure, chat replies from a queue.
pub(crate) struct FakeProvider {
    embedder: Embedder,
    embed_error: Option<String>,
    /// Embedding calls that succeed before `embed_error` applies.
    embed_successes: usize,
    chat_replies: Mutex<VecDeque<Result<String, String>>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub embed_inputs: Mutex<Vec<Vec<String>>>,
    pub embed_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            embedder: Box::new(|_| vec![1.0, 0.0]),
            embed_error: None,
            embed_successes: 0,
            chat_replies: Mutex::new(VecDeque::new()),
            chat_requests: Mutex::new(Vec::new()),
            embed_inputs: Mutex::new(Vec::new()),
            embed_calls: AtomicUsize::new(0),
        }
    }

    /// One dimension per keyword, set when the text contains it.
    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        self.embedder = Box::new(move |text| {
            let text = text.to_lowercase();
            keywords
                .iter()
                .map(|k| if text.contains(k.as_str()) { 1.0 } else { 0.0 })
                .collect()
        });
        self
    }

    pub fn with_embedder(mut self, embedder: impl Fn(&str) -> Vec<f32> + Send + Sync + 'static) -> Self {
        self.embedder = Box::new(embedder);
        self
    }

    pub fn failing_embeddings(mut self, message: &str) -> Self {
        self.embed_error = Some(message.to_string());
        self
    }

    pub fn failing_embeddings_after(mut self, successes: usize, message: &str) -> Self {
        self.embed_error = Some(message.to_string());
        self.embed_successes = successes;
        self
    }

    pub fn with_chat_reply(self, reply: &str) -> Self {
        self.chat_replies
            .lock()
            .unwrap()
            .push_back(Ok(reply.to_string()));
        self
    }

    pub fn with_chat_failure(self, message: &str) -> Self {
        self.chat_replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn embed_call_count(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn chat_call_count(&self) -> usize {
        self.chat_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
        self.chat_requests.lock().unwrap().push(request);
        match self.chat_replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ApiError::Upstream(message)),
            None => Ok("default answer".to_string()),
        }
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        let call = self.embed_calls.fetch_add(1, Ordering::SeqCst);
        self.embed_inputs.lock().unwrap().push(inputs.to_vec());
        if let Some(message) = &self.embed_error {
            if call >= self.embed_successes {
                return Err(ApiError::Upstream(message.clone()));
            }
        }
        Ok(inputs.iter().map(|input| (self.embedder)(input)).collect())
    }
}
