use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::rag::Query;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Prior turns, oldest first, alternating user and assistant.
    #[serde(default)]
    pub history: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("ask", %request_id);

    async move {
        tracing::info!(
            "Question received ({} chars, {} history turns)",
            payload.question.chars().count(),
            payload.history.len()
        );

        let query = Query {
            question: payload.question,
            history: payload.history,
        };
        let answer = state.rag.ask(&query).await?;

        tracing::info!(
            "Answered with {} sources (vague: {})",
            answer.sources.len(),
            answer.vague
        );
        Ok::<_, ApiError>(Json(AskResponse { answer: answer.text }))
    }
    .instrument(span)
    .await
}
