use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let collection = &state.config.store.collection;
    let chunks = state.rag_store.count(collection).await?;
    let provider_reachable = match state.provider.health_check().await {
        Ok(reachable) => reachable,
        Err(err) => {
            tracing::warn!("Provider health check failed: {}", err);
            false
        }
    };

    Ok(Json(json!({
        "collection": collection,
        "chunks": chunks,
        "provider": state.provider.name(),
        "provider_reachable": provider_reachable,
        "chat_model": state.config.llm.chat_model,
        "embedding_model": state.config.llm.embedding_model,
        "clarification_enabled": state.config.clarification.enabled,
        "started_at": state.started_at.to_rfc3339(),
    })))
}
