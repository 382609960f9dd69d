use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{ask, health};
use crate::state::AppState;

/// Creates the application router.
///
/// - `POST /ask`: question answering over the indexed corpus
/// - `GET /health`, `GET /api/status`: liveness and index details
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ask", post(ask::ask))
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .with_state(state)
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Any origin, method and header. Credentials stay disabled since they cannot be
/// combined with wildcards.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
