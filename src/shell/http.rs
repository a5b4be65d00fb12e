use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use tower_http::trace::TraceLayer;

use crate::shell::state::AppState;

pub const RUNNING_MESSAGE: &str = "Personio-Monday sync is running";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> &'static str {
    RUNNING_MESSAGE
}

async fn health() -> &'static str {
    "OK"
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.health.read().await.clone())
}
