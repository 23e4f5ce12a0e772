use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tracing::debug;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model: &'static str,
    cache_entries: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("GET /health - Health check");
    Json(HealthResponse {
        status: "OK",
        model: state.predictions.model().method().label(),
        cache_entries: state.cache().len(),
    })
}
