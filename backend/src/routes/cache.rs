use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use crate::services::prediction_cache::CacheEntrySnapshot;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(view_cache))
}

/// GET /cache
///
/// Live cache entries with seconds left before expiry.
pub async fn view_cache(State(state): State<AppState>) -> Json<Vec<CacheEntrySnapshot>> {
    let entries = state.cache().snapshot();
    info!("GET /cache - {} live entries", entries.len());
    Json(entries)
}
