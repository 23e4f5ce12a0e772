use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::PredictionRecord;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:frequency/:period/:asset", get(get_predictions))
}

/// GET /predictions/{frequency}/{period}/{asset}
pub async fn get_predictions(
    Path((frequency, period, asset)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PredictionRecord>>, AppError> {
    info!("GET /predictions/{}/{}/{} - Projecting prices", frequency, period, asset);

    let records = state
        .predictions
        .get_predictions(&asset, &frequency, &period)
        .await
        .map_err(|e| {
            match &e {
                AppError::InvalidFrequency(_) | AppError::InvalidPeriod(_) => {
                    warn!("Rejected prediction request: {}", e)
                }
                _ => error!("Failed to project prices for {}: {}", asset, e),
            }
            e
        })?;

    Ok(Json(records.as_ref().clone()))
}
