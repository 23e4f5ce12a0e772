use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::external::price_provider::PriceProviderError;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidFrequency(String),
    #[error("{0}")]
    InvalidPeriod(String),
    #[error("{0}")]
    InvalidAsset(String),
    #[error("Price source unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("No price data: {0}")]
    NoData(String),
    #[error("Insufficient data to fit model: {0}")]
    InsufficientData(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidFrequency(_) => "invalid_frequency",
            AppError::InvalidPeriod(_) => "invalid_period",
            AppError::InvalidAsset(_) => "invalid_asset",
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
            AppError::NoData(_) => "no_data",
            AppError::InsufficientData(_) => "insufficient_data",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidFrequency(_)
            | AppError::InvalidPeriod(_)
            | AppError::InvalidAsset(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<PriceProviderError> for AppError {
    fn from(value: PriceProviderError) -> Self {
        match value {
            PriceProviderError::Network(msg) => AppError::UpstreamUnavailable(msg),
            PriceProviderError::BadResponse(msg) => AppError::UpstreamUnavailable(msg),
            PriceProviderError::RateLimited => {
                AppError::UpstreamUnavailable("rate limited by price source".to_string())
            }
            PriceProviderError::Parse(msg) => AppError::NoData(msg),
            PriceProviderError::Empty(asset) => {
                AppError::NoData(format!("price source returned no points for {}", asset))
            }
        }
    }
}
