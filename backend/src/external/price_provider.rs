use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ExternalPricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExternalAsset {
    pub symbol: String,
    pub name: String,
}

/// How much history to request, and at which granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryWindow {
    Hours(u32),
    Days(u32),
}

impl fmt::Display for HistoryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryWindow::Hours(n) => write!(f, "{}h", n),
            HistoryWindow::Days(n) => write!(f, "{}d", n),
        }
    }
}

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("no price points returned for {0}")]
    Empty(String),
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Price history for `asset`, in whatever order the source returns it.
    async fn fetch_history(
        &self,
        asset: &str,
        window: HistoryWindow,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError>;
}

/// Reads the whole body, then decodes it. A failure while reading is a
/// transport error, a failure while decoding is a parse error.
pub async fn read_json<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, PriceProviderError> {
    let body = resp
        .bytes()
        .await
        .map_err(|e| PriceProviderError::Network(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| PriceProviderError::Parse(e.to_string()))
}
