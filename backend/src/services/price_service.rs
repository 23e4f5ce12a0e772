use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::external::price_provider::{HistoryWindow, PriceProvider, PriceProviderError};
use crate::models::{PricePoint, PriceSeries};
use crate::services::prediction_cache::{PredictionCache, DEFAULT_TTL};

/// Cache-fronted access to an asset's price history over a fixed window.
#[derive(Clone)]
pub struct PriceSeriesFetcher {
    provider: Arc<dyn PriceProvider>,
    cache: PredictionCache,
    window: HistoryWindow,
    ttl: Duration,
}

impl PriceSeriesFetcher {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        cache: PredictionCache,
        window: HistoryWindow,
    ) -> Self {
        Self {
            provider,
            cache,
            window,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache(&self) -> &PredictionCache {
        &self.cache
    }

    /// Series for `asset`, oldest first, from cache when still fresh.
    pub async fn fetch(&self, asset: &str) -> Result<Arc<PriceSeries>, AppError> {
        let asset = asset.to_lowercase();

        if let Some(series) = self.cache.get_series(&asset, self.window) {
            info!("✓ Series cache hit for {} ({} points)", asset, series.len());
            return Ok(series);
        }

        info!("Fetching {} of price history for {}", self.window, asset);
        let external = self
            .provider
            .fetch_history(&asset, self.window)
            .await
            .map_err(|e| {
                match &e {
                    PriceProviderError::RateLimited => {
                        warn!("Rate limited when fetching {}", asset)
                    }
                    _ => error!("Failed to fetch price history for {}: {}", asset, e),
                }
                AppError::from(e)
            })?;

        if external.is_empty() {
            warn!("Price source returned no points for {}", asset);
            return Err(PriceProviderError::Empty(asset).into());
        }

        let points = external
            .into_iter()
            .map(|p| PricePoint::new(p.timestamp, p.close))
            .collect();
        let series = Arc::new(PriceSeries::new(asset, points));

        self.cache.set_series(self.window, series.clone(), self.ttl);
        info!("✓ Cached {} points for {}", series.len(), series.asset);

        Ok(series)
    }
}
