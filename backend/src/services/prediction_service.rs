use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{Frequency, PredictionRecord, PredictionRequest, PricePoint, PriceSeries};
use crate::services::date_range::{self, RangeAnchor};
use crate::services::prediction_cache::{PredictionCache, DEFAULT_TTL};
use crate::services::price_service::PriceSeriesFetcher;
use crate::services::result_formatter;
use crate::services::trend_model::TrendModel;

/// Validate → cached fetch → fit → project → format, with the formatted
/// result cached per (asset, frequency, period).
#[derive(Clone)]
pub struct PredictionService {
    fetcher: PriceSeriesFetcher,
    cache: PredictionCache,
    model: Arc<dyn TrendModel>,
    anchor: RangeAnchor,
    ttl: Duration,
}

impl PredictionService {
    /// Predictions share the fetcher's cache.
    pub fn new(fetcher: PriceSeriesFetcher, model: Arc<dyn TrendModel>) -> Self {
        let cache = fetcher.cache().clone();
        Self {
            fetcher,
            cache,
            model,
            anchor: RangeAnchor::LastObservation,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_anchor(mut self, anchor: RangeAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache(&self) -> &PredictionCache {
        &self.cache
    }

    pub fn model(&self) -> &dyn TrendModel {
        self.model.as_ref()
    }

    /// Entry point for raw path parameters.
    pub async fn get_predictions(
        &self,
        asset: &str,
        frequency: &str,
        period: &str,
    ) -> Result<Arc<Vec<PredictionRecord>>, AppError> {
        let request = PredictionRequest::parse(asset, frequency, period)?;
        self.predict(&request).await
    }

    pub async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<Arc<Vec<PredictionRecord>>, AppError> {
        if let Some(records) = self.cache.get_predictions(request) {
            info!(
                "✓ Prediction cache hit for {} {} x{}",
                request.asset, request.frequency, request.period
            );
            return Ok(records);
        }

        info!(
            "Prediction cache miss for {} {} x{}, running {:?}",
            request.asset,
            request.frequency,
            request.period,
            self.model.method()
        );

        let projected = self
            .forecast(&request.asset, request.frequency, request.period)
            .await?;
        let records: Vec<PredictionRecord> = projected
            .into_iter()
            .map(|p| result_formatter::format(p.timestamp, p.price, request.frequency))
            .collect();

        let records = Arc::new(records);
        self.cache
            .set_predictions(request.clone(), records.clone(), self.ttl);
        Ok(records)
    }

    /// Projected prices for an asset, unformatted and not cached.
    pub async fn forecast(
        &self,
        asset: &str,
        frequency: Frequency,
        count: u32,
    ) -> Result<Vec<PricePoint>, AppError> {
        let series = self.fetcher.fetch(asset).await?;
        self.project(&series, frequency, count)
    }

    pub fn project(
        &self,
        series: &PriceSeries,
        frequency: Frequency,
        count: u32,
    ) -> Result<Vec<PricePoint>, AppError> {
        let last = series
            .last()
            .ok_or_else(|| AppError::NoData(format!("series for {} is empty", series.asset)))?;

        let fitted = self.model.fit(series).map_err(|e| {
            error!("Failed to fit {:?} to {}: {}", self.model.method(), series.asset, e);
            e
        })?;

        let anchor = self.anchor.resolve(last.timestamp);
        date_range::generate(anchor, frequency, count)
            .into_iter()
            .map(|timestamp| {
                let price = fitted.predict(timestamp);
                if !price.is_finite() {
                    return Err(AppError::Internal(format!(
                        "model produced a non-finite price for {} at {}",
                        series.asset, timestamp
                    )));
                }
                Ok(PricePoint::new(timestamp, price))
            })
            .collect()
    }
}
