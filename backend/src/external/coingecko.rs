use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::external::price_provider::{
    read_json, ExternalPricePoint, HistoryWindow, PriceProvider, PriceProviderError,
};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko `market_chart` client. Assets are CoinGecko ids such as `bitcoin`.
pub struct CoinGeckoProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PriceProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    #[serde(default)]
    prices: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoErrorBody {
    error: Option<String>,
}

fn window_days(window: HistoryWindow) -> u32 {
    match window {
        HistoryWindow::Days(days) => days.max(1),
        HistoryWindow::Hours(hours) => hours.div_ceil(24).max(1),
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    async fn fetch_history(
        &self,
        asset: &str,
        window: HistoryWindow,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let url = format!(
            "{}/coins/{}/market_chart",
            self.base_url,
            asset.to_lowercase()
        );
        let days = window_days(window).to_string();

        let mut request = self
            .client
            .get(&url)
            .query(&[("vs_currency", "usd"), ("days", days.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        debug!("GET {} (days={})", url, days);
        let resp = request
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceProviderError::RateLimited);
        }
        if !status.is_success() {
            let detail = resp
                .json::<CoinGeckoErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| status.to_string());
            warn!("CoinGecko returned {} for {}: {}", status, asset, detail);
            return Err(PriceProviderError::BadResponse(format!(
                "HTTP {} for {}: {}",
                status.as_u16(),
                asset,
                detail
            )));
        }

        let body: MarketChartResponse = read_json(resp).await?;

        let points = body
            .prices
            .into_iter()
            .map(|[millis, price]| -> Result<ExternalPricePoint, PriceProviderError> {
                let timestamp = DateTime::from_timestamp_millis(millis as i64).ok_or_else(|| {
                    PriceProviderError::Parse(format!("timestamp out of range: {}", millis))
                })?;
                if !price.is_finite() {
                    return Err(PriceProviderError::Parse(format!(
                        "non-finite price at {}",
                        millis
                    )));
                }
                Ok(ExternalPricePoint {
                    timestamp,
                    close: price,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(points)
    }
}
