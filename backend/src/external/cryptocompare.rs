use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::external::price_provider::{
    read_json, ExternalAsset, ExternalPricePoint, HistoryWindow, PriceProvider, PriceProviderError,
};

pub const DEFAULT_BASE_URL: &str = "https://min-api.cryptocompare.com";

/// CryptoCompare client. Assets are ticker symbols such as `BTC`.
pub struct CryptoCompareProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CryptoCompareProvider {
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

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => request.header("authorization", format!("Apikey {}", key)),
            None => request,
        }
    }

    /// Top assets by market cap, largest first.
    pub async fn top_assets(&self, limit: u32) -> Result<Vec<ExternalAsset>, PriceProviderError> {
        let limit = limit.to_string();
        let resp = self
            .get("/data/top/mktcapfull")
            .query(&[("limit", limit.as_str()), ("tsym", "USD")])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;
        check_status(resp.status())?;

        let body: TopListResponse = read_json(resp).await?;

        if let Some(message) = body.message.filter(|_| body.data.is_empty()) {
            return Err(classify_message(message));
        }

        Ok(body
            .data
            .into_iter()
            .map(|entry| ExternalAsset {
                symbol: entry.coin_info.name,
                name: entry.coin_info.full_name,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Data")]
    data: Option<HistoryData>,
}

#[derive(Debug, Deserialize)]
struct HistoryData {
    #[serde(rename = "Data", default)]
    data: Vec<HistoryBar>,
}

#[derive(Debug, Deserialize)]
struct HistoryBar {
    time: i64,
    close: f64,
}

#[derive(Debug, Deserialize)]
struct TopListResponse {
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Data", default)]
    data: Vec<TopListEntry>,
}

#[derive(Debug, Deserialize)]
struct TopListEntry {
    #[serde(rename = "CoinInfo")]
    coin_info: CoinInfo,
}

#[derive(Debug, Deserialize)]
struct CoinInfo {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "FullName", default)]
    full_name: String,
}

fn check_status(status: StatusCode) -> Result<(), PriceProviderError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(PriceProviderError::RateLimited);
    }
    if !status.is_success() {
        return Err(PriceProviderError::BadResponse(format!(
            "HTTP {}",
            status.as_u16()
        )));
    }
    Ok(())
}

fn classify_message(message: String) -> PriceProviderError {
    if message.to_lowercase().contains("rate limit") {
        PriceProviderError::RateLimited
    } else {
        PriceProviderError::BadResponse(message)
    }
}

#[async_trait]
impl PriceProvider for CryptoCompareProvider {
    async fn fetch_history(
        &self,
        asset: &str,
        window: HistoryWindow,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let (path, limit) = match window {
            HistoryWindow::Hours(n) => ("/data/v2/histohour", n),
            HistoryWindow::Days(n) => ("/data/v2/histoday", n),
        };
        let symbol = asset.to_uppercase();
        let limit = limit.to_string();

        debug!("GET {} (fsym={}, limit={})", path, symbol, limit);
        let resp = self
            .get(path)
            .query(&[
                ("fsym", symbol.as_str()),
                ("tsym", "USD"),
                ("limit", limit.as_str()),
                ("aggregate", "1"),
            ])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;
        check_status(resp.status())?;

        let body: HistoryResponse = read_json(resp).await?;

        if body.response != "Success" {
            return Err(classify_message(body.message));
        }

        let bars = body.data.map(|d| d.data).unwrap_or_default();
        bars.into_iter()
            .map(|bar| -> Result<ExternalPricePoint, PriceProviderError> {
                let timestamp = DateTime::from_timestamp(bar.time, 0).ok_or_else(|| {
                    PriceProviderError::Parse(format!("timestamp out of range: {}", bar.time))
                })?;
                Ok(ExternalPricePoint {
                    timestamp,
                    close: bar.close,
                })
            })
            .collect()
    }
}
