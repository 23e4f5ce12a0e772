use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::external::{coingecko, cryptocompare};
use crate::models::TrendMethod;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub coingecko_base_url: String,
    pub coingecko_api_key: Option<String>,
    pub cryptocompare_base_url: String,
    pub cryptocompare_api_key: Option<String>,
    pub lookback_days: u32,
    pub cache_ttl: Duration,
    pub trend_method: TrendMethod,
    pub http_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            coingecko_base_url: coingecko::DEFAULT_BASE_URL.to_string(),
            coingecko_api_key: None,
            cryptocompare_base_url: cryptocompare::DEFAULT_BASE_URL.to_string(),
            cryptocompare_api_key: None,
            lookback_days: 3652,
            cache_ttl: Duration::from_secs(60 * 60),
            trend_method: TrendMethod::LinearRegression,
            http_timeout: Duration::from_secs(30),
        }
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {}={}: {}", name, raw, e)),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let config = Self {
            bind_addr: parse_var("BIND_ADDR", defaults.bind_addr)?,
            coingecko_base_url: var("COINGECKO_BASE_URL").unwrap_or(defaults.coingecko_base_url),
            coingecko_api_key: var("COINGECKO_API_KEY"),
            cryptocompare_base_url: var("CRYPTOCOMPARE_BASE_URL")
                .unwrap_or(defaults.cryptocompare_base_url),
            cryptocompare_api_key: var("CRYPTOCOMPARE_API_KEY"),
            lookback_days: parse_var("LOOKBACK_DAYS", defaults.lookback_days)?,
            cache_ttl: Duration::from_secs(parse_var(
                "CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            trend_method: parse_var("TREND_MODEL", defaults.trend_method)?,
            http_timeout: Duration::from_secs(parse_var(
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.lookback_days == 0 {
            return Err("LOOKBACK_DAYS must be at least 1".to_string());
        }
        if self.cache_ttl.is_zero() {
            return Err("CACHE_TTL_SECS must be at least 1".to_string());
        }
        if self.http_timeout.is_zero() {
            return Err("HTTP_TIMEOUT_SECS must be at least 1".to_string());
        }
        Ok(())
    }
}
