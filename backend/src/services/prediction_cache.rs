use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::external::price_provider::HistoryWindow;
use crate::models::{PredictionRecord, PredictionRequest, PriceSeries};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache keys, namespaced by what they hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Series { asset: String, window: HistoryWindow },
    Predictions(PredictionRequest),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Series { asset, window } => write!(f, "series:{}:{}", asset, window),
            CacheKey::Predictions(req) => write!(
                f,
                "predictions:{}-{}-{}",
                req.asset, req.frequency, req.period
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CachedValue {
    Series(Arc<PriceSeries>),
    Predictions(Arc<Vec<PredictionRecord>>),
}

impl CachedValue {
    pub fn kind(&self) -> &'static str {
        match self {
            CachedValue::Series(_) => "series",
            CachedValue::Predictions(_) => "predictions",
        }
    }

    fn describe(&self) -> serde_json::Value {
        match self {
            CachedValue::Series(series) => serde_json::json!({
                "asset": series.asset,
                "points": series.len(),
                "first_timestamp": series.first().map(|p| p.timestamp),
                "last_timestamp": series.last().map(|p| p.timestamp),
                "last_price": series.last().map(|p| p.price),
            }),
            CachedValue::Predictions(records) => {
                serde_json::to_value(records.as_slice()).unwrap_or(serde_json::Value::Null)
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// Diagnostic view of one live entry.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntrySnapshot {
    pub key: String,
    pub kind: &'static str,
    pub value: serde_json::Value,
    /// Seconds until expiry, `None` for entries that never expire.
    pub expiration_time: Option<f64>,
}

/// Thread-safe in-memory TTL cache for price series and prediction sets.
///
/// Expired entries read as absent and are evicted on access.
#[derive(Clone, Default)]
pub struct PredictionCache {
    entries: Arc<DashMap<CacheKey, CacheEntry>>,
}

impl PredictionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
        }

        // The read guard is gone by now; a concurrent refresh is kept.
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    /// Stores `value` under `key`. `None` means the entry never expires.
    pub fn set(&self, key: CacheKey, value: CachedValue, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries.insert(key, CacheEntry { value, expires_at });
    }

    pub fn get_series(&self, asset: &str, window: HistoryWindow) -> Option<Arc<PriceSeries>> {
        let key = CacheKey::Series {
            asset: asset.to_string(),
            window,
        };
        match self.get(&key)? {
            CachedValue::Series(series) => Some(series),
            CachedValue::Predictions(_) => None,
        }
    }

    pub fn set_series(&self, window: HistoryWindow, series: Arc<PriceSeries>, ttl: Duration) {
        let key = CacheKey::Series {
            asset: series.asset.clone(),
            window,
        };
        self.set(key, CachedValue::Series(series), Some(ttl));
    }

    pub fn get_predictions(
        &self,
        request: &PredictionRequest,
    ) -> Option<Arc<Vec<PredictionRecord>>> {
        match self.get(&CacheKey::Predictions(request.clone()))? {
            CachedValue::Predictions(records) => Some(records),
            CachedValue::Series(_) => None,
        }
    }

    pub fn set_predictions(
        &self,
        request: PredictionRequest,
        records: Arc<Vec<PredictionRecord>>,
        ttl: Duration,
    ) {
        self.set(
            CacheKey::Predictions(request),
            CachedValue::Predictions(records),
            Some(ttl),
        );
    }

    /// Live entries sorted by key. Expired entries are left out.
    pub fn snapshot(&self) -> Vec<CacheEntrySnapshot> {
        let now = Instant::now();
        let mut entries: Vec<CacheEntrySnapshot> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .map(|entry| CacheEntrySnapshot {
                key: entry.key().to_string(),
                kind: entry.value().value.kind(),
                value: entry.value().value.describe(),
                expiration_time: entry
                    .value()
                    .expires_at
                    .map(|at| at.saturating_duration_since(now).as_secs_f64()),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Sweeps expired entries every `every` until the handle is aborted.
    ///
    /// Entries whose key is never read again are only reclaimed here.
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = cache.cleanup_expired();
                if removed > 0 {
                    debug!("Evicted {} expired cache entries", removed);
                }
            }
        })
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
