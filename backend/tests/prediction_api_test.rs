//! HTTP-level tests for the prediction and cache endpoints.
//!
//! The router runs in-process against a stub price source, so no network access
//! is needed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use coincast::app::create_app;
use coincast::external::price_provider::{
    ExternalPricePoint, HistoryWindow, PriceProvider, PriceProviderError,
};
use coincast::errors::AppError;
use coincast::models::{PriceSeries, TrendMethod};
use coincast::services::prediction_cache::PredictionCache;
use coincast::services::prediction_service::PredictionService;
use coincast::services::price_service::PriceSeriesFetcher;
use coincast::services::trend_model::{model_for, FittedModel, TrendModel};
use coincast::state::AppState;

// ---------------------------------------------------------------------------
// Stub price source
// ---------------------------------------------------------------------------

struct FlatPriceSource {
    calls: AtomicUsize,
    failing: AtomicBool,
    empty: AtomicBool,
    panicking: AtomicBool,
}

impl FlatPriceSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            empty: AtomicBool::new(false),
            panicking: AtomicBool::new(false),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceProvider for FlatPriceSource {
    async fn fetch_history(
        &self,
        _asset: &str,
        _window: HistoryWindow,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.panicking.swap(false, Ordering::SeqCst) {
            panic!("price source blew up");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PriceProviderError::BadResponse("HTTP 503".into()));
        }
        if self.empty.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }

        // Daily closes for December 2023, newest first.
        let start = Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap();
        Ok((0..31)
            .rev()
            .map(|d| ExternalPricePoint {
                timestamp: start + ChronoDuration::days(d),
                close: 50000.0,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Stub trend models
// ---------------------------------------------------------------------------

struct UnfittableModel;

impl TrendModel for UnfittableModel {
    fn method(&self) -> TrendMethod {
        TrendMethod::LinearRegression
    }

    fn fit(&self, series: &PriceSeries) -> Result<Box<dyn FittedModel>, AppError> {
        Err(AppError::InsufficientData(format!(
            "cannot fit {} points",
            series.len()
        )))
    }
}

struct NanModel;

struct NanFit;

impl FittedModel for NanFit {
    fn predict(&self, _timestamp: DateTime<Utc>) -> f64 {
        f64::NAN
    }
}

impl TrendModel for NanModel {
    fn method(&self) -> TrendMethod {
        TrendMethod::LinearRegression
    }

    fn fit(&self, _series: &PriceSeries) -> Result<Box<dyn FittedModel>, AppError> {
        Ok(Box::new(NanFit))
    }
}

fn app_with_model(source: Arc<FlatPriceSource>, model: Arc<dyn TrendModel>) -> Router {
    let fetcher =
        PriceSeriesFetcher::new(source, PredictionCache::new(), HistoryWindow::Days(3652));
    let service = PredictionService::new(fetcher, model);
    create_app(AppState::new(service))
}

fn app(source: Arc<FlatPriceSource>) -> Router {
    app_with_model(source, model_for(TrendMethod::LinearRegression))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_daily_predictions_for_flat_series() {
    let source = FlatPriceSource::new();
    let app = app(source.clone());

    let (status, body) = get_json(&app, "/predictions/day/7/bitcoin").await;
    assert_eq!(status, StatusCode::OK);

    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 7);

    let mut previous: Option<NaiveDate> = None;
    for record in records {
        assert_eq!(record["price"], "50000.0");
        let date = NaiveDate::parse_from_str(record["date"].as_str().unwrap(), "%Y-%m-%d").unwrap();
        if let Some(prev) = previous {
            assert_eq!(date - prev, ChronoDuration::days(1));
        }
        previous = Some(date);
    }
    assert_eq!(records[0]["date"], "2024-01-01");
    assert_eq!(records[6]["date"], "2024-01-07");
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_monthly_and_yearly_date_formats() {
    let app = app(FlatPriceSource::new());

    let (status, body) = get_json(&app, "/predictions/month/3/bitcoin").await;
    assert_eq!(status, StatusCode::OK);
    let dates: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-01", "2024-02", "2024-03"]);

    let (_, body) = get_json(&app, "/predictions/year/2/bitcoin").await;
    assert_eq!(body[0]["date"], "2024");
    assert_eq!(body[1]["date"], "2025");

    let (_, body) = get_json(&app, "/predictions/hour/1/bitcoin").await;
    assert_eq!(body[0]["date"], "2023-12-31 01:00:00");
}

#[tokio::test]
async fn test_invalid_period_is_rejected_without_fetching() {
    let source = FlatPriceSource::new();
    let app = app(source.clone());

    for uri in [
        "/predictions/hour/0/bitcoin",
        "/predictions/day/3653/bitcoin",
        "/predictions/day/seven/bitcoin",
    ] {
        let (status, body) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["kind"], "invalid_period", "{}", uri);
        assert!(body["error"].as_str().unwrap().contains("3652"));
    }

    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_invalid_frequency_is_rejected_without_fetching() {
    let source = FlatPriceSource::new();
    let app = app(source.clone());

    let (status, body) = get_json(&app, "/predictions/week/7/bitcoin").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_frequency");
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_identical_requests_are_byte_identical_and_fetch_once() {
    let source = FlatPriceSource::new();
    let app = app(source.clone());

    let (_, first) = get(&app, "/predictions/month/12/Bitcoin").await;
    let (_, second) = get(&app, "/predictions/month/12/bitcoin").await;

    assert_eq!(first, second);
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entries_trigger_one_fresh_fetch() {
    let source = FlatPriceSource::new();
    let app = app(source.clone());

    get(&app, "/predictions/day/7/bitcoin").await;
    tokio::time::advance(Duration::from_secs(60 * 60 + 1)).await;

    get(&app, "/predictions/day/7/bitcoin").await;
    get(&app, "/predictions/day/7/bitcoin").await;
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_upstream_failure_is_reported_and_recoverable() {
    let source = FlatPriceSource::new();
    let app = app(source.clone());

    source.failing.store(true, Ordering::SeqCst);
    let (status, body) = get_json(&app, "/predictions/day/7/bitcoin").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "upstream_unavailable");

    // Failures are not cached.
    source.failing.store(false, Ordering::SeqCst);
    let (status, _) = get_json(&app, "/predictions/day/7/bitcoin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_empty_series_is_no_data() {
    let source = FlatPriceSource::new();
    source.empty.store(true, Ordering::SeqCst);
    let app = app(source);

    let (status, body) = get_json(&app, "/predictions/day/7/bitcoin").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "no_data");
}

#[tokio::test]
async fn test_blank_asset_is_rejected_without_fetching() {
    let source = FlatPriceSource::new();
    let app = app(source.clone());

    let (status, body) = get_json(&app, "/predictions/day/7/%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_asset");
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_model_failure_is_insufficient_data() {
    let source = FlatPriceSource::new();
    let app = app_with_model(source.clone(), Arc::new(UnfittableModel));

    let (status, body) = get_json(&app, "/predictions/day/7/bitcoin").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "insufficient_data");

    // The series stays cached; only the prediction set is missing.
    let (status, body) = get_json(&app, "/cache").await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["series:bitcoin:3652d"]);

    get_json(&app, "/predictions/day/7/bitcoin").await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_non_finite_projection_is_internal_error() {
    let source = FlatPriceSource::new();
    let app = app_with_model(source.clone(), Arc::new(NanModel));

    let (status, body) = get_json(&app, "/predictions/month/3/bitcoin").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "internal_error");
    assert!(body["error"].as_str().unwrap().contains("non-finite"));

    let (status, body) = get_json(&app, "/cache").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_panicking_source_is_internal_error_and_recoverable() {
    let source = FlatPriceSource::new();
    let app = app(source.clone());

    source.panicking.store(true, Ordering::SeqCst);
    let (status, body) = get_json(&app, "/predictions/day/7/bitcoin").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "internal_error");

    let (status, body) = get_json(&app, "/cache").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(Vec::new()));

    let (status, body) = get_json(&app, "/predictions/day/7/bitcoin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 7);
    assert_eq!(source.calls(), 2);
}

// ---------------------------------------------------------------------------
// Cache introspection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_cache_starts_empty() {
    let app = app(FlatPriceSource::new());

    let (status, body) = get_json(&app, "/cache").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(Vec::new()));
}

#[tokio::test]
async fn test_cache_lists_entries_from_one_request() {
    let app = app(FlatPriceSource::new());
    get(&app, "/predictions/day/7/bitcoin").await;

    let (_, body) = get_json(&app, "/cache").await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0]["key"], "predictions:bitcoin-day-7");
    assert_eq!(entries[0]["kind"], "predictions");
    assert_eq!(entries[0]["value"].as_array().unwrap().len(), 7);

    assert_eq!(entries[1]["key"], "series:bitcoin:3652d");
    assert_eq!(entries[1]["kind"], "series");
    assert_eq!(entries[1]["value"]["points"], 31);

    for entry in entries {
        let remaining = entry["expiration_time"].as_f64().unwrap();
        assert!(remaining > 0.0 && remaining <= 3600.0);
    }
}

#[tokio::test]
async fn test_health() {
    let app = app(FlatPriceSource::new());
    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["model"], "Linear-Regression");
}
