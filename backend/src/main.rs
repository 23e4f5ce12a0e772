use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::net::TcpListener;

use coincast::app;
use coincast::config::AppConfig;
use coincast::external::coingecko::CoinGeckoProvider;
use coincast::external::price_provider::{HistoryWindow, PriceProvider};
use coincast::logging::{init_logging, LoggingConfig};
use coincast::services::prediction_cache::PredictionCache;
use coincast::services::prediction_service::PredictionService;
use coincast::services::price_service::PriceSeriesFetcher;
use coincast::services::trend_model::model_for;
use coincast::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env("coincast"))?;

    let config = AppConfig::from_env().map_err(|e| anyhow!(e))?;

    let provider: Arc<dyn PriceProvider> = Arc::new(
        CoinGeckoProvider::new(
            config.coingecko_base_url.clone(),
            config.coingecko_api_key.clone(),
            config.http_timeout,
        )
        .context("Failed to create CoinGecko client")?,
    );

    let fetcher = PriceSeriesFetcher::new(
        provider,
        PredictionCache::new(),
        HistoryWindow::Days(config.lookback_days),
    )
    .with_ttl(config.cache_ttl);

    let predictions = PredictionService::new(fetcher, model_for(config.trend_method))
        .with_ttl(config.cache_ttl);

    // Expired keys that are never requested again are only dropped by this sweep.
    let _sweeper = predictions.cache().spawn_cleanup(config.cache_ttl);

    tracing::info!(
        "📈 Trend model: {} ({})",
        config.trend_method.label(),
        config.trend_method.description()
    );

    let app = app::create_app(AppState::new(predictions));

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("🚀 Coincast running at http://{}/", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
