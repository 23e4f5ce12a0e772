//! Interactive price projection reports.
//!
//! ```bash
//! coincast-report --reports-dir reports
//! coincast-report --model exponential_smoothing
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use tracing::error;

use coincast::config::AppConfig;
use coincast::external::cryptocompare::CryptoCompareProvider;
use coincast::external::price_provider::PriceProvider;
use coincast::logging::{init_logging, LoggingConfig};
use coincast::models::TrendMethod;
use coincast::services::date_range::RangeAnchor;
use coincast::services::prediction_cache::PredictionCache;
use coincast::services::prediction_service::PredictionService;
use coincast::services::price_service::PriceSeriesFetcher;
use coincast::services::report_service::{parse_menu_choice, Report, ReportPreset};
use coincast::services::trend_model::model_for;

#[derive(Parser)]
#[command(name = "coincast-report")]
#[command(
    about = "Project cryptocurrency prices and save them as spreadsheet reports",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Folder the CSV reports are written to
    #[arg(long, default_value = "reports")]
    reports_dir: PathBuf,

    /// Skip the algorithm prompt (linear | exponential_smoothing)
    #[arg(long)]
    model: Option<TrendMethod>,

    /// How many assets to list, by market cap
    #[arg(long, default_value_t = 50)]
    top: u32,
}

const METHODS: [TrendMethod; 2] = [
    TrendMethod::LinearRegression,
    TrendMethod::ExponentialSmoothing,
];

/// Prints `message`, then reads one line. `None` on end of input.
fn prompt(input: &mut impl BufRead, message: &str) -> Result<Option<String>> {
    println!("{}", message);
    print!("> ");
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(LoggingConfig::from_env("coincast-report").with_stderr())?;
    let config = AppConfig::from_env().map_err(|e| anyhow!(e))?;

    let client = Arc::new(
        CryptoCompareProvider::new(
            config.cryptocompare_base_url.clone(),
            config.cryptocompare_api_key.clone(),
            config.http_timeout,
        )
        .context("Failed to create CryptoCompare client")?,
    );
    let provider: Arc<dyn PriceProvider> = client.clone();
    let cache = PredictionCache::new();
    let _sweeper = cache.spawn_cleanup(config.cache_ttl);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut again = false;

    loop {
        if again {
            let Some(answer) =
                prompt(&mut input, "Do you want to analyze another cryptocurrency? (y/n)")?
            else {
                break;
            };
            match answer.to_lowercase().as_str() {
                "n" => break,
                "y" => {}
                _ => {
                    println!("Invalid input. Please enter 'y' or 'n'.");
                    continue;
                }
            }
        }
        again = true;

        let assets = match client.top_assets(cli.top).await {
            Ok(assets) if !assets.is_empty() => assets,
            Ok(_) => {
                println!("No cryptocurrencies are listed right now. Please try again.");
                continue;
            }
            Err(e) => {
                error!("Failed to list cryptocurrencies: {}", e);
                println!("Could not retrieve the list of cryptocurrencies. Please try again.");
                continue;
            }
        };

        let mut menu = String::from("Choose a cryptocurrency to analyze:");
        for (i, asset) in assets.iter().enumerate() {
            menu.push_str(&format!("\n{}. {}", i + 1, asset.symbol));
        }
        let Some(answer) = prompt(&mut input, &menu)? else { break };
        let Some(asset) = parse_menu_choice(&answer, assets.len()).map(|i| &assets[i]) else {
            println!("Invalid cryptocurrency choice. Please try again.");
            continue;
        };

        let mut menu = String::from("Choose a time period to analyze:");
        for (i, preset) in ReportPreset::ALL.iter().enumerate() {
            menu.push_str(&format!("\n{}. {}", i + 1, preset.label()));
        }
        let Some(answer) = prompt(&mut input, &menu)? else { break };
        let Some(preset) =
            parse_menu_choice(&answer, ReportPreset::ALL.len()).map(|i| ReportPreset::ALL[i])
        else {
            println!("Invalid time period choice. Please try again.");
            continue;
        };

        let method = match cli.model {
            Some(method) => method,
            None => {
                let mut menu = String::from("Choose an algorithm to use for price prediction:");
                for (i, method) in METHODS.iter().enumerate() {
                    menu.push_str(&format!("\n{}. {}", i + 1, method.label().replace('-', " ")));
                }
                let Some(answer) = prompt(&mut input, &menu)? else { break };
                match parse_menu_choice(&answer, METHODS.len()) {
                    Some(i) => METHODS[i],
                    None => {
                        println!("Invalid algorithm choice. Please try again.");
                        continue;
                    }
                }
            }
        };

        let fetcher = PriceSeriesFetcher::new(provider.clone(), cache.clone(), preset.window())
            .with_ttl(config.cache_ttl);
        let service = PredictionService::new(fetcher, model_for(method))
            .with_anchor(RangeAnchor::WallClock);

        let points = match service
            .forecast(&asset.symbol, preset.frequency(), preset.count())
            .await
        {
            Ok(points) => points,
            Err(e) => {
                error!("Projection failed for {}: {}", asset.symbol, e);
                println!("Could not project prices for {}: {}. Please try again.", asset.symbol, e);
                continue;
            }
        };

        let report = Report {
            symbol: asset.symbol.clone(),
            preset,
            method,
            generated_at: Utc::now(),
            points,
        };

        match report.write_csv(&cli.reports_dir, &Local) {
            Ok(path) => println!("Saved to: {}", path.display()),
            Err(e) => {
                error!("Failed to save report: {:#}", e);
                println!("Error: Could not save price predictions to a spreadsheet.");
            }
        }

        print!("{}", report.render_table(&Local));
    }

    println!("Thank you for using the cryptocurrency price prediction tool!");
    Ok(())
}
