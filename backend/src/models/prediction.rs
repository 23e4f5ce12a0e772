use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const MIN_PERIOD: i64 = 1;
pub const MAX_PERIOD: i64 = 3652;

/// Granularity of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Hour,
    Day,
    Month,
    Year,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Hour,
        Frequency::Day,
        Frequency::Month,
        Frequency::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Hour => "hour",
            Frequency::Day => "day",
            Frequency::Month => "month",
            Frequency::Year => "year",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Frequency::Hour),
            "day" => Ok(Frequency::Day),
            "month" => Ok(Frequency::Month),
            "year" => Ok(Frequency::Year),
            other => Err(AppError::InvalidFrequency(format!(
                "Invalid frequency '{}'. Please use \"hour\", \"day\", \"month\", or \"year\".",
                other
            ))),
        }
    }
}

/// Which trend model to fit to a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMethod {
    LinearRegression,
    ExponentialSmoothing,
}

impl TrendMethod {
    pub fn description(&self) -> &'static str {
        match self {
            TrendMethod::LinearRegression => {
                "Least-squares line through price against elapsed time"
            }
            TrendMethod::ExponentialSmoothing => {
                "Holt's linear trend (double exponential smoothing)"
            }
        }
    }

    /// Label used in report file names and the algorithm column.
    pub fn label(&self) -> &'static str {
        match self {
            TrendMethod::LinearRegression => "Linear-Regression",
            TrendMethod::ExponentialSmoothing => "Exponential-Smoothing",
        }
    }
}

impl FromStr for TrendMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" | "linear_regression" | "linear-regression" => {
                Ok(TrendMethod::LinearRegression)
            }
            "exponential_smoothing" | "exponential-smoothing" | "holt" => {
                Ok(TrendMethod::ExponentialSmoothing)
            }
            other => Err(format!(
                "Unknown trend model '{}'. Must be 'linear' or 'exponential_smoothing'",
                other
            )),
        }
    }
}

/// A validated prediction request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredictionRequest {
    pub asset: String,
    pub frequency: Frequency,
    pub period: u32,
}

impl PredictionRequest {
    /// Validates raw path parameters. Frequency is checked before period.
    pub fn parse(asset: &str, frequency: &str, period: &str) -> Result<Self, AppError> {
        let frequency: Frequency = frequency.parse()?;
        let period = period
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid_period(period))?;
        Self::new(asset, frequency, period)
    }

    pub fn new(asset: &str, frequency: Frequency, period: i64) -> Result<Self, AppError> {
        if !(MIN_PERIOD..=MAX_PERIOD).contains(&period) {
            return Err(invalid_period(period));
        }

        let asset = asset.trim().to_lowercase();
        if asset.is_empty() {
            return Err(AppError::InvalidAsset(
                "Asset identifier must not be empty".to_string(),
            ));
        }

        Ok(Self {
            asset,
            frequency,
            period: period as u32,
        })
    }
}

fn invalid_period(period: impl fmt::Display) -> AppError {
    AppError::InvalidPeriod(format!(
        "Invalid period '{}'. Please use a value between {} and {}.",
        period, MIN_PERIOD, MAX_PERIOD
    ))
}

/// One projected price, already rendered for its frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub date: String,
    pub price: String,
}
