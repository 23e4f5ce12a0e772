//! Trend models fitted to a price series.
//!
//! Every model regresses price on elapsed time alone. That ignores volatility,
//! seasonality and anything else that moves a market, so projections are a
//! trend line and nothing more.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::{PriceSeries, TrendMethod};

/// Something that can be fitted to a series.
pub trait TrendModel: Send + Sync {
    fn method(&self) -> TrendMethod;

    fn fit(&self, series: &PriceSeries) -> Result<Box<dyn FittedModel>, AppError>;
}

/// The result of a fit; maps a timestamp to an estimated price.
pub trait FittedModel: Send + Sync {
    fn predict(&self, timestamp: DateTime<Utc>) -> f64;
}

pub fn model_for(method: TrendMethod) -> Arc<dyn TrendModel> {
    match method {
        TrendMethod::LinearRegression => Arc::new(LinearRegression),
        TrendMethod::ExponentialSmoothing => Arc::new(ExponentialSmoothing::default()),
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

fn ensure_not_empty(series: &PriceSeries) -> Result<(), AppError> {
    if series.is_empty() {
        return Err(AppError::InsufficientData(format!(
            "series for {} has no points",
            series.asset
        )));
    }
    Ok(())
}

/// Predicts the same price everywhere.
#[derive(Debug, Clone, Copy)]
pub struct ConstantFit {
    pub price: f64,
}

impl FittedModel for ConstantFit {
    fn predict(&self, _timestamp: DateTime<Utc>) -> f64 {
        self.price
    }
}

/// Ordinary least squares of price against seconds elapsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRegression;

/// Fitted line; `slope` is the price change per second.
#[derive(Debug, Clone, Copy)]
pub struct LinearFit {
    origin: DateTime<Utc>,
    slope: f64,
    intercept: f64,
}

impl FittedModel for LinearFit {
    fn predict(&self, timestamp: DateTime<Utc>) -> f64 {
        self.intercept + self.slope * seconds_between(self.origin, timestamp)
    }
}

impl LinearRegression {
    pub fn fit_line(&self, series: &PriceSeries) -> Result<Option<LinearFit>, AppError> {
        ensure_not_empty(series)?;

        // x is measured from the first observation to keep magnitudes small.
        let origin = series.points[0].timestamp;
        let n = series.len() as f64;
        let xs: Vec<f64> = series
            .points
            .iter()
            .map(|p| seconds_between(origin, p.timestamp))
            .collect();

        let x_mean = xs.iter().sum::<f64>() / n;
        let y_mean = series.points.iter().map(|p| p.price).sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (x, point) in xs.iter().zip(&series.points) {
            numerator += (x - x_mean) * (point.price - y_mean);
            denominator += (x - x_mean) * (x - x_mean);
        }

        if denominator == 0.0 {
            return Ok(None);
        }

        let slope = numerator / denominator;
        let intercept = y_mean - slope * x_mean;
        if !slope.is_finite() || !intercept.is_finite() {
            return Err(AppError::InsufficientData(format!(
                "regression for {} did not converge",
                series.asset
            )));
        }

        Ok(Some(LinearFit {
            origin,
            slope,
            intercept,
        }))
    }
}

impl TrendModel for LinearRegression {
    fn method(&self) -> TrendMethod {
        TrendMethod::LinearRegression
    }

    fn fit(&self, series: &PriceSeries) -> Result<Box<dyn FittedModel>, AppError> {
        match self.fit_line(series)? {
            Some(fit) => Ok(Box::new(fit)),
            // One point, or every point at the same instant.
            None => {
                let mean = series.points.iter().map(|p| p.price).sum::<f64>()
                    / series.len() as f64;
                Ok(Box::new(ConstantFit { price: mean }))
            }
        }
    }
}

/// Holt's linear trend method (double exponential smoothing).
#[derive(Debug, Clone, Copy)]
pub struct ExponentialSmoothing {
    /// Level smoothing parameter
    pub alpha: f64,
    /// Trend smoothing parameter
    pub beta: f64,
}

impl Default for ExponentialSmoothing {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            beta: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SmoothedFit {
    last: DateTime<Utc>,
    step_secs: f64,
    level: f64,
    trend: f64,
}

impl FittedModel for SmoothedFit {
    fn predict(&self, timestamp: DateTime<Utc>) -> f64 {
        let steps = seconds_between(self.last, timestamp) / self.step_secs;
        self.level + self.trend * steps
    }
}

impl TrendModel for ExponentialSmoothing {
    fn method(&self) -> TrendMethod {
        TrendMethod::ExponentialSmoothing
    }

    fn fit(&self, series: &PriceSeries) -> Result<Box<dyn FittedModel>, AppError> {
        ensure_not_empty(series)?;

        let points = &series.points;
        let first = points[0];
        let last = points[points.len() - 1];
        let span = seconds_between(first.timestamp, last.timestamp);

        if points.len() < 2 || span <= 0.0 {
            return Ok(Box::new(ConstantFit { price: last.price }));
        }

        // Trend is expressed per average observation interval.
        let step_secs = span / (points.len() - 1) as f64;

        let mut level = first.price;
        let mut trend = points[1].price - first.price;
        for point in &points[1..] {
            let prev_level = level;
            level = self.alpha * point.price + (1.0 - self.alpha) * (level + trend);
            trend = self.beta * (level - prev_level) + (1.0 - self.beta) * trend;
        }

        if !level.is_finite() || !trend.is_finite() {
            return Err(AppError::InsufficientData(format!(
                "smoothing for {} did not converge",
                series.asset
            )));
        }

        Ok(Box::new(SmoothedFit {
            last: last.timestamp,
            step_secs,
            level,
            trend,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricePoint;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 2, 19, 12, 0, 0).unwrap()
    }

    fn series(prices: &[(i64, f64)]) -> PriceSeries {
        PriceSeries::new(
            "bitcoin",
            prices
                .iter()
                .map(|&(hours, price)| PricePoint::new(t0() + Duration::hours(hours), price))
                .collect(),
        )
    }

    #[test]
    fn test_linear_extrapolates_exactly() {
        let model = LinearRegression.fit(&series(&[(0, 100.0), (1, 200.0)])).unwrap();
        let predicted = model.predict(t0() + Duration::hours(2));
        assert!((predicted - 300.0).abs() < 1e-9, "predicted {}", predicted);
    }

    #[test]
    fn test_linear_least_squares_slope() {
        let fit = LinearRegression
            .fit_line(&series(&[(0, 1.0), (1, 3.0), (2, 2.0), (3, 4.0)]))
            .unwrap()
            .unwrap();
        // Slope of 0.8 per hour.
        assert!((fit.slope * 3600.0 - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_single_point_is_constant() {
        let single = series(&[(0, 42.0)]);
        for method in [TrendMethod::LinearRegression, TrendMethod::ExponentialSmoothing] {
            let fitted = model_for(method).fit(&single).unwrap();
            assert_eq!(fitted.predict(t0() + Duration::days(400)), 42.0);
        }
    }

    #[test]
    fn test_identical_timestamps_average() {
        let fitted = LinearRegression
            .fit(&series(&[(5, 10.0), (5, 20.0)]))
            .unwrap();
        assert_eq!(fitted.predict(t0()), 15.0);
    }

    #[test]
    fn test_empty_series_is_insufficient() {
        let empty = PriceSeries::new("bitcoin", Vec::new());
        assert!(matches!(
            LinearRegression.fit(&empty),
            Err(AppError::InsufficientData(_))
        ));
        assert!(matches!(
            ExponentialSmoothing::default().fit(&empty),
            Err(AppError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_smoothing_follows_a_clean_trend() {
        let prices: Vec<(i64, f64)> = (0..48).map(|h| (h, 100.0 + 10.0 * h as f64)).collect();
        let fitted = ExponentialSmoothing::default().fit(&series(&prices)).unwrap();

        let next = fitted.predict(t0() + Duration::hours(48));
        assert!((next - 580.0).abs() < 1e-6, "predicted {}", next);
    }

    #[test]
    fn test_flat_series_stays_flat() {
        let prices: Vec<(i64, f64)> = (0..24).map(|h| (h * 24, 50000.0)).collect();
        let flat = series(&prices);
        for method in [TrendMethod::LinearRegression, TrendMethod::ExponentialSmoothing] {
            let fitted = model_for(method).fit(&flat).unwrap();
            let predicted = fitted.predict(t0() + Duration::days(60));
            assert!((predicted - 50000.0).abs() < 1e-6, "{:?} predicted {}", method, predicted);
        }
    }
}
