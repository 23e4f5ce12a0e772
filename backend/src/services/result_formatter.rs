use chrono::{DateTime, Utc};

use crate::models::{Frequency, PredictionRecord};

pub fn date_format(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Hour => "%Y-%m-%d %H:%M:%S",
        Frequency::Day => "%Y-%m-%d",
        Frequency::Month => "%Y-%m",
        Frequency::Year => "%Y",
    }
}

/// Shortest round-trip decimal form of `price`, always with a fractional part
/// and never in exponent notation. No rounding is applied.
pub fn decimal_string(price: f64) -> String {
    let s = price.to_string();
    if !price.is_finite() || s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}

pub fn format(timestamp: DateTime<Utc>, price: f64, frequency: Frequency) -> PredictionRecord {
    PredictionRecord {
        date: timestamp.format(date_format(frequency)).to_string(),
        price: decimal_string(price),
    }
}
