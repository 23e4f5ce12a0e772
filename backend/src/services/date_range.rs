use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::models::Frequency;

/// Where a projection starts counting from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeAnchor {
    /// The newest observation in the series.
    #[default]
    LastObservation,
    /// The current wall-clock time.
    WallClock,
}

impl RangeAnchor {
    pub fn resolve(&self, last_observation: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            RangeAnchor::LastObservation => last_observation,
            RangeAnchor::WallClock => Utc::now(),
        }
    }
}

/// `count` timestamps strictly after `anchor`, spaced by `frequency`.
///
/// Hours and days are fixed offsets. Months and years land on calendar
/// month-ends and year-ends, keeping the anchor's time of day.
pub fn generate(anchor: DateTime<Utc>, frequency: Frequency, count: u32) -> Vec<DateTime<Utc>> {
    match frequency {
        Frequency::Hour => (1..=count as i64)
            .map(|i| anchor + Duration::hours(i))
            .collect(),
        Frequency::Day => (1..=count as i64)
            .map(|i| anchor + Duration::days(i))
            .collect(),
        Frequency::Month => calendar_ends(anchor, count, 1),
        Frequency::Year => calendar_ends(anchor, count, 12),
    }
}

fn calendar_ends(anchor: DateTime<Utc>, count: u32, months_per_step: i64) -> Vec<DateTime<Utc>> {
    let naive = anchor.naive_utc();
    let time = naive.time();

    let (mut year, mut month) = if months_per_step == 12 {
        (naive.year(), 12)
    } else {
        (naive.year(), naive.month())
    };

    let at_end = |year: i32, month: u32| NaiveDateTime::new(month_end(year, month), time).and_utc();

    if at_end(year, month) <= anchor {
        (year, month) = add_months(year, month, months_per_step);
    }

    let mut dates = Vec::with_capacity(count as usize);
    for _ in 0..count {
        dates.push(at_end(year, month));
        (year, month) = add_months(year, month, months_per_step);
    }
    dates
}

fn add_months(year: i32, month: u32, n: i64) -> (i32, u32) {
    let total = year as i64 * 12 + (month as i64 - 1) + n;
    (total.div_euclid(12) as i32, (total.rem_euclid(12) + 1) as u32)
}

/// Last day of the given month.
pub fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = add_months(year, month, 1);
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}
