use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use csv::WriterBuilder;
use serde::Serialize;

use crate::external::price_provider::HistoryWindow;
use crate::models::{Frequency, PricePoint, TrendMethod};

/// Fixed horizons offered by the interactive report tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPreset {
    Hours24,
    Days7,
    Months12,
}

impl ReportPreset {
    pub const ALL: [ReportPreset; 3] = [
        ReportPreset::Hours24,
        ReportPreset::Days7,
        ReportPreset::Months12,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ReportPreset::Hours24 => "24 hours",
            ReportPreset::Days7 => "7 days",
            ReportPreset::Months12 => "12 months",
        }
    }

    pub fn frequency(&self) -> Frequency {
        match self {
            ReportPreset::Hours24 => Frequency::Hour,
            ReportPreset::Days7 => Frequency::Day,
            ReportPreset::Months12 => Frequency::Month,
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            ReportPreset::Hours24 => 24,
            ReportPreset::Days7 => 7,
            ReportPreset::Months12 => 12,
        }
    }

    /// History used to train the model for this horizon.
    pub fn window(&self) -> HistoryWindow {
        match self {
            ReportPreset::Hours24 => HistoryWindow::Hours(24),
            ReportPreset::Days7 => HistoryWindow::Hours(168),
            ReportPreset::Months12 => HistoryWindow::Days(365),
        }
    }

    fn cell_format(&self) -> &'static str {
        match self {
            ReportPreset::Months12 => "%m/%d/%Y",
            _ => "%m/%d/%Y %H:%M",
        }
    }
}

/// 1-based menu selection, `None` when out of range or not a number.
pub fn parse_menu_choice(input: &str, options: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=options).contains(&n) => Some(n - 1),
        _ => None,
    }
}

/// A finished projection ready to be written or printed.
#[derive(Debug, Clone)]
pub struct Report {
    pub symbol: String,
    pub preset: ReportPreset,
    pub method: TrendMethod,
    pub generated_at: DateTime<Utc>,
    pub points: Vec<PricePoint>,
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Price")]
    price: f64,
    #[serde(rename = "Algorithm")]
    algorithm: &'a str,
}

impl Report {
    /// `{Algorithm}-{Preset}-{SYMBOL}-{mmddYYYY-HHMMSS}.csv`
    pub fn file_name<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        format!(
            "{}-{}-{}-{}.csv",
            self.method.label(),
            self.preset.label().replace(' ', "-"),
            self.symbol,
            self.generated_at
                .with_timezone(tz)
                .format("%m%d%Y-%H%M%S")
        )
    }

    /// Writes the report as a CSV spreadsheet under `dir`, creating it if needed.
    pub fn write_csv<Tz: TimeZone>(&self, dir: &Path, tz: &Tz) -> Result<PathBuf>
    where
        Tz::Offset: fmt::Display,
    {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create reports folder {}", dir.display()))?;

        let path = dir.join(self.file_name(tz));
        let mut writer = WriterBuilder::new()
            .from_path(&path)
            .with_context(|| format!("Failed to create report {}", path.display()))?;

        for point in &self.points {
            writer.serialize(ReportRow {
                date: point
                    .timestamp
                    .with_timezone(tz)
                    .format(self.preset.cell_format())
                    .to_string(),
                price: point.price,
                algorithm: self.method.label(),
            })?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write report {}", path.display()))?;

        Ok(path)
    }

    /// Console table of the projected prices.
    pub fn render_table<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        let rule = format!("+{}+{}+", "-".repeat(27), "-".repeat(12));
        let mut out = String::new();

        let _ = writeln!(out, "Price predictions for: {}", self.symbol);
        let _ = writeln!(out, "Algorithm: {}", self.method.label().replace('-', " "));
        let _ = writeln!(out, "Time period: {}", self.preset.label());
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "{:<26}{:<13}|", "| Date", " | Price");
        let _ = writeln!(out, "{}", rule);
        for point in &self.points {
            let date = point
                .timestamp
                .with_timezone(tz)
                .format("%m/%d/%Y %I:%M:%S %p")
                .to_string();
            let price = format!("${:.2}", point.price);
            let width = price.len().max(10);
            let _ = writeln!(out, "| {:<25} | {:>width$} |", date, price, width = width);
        }
        let _ = writeln!(out, "{}", rule);
        out
    }
}
