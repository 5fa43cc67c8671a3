//! Writers for simulated athlete-years
//!
//! CSV files follow the fixed column schema consumed downstream; the JSON
//! summary carries per-athlete totals and injury events.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ExportError;
use crate::simulation::AthleteYear;

pub mod csv;
pub mod json;

pub const DAILY_FILE: &str = "daily_data.csv";
pub const ACTIVITY_FILE: &str = "activity_data.csv";
pub const ATHLETES_FILE: &str = "athletes.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Json,
    Both,
}

impl ExportFormat {
    pub fn writes_csv(&self) -> bool {
        matches!(self, ExportFormat::Csv | ExportFormat::Both)
    }

    pub fn writes_json(&self) -> bool {
        matches!(self, ExportFormat::Json | ExportFormat::Both)
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "both" | "all" => Ok(ExportFormat::Both),
            _ => Err(format!("Unsupported export format: {}", s)),
        }
    }
}

/// Files written by one export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub files: Vec<PathBuf>,
    pub daily_rows: usize,
    pub activity_rows: usize,
    pub athletes: usize,
}

/// Write a cohort into `output_dir`
pub fn export_cohort(
    years: &[AthleteYear],
    output_dir: &Path,
    format: ExportFormat,
) -> Result<ExportReport, ExportError> {
    fs::create_dir_all(output_dir).map_err(|e| ExportError::ExportFailed {
        path: output_dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut report = ExportReport {
        athletes: years.len(),
        ..ExportReport::default()
    };

    if format.writes_csv() {
        let daily = output_dir.join(DAILY_FILE);
        report.daily_rows = csv::export_daily_data(years, &daily)?;
        report.files.push(daily);

        let activities = output_dir.join(ACTIVITY_FILE);
        report.activity_rows = csv::export_activity_data(years, &activities)?;
        report.files.push(activities);

        let athletes = output_dir.join(ATHLETES_FILE);
        csv::export_athletes(years, &athletes)?;
        report.files.push(athletes);
    }

    if format.writes_json() {
        let summary = output_dir.join(SUMMARY_FILE);
        json::export_summary(years, &summary)?;
        report.files.push(summary);
    }

    tracing::info!(
        dir = %output_dir.display(),
        files = report.files.len(),
        daily_rows = report.daily_rows,
        "Export complete"
    );
    Ok(report)
}

/// Round through `Decimal`; non-finite values become zero
pub fn rounded(value: f64, decimals: u32) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(decimals))
        .unwrap_or(Decimal::ZERO)
}

/// [`rounded`] converted back for JSON numbers
pub fn rounded_f64(value: f64, decimals: u32) -> f64 {
    rounded(value, decimals).to_f64().unwrap_or(0.0)
}
