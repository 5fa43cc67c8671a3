use serde_json::Value;
use std::fs;
use tempfile::tempdir;
use trainsim::export::{self, csv::DAILY_COLUMNS, ExportFormat};
use trainsim::{SimulationConfig, YearOrchestrator};

/// Export and configuration file tests

fn simulate(n: usize) -> Vec<trainsim::AthleteYear> {
    let mut config = SimulationConfig::default();
    config.run.n_athletes = n;
    config.run.year = 2023;
    config.run.seed = 31;
    config.run.show_progress = false;
    YearOrchestrator::new(config).unwrap().run().unwrap()
}

#[test]
fn test_export_writes_all_files() {
    let years = simulate(2);
    let dir = tempdir().unwrap();

    let report = export::export_cohort(&years, dir.path(), ExportFormat::Both).unwrap();
    assert_eq!(report.files.len(), 4);
    assert_eq!(report.athletes, 2);
    assert_eq!(report.daily_rows, 730);
    assert_eq!(
        report.activity_rows,
        years.iter().map(|y| y.activity_data.len()).sum::<usize>()
    );

    let daily = fs::read_to_string(dir.path().join(export::DAILY_FILE)).unwrap();
    let mut lines = daily.lines();
    assert_eq!(
        lines.next().unwrap(),
        "athlete_id,date,resting_hr,hrv,sleep_hours,deep_sleep,light_sleep,rem_sleep,\
         sleep_quality,body_battery_morning,stress,body_battery_evening,planned_tss,actual_tss,injury"
    );
    assert_eq!(lines.count(), 730);

    let first_row = daily.lines().nth(1).unwrap();
    assert_eq!(first_row.split(',').count(), DAILY_COLUMNS.len());
    assert!(first_row.contains("2023-01-01"));
    assert!(first_row.ends_with(",0") || first_row.ends_with(",1"));

    let athletes = fs::read_to_string(dir.path().join(export::ATHLETES_FILE)).unwrap();
    assert_eq!(athletes.lines().count(), 3);
    assert!(athletes.lines().next().unwrap().starts_with("athlete_id,gender,age"));

    let summary: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join(export::SUMMARY_FILE)).unwrap()).unwrap();
    assert_eq!(summary["athletes"], 2);
    assert_eq!(summary["days"], 730);
    assert_eq!(summary["per_athlete"].as_array().unwrap().len(), 2);
    assert_eq!(summary["per_athlete"][0]["first_day"], "2023-01-01");
    assert_eq!(summary["per_athlete"][0]["last_day"], "2023-12-31");
}

#[test]
fn test_csv_only_export() {
    let years = simulate(1);
    let dir = tempdir().unwrap();

    let report = export::export_cohort(&years, dir.path(), ExportFormat::Csv).unwrap();
    assert_eq!(report.files.len(), 3);
    assert!(!dir.path().join(export::SUMMARY_FILE).exists());
}

#[test]
fn test_empty_cohort_keeps_schema() {
    let dir = tempdir().unwrap();
    let report = export::export_cohort(&[], dir.path(), ExportFormat::Csv).unwrap();
    assert_eq!(report.daily_rows, 0);

    let daily = fs::read_to_string(dir.path().join(export::DAILY_FILE)).unwrap();
    assert_eq!(daily.lines().count(), 1);
    assert!(daily.starts_with("athlete_id,date,"));
}

#[test]
fn test_export_creates_nested_directory() {
    let years = simulate(1);
    let dir = tempdir().unwrap();
    let nested = dir.path().join("runs").join("a");

    export::export_cohort(&years, &nested, ExportFormat::Json).unwrap();
    assert!(nested.join(export::SUMMARY_FILE).exists());
}

#[test]
fn test_config_toml_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trainsim.toml");

    let mut config = SimulationConfig::default();
    config.run.n_athletes = 25;
    config.run.seed = 1234;
    config.run.threads = Some(2);
    config.patterns.lookback_days = 10;
    config.save_to_file(&path).unwrap();

    let loaded = SimulationConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_config_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.toml");
    fs::write(&path, "[run]\nseed = 77\nn_athletes = 3\n").unwrap();

    let loaded = SimulationConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded.run.seed, 77);
    assert_eq!(loaded.run.n_athletes, 3);
    assert_eq!(loaded.injury, SimulationConfig::default().injury);
    assert_eq!(loaded.patterns, SimulationConfig::default().patterns);
}

#[test]
fn test_invalid_config_file_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[patterns]\nlookback_days = 30\n").unwrap();
    assert!(SimulationConfig::load_from_file(&path).is_err());

    fs::write(&path, "not = [valid").unwrap();
    assert!(SimulationConfig::load_from_file(&path).is_err());
}
