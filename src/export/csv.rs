use ::csv::{Writer, WriterBuilder};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use uuid::Uuid;

use super::rounded;
use crate::error::ExportError;
use crate::models::{ActivityRecord, AthleteProfile, DailyRecord};
use crate::simulation::AthleteYear;

/// Column order of `daily_data.csv`
pub const DAILY_COLUMNS: [&str; 15] = [
    "athlete_id",
    "date",
    "resting_hr",
    "hrv",
    "sleep_hours",
    "deep_sleep",
    "light_sleep",
    "rem_sleep",
    "sleep_quality",
    "body_battery_morning",
    "stress",
    "body_battery_evening",
    "planned_tss",
    "actual_tss",
    "injury",
];

#[derive(Debug, Serialize)]
struct DailyRow {
    athlete_id: Uuid,
    date: NaiveDate,
    resting_hr: Decimal,
    hrv: Decimal,
    sleep_hours: Decimal,
    deep_sleep: Decimal,
    light_sleep: Decimal,
    rem_sleep: Decimal,
    sleep_quality: Decimal,
    body_battery_morning: Decimal,
    stress: Decimal,
    body_battery_evening: Decimal,
    planned_tss: Decimal,
    actual_tss: Decimal,
    injury: u8,
}

impl From<&DailyRecord> for DailyRow {
    fn from(d: &DailyRecord) -> Self {
        DailyRow {
            athlete_id: d.athlete_id,
            date: d.date,
            resting_hr: rounded(d.resting_hr, 1),
            hrv: rounded(d.hrv, 1),
            sleep_hours: rounded(d.sleep_hours, 2),
            deep_sleep: rounded(d.deep_sleep, 1),
            light_sleep: rounded(d.light_sleep, 1),
            rem_sleep: rounded(d.rem_sleep, 1),
            sleep_quality: rounded(d.sleep_quality, 3),
            body_battery_morning: rounded(d.body_battery_morning, 1),
            stress: rounded(d.stress, 1),
            body_battery_evening: rounded(d.body_battery_evening, 1),
            planned_tss: rounded(d.planned_tss, 1),
            actual_tss: rounded(d.actual_tss, 1),
            injury: u8::from(d.injury),
        }
    }
}

#[derive(Debug, Serialize)]
struct ActivityRow {
    athlete_id: Uuid,
    date: NaiveDate,
    sport: String,
    workout_type: String,
    start_hour: u32,
    duration_minutes: Decimal,
    planned_tss: Decimal,
    tss: Decimal,
    intensity_factor: Decimal,
    avg_hr: Decimal,
    max_hr: Decimal,
    avg_power: Option<Decimal>,
    planned: u8,
}

impl From<&ActivityRecord> for ActivityRow {
    fn from(a: &ActivityRecord) -> Self {
        ActivityRow {
            athlete_id: a.athlete_id,
            date: a.date,
            sport: a.sport.to_string(),
            workout_type: format!("{:?}", a.kind).to_lowercase(),
            start_hour: a.start_hour,
            duration_minutes: rounded(a.duration_minutes, 1),
            planned_tss: rounded(a.planned_tss, 1),
            tss: rounded(a.tss, 1),
            intensity_factor: rounded(a.intensity_factor, 2),
            avg_hr: rounded(a.avg_hr, 0),
            max_hr: rounded(a.max_hr, 0),
            avg_power: a.avg_power.map(|p| rounded(p, 0)),
            planned: u8::from(a.planned),
        }
    }
}

#[derive(Debug, Serialize)]
struct AthleteRow {
    athlete_id: Uuid,
    gender: String,
    age: u32,
    height_cm: Decimal,
    weight_kg: Decimal,
    genetic_factor: Decimal,
    vo2max: Decimal,
    ftp: Decimal,
    css: Decimal,
    lthr: Decimal,
    max_hr: Decimal,
    resting_hr: Decimal,
    threshold_pace: Decimal,
    hrv_baseline: Decimal,
    hrv_low: Decimal,
    hrv_high: Decimal,
    training_experience: u32,
    weekly_training_hours: Decimal,
    recovery_rate: Decimal,
    lifestyle: String,
    sleep_time_norm: Decimal,
    sleep_quality: Decimal,
    nutrition_factor: Decimal,
    stress_factor: Decimal,
    smoking_factor: Decimal,
    drinking_factor: Decimal,
    specialization: String,
    sensor_profile: String,
    chronotype: String,
    cycle_length: Option<u32>,
}

impl From<&AthleteProfile> for AthleteRow {
    fn from(a: &AthleteProfile) -> Self {
        let l = &a.lifestyle;
        AthleteRow {
            athlete_id: a.id,
            gender: format!("{:?}", a.gender).to_lowercase(),
            age: a.age,
            height_cm: rounded(a.height_cm, 1),
            weight_kg: rounded(a.weight_kg, 1),
            genetic_factor: rounded(a.genetic_factor, 3),
            vo2max: rounded(a.vo2max, 1),
            ftp: rounded(a.ftp, 0),
            css: rounded(a.css, 1),
            lthr: rounded(a.lthr, 0),
            max_hr: rounded(a.max_hr, 0),
            resting_hr: rounded(a.resting_hr, 1),
            threshold_pace: rounded(a.threshold_pace, 2),
            hrv_baseline: rounded(a.hrv_baseline, 1),
            hrv_low: rounded(a.hrv_range.low, 1),
            hrv_high: rounded(a.hrv_range.high, 1),
            training_experience: a.training_experience,
            weekly_training_hours: rounded(a.weekly_training_hours, 1),
            recovery_rate: rounded(a.recovery_rate, 2),
            lifestyle: l.archetype.name().to_string(),
            sleep_time_norm: rounded(l.sleep_norm, 2),
            sleep_quality: rounded(l.sleep_quality, 2),
            nutrition_factor: rounded(l.nutrition, 2),
            stress_factor: rounded(l.stress, 2),
            smoking_factor: rounded(l.smoking, 2),
            drinking_factor: rounded(l.drinking, 2),
            specialization: format!("{:?}", a.specialization),
            sensor_profile: format!("{:?}", a.sensor_profile).to_lowercase(),
            chronotype: format!("{:?}", a.chronotype).to_lowercase(),
            cycle_length: a.menstrual.map(|m| m.cycle_length),
        }
    }
}

fn writer(path: &Path, headers: bool) -> Result<Writer<File>, ExportError> {
    let file = File::create(path).map_err(|e| ExportError::ExportFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(WriterBuilder::new().has_headers(headers).from_writer(file))
}

/// Write every athlete-day, returns the row count
pub fn export_daily_data(years: &[AthleteYear], path: &Path) -> Result<usize, ExportError> {
    // Header is written explicitly so an empty cohort still has the schema
    let mut writer = writer(path, false)?;
    writer.write_record(DAILY_COLUMNS)?;
    let mut rows = 0;
    for record in years.iter().flat_map(|y| y.daily_data.iter()) {
        writer.serialize(DailyRow::from(record))?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

/// Write every activity, returns the row count
pub fn export_activity_data(years: &[AthleteYear], path: &Path) -> Result<usize, ExportError> {
    let mut writer = writer(path, true)?;
    let mut rows = 0;
    for activity in years.iter().flat_map(|y| y.activity_data.iter()) {
        writer.serialize(ActivityRow::from(activity))?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

/// One row per athlete profile
pub fn export_athletes(years: &[AthleteYear], path: &Path) -> Result<(), ExportError> {
    let mut writer = writer(path, true)?;
    for year in years {
        writer.serialize(AthleteRow::from(&year.athlete))?;
    }
    writer.flush()?;
    Ok(())
}
