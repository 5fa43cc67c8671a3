use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

use super::rounded_f64;
use crate::error::ExportError;
use crate::injury::InjuryEvent;
use crate::simulation::AthleteYear;

/// Top-level document of `summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct CohortSummary {
    pub athletes: usize,
    pub days: usize,
    pub total_injuries: usize,
    pub injury_days: usize,
    pub per_athlete: Vec<AthleteEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AthleteEntry {
    pub athlete_id: Uuid,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub injury_days: usize,
    pub injuries: Vec<InjuryEvent>,
    pub total_planned_tss: f64,
    pub total_actual_tss: f64,
    pub mean_acwr: f64,
    pub activities: usize,
    pub precursor_patches: usize,
    pub false_alarm_patches: usize,
    pub races: usize,
}

impl CohortSummary {
    pub fn from_years(years: &[AthleteYear]) -> Self {
        let per_athlete: Vec<AthleteEntry> = years
            .iter()
            .map(|year| {
                let s = year.summary();
                AthleteEntry {
                    athlete_id: s.athlete_id,
                    first_day: year.daily_data.first().map(|d| d.date),
                    last_day: year.daily_data.last().map(|d| d.date),
                    injury_days: s.injury_days,
                    injuries: s.injuries,
                    total_planned_tss: rounded_f64(s.total_planned_tss, 1),
                    total_actual_tss: rounded_f64(s.total_actual_tss, 1),
                    mean_acwr: rounded_f64(s.mean_acwr, 3),
                    activities: s.activities,
                    precursor_patches: s.precursor_patches,
                    false_alarm_patches: s.false_alarm_patches,
                    races: year.plan.races.len(),
                }
            })
            .collect();

        CohortSummary {
            athletes: years.len(),
            days: years.iter().map(|y| y.daily_data.len()).sum(),
            total_injuries: per_athlete.iter().map(|a| a.injuries.len()).sum(),
            injury_days: per_athlete.iter().map(|a| a.injury_days).sum(),
            per_athlete,
        }
    }
}

/// Write the cohort summary as pretty JSON
pub fn export_summary<P: AsRef<Path>>(years: &[AthleteYear], output_path: P) -> Result<(), ExportError> {
    export_json(&CohortSummary::from_years(years), output_path)
}

/// Export any serializable data structure to JSON
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<(), ExportError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let json_data = serde_json::to_string_pretty(data)?;

    let mut file = std::fs::File::create(output_path)?;
    file.write_all(json_data.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::NamedTempFile;

    #[test]
    fn test_export_json_value() {
        let file = NamedTempFile::new().unwrap();
        export_json(&vec![1, 2, 3], file.path()).unwrap();
        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(parsed, serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_empty_cohort_summary() {
        let summary = CohortSummary::from_years(&[]);
        assert_eq!(summary.athletes, 0);
        assert_eq!(summary.total_injuries, 0);
        assert!(summary.per_athlete.is_empty());
    }
}
