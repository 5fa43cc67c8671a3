use chrono::{Datelike, Days, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::AthleteProfile;
use crate::sampling::{normal, uniform};

/// Fitness/fatigue model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PmcConfig {
    /// CTL time constant in days (default: 42)
    pub ctl_time_constant: u16,

    /// ATL time constant in days (default: 7)
    pub atl_time_constant: u16,

    /// Days in the acute ACWR window
    pub acute_window: usize,

    /// Days in the chronic ACWR window
    pub chronic_window: usize,

    /// Minimum history length before ACWR leaves its neutral value
    pub min_chronic_days: usize,

    /// Number of trailing history entries any computation reads
    pub history_window: usize,
}

impl Default for PmcConfig {
    fn default() -> Self {
        PmcConfig {
            ctl_time_constant: 42,
            atl_time_constant: 7,
            acute_window: 7,
            chronic_window: 28,
            min_chronic_days: 7,
            history_window: 28,
        }
    }
}

/// One day of load history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub tss: f64,
    pub hrv: f64,
}

/// Append-only daily TSS/HRV history
///
/// Values are never rewritten. [`FitnessFatigueFormModel::update_history`]
/// hands back a new history with one more entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingHistory {
    entries: Vec<HistoryEntry>,
}

impl RollingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        RollingHistory { entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The trailing `n` entries (fewer if the history is shorter)
    pub fn tail(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// TSS `k` days back, where 1 is the most recent entry
    pub fn tss_back(&self, k: usize) -> f64 {
        if k == 0 || k > self.entries.len() {
            return 0.0;
        }
        self.entries[self.entries.len() - k].tss
    }

    /// Mean TSS over the trailing `n` entries, 0 for an empty history
    pub fn mean_tss(&self, n: usize) -> f64 {
        let tail = self.tail(n);
        if tail.is_empty() {
            return 0.0;
        }
        tail.iter().map(|e| e.tss).sum::<f64>() / tail.len() as f64
    }
}

/// Training state derived from the load history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Chronic training load (CTL)
    pub fitness: f64,

    /// Acute training load (ATL)
    pub fatigue: f64,

    /// Training stress balance (CTL - ATL)
    pub form: f64,

    /// Acute:chronic workload ratio
    pub acwr: f64,
}

impl TrainingMetrics {
    /// Metrics for an athlete with no recorded load
    pub fn neutral() -> Self {
        TrainingMetrics {
            fitness: 0.0,
            fatigue: 0.0,
            form: 0.0,
            acwr: 1.0,
        }
    }
}

/// Core fitness/fatigue/form engine with HRV-adjusted load
#[derive(Debug, Clone, Default)]
pub struct FitnessFatigueFormModel {
    config: PmcConfig,
}

impl FitnessFatigueFormModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PmcConfig) -> Self {
        FitnessFatigueFormModel { config }
    }

    pub fn config(&self) -> &PmcConfig {
        &self.config
    }

    /// Build the pre-season TSS history for the days before `start_date`
    ///
    /// HRV values are placeholders at baseline until
    /// [`initialize_hrv_history`](Self::initialize_hrv_history) fills them.
    pub fn initialize_tss_history<R: Rng + ?Sized>(
        &self,
        athlete: &AthleteProfile,
        start_date: NaiveDate,
        rng: &mut R,
    ) -> RollingHistory {
        let days = self.config.history_window;
        let experience = athlete.training_experience;

        let (base_tss, variability) = match experience {
            0 => (40.0, 0.35),
            1..=2 => (60.0, 0.30),
            3..=4 => (70.0, 0.25),
            5..=7 => (85.0, 0.20),
            8..=11 => (95.0, 0.15),
            _ => (100.0, 0.12),
        };

        let fitness_factor =
            1.0 + (athlete.vo2max / 60.0).ln_1p() + (athlete.ftp / 350.0).ln_1p();
        let lifestyle_score = athlete.lifestyle.score();
        let daily_base =
            base_tss * (athlete.weekly_training_hours / 10.0) * fitness_factor * lifestyle_score;
        let variability = variability * (2.0 - lifestyle_score);

        // Mon..Sun
        const DAY_FACTORS: [f64; 7] = [1.0, 1.5, 0.9, 1.4, 0.6, 1.7, 0.3];

        let first = start_date
            .checked_sub_days(Days::new(days as u64))
            .unwrap_or(start_date);

        let entries = (0..days)
            .map(|i| {
                let date = first + Days::new(i as u64);
                let day_factor = DAY_FACTORS[date.weekday().num_days_from_monday() as usize];
                let mut tss = (daily_base * day_factor * normal(rng, 1.0, variability)).max(0.0);

                if (i / 7) % 4 == 3 {
                    tss *= 0.7;
                }
                if experience >= 5 && days > 1 {
                    tss *= 0.9 + 0.2 * i as f64 / (days - 1) as f64;
                }

                HistoryEntry {
                    date,
                    tss: tss.round(),
                    hrv: athlete.hrv_baseline,
                }
            })
            .collect();

        RollingHistory::from_entries(entries)
    }

    /// Fill the HRV column of a freshly initialised history
    pub fn initialize_hrv_history<R: Rng + ?Sized>(
        &self,
        athlete: &AthleteProfile,
        tss_history: &RollingHistory,
        rng: &mut R,
    ) -> RollingHistory {
        let sleep_quality = athlete.lifestyle.sleep_quality;
        let mut prev_hrv = athlete.hrv_baseline;

        let entries = tss_history
            .entries()
            .iter()
            .map(|entry| {
                let mut impact = -0.03 * entry.tss;
                if entry.tss < 30.0 {
                    impact += 2.0;
                }
                let sleep_effect = normal(rng, sleep_quality * 2.0, 1.0);
                let variation = normal(rng, 0.0, 1.0);

                let hrv = (prev_hrv + impact + sleep_effect + variation)
                    .max(40.0)
                    .clamp(athlete.hrv_range.low, athlete.hrv_range.high)
                    .round();
                prev_hrv = hrv;

                HistoryEntry { hrv, ..*entry }
            })
            .collect();

        RollingHistory::from_entries(entries)
    }

    /// Compute fitness, fatigue, form and ACWR from the trailing window
    ///
    /// Each day's TSS is weighted by that day's HRV relative to baseline.
    /// ACWR falls back to 1.0 while the history is too short or the
    /// chronic load is zero.
    pub fn calculate_training_metrics(
        &self,
        history: &RollingHistory,
        hrv_baseline: f64,
    ) -> TrainingMetrics {
        let window = history.tail(self.config.history_window);
        if window.is_empty() {
            return TrainingMetrics::neutral();
        }

        let loads: Vec<f64> = window
            .iter()
            .map(|e| {
                if hrv_baseline > 0.0 {
                    e.tss * e.hrv / hrv_baseline
                } else {
                    e.tss
                }
            })
            .collect();

        let chronic = tail(&loads, self.config.chronic_window);
        let acute = tail(&loads, self.config.acute_window);

        let fitness = ewma(chronic, self.config.ctl_time_constant);
        let fatigue = ewma(acute, self.config.atl_time_constant);

        let chronic_mean = mean(chronic);
        let acwr = if loads.len() < self.config.min_chronic_days || chronic_mean <= 0.0 {
            1.0
        } else {
            mean(acute) / chronic_mean
        };

        TrainingMetrics {
            fitness,
            fatigue,
            form: fitness - fatigue,
            acwr,
        }
    }

    /// Return a new history with today's values appended
    pub fn update_history(
        &self,
        history: &RollingHistory,
        date: NaiveDate,
        tss: f64,
        hrv: f64,
    ) -> RollingHistory {
        let mut entries = Vec::with_capacity(history.len() + 1);
        entries.extend_from_slice(history.entries());
        entries.push(HistoryEntry { date, tss, hrv });
        RollingHistory::from_entries(entries)
    }

    /// Daily TSS ceiling used by the high-load flags
    pub fn max_daily_tss<R: Rng + ?Sized>(&self, athlete: &AthleteProfile, rng: &mut R) -> f64 {
        let hours = athlete.weekly_training_hours;
        let (rate, daily_factor) = match athlete.training_experience {
            0..=1 => (uniform(rng, 40.0, 50.0), 0.30),
            2..=4 => (uniform(rng, 50.0, 65.0), 0.35),
            5..=7 => (uniform(rng, 65.0, 80.0), 0.40),
            _ => (uniform(rng, 80.0, 90.0), 0.45),
        };
        hours * rate * daily_factor
    }
}

fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// x_today = x_yesterday + (load - x_yesterday) / tau, seeded with the mean
fn ewma(values: &[f64], time_constant: u16) -> f64 {
    let tau = f64::from(time_constant.max(1));
    values
        .iter()
        .fold(mean(values), |acc, load| acc + (load - acc) / tau)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::athlete::AthleteProfileGenerator;
    use crate::sampling::run_rng;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn constant_history(days: u32, tss: f64, hrv: f64) -> RollingHistory {
        RollingHistory::from_entries(
            (1..=days)
                .map(|d| HistoryEntry {
                    date: date(d),
                    tss,
                    hrv,
                })
                .collect(),
        )
    }

    #[test]
    fn test_constant_load_is_balanced() {
        let model = FitnessFatigueFormModel::new();
        let metrics = model.calculate_training_metrics(&constant_history(28, 80.0, 60.0), 60.0);

        assert!((metrics.fitness - 80.0).abs() < 1e-9);
        assert!((metrics.fatigue - 80.0).abs() < 1e-9);
        assert!(metrics.form.abs() < 1e-9);
        assert!((metrics.acwr - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_history_gives_neutral_acwr() {
        let model = FitnessFatigueFormModel::new();
        let metrics = model.calculate_training_metrics(&constant_history(5, 120.0, 60.0), 60.0);
        assert_eq!(metrics.acwr, 1.0);

        let empty = model.calculate_training_metrics(&RollingHistory::new(), 60.0);
        assert_eq!(empty, TrainingMetrics::neutral());
    }

    #[test]
    fn test_zero_chronic_load_gives_neutral_acwr() {
        let model = FitnessFatigueFormModel::new();
        let metrics = model.calculate_training_metrics(&constant_history(28, 0.0, 60.0), 60.0);
        assert_eq!(metrics.acwr, 1.0);
    }

    #[test]
    fn test_acute_spike_raises_acwr_and_fatigue() {
        let model = FitnessFatigueFormModel::new();
        let mut history = constant_history(21, 50.0, 60.0);
        for d in 22..=28 {
            history = model.update_history(&history, date(d), 150.0, 60.0);
        }
        let metrics = model.calculate_training_metrics(&history, 60.0);

        assert!(metrics.acwr > 1.5);
        assert!(metrics.fatigue > metrics.fitness);
        assert!(metrics.form < 0.0);
    }

    #[test]
    fn test_hrv_scales_load() {
        let model = FitnessFatigueFormModel::new();
        let suppressed = model.calculate_training_metrics(&constant_history(28, 80.0, 45.0), 60.0);
        let normal = model.calculate_training_metrics(&constant_history(28, 80.0, 60.0), 60.0);
        assert!(suppressed.fitness < normal.fitness);
    }

    #[test]
    fn test_only_trailing_window_is_read() {
        let model = FitnessFatigueFormModel::new();
        let mut history = constant_history(10, 500.0, 60.0);
        for i in 0..28 {
            history = model.update_history(&history, date(1) + Days::new(10 + i), 80.0, 60.0);
        }
        let metrics = model.calculate_training_metrics(&history, 60.0);
        assert!((metrics.fitness - 80.0).abs() < 1e-9);
        assert_eq!(history.len(), 38);
    }

    #[test]
    fn test_update_history_leaves_input_untouched() {
        let model = FitnessFatigueFormModel::new();
        let history = constant_history(3, 60.0, 55.0);
        let updated = model.update_history(&history, date(4), 90.0, 50.0);

        assert_eq!(history.len(), 3);
        assert_eq!(updated.len(), 4);
        assert_eq!(updated.tss_back(1), 90.0);
        assert_eq!(updated.tss_back(2), 60.0);
        assert_eq!(updated.tss_back(9), 0.0);
    }

    #[test]
    fn test_initial_history_shape() {
        let mut rng = run_rng(42, 0);
        let athlete = AthleteProfileGenerator::new().generate_athlete_profile(&mut rng);
        let model = FitnessFatigueFormModel::new();
        let start = date(1);

        let tss = model.initialize_tss_history(&athlete, start, &mut rng);
        let history = model.initialize_hrv_history(&athlete, &tss, &mut rng);

        assert_eq!(history.len(), 28);
        assert!(history.entries().iter().all(|e| e.tss >= 0.0));
        assert!(history.entries().iter().all(|e| e.date < start));
        assert_eq!(history.entries().last().unwrap().date, start.pred_opt().unwrap());
        for entry in history.entries() {
            assert!(entry.hrv >= athlete.hrv_range.low.floor());
            assert!(entry.hrv <= athlete.hrv_range.high.ceil());
        }
    }

    #[test]
    fn test_max_daily_tss_scales_with_hours() {
        let mut rng = run_rng(3, 0);
        let mut athlete = AthleteProfileGenerator::new().generate_athlete_profile(&mut rng);
        let model = FitnessFatigueFormModel::new();

        athlete.weekly_training_hours = 8.0;
        let low = model.max_daily_tss(&athlete, &mut run_rng(5, 0));
        athlete.weekly_training_hours = 16.0;
        let high = model.max_daily_tss(&athlete, &mut run_rng(5, 0));

        assert!(low > 0.0);
        assert!((high - 2.0 * low).abs() < 1e-9);
    }
}
