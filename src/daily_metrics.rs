//! Morning and evening wearable metrics
//!
//! Morning metrics (sleep, resting HR, HRV, body battery) respond to the
//! previous day's load, stress and injury state. Evening metrics (stress and
//! evening body battery) respond to the day's executed load.

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{AthleteProfile, DailyFlags, RHR_BAND};
use crate::modulation::Modulation;
use crate::pmc::{RollingHistory, TrainingMetrics};
use crate::sampling::{clip, normal, round_to};

/// Evening body battery stays at least this far below the morning value
pub const EVENING_BATTERY_GAP: f64 = 40.0;

/// Ideal share of deep, REM and light sleep
const IDEAL_DEEP: f64 = 0.20;
const IDEAL_REM: f64 = 0.25;
const IDEAL_LIGHT: f64 = 0.55;

/// Daily metric settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyMetricsConfig {
    /// Exponent of the right-skew transform applied to daily stress
    pub stress_skew_exponent: f64,

    /// Floor on simulated sleep duration in hours
    pub min_sleep_hours: f64,

    /// Local hour the evening reading is taken
    pub evening_hour: u32,
}

impl Default for DailyMetricsConfig {
    fn default() -> Self {
        Self {
            stress_skew_exponent: 1.3,
            min_sleep_hours: 4.0,
            evening_hour: 22,
        }
    }
}

/// What the next morning needs to know about yesterday
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrevDayState {
    /// Yesterday's executed TSS
    pub training_stress: f64,
    pub resting_hr: f64,
    pub hrv: f64,
    /// Yesterday's stress score (0-100)
    pub stress: f64,
    pub fatigue: f64,
    pub form: f64,
    pub body_battery_evening: f64,
}

impl PrevDayState {
    /// State before the first simulated day
    pub fn initial(athlete: &AthleteProfile, metrics: &TrainingMetrics) -> Self {
        PrevDayState {
            training_stress: 60.0,
            resting_hr: athlete.resting_hr,
            hrv: athlete.hrv_baseline,
            stress: athlete.lifestyle.stress * 100.0,
            fatigue: metrics.fatigue,
            form: metrics.form,
            body_battery_evening: 50.0,
        }
    }
}

/// Everything the morning simulation reads besides the profile
#[derive(Debug, Clone, Copy)]
pub struct MorningContext<'a> {
    pub prev_day: &'a PrevDayState,
    pub recovery_days_remaining: u32,
    pub max_daily_tss: f64,
    /// Load history up to and including yesterday
    pub history: &'a RollingHistory,
    /// Pre-workout acute:chronic workload ratio
    pub acwr: f64,
    pub modulation: &'a Modulation,
}

/// Morning readings of one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorningMetrics {
    pub date: NaiveDate,
    pub sleep_hours: f64,
    /// Minutes of deep sleep
    pub deep_sleep: f64,
    /// Minutes of light sleep
    pub light_sleep: f64,
    /// Minutes of REM sleep
    pub rem_sleep: f64,
    pub sleep_quality: f64,
    pub resting_hr: f64,
    pub hrv: f64,
    pub body_battery_morning: f64,
    pub flags: DailyFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EveningMetrics {
    pub stress: f64,
    pub body_battery_evening: f64,
}

/// Derived recovery inputs shared by the morning metrics
#[derive(Debug, Clone, Copy)]
struct RecoveryInputs {
    recovery_score: f64,
    injury_effect: f64,
    fatigue_factor: f64,
    stress_factor: f64,
    acwr_effect: f64,
    chronic_adaptation: f64,
    consecutive_high_load: u32,
}

/// Highest-priority load signal for the morning, most severe first
#[derive(Debug, Clone, Copy, PartialEq)]
enum LoadSignal {
    OvertrainingRisk,
    ExcessiveFatigue,
    HighLoad,
    ConsecutiveHighLoad,
    Peaking,
    HighStress,
    Settled,
}

impl LoadSignal {
    fn from_flags(flags: &DailyFlags) -> Self {
        match flags {
            DailyFlags {
                overtraining_risk: true,
                ..
            } => LoadSignal::OvertrainingRisk,
            DailyFlags {
                excessive_fatigue: true,
                ..
            } => LoadSignal::ExcessiveFatigue,
            DailyFlags { high_load: true, .. } => LoadSignal::HighLoad,
            DailyFlags {
                consecutive_high_load: 3..,
                ..
            } => LoadSignal::ConsecutiveHighLoad,
            DailyFlags { peaking: true, .. } => LoadSignal::Peaking,
            DailyFlags {
                high_stress: true, ..
            } => LoadSignal::HighStress,
            _ => LoadSignal::Settled,
        }
    }
}

/// Simulates morning and evening wearable data
#[derive(Debug, Clone, Default)]
pub struct DailyMetricsSimulator {
    config: DailyMetricsConfig,
}

impl DailyMetricsSimulator {
    pub fn new(config: DailyMetricsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DailyMetricsConfig {
        &self.config
    }

    pub fn simulate_morning_data<R: Rng + ?Sized>(
        &self,
        athlete: &AthleteProfile,
        date: NaiveDate,
        ctx: &MorningContext<'_>,
        rng: &mut R,
    ) -> MorningMetrics {
        let inputs = Self::recovery_inputs(athlete, ctx);
        let flags = Self::check_flags(ctx);

        // Sleep
        let sleep_hours = (athlete.lifestyle.sleep_norm + 0.1 * inputs.fatigue_factor
            - 0.2 * inputs.injury_effect
            - 0.1 * inputs.stress_factor
            + normal(rng, 0.0, 0.5))
        .max(self.config.min_sleep_hours);

        let deep_pct = clip(
            IDEAL_DEEP - 0.05 * inputs.fatigue_factor - 0.07 * inputs.injury_effect - 0.03 * inputs.stress_factor,
            0.08,
            0.25,
        );
        let rem_pct = clip(
            IDEAL_REM - 0.03 * inputs.fatigue_factor - 0.05 * inputs.injury_effect - 0.02 * inputs.stress_factor,
            0.15,
            0.25,
        );
        let light_pct = 1.0 - deep_pct - rem_pct;
        let sleep_quality = sleep_quality(sleep_hours, deep_pct, rem_pct, light_pct);

        let mut baseline_sleep = athlete.lifestyle.sleep_norm * athlete.lifestyle.sleep_quality;
        if athlete.lifestyle.sleep_quality > 0.85 {
            baseline_sleep *= 0.85;
        }
        let sleep_debt = (baseline_sleep - sleep_hours * sleep_quality).max(0.0);

        let signal = LoadSignal::from_flags(&flags);
        let resting_hr = self.resting_hr(athlete, ctx, &inputs, signal, sleep_debt, sleep_quality, rng);
        let hrv = self.hrv(athlete, ctx, &inputs, signal, &flags, sleep_debt, sleep_quality, rng);
        let body_battery_morning = Self::morning_body_battery(
            athlete,
            ctx,
            &inputs,
            sleep_quality,
            sleep_hours,
            hrv,
            resting_hr,
        );

        let deep_sleep = sleep_hours * deep_pct * 60.0;
        let rem_sleep = sleep_hours * rem_pct * 60.0;

        MorningMetrics {
            date,
            sleep_hours,
            deep_sleep,
            light_sleep: sleep_hours * 60.0 - deep_sleep - rem_sleep,
            rem_sleep,
            sleep_quality,
            resting_hr,
            hrv,
            body_battery_morning,
            flags,
        }
    }

    pub fn simulate_evening_data<R: Rng + ?Sized>(
        &self,
        athlete: &AthleteProfile,
        morning: &MorningMetrics,
        actual_tss: f64,
        fatigue: f64,
        current_hour: u32,
        rng: &mut R,
    ) -> EveningMetrics {
        let stress = self.stress(athlete, morning, fatigue, rng);

        let bbm = morning.body_battery_morning;
        let base_decay = 25.0 + 5.0 * ((current_hour as f64 - 15.0) / 12.0).abs();
        let decay_modifier = if bbm > 80.0 {
            1.4
        } else if bbm < 40.0 {
            0.8
        } else if actual_tss < 40.0 {
            1.3
        } else {
            1.0
        };

        let workout_drain = if actual_tss > 0.0 {
            actual_tss * (0.085 + actual_tss / 400.0 * 0.1)
        } else {
            0.0
        };
        let stress_drain = (stress / 100.0).powf(1.2) * 25.0;
        let fatigue_drain = fatigue * 0.12;

        let drain = base_decay * decay_modifier + workout_drain + stress_drain + fatigue_drain + normal(rng, 0.0, 2.0);
        let body_battery_evening = round_to((bbm - drain).max(5.0).min(bbm - EVENING_BATTERY_GAP), 1);

        EveningMetrics {
            stress,
            body_battery_evening,
        }
    }

    fn recovery_inputs(athlete: &AthleteProfile, ctx: &MorningContext<'_>) -> RecoveryInputs {
        let rr = athlete.recovery_rate.max(0.1);
        let history = ctx.history;

        let delayed = if history.len() >= 3 {
            history.tss_back(1) * 0.3 + history.tss_back(2) * 0.15 + history.tss_back(3) * 0.05
        } else {
            0.0
        };
        let total_fatigue = ctx.prev_day.fatigue / rr + delayed / rr;

        let injury_effect = if ctx.recovery_days_remaining == 0 {
            0.0
        } else {
            (ctx.recovery_days_remaining as f64 / rr / 10.0).min(1.0)
        };

        let acwr_effect = if ctx.acwr > 1.3 {
            0.1
        } else if ctx.acwr < 0.8 {
            0.05
        } else {
            0.0
        };

        let chronic_adaptation = if history.len() >= 28 && ctx.max_daily_tss > 0.0 {
            let avg = history.mean_tss(28);
            if avg > ctx.max_daily_tss * 0.7 {
                (avg / ctx.max_daily_tss * 0.2).min(0.2)
            } else {
                0.0
            }
        } else {
            0.0
        };

        RecoveryInputs {
            recovery_score: (1.0 - total_fatigue / 150.0).max(0.0),
            injury_effect,
            fatigue_factor: (total_fatigue / 100.0).min(1.0),
            stress_factor: (ctx.prev_day.stress / 100.0).min(1.0),
            acwr_effect,
            chronic_adaptation,
            consecutive_high_load: consecutive_high_load(history, ctx.max_daily_tss),
        }
    }

    fn check_flags(ctx: &MorningContext<'_>) -> DailyFlags {
        let prev = ctx.prev_day;
        let excessive_fatigue = prev.form < -20.0;
        let high_load = prev.training_stress > ctx.max_daily_tss;
        DailyFlags {
            excessive_fatigue,
            high_load,
            overtraining_risk: excessive_fatigue && high_load,
            peaking: prev.form > 20.0 && prev.form < 35.0,
            high_stress: prev.stress > 50.0,
            extreme_load: excessive_fatigue || prev.training_stress > ctx.max_daily_tss * 1.2,
            consecutive_high_load: consecutive_high_load(ctx.history, ctx.max_daily_tss),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resting_hr<R: Rng + ?Sized>(
        &self,
        athlete: &AthleteProfile,
        ctx: &MorningContext<'_>,
        inputs: &RecoveryInputs,
        signal: LoadSignal,
        sleep_debt: f64,
        sleep_quality: f64,
        rng: &mut R,
    ) -> f64 {
        let b = athlete.resting_hr;
        let mut deviation = 0.6 * sleep_debt + 0.08 * inputs.injury_effect * b + 0.1 * inputs.fatigue_factor * b
            - 0.03 * inputs.recovery_score * b
            - 0.02 * (sleep_quality - 0.7).max(0.0) * b
            + 0.08 * inputs.acwr_effect * b
            - inputs.chronic_adaptation * b;

        deviation += b * match signal {
            LoadSignal::OvertrainingRisk | LoadSignal::ExcessiveFatigue => 0.08,
            LoadSignal::HighLoad => 0.07,
            LoadSignal::ConsecutiveHighLoad => 0.05,
            LoadSignal::Peaking => -0.05,
            LoadSignal::HighStress => 0.05,
            LoadSignal::Settled => 0.0,
        };
        deviation += normal(rng, 0.0, 0.02 * b);

        // AR(1) carry-over from yesterday
        deviation = 0.7 * deviation + 0.3 * (ctx.prev_day.resting_hr - b);

        let rhr = b + deviation + ctx.modulation.rhr_offset;
        clip(rhr, b * (1.0 - RHR_BAND), b * (1.0 + RHR_BAND))
    }

    #[allow(clippy::too_many_arguments)]
    fn hrv<R: Rng + ?Sized>(
        &self,
        athlete: &AthleteProfile,
        ctx: &MorningContext<'_>,
        inputs: &RecoveryInputs,
        signal: LoadSignal,
        flags: &DailyFlags,
        sleep_debt: f64,
        sleep_quality: f64,
        rng: &mut R,
    ) -> f64 {
        let b = athlete.hrv_baseline;
        let band = flags.hrv_band();

        let supracompensation = match inputs.consecutive_high_load {
            3 => 0.08 * b,
            n if n >= 4 => -0.15 * b,
            _ => 0.0,
        };

        let mut deviation = -3.0 * sleep_debt - 0.25 * inputs.injury_effect * b - 0.15 * inputs.fatigue_factor * b
            + 0.1 * inputs.recovery_score * b
            + 0.05 * (sleep_quality - 0.7).max(0.0) * b
            - 0.12 * inputs.acwr_effect * b
            + inputs.chronic_adaptation * b
            + supracompensation;

        deviation += b * match signal {
            LoadSignal::OvertrainingRisk => -0.20,
            LoadSignal::ExcessiveFatigue => -0.12,
            LoadSignal::HighLoad if ctx.prev_day.training_stress > ctx.max_daily_tss * 1.5 => -0.25,
            LoadSignal::HighLoad => -0.10,
            LoadSignal::Peaking => 0.08,
            LoadSignal::HighStress => -0.07,
            LoadSignal::ConsecutiveHighLoad | LoadSignal::Settled => 0.0,
        };
        deviation += normal(rng, 0.0, 0.05 * b);

        deviation = 0.6 * deviation + 0.4 * (ctx.prev_day.hrv - b);

        let hrv = (b + deviation) * ctx.modulation.hrv_factor;
        clip(hrv, b * (1.0 - band), b * (1.0 + band))
    }

    fn morning_body_battery(
        athlete: &AthleteProfile,
        ctx: &MorningContext<'_>,
        inputs: &RecoveryInputs,
        sleep_quality: f64,
        sleep_hours: f64,
        hrv: f64,
        resting_hr: f64,
    ) -> f64 {
        let prev = ctx.prev_day;
        let last = prev.body_battery_evening;

        let mut efficiency = sleep_quality * (sleep_hours / athlete.lifestyle.sleep_norm).min(1.3);
        if sleep_hours < 6.0 {
            efficiency *= (0.9 - (6.0 - sleep_hours) * 0.1).max(0.5);
        } else if (8.0..=9.0).contains(&sleep_hours) {
            efficiency *= 1.1;
        }

        let hrv_factor = hrv / athlete.hrv_baseline;
        let rhr_factor = athlete.resting_hr / resting_hr.max(1.0);
        let recharge = (120.0 - last)
            * efficiency
            * (0.6 * hrv_factor + 0.4 * rhr_factor)
            * inputs.recovery_score
            * 2.0
            * ctx.modulation.readiness_factor;

        let drain = prev.stress * 0.15 + prev.training_stress * 0.1;
        let mut battery = last + recharge - drain;

        if battery > 80.0 {
            battery = 80.0 + (battery - 80.0) * 0.8;
        } else if battery < 70.0 {
            battery += recharge * (70.0 - battery) / 20.0;
        }

        clip(battery, 60.0, 100.0).round()
    }

    fn stress<R: Rng + ?Sized>(&self, athlete: &AthleteProfile, morning: &MorningMetrics, fatigue: f64, rng: &mut R) -> f64 {
        let hrv_b = athlete.hrv_baseline;
        let rhr_b = athlete.resting_hr;

        let mut hrv_term = clip((hrv_b - morning.hrv) / hrv_b * 2.0, 0.0, 1.0);
        let mut hr_term = clip((morning.resting_hr - rhr_b) / (rhr_b * 0.15), 0.0, 1.0);
        if morning.hrv < hrv_b * 0.8 {
            hrv_term = hrv_term.powf(1.5);
        }
        if morning.resting_hr > rhr_b * 1.1 {
            hr_term = hr_term.powf(1.5);
        }

        let lifestyle = &athlete.lifestyle;
        let weighted = 15.0 * lifestyle.smoking
            + 15.0 * lifestyle.drinking
            + 20.0 * lifestyle.stress
            + 15.0 * hrv_term
            + 10.0 * hr_term
            + 10.0 * clip(1.0 - morning.sleep_quality, 0.0, 1.0)
            + 10.0 * clip((100.0 - morning.body_battery_morning) / 100.0, 0.0, 1.0)
            + 5.0 * clip(fatigue / 100.0, 0.0, 1.0);

        let raw = clip(weighted + normal(rng, 0.0, 3.0), 0.0, 100.0);
        let skewed = 100.0 * (raw / 100.0).powf(self.config.stress_skew_exponent);
        round_to(skewed, 1)
    }
}

/// Trailing run of history days above the daily ceiling
fn consecutive_high_load(history: &RollingHistory, max_daily_tss: f64) -> u32 {
    history
        .entries()
        .iter()
        .rev()
        .take_while(|e| e.tss > max_daily_tss)
        .count() as u32
}

fn duration_score(hours: f64) -> f64 {
    if hours < 5.0 {
        (0.1 - (5.0 - hours) * 0.05).max(0.0)
    } else if hours < 6.0 {
        0.2
    } else if hours < 7.0 {
        0.4
    } else if hours < 8.0 {
        0.7
    } else if hours <= 9.0 {
        0.9
    } else if hours <= 10.0 {
        0.7
    } else {
        (0.6 - (hours - 10.0) * 0.07).max(0.0)
    }
}

fn stage_score(actual: f64, ideal: f64) -> f64 {
    let deviation = (actual - ideal).abs();
    if deviation <= 0.03 {
        1.0
    } else if deviation <= 0.08 {
        0.9
    } else if deviation <= 0.12 {
        0.75
    } else {
        0.65
    }
}

/// Sleep quality in [0, 1] from duration and stage shares
fn sleep_quality(hours: f64, deep_pct: f64, rem_pct: f64, light_pct: f64) -> f64 {
    let stages = stage_score(deep_pct, IDEAL_DEEP) * 0.45
        + stage_score(rem_pct, IDEAL_REM) * 0.35
        + stage_score(light_pct, IDEAL_LIGHT) * 0.20;

    let score = if hours < 6.0 {
        duration_score(hours) * 0.6 + stages * 0.4
    } else {
        duration_score(hours) * 0.4 + stages * 0.6
    };
    clip(score, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::athlete::AthleteProfileGenerator;
    use crate::pmc::HistoryEntry;
    use crate::sampling::run_rng;
    use chrono::Days;

    fn athlete(seed: u64) -> AthleteProfile {
        AthleteProfileGenerator::new().generate_athlete_profile(&mut run_rng(seed, 0))
    }

    fn history(tss: &[f64]) -> RollingHistory {
        let start = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        RollingHistory::from_entries(
            tss.iter()
                .enumerate()
                .map(|(i, t)| HistoryEntry {
                    date: start + Days::new(i as u64),
                    tss: *t,
                    hrv: 60.0,
                })
                .collect(),
        )
    }

    fn prev_for(athlete: &AthleteProfile) -> PrevDayState {
        PrevDayState::initial(
            athlete,
            &TrainingMetrics {
                fitness: 60.0,
                fatigue: 60.0,
                form: 0.0,
                acwr: 1.0,
            },
        )
    }

    #[test]
    fn test_morning_metrics_in_bounds() {
        let simulator = DailyMetricsSimulator::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        for seed in 0..20 {
            let athlete = athlete(seed);
            let prev = prev_for(&athlete);
            let hist = history(&[80.0; 28]);
            let modulation = Modulation::neutral();
            let ctx = MorningContext {
                prev_day: &prev,
                recovery_days_remaining: 0,
                max_daily_tss: 150.0,
                history: &hist,
                acwr: 1.0,
                modulation: &modulation,
            };
            let mut rng = run_rng(seed, 1);
            for _ in 0..20 {
                let m = simulator.simulate_morning_data(&athlete, date, &ctx, &mut rng);
                assert!(m.sleep_hours >= 4.0);
                assert!((0.0..=1.0).contains(&m.sleep_quality));
                assert!((60.0..=100.0).contains(&m.body_battery_morning));
                assert!(m.resting_hr >= athlete.resting_hr * 0.85 - 1e-9);
                assert!(m.resting_hr <= athlete.resting_hr * 1.15 + 1e-9);
                assert!(m.hrv >= athlete.hrv_baseline * 0.85 - 1e-9);
                assert!(m.hrv <= athlete.hrv_baseline * 1.15 + 1e-9);
                let total = m.deep_sleep + m.rem_sleep + m.light_sleep;
                assert!((total - m.sleep_hours * 60.0).abs() < 1e-6);
                assert!(m.light_sleep > 0.0);
            }
        }
    }

    #[test]
    fn test_flags_follow_previous_day() {
        let athlete = athlete(3);
        let hist = history(&[200.0, 210.0, 220.0]);
        let prev = PrevDayState {
            training_stress: 220.0,
            form: -25.0,
            stress: 60.0,
            ..prev_for(&athlete)
        };
        let modulation = Modulation::neutral();
        let ctx = MorningContext {
            prev_day: &prev,
            recovery_days_remaining: 0,
            max_daily_tss: 150.0,
            history: &hist,
            acwr: 1.5,
            modulation: &modulation,
        };
        let flags = DailyMetricsSimulator::check_flags(&ctx);
        assert!(flags.excessive_fatigue);
        assert!(flags.high_load);
        assert!(flags.overtraining_risk);
        assert!(flags.high_stress);
        assert!(flags.extreme_load);
        assert!(!flags.peaking);
        assert_eq!(flags.consecutive_high_load, 3);
        assert_eq!(LoadSignal::from_flags(&flags), LoadSignal::OvertrainingRisk);
    }

    #[test]
    fn test_signal_priority() {
        let flags = DailyFlags {
            peaking: true,
            high_stress: true,
            ..DailyFlags::default()
        };
        assert_eq!(LoadSignal::from_flags(&flags), LoadSignal::Peaking);
        assert_eq!(LoadSignal::from_flags(&DailyFlags::default()), LoadSignal::Settled);
    }

    #[test]
    fn test_evening_metrics() {
        let simulator = DailyMetricsSimulator::default();
        let athlete = athlete(5);
        let morning = MorningMetrics {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            sleep_hours: 7.5,
            deep_sleep: 90.0,
            light_sleep: 247.5,
            rem_sleep: 112.5,
            sleep_quality: 0.8,
            resting_hr: athlete.resting_hr,
            hrv: athlete.hrv_baseline,
            body_battery_morning: 85.0,
            flags: DailyFlags::default(),
        };
        let mut rng = run_rng(5, 2);
        for tss in [0.0, 60.0, 150.0, 300.0] {
            let evening = simulator.simulate_evening_data(&athlete, &morning, tss, 50.0, 22, &mut rng);
            assert!((0.0..=100.0).contains(&evening.stress));
            assert!(evening.body_battery_evening <= 85.0 - 40.0);
            assert!(evening.body_battery_evening >= 5.0);
        }
    }

    #[test]
    fn test_heavy_load_lowers_hrv() {
        let simulator = DailyMetricsSimulator::default();
        let athlete = athlete(8);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let modulation = Modulation::neutral();

        let easy_hist = history(&[40.0; 28]);
        let easy_prev = PrevDayState {
            training_stress: 40.0,
            fatigue: 30.0,
            form: 10.0,
            ..prev_for(&athlete)
        };
        let hard_hist = history(&[220.0; 28]);
        let hard_prev = PrevDayState {
            training_stress: 250.0,
            fatigue: 120.0,
            form: -30.0,
            ..prev_for(&athlete)
        };

        let mean_hrv = |prev: &PrevDayState, hist: &RollingHistory| {
            let ctx = MorningContext {
                prev_day: prev,
                recovery_days_remaining: 0,
                max_daily_tss: 150.0,
                history: hist,
                acwr: 1.0,
                modulation: &modulation,
            };
            let mut rng = run_rng(8, 9);
            (0..50)
                .map(|_| simulator.simulate_morning_data(&athlete, date, &ctx, &mut rng).hrv)
                .sum::<f64>()
                / 50.0
        };

        assert!(mean_hrv(&hard_prev, &hard_hist) < mean_hrv(&easy_prev, &easy_hist));
    }

    #[test]
    fn test_sleep_quality_scoring() {
        let ideal = sleep_quality(8.5, IDEAL_DEEP, IDEAL_REM, IDEAL_LIGHT);
        let short = sleep_quality(4.5, 0.08, 0.15, 0.77);
        assert!(ideal > 0.9);
        assert!(short < 0.4);
        assert_eq!(duration_score(3.0), 0.0);
    }

    #[test]
    fn test_consecutive_high_load_count() {
        let hist = history(&[200.0, 50.0, 160.0, 170.0]);
        assert_eq!(consecutive_high_load(&hist, 150.0), 2);
        assert_eq!(consecutive_high_load(&RollingHistory::new(), 150.0), 0);
    }
}
