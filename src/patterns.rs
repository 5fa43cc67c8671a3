//! Retroactive pre-injury and false-alarm signatures
//!
//! Injectors never touch records directly. They return a [`PatchLog`]
//! describing every changed value, which the caller applies to the days
//! before the current one. The log keeps the original values so the
//! overlay can be audited or reverted.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::daily_metrics::EVENING_BATTERY_GAP;
use crate::models::{AthleteProfile, DailyRecord, RHR_BAND};
use crate::sampling::{chance, clip, normal, uniform, uniform_int};

/// Pattern injection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Inject precursor signatures before injuries
    pub precursors: bool,

    /// Inject false-alarm signatures
    pub false_alarms: bool,

    /// Days before an injury that precursors may alter (at most 14)
    pub lookback_days: usize,

    /// Day range of the first false alarm
    pub false_alarm_first: (u32, u32),

    /// Day range between false alarms
    pub false_alarm_interval: (u32, u32),

    /// Length range of a false-alarm window
    pub false_alarm_length: (u32, u32),
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            precursors: true,
            false_alarms: true,
            lookback_days: 14,
            false_alarm_first: (30, 60),
            false_alarm_interval: (20, 35),
            false_alarm_length: (7, 12),
        }
    }
}

/// Record fields a pattern may overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatchedField {
    Hrv,
    RestingHr,
    SleepQuality,
    DeepSleep,
    LightSleep,
    RemSleep,
    BodyBatteryMorning,
    BodyBatteryEvening,
    Stress,
}

impl PatchedField {
    pub fn get(&self, record: &DailyRecord) -> f64 {
        match self {
            PatchedField::Hrv => record.hrv,
            PatchedField::RestingHr => record.resting_hr,
            PatchedField::SleepQuality => record.sleep_quality,
            PatchedField::DeepSleep => record.deep_sleep,
            PatchedField::LightSleep => record.light_sleep,
            PatchedField::RemSleep => record.rem_sleep,
            PatchedField::BodyBatteryMorning => record.body_battery_morning,
            PatchedField::BodyBatteryEvening => record.body_battery_evening,
            PatchedField::Stress => record.stress,
        }
    }

    pub fn set(&self, record: &mut DailyRecord, value: f64) {
        let slot = match self {
            PatchedField::Hrv => &mut record.hrv,
            PatchedField::RestingHr => &mut record.resting_hr,
            PatchedField::SleepQuality => &mut record.sleep_quality,
            PatchedField::DeepSleep => &mut record.deep_sleep,
            PatchedField::LightSleep => &mut record.light_sleep,
            PatchedField::RemSleep => &mut record.rem_sleep,
            PatchedField::BodyBatteryMorning => &mut record.body_battery_morning,
            PatchedField::BodyBatteryEvening => &mut record.body_battery_evening,
            PatchedField::Stress => &mut record.stress,
        };
        *slot = value;
    }
}

/// Why a value was patched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchSource {
    InjuryPrecursor,
    FalseAlarm,
}

/// One overwritten value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPatch {
    pub day_index: usize,
    pub field: PatchedField,
    pub original: f64,
    pub patched: f64,
    pub source: PatchSource,
}

/// Ordered overlay of patches on already simulated days
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchLog {
    patches: Vec<MetricPatch>,
}

impl PatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patches(&self) -> &[MetricPatch] {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    fn record(
        &mut self,
        record: &DailyRecord,
        field: PatchedField,
        value: f64,
        source: PatchSource,
    ) {
        let original = field.get(record);
        if original != value {
            self.patches.push(MetricPatch {
                day_index: record.day_index,
                field,
                original,
                patched: value,
                source,
            });
        }
    }

    /// Append another log, keeping order
    pub fn extend(&mut self, other: PatchLog) {
        self.patches.extend(other.patches);
    }

    /// Write every patch into `records`, indexed by day
    ///
    /// All patches must target days before `current_index`.
    pub fn apply(&self, records: &mut [DailyRecord], current_index: usize) {
        for patch in &self.patches {
            debug_assert!(
                patch.day_index < current_index,
                "patch for day {} at day {}",
                patch.day_index,
                current_index
            );
            if let Some(record) = records.get_mut(patch.day_index) {
                patch.field.set(record, patch.patched);
            }
        }
    }

    /// Restore the original values, newest patch first
    pub fn revert(&self, records: &mut [DailyRecord]) {
        for patch in self.patches.iter().rev() {
            if let Some(record) = records.get_mut(patch.day_index) {
                patch.field.set(record, patch.original);
            }
        }
    }

    /// Sorted, de-duplicated day indices touched by this log
    pub fn touched_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.patches.iter().map(|p| p.day_index).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    pub fn count_by_source(&self, source: PatchSource) -> usize {
        self.patches.iter().filter(|p| p.source == source).count()
    }
}

/// Interaction multipliers between stressors on a given day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossStress {
    pub hrv: f64,
    pub rhr: f64,
    pub sleep: f64,
    pub stress: f64,
    pub body_battery: f64,
}

impl CrossStress {
    fn neutral() -> Self {
        CrossStress {
            hrv: 1.0,
            rhr: 1.0,
            sleep: 1.0,
            stress: 1.0,
            body_battery: 1.0,
        }
    }
}

/// Amplify pattern effects when stressors stack up
///
/// Poor sleep with high stress, high fatigue with poor sleep, and two
/// high-stress days followed by an overshoot of planned load each raise
/// the multipliers.
pub fn cross_stress_effects(day: &DailyRecord, recent: &[DailyRecord]) -> CrossStress {
    let mut m = CrossStress::neutral();

    if day.sleep_quality < 0.6 && day.stress > 70.0 {
        m.hrv *= 1.4;
        m.rhr *= 1.3;
    }

    if day.fatigue > 75.0 && day.sleep_quality < 0.7 {
        m.hrv *= 1.5;
        m.body_battery *= 1.4;
    }

    if let [.., a, b, c] = recent {
        if a.stress > 70.0 && b.stress > 70.0 && c.actual_tss > c.planned_tss * 1.1 {
            m.hrv *= 1.6;
            m.sleep *= 1.3;
        }
    }

    m
}

/// Decline curve `1 - alpha * t^beta`
pub fn decline_curve(t: f64, alpha: f64, beta: f64) -> f64 {
    1.0 - alpha * t.max(0.0).powf(beta)
}

/// Patched HRV, kept inside both the pattern limits and the day's band
fn bounded_hrv(day: &DailyRecord, baseline: f64, low: f64, high: f64, value: f64) -> f64 {
    let band = day.flags.hrv_band();
    clip(value, baseline * low.max(1.0 - band), baseline * high.min(1.0 + band))
}

fn bounded_rhr(baseline: f64, low: f64, high: f64, value: f64) -> f64 {
    clip(value, baseline * low.max(1.0 - RHR_BAND), baseline * high.min(1.0 + RHR_BAND))
}

fn recent_before(records: &[DailyRecord], index: usize) -> &[DailyRecord] {
    let end = index.min(records.len());
    &records[end.saturating_sub(3)..end]
}

/// Degrade the days leading up to an injury on `current_index`
///
/// Only days in `[current_index - lookback_days, current_index)` are
/// touched. Pattern strength, onset and which markers react vary per
/// injury; 15% of injuries are acute and only alter the last 1-3 days.
pub fn inject_realistic_injury_patterns<R: Rng + ?Sized>(
    athlete: &AthleteProfile,
    records: &[DailyRecord],
    current_index: usize,
    lookback_days: usize,
    rng: &mut R,
) -> PatchLog {
    let mut log = PatchLog::new();
    let end = current_index.min(records.len());
    let start = end.saturating_sub(lookback_days.min(14));
    let period = &records[start..end];
    let len = period.len();
    if len == 0 {
        return log;
    }

    let b_hrv = athlete.hrv_baseline;
    let b_rhr = athlete.resting_hr;
    let sig = &athlete.recovery_signature;

    let strength = uniform(rng, 0.7, 1.3);
    let mut pattern_start = uniform_int(rng, 1, (len as u32 / 3).clamp(1, 5)) as usize;

    let show_hrv = chance(rng, 0.85);
    let show_rhr = chance(rng, 0.80);
    let show_sleep = chance(rng, 0.70);
    let show_battery = chance(rng, 0.75);

    if chance(rng, 0.15) {
        pattern_start = len.saturating_sub(uniform_int(rng, 1, 3) as usize);
    }

    let recent = recent_before(records, end);
    let source = PatchSource::InjuryPrecursor;

    for (i, day) in period.iter().enumerate() {
        if i < pattern_start {
            continue;
        }
        let progression = (i - pattern_start) as f64 / (len - pattern_start) as f64;
        let variability = normal(rng, 0.0, 0.2);
        let cross = cross_stress_effects(day, recent);

        if show_hrv {
            let alpha = (0.05 + progression * 0.20).min(0.25)
                * strength
                * sig.hrv_sensitivity
                * cross.hrv;
            let hrv = b_hrv * decline_curve(progression, alpha, 1.2) + variability * b_hrv * 0.15;
            log.record(day, PatchedField::Hrv, bounded_hrv(day, b_hrv, 0.65, 1.1, hrv), source);
        }

        if show_rhr {
            let rise = (0.02 + progression * 0.10).min(0.12)
                * strength
                * sig.rhr_sensitivity
                * cross.rhr;
            let rhr = b_rhr * (1.0 + rise * progression.powf(1.1)) - variability * b_rhr * 0.08;
            log.record(day, PatchedField::RestingHr, bounded_rhr(b_rhr, 0.92, 1.15, rhr), source);
        }

        if show_sleep && progression > 0.3 {
            let alpha = ((progression - 0.3) * 0.3).min(0.2)
                * strength
                * sig.sleep_sensitivity
                * cross.sleep;
            let quality = (day.sleep_quality * (1.0 - alpha) + variability * 0.15).clamp(0.4, 0.95);
            let deep = day.deep_sleep * (1.0 - alpha * (1.0 + uniform(rng, -0.3, 0.3)));
            let rem = day.rem_sleep * (1.0 - alpha * (0.8 + uniform(rng, -0.3, 0.3)));
            let light = (day.sleep_hours * 60.0 - deep - rem).max(0.0);

            log.record(day, PatchedField::SleepQuality, quality, source);
            log.record(day, PatchedField::DeepSleep, deep, source);
            log.record(day, PatchedField::RemSleep, rem, source);
            log.record(day, PatchedField::LightSleep, light, source);
        }

        if show_battery {
            let alpha = (0.05 + progression * 0.10).min(0.25) * strength * cross.body_battery;
            let adjustment = variability * 8.0;
            let morning = (day.body_battery_morning * decline_curve(progression, alpha, 1.0) + adjustment)
                .clamp(40.0, 100.0);
            let evening = (day.body_battery_evening * decline_curve(progression, alpha, 1.1) + adjustment * 0.5)
                .clamp(15.0, 60.0)
                .min(morning - EVENING_BATTERY_GAP);
            log.record(day, PatchedField::BodyBatteryMorning, morning, source);
            log.record(day, PatchedField::BodyBatteryEvening, evening, source);
        }

        let rise = (progression * 30.0 * strength).min(20.0) * sig.stress_sensitivity * cross.stress;
        let stress = day.stress + rise + normal(rng, 0.0, 8.0);
        log.record(day, PatchedField::Stress, stress.clamp(20.0, 95.0), source);
    }

    log
}

/// Mild warning signs over the `pattern_days` days before `current_index`
///
/// The signature rises then resolves and never marks an injury. Nothing
/// is produced when fewer than `pattern_days` past days exist.
pub fn create_false_alarm_patterns<R: Rng + ?Sized>(
    athlete: &AthleteProfile,
    records: &[DailyRecord],
    current_index: usize,
    pattern_days: usize,
    rng: &mut R,
) -> PatchLog {
    let mut log = PatchLog::new();
    let end = current_index.min(records.len());
    if pattern_days == 0 || end < pattern_days {
        return log;
    }
    let start = end - pattern_days;

    let strength = if chance(rng, 0.3) {
        uniform(rng, 0.8, 1.1)
    } else {
        uniform(rng, 0.4, 0.8)
    };

    let b_hrv = athlete.hrv_baseline;
    let b_rhr = athlete.resting_hr;
    let sig = &athlete.recovery_signature;

    let show_hrv = chance(rng, 0.7);
    let show_rhr = chance(rng, 0.6);
    let show_sleep = chance(rng, 0.5);

    let recent = recent_before(records, start);
    let half = (pattern_days / 2).max(1);
    let source = PatchSource::FalseAlarm;

    for (i, day) in records[start..end].iter().enumerate() {
        let progression = if i < half {
            i as f64 / half as f64
        } else {
            1.0 - (i - half) as f64 / (pattern_days - half) as f64
        };
        let variability = normal(rng, 0.0, 0.25);
        let cross = cross_stress_effects(day, recent);

        if show_hrv {
            let change = 0.15 * progression * strength * sig.hrv_sensitivity * cross.hrv;
            let hrv = b_hrv * (1.0 - change) + variability * b_hrv * 0.1;
            log.record(day, PatchedField::Hrv, bounded_hrv(day, b_hrv, 0.75, 1.1, hrv), source);
        }

        if show_rhr {
            let change = 0.08 * progression * strength * sig.rhr_sensitivity * cross.rhr;
            let rhr = b_rhr * (1.0 + change) - variability * b_rhr * 0.05;
            log.record(day, PatchedField::RestingHr, bounded_rhr(b_rhr, 0.95, 1.1, rhr), source);
        }

        if show_sleep && i > pattern_days / 3 {
            let reduction = 0.1 * progression * strength * sig.sleep_sensitivity * cross.sleep;
            let quality =
                (day.sleep_quality * (1.0 - reduction) + variability * 0.12).clamp(0.6, 0.95);
            let deep = day.deep_sleep * (1.0 - reduction * (1.0 + uniform(rng, -0.2, 0.2)));
            let light = (day.sleep_hours * 60.0 - deep - day.rem_sleep).max(0.0);

            log.record(day, PatchedField::SleepQuality, quality, source);
            log.record(day, PatchedField::DeepSleep, deep, source);
            log.record(day, PatchedField::LightSleep, light, source);
        }

        let rise = (progression * 25.0 * strength).min(20.0) * sig.stress_sensitivity * cross.stress;
        let stress = day.stress + rise + normal(rng, 0.0, 6.0);
        log.record(day, PatchedField::Stress, stress.clamp(20.0, 85.0), source);
    }

    log
}

/// True when none of the `days` days before `current_index` is injured
pub fn window_is_clear(records: &[DailyRecord], current_index: usize, days: usize) -> bool {
    let end = current_index.min(records.len());
    if end < days {
        return false;
    }
    records[end - days..end].iter().all(|r| !r.injury)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::athlete::AthleteProfileGenerator;
    use crate::models::DailyFlags;
    use crate::sampling::run_rng;
    use crate::training_plan::Phase;
    use chrono::{Days, NaiveDate};

    fn records(athlete: &AthleteProfile, n: usize) -> Vec<DailyRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| DailyRecord {
                athlete_id: athlete.id,
                date: start + Days::new(i as u64),
                day_index: i,
                phase: Phase::Base,
                resting_hr: athlete.resting_hr,
                hrv: athlete.hrv_baseline,
                sleep_hours: 7.5,
                deep_sleep: 90.0,
                light_sleep: 247.5,
                rem_sleep: 112.5,
                sleep_quality: 0.8,
                body_battery_morning: 85.0,
                stress: 30.0,
                body_battery_evening: 40.0,
                planned_tss: 80.0,
                actual_tss: 80.0,
                injury: false,
                fitness: 60.0,
                fatigue: 60.0,
                form: 0.0,
                acwr: 1.0,
                flags: DailyFlags::default(),
            })
            .collect()
    }

    fn athlete(seed: u64) -> AthleteProfile {
        AthleteProfileGenerator::new().generate_athlete_profile(&mut run_rng(seed, 0))
    }

    #[test]
    fn test_precursor_patches_stay_in_lookback_window() {
        let athlete = athlete(1);
        let data = records(&athlete, 60);
        for seed in 0..50 {
            let mut rng = run_rng(seed, 7);
            let log = inject_realistic_injury_patterns(&athlete, &data, 40, 14, &mut rng);
            for idx in log.touched_indices() {
                assert!((26..40).contains(&idx), "index {} outside window", idx);
            }
            assert!(log
                .patches()
                .iter()
                .all(|p| p.source == PatchSource::InjuryPrecursor));
        }
    }

    #[test]
    fn test_precursor_lowers_hrv_on_average() {
        let athlete = athlete(2);
        let data = records(&athlete, 30);
        let mut rng = run_rng(99, 0);

        let mut deltas = Vec::new();
        for _ in 0..200 {
            let log = inject_realistic_injury_patterns(&athlete, &data, 30, 14, &mut rng);
            deltas.extend(
                log.patches()
                    .iter()
                    .filter(|p| p.field == PatchedField::Hrv)
                    .map(|p| p.patched - p.original),
            );
        }
        let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
        assert!(mean < 0.0);
    }

    #[test]
    fn test_precursor_at_start_of_year_is_empty() {
        let athlete = athlete(3);
        let data = records(&athlete, 10);
        let log = inject_realistic_injury_patterns(&athlete, &data, 0, 14, &mut run_rng(1, 0));
        assert!(log.is_empty());
    }

    #[test]
    fn test_false_alarm_window_and_bounds() {
        let athlete = athlete(4);
        let data = records(&athlete, 80);
        let mut rng = run_rng(5, 0);
        let log = create_false_alarm_patterns(&athlete, &data, 50, 10, &mut rng);

        for idx in log.touched_indices() {
            assert!((40..50).contains(&idx));
        }
        for patch in log.patches() {
            if patch.field == PatchedField::Stress {
                assert!((20.0..=85.0).contains(&patch.patched));
            }
            if patch.field == PatchedField::Hrv {
                assert!(patch.patched >= athlete.hrv_baseline * 0.75 - 1e-9);
            }
        }
    }

    #[test]
    fn test_patched_days_stay_within_daily_bands() {
        let athlete = athlete(9);
        let mut data = records(&athlete, 40);
        for record in data.iter_mut().step_by(3) {
            record.flags.extreme_load = true;
        }
        let (b_hrv, b_rhr) = (athlete.hrv_baseline, athlete.resting_hr);

        for seed in 0..40 {
            let mut rng = run_rng(seed, 2);
            let mut patched = data.clone();
            inject_realistic_injury_patterns(&athlete, &patched, 30, 14, &mut rng).apply(&mut patched, 30);
            create_false_alarm_patterns(&athlete, &patched, 30, 10, &mut rng).apply(&mut patched, 30);

            for day in &patched {
                let band = day.flags.hrv_band();
                assert!(day.hrv >= b_hrv * (1.0 - band) - 1e-9, "day {} hrv {}", day.day_index, day.hrv);
                assert!(day.hrv <= b_hrv * (1.0 + band) + 1e-9);
                assert!((day.resting_hr - b_rhr).abs() <= b_rhr * RHR_BAND + 1e-9);
                assert!(day.body_battery_evening <= day.body_battery_morning - EVENING_BATTERY_GAP + 1e-9);
            }
        }
    }

    #[test]
    fn test_false_alarm_needs_enough_history() {
        let athlete = athlete(5);
        let data = records(&athlete, 80);
        let log = create_false_alarm_patterns(&athlete, &data, 6, 10, &mut run_rng(1, 0));
        assert!(log.is_empty());
    }

    #[test]
    fn test_apply_and_revert_round_trip() {
        let athlete = athlete(6);
        let original = records(&athlete, 40);
        let mut data = original.clone();

        let log = inject_realistic_injury_patterns(&athlete, &data, 30, 14, &mut run_rng(8, 0));
        assert!(!log.is_empty());

        log.apply(&mut data, 30);
        assert_ne!(data, original);
        assert!(data.iter().all(|r| !r.injury));

        log.revert(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_window_is_clear() {
        let athlete = athlete(7);
        let mut data = records(&athlete, 30);
        assert!(window_is_clear(&data, 20, 10));
        data[15].injury = true;
        assert!(!window_is_clear(&data, 20, 10));
        assert!(window_is_clear(&data, 30, 10));
        assert!(!window_is_clear(&data, 5, 10));
    }

    #[test]
    fn test_cross_stress_sequence() {
        let athlete = athlete(8);
        let mut data = records(&athlete, 4);
        data[0].stress = 80.0;
        data[1].stress = 75.0;
        data[2].actual_tss = 120.0;
        let m = cross_stress_effects(&data[3], &data[..3]);
        assert!((m.hrv - 1.6).abs() < 1e-9);
        assert!((m.sleep - 1.3).abs() < 1e-9);

        data[3].sleep_quality = 0.5;
        data[3].stress = 80.0;
        let m = cross_stress_effects(&data[3], &[]);
        assert!((m.hrv - 1.4).abs() < 1e-9);
        assert!((m.rhr - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_decline_curve() {
        assert_eq!(decline_curve(0.0, 0.2, 1.2), 1.0);
        assert!((decline_curve(1.0, 0.2, 1.2) - 0.8).abs() < 1e-12);
    }
}
