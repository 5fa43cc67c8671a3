use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::training_plan::Phase;

/// Disciplines an athlete trains in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sport {
    Swim,
    Bike,
    Run,
    Strength,
}

impl Sport {
    pub const ALL: [Sport; 4] = [Sport::Swim, Sport::Bike, Sport::Run, Sport::Strength];
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sport::Swim => write!(f, "swim"),
            Sport::Bike => write!(f, "bike"),
            Sport::Run => write!(f, "run"),
            Sport::Strength => write!(f, "strength"),
        }
    }
}

/// Workout types for categorizing training sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkoutKind {
    Recovery,
    Endurance,
    Tempo,
    Intervals,
    Race,
    Strength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// Triathlon discipline the athlete is strongest in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Specialization {
    SwimStrong,
    BikeStrong,
    RunStrong,
    Balanced,
}

/// Wearable device family, selects the sensor-noise model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorProfile {
    /// Chest strap plus GPS watch: clean data with occasional HR spikes
    Garmin,
    /// Wrist optical HR: noisier at high intensity
    Optical,
}

/// Preferred training time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chronotype {
    Lark,
    Owl,
    Intermediate,
}

/// Which recovery marker reacts most strongly to accumulated fatigue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryProfile {
    HrvDominant,
    SleepDominant,
    RhrDominant,
    StressDominant,
    Balanced,
}

/// Named lifestyle archetypes drawn for each athlete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifestyleArchetype {
    HighlyDisciplined,
    BalancedCompetitor,
    WeekendSocializer,
    SleepDeprivedWorkaholic,
    UnderRecovered,
    HealthConscious,
}

impl LifestyleArchetype {
    pub fn name(&self) -> &'static str {
        match self {
            LifestyleArchetype::HighlyDisciplined => "Highly Disciplined Athlete",
            LifestyleArchetype::BalancedCompetitor => "Balanced Competitor",
            LifestyleArchetype::WeekendSocializer => "Weekend Socializer",
            LifestyleArchetype::SleepDeprivedWorkaholic => "Sleep-Deprived Workaholic",
            LifestyleArchetype::UnderRecovered => "Under-Recovered Athlete",
            LifestyleArchetype::HealthConscious => "Health-Conscious Athlete",
        }
    }
}

impl fmt::Display for LifestyleArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifestyle bundle attached to a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lifestyle {
    /// Archetype the factors were drawn from
    pub archetype: LifestyleArchetype,

    /// Habitual sleep duration in hours (5-9)
    pub sleep_norm: f64,

    /// Habitual sleep quality (0-1)
    pub sleep_quality: f64,

    /// Nutrition quality (0-1)
    pub nutrition: f64,

    /// Life stress level (0-1, higher is worse)
    pub stress: f64,

    /// Tobacco use (0-1)
    pub smoking: f64,

    /// Alcohol use (0-1)
    pub drinking: f64,

    /// Training adherence (0-1)
    pub exercise: f64,
}

impl Lifestyle {
    /// Combined 0-1 lifestyle score, higher is healthier
    pub fn score(&self) -> f64 {
        let sleep_normalized = (self.sleep_norm / 9.0).clamp(0.0, 1.0);
        let drinking_inverted = 1.0 - (self.drinking / 6.0).min(1.0);
        let smoking_inverted = 1.0 - self.smoking;
        let stress_inverted = 1.0 - self.stress;

        let score = 0.20 * sleep_normalized
            + 0.15 * self.sleep_quality
            + 0.20 * self.nutrition
            + 0.10 * drinking_inverted
            + 0.15 * smoking_inverted
            + 0.10 * stress_inverted
            + 0.10 * self.exercise;

        if smoking_inverted < 0.2 {
            score * 0.5
        } else {
            score
        }
    }
}

/// Per-metric sensitivity used when precursor patterns are injected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverySignature {
    pub profile: RecoveryProfile,
    pub hrv_sensitivity: f64,
    pub sleep_sensitivity: f64,
    pub rhr_sensitivity: f64,
    pub stress_sensitivity: f64,
}

/// Menstrual cycle parameters for female athletes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MenstrualConfig {
    /// Cycle length in days (26-32)
    pub cycle_length: u32,

    /// Luteal phase length in days (12-16)
    pub luteal_length: u32,

    /// Cycle day on January 1st of the simulated year (0-based)
    pub day_offset: u32,
}

/// Inclusive zone boundaries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneRange {
    pub low: f64,
    pub high: f64,
}

impl ZoneRange {
    pub fn new(low: f64, high: f64) -> Self {
        ZoneRange { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

/// Heart rate zones Z1-Z6 anchored on LTHR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateZones {
    pub zone1: ZoneRange,
    pub zone2: ZoneRange,
    pub zone3: ZoneRange,
    pub zone4: ZoneRange,
    pub zone5: ZoneRange,
    pub zone6: ZoneRange,
}

/// Coggan power zones Z1-Z7 anchored on FTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerZones {
    pub zone1: ZoneRange,
    pub zone2: ZoneRange,
    pub zone3: ZoneRange,
    pub zone4: ZoneRange,
    pub zone5: ZoneRange,
    pub zone6: ZoneRange,
    pub zone7: ZoneRange,
}

/// Immutable physiological and lifestyle profile of one simulated athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    /// Unique athlete identifier
    pub id: Uuid,

    pub gender: Gender,

    /// Age in years (18-50)
    pub age: u32,

    pub height_cm: f64,

    pub weight_kg: f64,

    /// Genetic talent multiplier (0.8-1.2)
    pub genetic_factor: f64,

    /// Maximal oxygen uptake in ml/kg/min (50-75)
    pub vo2max: f64,

    /// Functional Threshold Power in watts
    pub ftp: f64,

    /// Critical swim speed in seconds per 100m
    pub css: f64,

    /// Lactate Threshold Heart Rate (160-190)
    pub lthr: f64,

    pub max_hr: f64,

    /// Resting heart rate baseline (38-60)
    pub resting_hr: f64,

    /// Running threshold pace in minutes per kilometer
    pub threshold_pace: f64,

    pub hr_zones: HeartRateZones,

    pub power_zones: PowerZones,

    /// Morning HRV (RMSSD, ms) baseline
    pub hrv_baseline: f64,

    /// Normal day-to-day HRV band (baseline ±15%)
    pub hrv_range: ZoneRange,

    /// Years of structured training (2-20)
    pub training_experience: u32,

    /// Typical weekly training volume in hours (8-16)
    pub weekly_training_hours: f64,

    /// Recovery speed multiplier (0.5-1.3)
    pub recovery_rate: f64,

    pub lifestyle: Lifestyle,

    pub specialization: Specialization,

    pub sensor_profile: SensorProfile,

    pub chronotype: Chronotype,

    /// Cycle configuration, present for female athletes only
    pub menstrual: Option<MenstrualConfig>,

    pub recovery_signature: RecoverySignature,
}

/// Typed replacement for ad-hoc training-state flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFlags {
    /// Form below -20
    pub excessive_fatigue: bool,

    /// Yesterday's TSS above the athlete's daily ceiling
    pub high_load: bool,

    /// Both of the above
    pub overtraining_risk: bool,

    /// Form between 20 and 35
    pub peaking: bool,

    /// Yesterday's stress above 50
    pub high_stress: bool,

    /// Fatigue extreme enough to widen the HRV band to ±40%
    pub extreme_load: bool,

    /// Trailing run of days above the daily ceiling
    pub consecutive_high_load: u32,
}

impl DailyFlags {
    /// Allowed relative HRV deviation from baseline for the day
    pub fn hrv_band(&self) -> f64 {
        if self.extreme_load {
            0.40
        } else {
            0.15
        }
    }
}

/// Allowed relative resting-HR deviation from baseline
pub const RHR_BAND: f64 = 0.15;

/// One simulated athlete-day, the unit that gets persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub athlete_id: Uuid,
    pub date: NaiveDate,
    /// Position of the day within the simulated year
    pub day_index: usize,
    pub phase: Phase,

    pub resting_hr: f64,
    pub hrv: f64,
    pub sleep_hours: f64,
    /// Minutes of deep sleep
    pub deep_sleep: f64,
    /// Minutes of light sleep
    pub light_sleep: f64,
    /// Minutes of REM sleep
    pub rem_sleep: f64,
    pub sleep_quality: f64,
    pub body_battery_morning: f64,
    pub stress: f64,
    pub body_battery_evening: f64,

    pub planned_tss: f64,
    pub actual_tss: f64,
    pub injury: bool,

    pub fitness: f64,
    pub fatigue: f64,
    pub form: f64,
    pub acwr: f64,

    pub flags: DailyFlags,
}

/// A single executed (or unplanned) workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub athlete_id: Uuid,
    pub date: NaiveDate,
    pub sport: Sport,
    pub kind: WorkoutKind,
    /// Local hour the session started
    pub start_hour: u32,
    pub duration_minutes: f64,
    pub planned_tss: f64,
    pub tss: f64,
    pub intensity_factor: f64,
    pub avg_hr: f64,
    pub max_hr: f64,
    /// Average power in watts, bike sessions only
    pub avg_power: Option<f64>,
    /// False for sessions the athlete added on a rest day
    pub planned: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifestyle(smoking: f64) -> Lifestyle {
        Lifestyle {
            archetype: LifestyleArchetype::BalancedCompetitor,
            sleep_norm: 7.5,
            sleep_quality: 0.8,
            nutrition: 0.8,
            stress: 0.3,
            smoking,
            drinking: 0.15,
            exercise: 0.8,
        }
    }

    #[test]
    fn test_lifestyle_score_range() {
        let score = lifestyle(0.0).score();
        assert!(score > 0.0 && score <= 1.0);
    }

    #[test]
    fn test_heavy_smoking_halves_score() {
        let clean = lifestyle(0.0).score();
        let smoker = lifestyle(0.9).score();
        assert!(smoker < clean * 0.5);
    }

    #[test]
    fn test_archetype_names() {
        assert_eq!(LifestyleArchetype::SleepDeprivedWorkaholic.to_string(), "Sleep-Deprived Workaholic");
        assert_eq!(LifestyleArchetype::HighlyDisciplined.name(), "Highly Disciplined Athlete");
    }

    #[test]
    fn test_zone_range_contains() {
        let zone = ZoneRange::new(120.0, 140.0);
        assert!(zone.contains(120.0));
        assert!(zone.contains(140.0));
        assert!(!zone.contains(141.0));
    }
}
