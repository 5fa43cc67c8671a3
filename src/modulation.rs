//! Physiological modulation of the daily metrics
//!
//! A modulation shifts resting HR, scales HRV and readiness, and scales the
//! injury probability for one athlete-day. The metrics simulator only sees
//! the resulting [`Modulation`], never where it came from.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{AthleteProfile, MenstrualConfig};

/// Effect of physiological state on one day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modulation {
    /// Added to resting HR (bpm)
    pub rhr_offset: f64,
    /// Multiplies HRV
    pub hrv_factor: f64,
    /// Multiplies the overnight body battery recharge
    pub readiness_factor: f64,
    /// Multiplies the daily injury probability
    pub injury_risk_factor: f64,
}

impl Modulation {
    /// No effect on any metric
    pub fn neutral() -> Self {
        Modulation {
            rhr_offset: 0.0,
            hrv_factor: 1.0,
            readiness_factor: 1.0,
            injury_risk_factor: 1.0,
        }
    }
}

impl Default for Modulation {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Source of per-day modulations
pub trait PhysiologicalModulation: Send + Sync {
    fn modulation_for(&self, athlete: &AthleteProfile, date: NaiveDate) -> Modulation;
}

/// Leaves every metric untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModulation;

impl PhysiologicalModulation for NoModulation {
    fn modulation_for(&self, _athlete: &AthleteProfile, _date: NaiveDate) -> Modulation {
        Modulation::neutral()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CyclePhase {
    Menstruation,
    Follicular,
    Ovulation,
    Luteal,
    LateLuteal,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Menstruation => "menstruation",
            CyclePhase::Follicular => "follicular",
            CyclePhase::Ovulation => "ovulation",
            CyclePhase::Luteal => "luteal",
            CyclePhase::LateLuteal => "late luteal",
        };
        f.write_str(name)
    }
}

/// Days at the end of the cycle with intensified luteal effects
const LATE_LUTEAL_DAYS: u32 = 4;

/// Menstrual cycle effects for athletes that carry a cycle configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct MenstrualCycleModel;

impl MenstrualCycleModel {
    /// 1-based day within the cycle
    pub fn cycle_day(config: &MenstrualConfig, date: NaiveDate) -> u32 {
        let length = config.cycle_length.max(1);
        (config.day_offset + date.ordinal0()) % length + 1
    }

    pub fn phase(config: &MenstrualConfig, date: NaiveDate) -> CyclePhase {
        let day = Self::cycle_day(config, date);
        let ovulation_day = config.cycle_length.saturating_sub(config.luteal_length);

        if day <= 5 {
            CyclePhase::Menstruation
        } else if day < ovulation_day {
            CyclePhase::Follicular
        } else if day == ovulation_day {
            CyclePhase::Ovulation
        } else if day > config.cycle_length.saturating_sub(LATE_LUTEAL_DAYS) {
            CyclePhase::LateLuteal
        } else {
            CyclePhase::Luteal
        }
    }

    pub fn modulation_for_phase(phase: CyclePhase) -> Modulation {
        let neutral = Modulation::neutral();
        match phase {
            CyclePhase::Luteal => Modulation {
                rhr_offset: 1.5,
                hrv_factor: 0.94,
                readiness_factor: 0.95,
                ..neutral
            },
            CyclePhase::LateLuteal => Modulation {
                rhr_offset: 2.0,
                hrv_factor: 0.90,
                readiness_factor: 0.90,
                ..neutral
            },
            CyclePhase::Ovulation => Modulation {
                rhr_offset: 0.5,
                hrv_factor: 1.02,
                injury_risk_factor: 1.2,
                ..neutral
            },
            CyclePhase::Menstruation => Modulation {
                rhr_offset: -0.5,
                readiness_factor: 0.92,
                ..neutral
            },
            CyclePhase::Follicular => neutral,
        }
    }
}

impl PhysiologicalModulation for MenstrualCycleModel {
    fn modulation_for(&self, athlete: &AthleteProfile, date: NaiveDate) -> Modulation {
        match &athlete.menstrual {
            Some(config) => Self::modulation_for_phase(Self::phase(config, date)),
            None => Modulation::neutral(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::athlete::AthleteProfileGenerator;
    use crate::sampling::run_rng;

    fn config() -> MenstrualConfig {
        MenstrualConfig {
            cycle_length: 28,
            luteal_length: 14,
            day_offset: 0,
        }
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_cycle_phases() {
        let c = config();
        assert_eq!(MenstrualCycleModel::phase(&c, jan(1)), CyclePhase::Menstruation);
        assert_eq!(MenstrualCycleModel::phase(&c, jan(5)), CyclePhase::Menstruation);
        assert_eq!(MenstrualCycleModel::phase(&c, jan(6)), CyclePhase::Follicular);
        assert_eq!(MenstrualCycleModel::phase(&c, jan(14)), CyclePhase::Ovulation);
        assert_eq!(MenstrualCycleModel::phase(&c, jan(20)), CyclePhase::Luteal);
        assert_eq!(MenstrualCycleModel::phase(&c, jan(26)), CyclePhase::LateLuteal);
        assert_eq!(MenstrualCycleModel::phase(&c, jan(29)), CyclePhase::Menstruation);
    }

    #[test]
    fn test_day_offset_shifts_cycle() {
        let c = MenstrualConfig {
            day_offset: 13,
            ..config()
        };
        assert_eq!(MenstrualCycleModel::cycle_day(&c, jan(1)), 14);
        assert_eq!(MenstrualCycleModel::phase(&c, jan(1)), CyclePhase::Ovulation);
    }

    #[test]
    fn test_luteal_effects() {
        let m = MenstrualCycleModel::modulation_for_phase(CyclePhase::Luteal);
        assert_eq!(m.rhr_offset, 1.5);
        assert_eq!(m.hrv_factor, 0.94);
        let ovulation = MenstrualCycleModel::modulation_for_phase(CyclePhase::Ovulation);
        assert_eq!(ovulation.injury_risk_factor, 1.2);
        assert_eq!(
            MenstrualCycleModel::modulation_for_phase(CyclePhase::Follicular),
            Modulation::neutral()
        );
    }

    #[test]
    fn test_male_athletes_are_neutral() {
        let mut rng = run_rng(21, 0);
        let mut athlete = AthleteProfileGenerator::new().generate_athlete_profile(&mut rng);
        athlete.menstrual = None;
        for day in 1..=28 {
            assert_eq!(MenstrualCycleModel.modulation_for(&athlete, jan(day)), Modulation::neutral());
            assert_eq!(NoModulation.modulation_for(&athlete, jan(day)), Modulation::neutral());
        }
    }
}
