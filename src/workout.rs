//! Execution of the planned sessions of one day
//!
//! Decides whether each planned session is done, how its duration and
//! intensity drift with fatigue and HRV, when in the day it happens, and
//! whether the athlete adds an unplanned session on a rest day.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::daily_metrics::{MorningMetrics, PrevDayState};
use crate::models::{ActivityRecord, AthleteProfile, Chronotype, Sport, WorkoutKind};
use crate::sampling::{chance, round_to, uniform, uniform_int, weighted_choice};
use crate::training_plan::TrainingPlanDay;
use crate::zones::ZoneCalculator;

/// Morning HRV relative to baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HrvStatus {
    VeryLow,
    SlightlyLow,
    Normal,
    High,
}

impl HrvStatus {
    pub fn from_reading(hrv: f64, baseline: f64) -> Self {
        let ratio = if baseline > 0.0 { hrv / baseline } else { 1.0 };
        if ratio < 0.75 {
            HrvStatus::VeryLow
        } else if ratio < 0.85 {
            HrvStatus::SlightlyLow
        } else if ratio > 1.15 {
            HrvStatus::High
        } else {
            HrvStatus::Normal
        }
    }
}

/// Result of executing one plan day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub activities: Vec<ActivityRecord>,
    pub actual_tss: f64,
    /// Injury probability multiplier from sessions outside the chronotype window
    pub circadian_risk: f64,
}

impl Execution {
    /// Drop sessions the athlete added on their own
    pub fn without_unplanned(mut self) -> Self {
        self.activities.retain(|a| a.planned);
        self.actual_tss = self.activities.iter().map(|a| a.tss).sum();
        self
    }
}

/// Share of sessions scheduled outside the preferred window
const OFF_WINDOW_SHARE: f64 = 0.2;

/// Preferred training window, inclusive hours
fn preferred_window(chronotype: Chronotype) -> (u32, u32) {
    match chronotype {
        Chronotype::Lark => (6, 9),
        Chronotype::Owl => (17, 20),
        Chronotype::Intermediate => (11, 18),
    }
}

/// Performance and injury multipliers for a misaligned session
fn misalignment_cost(chronotype: Chronotype) -> (f64, f64) {
    match chronotype {
        Chronotype::Lark => (0.92, 1.15),
        Chronotype::Owl => (0.88, 1.25),
        Chronotype::Intermediate => (1.0, 1.0),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkoutExecutor;

impl WorkoutExecutor {
    pub fn new() -> Self {
        WorkoutExecutor
    }

    pub fn execute<R: Rng + ?Sized>(
        &self,
        athlete: &AthleteProfile,
        plan_day: &TrainingPlanDay,
        prev: &PrevDayState,
        morning: &MorningMetrics,
        rng: &mut R,
    ) -> Execution {
        let fatigue = prev.fatigue;
        let hrv_status = HrvStatus::from_reading(morning.hrv, athlete.hrv_baseline);
        let completion = if plan_day.is_race_day {
            1.0
        } else {
            completion_probability(fatigue, morning.sleep_quality, hrv_status)
        };

        let mut activities = Vec::new();
        let mut circadian_risk = 1.0;

        for sport in Sport::ALL {
            let planned_tss = plan_day.sport_tss.get(sport);
            let planned_minutes = plan_day.sport_minutes.get(sport);
            if planned_tss <= 0.0 || planned_minutes <= 0.0 {
                continue;
            }

            let (start_hour, aligned) = training_hour(athlete.chronotype, rng);
            let mut performance = 1.0;
            if !aligned {
                let (penalty, risk) = misalignment_cost(athlete.chronotype);
                performance = penalty;
                circadian_risk *= risk;
            }

            if !chance(rng, completion) {
                tracing::trace!(date = %plan_day.date, %sport, "Session skipped");
                continue;
            }

            let (duration_factor, intensity_factor) = if fatigue > 80.0 {
                (uniform(rng, 0.7, 0.9), uniform(rng, 0.8, 0.95))
            } else if fatigue < 40.0 && hrv_status == HrvStatus::High {
                (uniform(rng, 1.1, 1.2), uniform(rng, 1.05, 1.15))
            } else {
                (1.0, 1.0)
            };

            let planned_if = (planned_tss / 100.0 * 60.0 / planned_minutes).sqrt();
            let minutes = planned_minutes * duration_factor;
            let intensity = planned_if * intensity_factor * performance;

            let kind = classify(athlete, sport, intensity, plan_day.is_race_day);
            let mut tss = 100.0 * intensity * intensity * minutes / 60.0;
            if kind == WorkoutKind::Intervals {
                tss *= 1.1;
            }

            activities.push(self.activity_record(
                athlete,
                plan_day,
                sport,
                kind,
                start_hour,
                minutes,
                planned_tss,
                tss,
                intensity,
                true,
                rng,
            ));
        }

        if plan_day.is_rest_day {
            let extra_chance = if fatigue > 70.0 { 0.1 } else { 0.3 };
            if chance(rng, extra_chance) {
                let sport = *weighted_choice(rng, &[(Sport::Bike, 1.0), (Sport::Run, 1.0), (Sport::Swim, 1.0)])
                    .unwrap_or(&Sport::Bike);
                let tss = uniform(rng, 20.0, 45.0);
                let intensity = uniform(rng, 0.6, 0.75);
                let minutes = tss / (100.0 * intensity * intensity) * 60.0;
                let (start_hour, _) = training_hour(athlete.chronotype, rng);

                activities.push(self.activity_record(
                    athlete,
                    plan_day,
                    sport,
                    WorkoutKind::Recovery,
                    start_hour,
                    minutes,
                    0.0,
                    tss,
                    intensity,
                    false,
                    rng,
                ));
            }
        }

        let actual_tss = activities.iter().map(|a| a.tss).sum();
        Execution {
            activities,
            actual_tss,
            circadian_risk,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn activity_record<R: Rng + ?Sized>(
        &self,
        athlete: &AthleteProfile,
        plan_day: &TrainingPlanDay,
        sport: Sport,
        kind: WorkoutKind,
        start_hour: u32,
        minutes: f64,
        planned_tss: f64,
        tss: f64,
        intensity: f64,
        planned: bool,
        rng: &mut R,
    ) -> ActivityRecord {
        let avg_hr = (athlete.lthr * (0.65 + 0.3 * intensity)).min(athlete.max_hr);
        let max_hr = (avg_hr + uniform(rng, 8.0, 20.0)).min(athlete.max_hr);
        let avg_power = (sport == Sport::Bike).then(|| round_to(athlete.ftp * intensity, 0));

        ActivityRecord {
            athlete_id: athlete.id,
            date: plan_day.date,
            sport,
            kind,
            start_hour,
            duration_minutes: round_to(minutes, 1),
            planned_tss: round_to(planned_tss, 1),
            tss: round_to(tss, 1),
            intensity_factor: round_to(intensity, 2),
            avg_hr: round_to(avg_hr, 0),
            max_hr: round_to(max_hr, 0),
            avg_power,
            planned,
        }
    }
}

/// Probability that a planned session is completed
pub fn completion_probability(fatigue: f64, sleep_quality: f64, hrv: HrvStatus) -> f64 {
    if fatigue > 90.0 || (sleep_quality < 0.25 && hrv == HrvStatus::VeryLow) {
        return 0.05;
    }

    let base = 1.0 / (1.0 + ((fatigue - 75.0) / 10.0).exp()) + (sleep_quality * 100.0 - 50.0) / 200.0;
    let adjusted = match hrv {
        HrvStatus::VeryLow => base * 0.5,
        HrvStatus::SlightlyLow => base * 0.8,
        HrvStatus::High if fatigue < 40.0 => base * 1.2,
        _ => base,
    };
    adjusted.clamp(0.0, 1.0)
}

/// Start hour and whether it falls inside the preferred window
fn training_hour<R: Rng + ?Sized>(chronotype: Chronotype, rng: &mut R) -> (u32, bool) {
    let (low, high) = preferred_window(chronotype);
    if !chance(rng, OFF_WINDOW_SHARE) {
        return (uniform_int(rng, low, high), true);
    }
    let outside: Vec<(u32, f64)> = (5..=21).filter(|h| *h < low || *h > high).map(|h| (h, 1.0)).collect();
    match weighted_choice(rng, &outside) {
        Some(hour) => (*hour, false),
        None => (uniform_int(rng, low, high), true),
    }
}

/// Session kind from the power zone its intensity falls in
fn classify(athlete: &AthleteProfile, sport: Sport, intensity: f64, race_day: bool) -> WorkoutKind {
    if sport == Sport::Strength {
        return WorkoutKind::Strength;
    }
    if race_day {
        return WorkoutKind::Race;
    }
    match ZoneCalculator::power_zone(athlete.ftp * intensity, &athlete.power_zones) {
        0 | 1 => WorkoutKind::Recovery,
        2 => WorkoutKind::Endurance,
        3 => WorkoutKind::Tempo,
        _ => WorkoutKind::Intervals,
    }
}
