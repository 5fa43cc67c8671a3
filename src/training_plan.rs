use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{AthleteProfile, Specialization, Sport};
use crate::sampling::{chance, round_to, uniform, uniform_int, weighted_choice};

/// Periodization phase of a training day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Base,
    Build,
    Peak,
    Taper,
    Race,
    Recovery,
    OffSeason,
    RacePrep,
}

impl Phase {
    /// Weekly load multiplier relative to the athlete's base target
    pub fn tss_multiplier(&self) -> f64 {
        match self {
            Phase::Base => 0.8,
            Phase::Build => 1.0,
            Phase::Peak => 1.1,
            Phase::RacePrep => 1.05,
            Phase::Taper => 0.7,
            Phase::Recovery => 0.5,
            Phase::OffSeason => 0.6,
            Phase::Race => 1.0,
        }
    }

    /// Typical intensity factor of the sessions in this phase
    pub fn intensity_factor(&self) -> f64 {
        match self {
            Phase::Base => 0.70,
            Phase::Build => 0.78,
            Phase::Peak => 0.82,
            Phase::RacePrep => 0.80,
            Phase::Taper => 0.75,
            Phase::Race => 0.85,
            Phase::Recovery => 0.62,
            Phase::OffSeason => 0.65,
        }
    }

    /// Phases that mark a week as a recovery week
    pub fn is_easy(&self) -> bool {
        matches!(self, Phase::Taper | Phase::Recovery | Phase::Race)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Base => "Base",
            Phase::Build => "Build",
            Phase::Peak => "Peak",
            Phase::Taper => "Taper",
            Phase::Race => "Race",
            Phase::Recovery => "Recovery",
            Phase::OffSeason => "Off-season",
            Phase::RacePrep => "Race Prep",
        };
        f.write_str(name)
    }
}

/// Race priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RaceImportance {
    A,
    B,
    C,
}

impl RaceImportance {
    pub fn is_priority(&self) -> bool {
        matches!(self, RaceImportance::A | RaceImportance::B)
    }

    fn race_tss(&self) -> f64 {
        match self {
            RaceImportance::A => 300.0,
            RaceImportance::B => 200.0,
            RaceImportance::C => 150.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    pub date: NaiveDate,
    pub importance: RaceImportance,
}

/// Per-sport amounts (TSS or minutes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SportLoad {
    pub swim: f64,
    pub bike: f64,
    pub run: f64,
    pub strength: f64,
}

impl SportLoad {
    pub fn get(&self, sport: Sport) -> f64 {
        match sport {
            Sport::Swim => self.swim,
            Sport::Bike => self.bike,
            Sport::Run => self.run,
            Sport::Strength => self.strength,
        }
    }

    fn slot(&mut self, sport: Sport) -> &mut f64 {
        match sport {
            Sport::Swim => &mut self.swim,
            Sport::Bike => &mut self.bike,
            Sport::Run => &mut self.run,
            Sport::Strength => &mut self.strength,
        }
    }

    pub fn total(&self) -> f64 {
        self.swim + self.bike + self.run + self.strength
    }

    pub fn scaled(&self, factor: f64) -> SportLoad {
        SportLoad {
            swim: self.swim * factor,
            bike: self.bike * factor,
            run: self.run * factor,
            strength: self.strength * factor,
        }
    }
}

/// One row of the annual plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlanDay {
    pub date: NaiveDate,
    pub phase: Phase,
    /// 7-day block counted from the plan start
    pub week_index: usize,
    pub total_tss: f64,
    pub sport_tss: SportLoad,
    pub sport_minutes: SportLoad,
    pub total_minutes: f64,
    pub is_rest_day: bool,
    pub is_race_day: bool,
    pub race: Option<RaceImportance>,
    /// Planned intensity factor
    pub intensity: f64,
    /// Rescale factor applied by the overload rule
    pub overload_multiplier: f64,
    /// Part of a deload week inside a Build or Race Prep block
    pub deload: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekKind {
    Normal,
    Recovery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSummary {
    pub week_index: usize,
    pub start: NaiveDate,
    pub total_tss: f64,
    pub kind: WeekKind,
    pub multiplier: f64,
}

/// Ability band derived from the athlete's background
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbilityLevel {
    Beginner,
    Intermediate,
    Advanced,
    Elite,
}

impl AbilityLevel {
    pub fn tss_per_hour(&self) -> f64 {
        match self {
            AbilityLevel::Beginner => 50.0,
            AbilityLevel::Intermediate => 58.0,
            AbilityLevel::Advanced => 65.0,
            AbilityLevel::Elite => 72.0,
        }
    }
}

/// Full-year plan for one athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualPlan {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub ability: AbilityLevel,
    pub base_weekly_tss: f64,
    pub days: Vec<TrainingPlanDay>,
    pub races: Vec<Race>,
    pub weeks: Vec<WeekSummary>,
}

impl AnnualPlan {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn day_at(&self, index: usize) -> Option<&TrainingPlanDay> {
        self.days.get(index)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&TrainingPlanDay> {
        let offset = (date - self.start).num_days();
        usize::try_from(offset).ok().and_then(|i| self.days.get(i))
    }

    pub fn total_planned_tss(&self) -> f64 {
        self.days.iter().map(|d| d.total_tss).sum()
    }
}

/// Mon..Sun share of the weekly load
const DAY_SHAPE: [f64; 7] = [0.8, 1.0, 1.1, 1.0, 0.7, 1.2, 1.3];

/// Race months Jan..Dec, spring and summer heavy
const RACE_MONTH_WEIGHTS: [f64; 12] = [
    0.01, 0.02, 0.05, 0.10, 0.15, 0.20, 0.20, 0.15, 0.10, 0.02, 0.0, 0.0,
];

const RACE_PLACEMENT_ATTEMPTS: u32 = 100;
const STRENGTH_TSS_CAP: f64 = 70.0;
const OVERLOAD_CAP: f64 = 1.1;

/// Annual training plan generator
pub struct TrainingPlanGenerator;

impl TrainingPlanGenerator {
    /// Weighted score over experience, age, VO2max, volume and W/kg
    pub fn calculate_ability(athlete: &AthleteProfile) -> AbilityLevel {
        let experience = (athlete.training_experience as f64 * 2.0).min(20.0);
        let age = match athlete.age {
            0..=24 => 8.0,
            25..=34 => 10.0,
            35..=44 => 7.0,
            45..=54 => 6.0,
            _ => 3.0,
        };
        let vo2 = band(athlete.vo2max, &[(40.0, 5.0), (50.0, 10.0), (60.0, 15.0), (70.0, 20.0)], 25.0);
        let hours = band(athlete.weekly_training_hours, &[(7.0, 5.0), (9.0, 10.0), (12.0, 15.0)], 20.0);
        let w_per_kg = athlete.ftp / athlete.weight_kg.max(1.0);
        let power = band(w_per_kg, &[(3.0, 5.0), (3.5, 10.0), (4.5, 15.0), (5.5, 20.0)], 25.0);

        let score = experience + age + vo2 + hours + power;
        if score <= 30.0 {
            AbilityLevel::Beginner
        } else if score <= 50.0 {
            AbilityLevel::Intermediate
        } else if score <= 75.0 {
            AbilityLevel::Advanced
        } else {
            AbilityLevel::Elite
        }
    }

    /// Generate the plan from `start_date` to December 31st of that year
    pub fn generate_annual_training_plan<R: Rng + ?Sized>(
        athlete: &AthleteProfile,
        start_date: NaiveDate,
        rng: &mut R,
    ) -> AnnualPlan {
        let end = NaiveDate::from_ymd_opt(start_date.year(), 12, 31).unwrap_or(start_date);
        let n_days = ((end - start_date).num_days() + 1).max(1) as usize;

        let races = Self::schedule_races(start_date, end, rng);
        let phases = Self::build_phase_timeline(athlete, start_date, n_days, &races);
        let deloads = mark_deload_days(&phases);

        let ability = Self::calculate_ability(athlete);
        let base_weekly_tss = athlete.weekly_training_hours * ability.tss_per_hour();
        let shape_sum: f64 = DAY_SHAPE.iter().sum();
        let weights = sport_weights(athlete.specialization);

        let mut days: Vec<TrainingPlanDay> = (0..n_days)
            .map(|i| {
                let date = start_date + Days::new(i as u64);
                let phase = phases[i];
                let race = races.iter().find(|r| r.date == date).map(|r| r.importance);
                let weekday = date.weekday();

                let (total_tss, sport_tss, is_rest_day) = match race {
                    Some(importance) if phase == Phase::Race => {
                        let tss = importance.race_tss() * uniform(rng, 0.9, 1.1);
                        let split = SportLoad {
                            swim: tss * 0.1,
                            bike: tss * 0.6,
                            run: tss * 0.3,
                            strength: 0.0,
                        };
                        (tss, split, false)
                    }
                    _ => {
                        let deload = if deloads[i] { 0.7 } else { 1.0 };
                        let target = base_weekly_tss
                            * phase.tss_multiplier()
                            * deload
                            * DAY_SHAPE[weekday.num_days_from_monday() as usize]
                            / shape_sum
                            * uniform(rng, 0.9, 1.1);

                        let mut rest_probability = match weekday {
                            Weekday::Mon | Weekday::Fri => 0.2,
                            _ => 0.05,
                        };
                        if matches!(phase, Phase::Recovery | Phase::Taper) {
                            rest_probability *= 2.0;
                        }

                        if chance(rng, rest_probability) {
                            (0.0, SportLoad::default(), true)
                        } else {
                            let split = split_sports(target, phase, &weights, rng);
                            (split.total(), split, false)
                        }
                    }
                };

                let intensity = phase.intensity_factor();
                let sport_minutes = minutes_for(&sport_tss, intensity);

                TrainingPlanDay {
                    date,
                    phase,
                    week_index: i / 7,
                    total_tss: round_to(total_tss, 1),
                    sport_tss,
                    total_minutes: sport_minutes.total(),
                    sport_minutes,
                    is_rest_day,
                    is_race_day: phase == Phase::Race,
                    race: if phase == Phase::Race { race } else { None },
                    intensity,
                    overload_multiplier: 1.0,
                    deload: deloads[i],
                }
            })
            .collect();

        let weeks = apply_progressive_overload(&mut days, rng);

        tracing::debug!(
            races = races.len(),
            weeks = weeks.len(),
            ability = ?ability,
            "Annual plan generated"
        );

        AnnualPlan {
            start: start_date,
            end,
            ability,
            base_weekly_tss,
            days,
            races,
            weeks,
        }
    }

    /// Draw 3-5 A/B races (1-2 of them A) and 2-4 C races
    fn schedule_races<R: Rng + ?Sized>(start: NaiveDate, end: NaiveDate, rng: &mut R) -> Vec<Race> {
        let earliest = start + Days::new(56);
        let latest = end.checked_sub_days(Days::new(14)).unwrap_or(end);

        let n_priority = uniform_int(rng, 3, 5);
        let n_a = uniform_int(rng, 1, 2).min(n_priority);
        let n_c = uniform_int(rng, 2, 4);

        let wanted = std::iter::repeat(RaceImportance::A)
            .take(n_a as usize)
            .chain(std::iter::repeat(RaceImportance::B).take((n_priority - n_a) as usize))
            .chain(std::iter::repeat(RaceImportance::C).take(n_c as usize));

        let months: Vec<(u32, f64)> = RACE_MONTH_WEIGHTS
            .iter()
            .enumerate()
            .map(|(i, w)| (i as u32 + 1, *w))
            .collect();

        let mut races: Vec<Race> = Vec::new();
        for importance in wanted {
            for _ in 0..RACE_PLACEMENT_ATTEMPTS {
                let Some(&month) = weighted_choice(rng, &months) else {
                    break;
                };
                let day = uniform_int(rng, 1, days_in_month(start.year(), month));
                let Some(date) = NaiveDate::from_ymd_opt(start.year(), month, day) else {
                    continue;
                };
                if date < earliest || date > latest {
                    continue;
                }
                let clashes = races.iter().any(|r| {
                    let gap = (r.date - date).num_days().abs();
                    gap < 15 || (gap < 30 && importance.is_priority() && r.importance.is_priority())
                });
                if !clashes {
                    races.push(Race { date, importance });
                    break;
                }
            }
        }

        races.sort_by_key(|r| r.date);
        races
    }

    /// Lay out phases forwards, one priority race at a time
    fn build_phase_timeline(
        athlete: &AthleteProfile,
        start: NaiveDate,
        n_days: usize,
        races: &[Race],
    ) -> Vec<Phase> {
        let mut phases = vec![Phase::OffSeason; n_days];
        let index_of = |date: NaiveDate| (date - start).num_days().max(0) as usize;
        let rr = athlete.recovery_rate;
        let mut cursor = 0usize;

        for race in races.iter().filter(|r| r.importance.is_priority()) {
            let race_idx = index_of(race.date);
            if race_idx < cursor || race_idx >= n_days {
                continue;
            }
            let (taper_len, peak_len, recovery_len) = match race.importance {
                RaceImportance::A => (14, 14, (14.0 - 3.0 * rr).round().max(3.0) as usize),
                _ => (10, 7, (10.0 - 3.0 * rr).round().max(3.0) as usize),
            };

            let taper_start = race_idx.saturating_sub(taper_len).max(cursor);
            let available = taper_start - cursor;

            if available > 120 {
                let base = (available as f64 * 0.45).round() as usize;
                let build = available - base - peak_len;
                fill(&mut phases, cursor, base, Phase::Base);
                fill(&mut phases, cursor + base, build, Phase::Build);
                fill(&mut phases, cursor + base + build, peak_len, Phase::Peak);
            } else if available >= 60 {
                let base = (available as f64 * 0.3).round() as usize;
                fill(&mut phases, cursor, base, Phase::Base);
                fill(&mut phases, cursor + base, available - base, Phase::Build);
            } else {
                fill(&mut phases, cursor, available, Phase::RacePrep);
            }

            fill(&mut phases, taper_start, race_idx - taper_start, Phase::Taper);
            phases[race_idx] = Phase::Race;
            fill(&mut phases, race_idx + 1, recovery_len, Phase::Recovery);
            cursor = race_idx + recovery_len + 1;
        }

        // Fill the rest of the year with a generic cycle
        const CYCLE: [(Phase, usize); 4] = [
            (Phase::OffSeason, 28),
            (Phase::Base, 42),
            (Phase::Build, 28),
            (Phase::Recovery, 7),
        ];
        'outer: while cursor < n_days {
            for (phase, len) in CYCLE {
                fill(&mut phases, cursor, len, phase);
                cursor += len;
                if cursor >= n_days {
                    break 'outer;
                }
            }
        }

        for race in races.iter().filter(|r| r.importance == RaceImportance::C) {
            let race_idx = index_of(race.date);
            if race_idx >= n_days {
                continue;
            }
            let taper_start = race_idx.saturating_sub(3);
            fill(&mut phases, taper_start, race_idx - taper_start, Phase::Taper);
            phases[race_idx] = Phase::Race;
            fill(&mut phases, race_idx + 1, 2, Phase::Recovery);
        }

        phases
    }
}

fn band(value: f64, bands: &[(f64, f64)], top: f64) -> f64 {
    bands
        .iter()
        .find(|(upper, _)| value < *upper)
        .map_or(top, |(_, score)| *score)
}

fn fill(phases: &mut [Phase], start: usize, len: usize, phase: Phase) {
    let end = (start + len).min(phases.len());
    if start < end {
        phases[start..end].fill(phase);
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|d| d.pred_opt()).map_or(28, |d| d.day())
}

/// Every 4th week of a contiguous Build or Race Prep block
fn mark_deload_days(phases: &[Phase]) -> Vec<bool> {
    let mut deload = vec![false; phases.len()];
    let mut block_start = 0;
    for i in 0..phases.len() {
        let loaded = matches!(phases[i], Phase::Build | Phase::RacePrep);
        if !loaded {
            continue;
        }
        if i == 0 || phases[i - 1] != phases[i] {
            block_start = i;
        }
        deload[i] = ((i - block_start) / 7) % 4 == 3;
    }
    deload
}

fn sport_weights(specialization: Specialization) -> [(Sport, f64); 4] {
    let (swim, bike, run, strength) = match specialization {
        Specialization::BikeStrong => (0.25, 0.40, 0.30, 0.05),
        Specialization::RunStrong => (0.30, 0.50, 0.15, 0.05),
        Specialization::SwimStrong => (0.10, 0.55, 0.33, 0.05),
        Specialization::Balanced => (0.20, 0.50, 0.25, 0.05),
    };
    [
        (Sport::Swim, swim),
        (Sport::Bike, bike),
        (Sport::Run, run),
        (Sport::Strength, strength),
    ]
}

/// Pick 1-3 sports for the day and share the load by weight
fn split_sports<R: Rng + ?Sized>(
    target: f64,
    phase: Phase,
    weights: &[(Sport, f64); 4],
    rng: &mut R,
) -> SportLoad {
    let counts: &[(usize, f64)] = if matches!(phase, Phase::Recovery | Phase::Taper) {
        &[(1, 0.7), (2, 0.3)]
    } else {
        &[(1, 0.5), (2, 0.3), (3, 0.2)]
    };
    let n_sessions = weighted_choice(rng, counts).copied().unwrap_or(1);

    let mut selection_weights = *weights;
    if phase == Phase::Base {
        selection_weights[1].1 *= 1.2;
        selection_weights[2].1 *= 0.8;
    }
    if target > 80.0 && n_sessions == 1 {
        selection_weights[3].1 = 0.0;
    }

    let mut picked: Vec<Sport> = Vec::with_capacity(n_sessions);
    for _ in 0..n_sessions {
        if let Some(&sport) = weighted_choice(rng, &selection_weights) {
            if !picked.contains(&sport) {
                picked.push(sport);
            }
        }
    }
    if picked.is_empty() {
        picked.push(Sport::Bike);
    }

    let share_total: f64 = picked
        .iter()
        .map(|s| weights.iter().find(|(w, _)| w == s).map_or(0.0, |(_, v)| *v))
        .sum();

    let mut load = SportLoad::default();
    for sport in &picked {
        let weight = weights.iter().find(|(w, _)| w == sport).map_or(0.0, |(_, v)| *v);
        if share_total > 0.0 {
            *load.slot(*sport) = target * weight / share_total;
        }
    }

    if load.strength > STRENGTH_TSS_CAP {
        let excess = load.strength - STRENGTH_TSS_CAP;
        load.strength = STRENGTH_TSS_CAP;
        load.bike += excess;
    }

    load
}

/// Minutes needed to accumulate each sport's TSS at the given IF
fn minutes_for(tss: &SportLoad, intensity: f64) -> SportLoad {
    let per_hour = 100.0 * intensity * intensity;
    tss.scaled(60.0 / per_hour)
}

fn scale_day(day: &mut TrainingPlanDay, factor: f64) {
    day.total_tss *= factor;
    day.sport_tss = day.sport_tss.scaled(factor);
    day.sport_minutes = day.sport_minutes.scaled(factor);
    day.total_minutes *= factor;
    day.overload_multiplier = factor;
}

/// Cap week-over-week growth at 10% and trim recovery weeks
///
/// Normal weeks are compared with the last Normal week. Recovery weeks
/// (taper, recovery, race or deload days) are exempt from the cap and
/// their non-race load is held to 60-70% of the last Normal week.
fn apply_progressive_overload<R: Rng + ?Sized>(
    days: &mut [TrainingPlanDay],
    rng: &mut R,
) -> Vec<WeekSummary> {
    let mut weeks = Vec::new();
    let mut last_normal: Option<f64> = None;

    for (week_index, week) in days.chunks_mut(7).enumerate() {
        let is_recovery = week.iter().any(|d| d.phase.is_easy() || d.deload);
        let total: f64 = week.iter().map(|d| d.total_tss).sum();
        let mut multiplier = 1.0;

        if is_recovery {
            let non_race: f64 = week
                .iter()
                .filter(|d| !d.is_race_day)
                .map(|d| d.total_tss)
                .sum();
            if let Some(reference) = last_normal {
                if non_race > 0.7 * reference {
                    multiplier = uniform(rng, 0.6, 0.7) * reference / non_race;
                    for day in week.iter_mut().filter(|d| !d.is_race_day) {
                        scale_day(day, multiplier);
                    }
                }
            }
        } else {
            if let Some(reference) = last_normal {
                if total > OVERLOAD_CAP * reference && total > 0.0 {
                    multiplier = OVERLOAD_CAP * reference / total;
                    for day in week.iter_mut() {
                        scale_day(day, multiplier);
                    }
                }
            }
            last_normal = Some(week.iter().map(|d| d.total_tss).sum());
        }

        weeks.push(WeekSummary {
            week_index,
            start: week[0].date,
            total_tss: week.iter().map(|d| d.total_tss).sum(),
            kind: if is_recovery {
                WeekKind::Recovery
            } else {
                WeekKind::Normal
            },
            multiplier,
        });
    }

    weeks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::athlete::AthleteProfileGenerator;
    use crate::sampling::run_rng;

    fn plan_for(seed: u64) -> (AthleteProfile, AnnualPlan) {
        let mut rng = run_rng(seed, 0);
        let athlete = AthleteProfileGenerator::new().generate_athlete_profile(&mut rng);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let plan = TrainingPlanGenerator::generate_annual_training_plan(&athlete, start, &mut rng);
        (athlete, plan)
    }

    #[test]
    fn test_plan_covers_full_year() {
        let (_, plan) = plan_for(42);
        assert_eq!(plan.len(), 366);
        assert_eq!(plan.days[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(plan.days[365].date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        for (i, day) in plan.days.iter().enumerate() {
            assert_eq!(plan.day(day.date).map(|d| d.date), Some(day.date));
            assert_eq!(day.week_index, i / 7);
        }
        assert!(plan.total_planned_tss() > 0.0);
    }

    #[test]
    fn test_race_placement_rules() {
        for seed in 0..25 {
            let (_, plan) = plan_for(seed);
            let earliest = plan.start + Days::new(56);
            let latest = plan.end - Days::new(14);
            for race in &plan.races {
                assert!(race.date >= earliest && race.date <= latest);
            }
            for (i, a) in plan.races.iter().enumerate() {
                for b in &plan.races[i + 1..] {
                    let gap = (b.date - a.date).num_days().abs();
                    assert!(gap >= 15);
                    if a.importance.is_priority() && b.importance.is_priority() {
                        assert!(gap >= 30);
                    }
                }
            }
            let a_races = plan
                .races
                .iter()
                .filter(|r| r.importance == RaceImportance::A)
                .count();
            assert!(a_races <= 2);
        }
    }

    #[test]
    fn test_race_days_are_marked() {
        for seed in 0..10 {
            let (_, plan) = plan_for(seed);
            for race in &plan.races {
                let day = plan.day(race.date).unwrap();
                assert!(day.is_race_day);
                assert_eq!(day.phase, Phase::Race);
                assert_eq!(day.race, Some(race.importance));
                assert!(!day.is_rest_day);
                assert!(day.total_tss > 0.0);
                assert!(plan.day(race.date - Days::new(1)).unwrap().phase == Phase::Taper);
            }
        }
    }

    #[test]
    fn test_overload_cap_between_normal_weeks() {
        for seed in 0..25 {
            let (_, plan) = plan_for(seed);
            let mut last_normal: Option<f64> = None;
            for week in &plan.weeks {
                if week.kind == WeekKind::Normal {
                    if let Some(prev) = last_normal {
                        assert!(
                            week.total_tss <= OVERLOAD_CAP * prev + 1e-6,
                            "week {} grew from {} to {}",
                            week.week_index,
                            prev,
                            week.total_tss
                        );
                    }
                    last_normal = Some(week.total_tss);
                }
            }
        }
    }

    #[test]
    fn test_sport_split_consistency() {
        let (_, plan) = plan_for(7);
        for day in &plan.days {
            assert!((day.sport_tss.total() - day.total_tss).abs() < 0.2);
            assert!(day.sport_tss.strength <= STRENGTH_TSS_CAP + 1e-9);
            if day.is_rest_day {
                assert_eq!(day.total_tss, 0.0);
                assert_eq!(day.total_minutes, 0.0);
            }
            assert!(day.overload_multiplier > 0.0 && day.overload_multiplier <= 1.0);
        }
    }

    #[test]
    fn test_minutes_follow_intensity() {
        let tss = SportLoad {
            swim: 0.0,
            bike: 100.0,
            run: 0.0,
            strength: 0.0,
        };
        let minutes = minutes_for(&tss, 1.0);
        assert!((minutes.bike - 60.0).abs() < 1e-9);
        let easy = minutes_for(&tss, 0.7);
        assert!(easy.bike > 120.0);
    }

    #[test]
    fn test_deload_every_fourth_week() {
        let mut phases = vec![Phase::Base; 3];
        phases.extend(vec![Phase::Build; 35]);
        let deload = mark_deload_days(&phases);
        assert!(!deload[3 + 20]);
        assert!(deload[3 + 21]);
        assert!(deload[3 + 27]);
        assert!(!deload[3 + 28]);
        assert!(!deload[0]);
    }

    #[test]
    fn test_ability_levels() {
        let mut rng = run_rng(1, 0);
        let mut athlete = AthleteProfileGenerator::new().generate_athlete_profile(&mut rng);
        athlete.training_experience = 2;
        athlete.age = 50;
        athlete.vo2max = 45.0;
        athlete.weekly_training_hours = 6.0;
        athlete.ftp = 2.5 * athlete.weight_kg;
        assert_eq!(TrainingPlanGenerator::calculate_ability(&athlete), AbilityLevel::Beginner);

        athlete.training_experience = 12;
        athlete.age = 30;
        athlete.vo2max = 72.0;
        athlete.weekly_training_hours = 15.0;
        athlete.ftp = 5.0 * athlete.weight_kg;
        assert_eq!(TrainingPlanGenerator::calculate_ability(&athlete), AbilityLevel::Elite);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::OffSeason.to_string(), "Off-season");
        assert_eq!(Phase::RacePrep.to_string(), "Race Prep");
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
    }
}
