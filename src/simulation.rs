//! Day-by-day simulation of one athlete-year and of a cohort
//!
//! Each day is a fold step over [`PrevDayState`]: modulation, morning
//! metrics, sensor noise, workout execution, load spikes, history update,
//! evening metrics, the injury state machine, and the false-alarm clock.

use chrono::{Days, NaiveDate};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::athlete::AthleteProfileGenerator;
use crate::config::SimulationConfig;
use crate::daily_metrics::{DailyMetricsSimulator, MorningContext, MorningMetrics, PrevDayState};
use crate::error::{PlanError, Result, SimError};
use crate::injury::{
    InjuryDecision, InjuryEvent, InjuryInputs, InjuryRiskEngine, InjuryState, WellnessInputs,
};
use crate::load_spikes::LoadSpikeSchedule;
use crate::models::{ActivityRecord, AthleteProfile, DailyRecord, RHR_BAND};
use crate::modulation::{MenstrualCycleModel, NoModulation, PhysiologicalModulation};
use crate::patterns::{
    create_false_alarm_patterns, inject_realistic_injury_patterns, window_is_clear, PatchLog,
    PatchSource, PatternConfig,
};
use crate::pmc::FitnessFatigueFormModel;
use crate::sampling::{clip, round_to, run_rng, uniform, uniform_int};
use crate::sensor_noise::{DeviceNoise, NoNoise, SensorNoise};
use crate::training_plan::{AnnualPlan, TrainingPlanDay, TrainingPlanGenerator};
use crate::workout::WorkoutExecutor;

/// Stream reserved for drawing the cohort's profiles
const PROFILE_STREAM: u64 = u64::MAX;

/// Everything produced for one athlete over one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteYear {
    pub athlete: AthleteProfile,
    pub plan: AnnualPlan,
    pub daily_data: Vec<DailyRecord>,
    pub activity_data: Vec<ActivityRecord>,
    pub injuries: Vec<InjuryEvent>,
    /// Every retroactive change made to `daily_data`
    pub patches: PatchLog,
    pub spikes: LoadSpikeSchedule,
}

/// Per-athlete totals for reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteSummary {
    pub athlete_id: Uuid,
    pub days: usize,
    pub injury_days: usize,
    pub injuries: Vec<InjuryEvent>,
    pub total_planned_tss: f64,
    pub total_actual_tss: f64,
    pub mean_acwr: f64,
    pub activities: usize,
    pub precursor_patches: usize,
    pub false_alarm_patches: usize,
}

impl AthleteYear {
    pub fn total_actual_tss(&self) -> f64 {
        self.daily_data.iter().map(|d| d.actual_tss).sum()
    }

    pub fn injury_days(&self) -> usize {
        self.daily_data.iter().filter(|d| d.injury).count()
    }

    /// Mean post-workout ACWR, 1.0 for an empty year
    pub fn mean_acwr(&self) -> f64 {
        if self.daily_data.is_empty() {
            return 1.0;
        }
        self.daily_data.iter().map(|d| d.acwr).sum::<f64>() / self.daily_data.len() as f64
    }

    pub fn summary(&self) -> AthleteSummary {
        AthleteSummary {
            athlete_id: self.athlete.id,
            days: self.daily_data.len(),
            injury_days: self.injury_days(),
            injuries: self.injuries.clone(),
            total_planned_tss: self.daily_data.iter().map(|d| d.planned_tss).sum(),
            total_actual_tss: self.total_actual_tss(),
            mean_acwr: self.mean_acwr(),
            activities: self.activity_data.len(),
            precursor_patches: self.patches.count_by_source(PatchSource::InjuryPrecursor),
            false_alarm_patches: self.patches.count_by_source(PatchSource::FalseAlarm),
        }
    }
}

/// Countdown to the next false-alarm window
#[derive(Debug, Clone, Copy)]
struct FalseAlarmClock {
    due_in: u32,
}

impl FalseAlarmClock {
    fn new<R: Rng + ?Sized>(config: &PatternConfig, rng: &mut R) -> Self {
        let (low, high) = config.false_alarm_first;
        FalseAlarmClock {
            due_in: uniform_int(rng, low, high),
        }
    }

    /// Count one day down, true once the alarm is due
    fn tick(&mut self) -> bool {
        self.due_in = self.due_in.saturating_sub(1);
        self.due_in == 0
    }

    fn reschedule<R: Rng + ?Sized>(&mut self, config: &PatternConfig, rng: &mut R) {
        let (low, high) = config.false_alarm_interval;
        self.due_in = uniform_int(rng, low, high).max(1);
    }
}

/// Drives the per-day protocol for athletes
pub struct YearOrchestrator {
    config: SimulationConfig,
    pmc: FitnessFatigueFormModel,
    metrics: DailyMetricsSimulator,
    injury: InjuryRiskEngine,
    executor: WorkoutExecutor,
    noise: Box<dyn SensorNoise>,
    modulation: Box<dyn PhysiologicalModulation>,
}

impl YearOrchestrator {
    /// Build an orchestrator from a validated configuration
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let noise: Box<dyn SensorNoise> = if config.run.sensor_noise {
            Box::new(DeviceNoise)
        } else {
            Box::new(NoNoise)
        };
        let modulation: Box<dyn PhysiologicalModulation> = if config.run.modulations {
            Box::new(MenstrualCycleModel)
        } else {
            Box::new(NoModulation)
        };

        Ok(YearOrchestrator {
            pmc: FitnessFatigueFormModel::with_config(config.training.clone()),
            metrics: DailyMetricsSimulator::new(config.metrics.clone()),
            injury: InjuryRiskEngine::new(config.injury.clone(), config.wellness.clone()),
            executor: WorkoutExecutor::new(),
            noise,
            modulation,
            config,
        })
    }

    pub fn with_sensor_noise(mut self, noise: Box<dyn SensorNoise>) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_modulation(mut self, modulation: Box<dyn PhysiologicalModulation>) -> Self {
        self.modulation = modulation;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Generate `run.n_athletes` profiles and simulate `run.year` for all of them
    pub fn run(&self) -> Result<Vec<AthleteYear>> {
        let run = &self.config.run;
        let athletes = Self::generate_cohort(run.n_athletes, run.seed);
        self.simulate_cohort(&athletes, run.year, run.seed)
    }

    /// Profiles for a seeded run, drawn from their own stream
    pub fn generate_cohort(n: usize, seed: u64) -> Vec<AthleteProfile> {
        let mut rng = run_rng(seed, PROFILE_STREAM);
        AthleteProfileGenerator::new().generate_athlete_cohort(&mut rng, n)
    }

    /// Simulate every athlete in parallel
    ///
    /// Athlete `i` uses stream `i` of the run seed, so results do not depend
    /// on the thread count. The first error aborts the cohort.
    pub fn simulate_cohort(
        &self,
        athletes: &[AthleteProfile],
        year: i32,
        seed: u64,
    ) -> Result<Vec<AthleteYear>> {
        info!(athletes = athletes.len(), year, seed, "Starting cohort simulation");
        let start_time = std::time::Instant::now();

        let progress = self.progress_bar(athletes.len());

        let simulate = || {
            athletes
                .par_iter()
                .enumerate()
                .map(|(index, athlete)| {
                    let mut rng = run_rng(seed, index as u64);
                    let result = self.simulate_full_year(athlete, year, &mut rng);
                    if let Some(pb) = &progress {
                        pb.inc(1);
                    }
                    result
                })
                .collect::<Result<Vec<AthleteYear>>>()
        };

        let results = match self.config.run.threads {
            Some(0) => Err(SimError::InvalidInput("thread count must be positive".to_string())),
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| SimError::Internal(format!("Failed to create thread pool: {}", e)))
                .and_then(|pool| pool.install(simulate)),
            None => simulate(),
        };

        if let Some(pb) = progress {
            pb.finish_with_message("Complete");
        }

        let years = results?;
        info!(
            athletes = years.len(),
            injuries = years.iter().map(|y| y.injuries.len()).sum::<usize>(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Cohort simulation complete"
        );
        Ok(years)
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.config.run.show_progress {
            return None;
        }
        let pb = ProgressBar::new(len as u64);
        match ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({msg})") {
            Ok(style) => pb.set_style(style.progress_chars("#>-")),
            Err(err) => warn!(error = %err, "Invalid progress template, using default style"),
        }
        pb.set_message("athletes");
        Some(pb)
    }

    /// Simulate January 1st to December 31st of `year` for one athlete
    pub fn simulate_full_year<R: Rng>(
        &self,
        athlete: &AthleteProfile,
        year: i32,
        rng: &mut R,
    ) -> Result<AthleteYear> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(PlanError::InvalidYear { year })?;

        let plan = TrainingPlanGenerator::generate_annual_training_plan(athlete, start, rng);
        let n_days = plan.len();

        let spike_config = &self.config.load_spikes;
        let spikes = if spike_config.enabled {
            LoadSpikeSchedule::generate(n_days, spike_config, rng)
        } else {
            LoadSpikeSchedule::empty()
        };
        for window in spikes.windows() {
            debug!(
                athlete = %athlete.id,
                kind = %window.kind,
                start = window.start,
                length = window.length,
                multiplier = window.multiplier,
                "Load spike scheduled"
            );
        }

        let seeded = self.pmc.initialize_tss_history(athlete, start, rng);
        let mut history = self.pmc.initialize_hrv_history(athlete, &seeded, rng);
        let max_daily_tss = self.pmc.max_daily_tss(athlete, rng);
        let initial = self.pmc.calculate_training_metrics(&history, athlete.hrv_baseline);

        let patterns = &self.config.patterns;
        let mut prev = PrevDayState::initial(athlete, &initial);
        let mut state = InjuryState::Healthy;
        let mut false_alarms = FalseAlarmClock::new(patterns, rng);

        let mut daily_data: Vec<DailyRecord> = Vec::with_capacity(n_days);
        let mut activity_data = Vec::new();
        let mut injuries = Vec::new();
        let mut patches = PatchLog::new();

        for day_index in 0..n_days {
            let plan_day = plan.day_at(day_index).ok_or(PlanError::MissingDay {
                date: start + Days::new(day_index as u64),
            })?;
            let date = plan_day.date;
            let injured = state.is_injured();

            // 1. modulation
            let modulation = self.modulation.modulation_for(athlete, date);

            // 2. morning metrics on the pre-workout ACWR
            let pre = self.pmc.calculate_training_metrics(&history, athlete.hrv_baseline);
            let ctx = MorningContext {
                prev_day: &prev,
                recovery_days_remaining: state.recovery_days_remaining(),
                max_daily_tss,
                history: &history,
                acwr: pre.acwr,
                modulation: &modulation,
            };
            let morning = self.metrics.simulate_morning_data(athlete, date, &ctx, rng);

            // 3. sensor noise
            let morning = self.clamp_morning(athlete, self.noise.perturb_morning(athlete, morning, rng));

            // 4. workout execution
            let execution = if injured {
                let suppressed = suppress(plan_day, self.config.injury.injured_load_fraction);
                self.executor
                    .execute(athlete, &suppressed, &prev, &morning, rng)
                    .without_unplanned()
            } else {
                self.executor.execute(athlete, plan_day, &prev, &morning, rng)
            };
            let circadian_risk = execution.circadian_risk;
            let activities: Vec<ActivityRecord> = execution
                .activities
                .into_iter()
                .map(|a| self.noise.perturb_activity(athlete, a, rng))
                .collect();

            // 5. load spikes and daily jitter
            let spike = if injured { 1.0 } else { spikes.multiplier_for(day_index) };
            let jitter = if spike_config.enabled {
                let j = spike_config.daily_jitter;
                uniform(rng, 1.0 - j, 1.0 + j)
            } else {
                1.0
            };
            let activities: Vec<ActivityRecord> = activities
                .into_iter()
                .map(|a| scale_activity(a, spike * jitter))
                .collect();
            let actual_tss: f64 = activities.iter().map(|a| a.tss).sum();

            // 6. history and post-workout metrics
            history = self.pmc.update_history(&history, date, actual_tss, morning.hrv);
            let post = self.pmc.calculate_training_metrics(&history, athlete.hrv_baseline);

            // 7. evening metrics
            let evening = self.metrics.simulate_evening_data(
                athlete,
                &morning,
                actual_tss,
                post.fatigue,
                self.config.metrics.evening_hour,
                rng,
            );

            daily_data.push(DailyRecord {
                athlete_id: athlete.id,
                date,
                day_index,
                phase: plan_day.phase,
                resting_hr: morning.resting_hr,
                hrv: morning.hrv,
                sleep_hours: morning.sleep_hours,
                deep_sleep: morning.deep_sleep,
                light_sleep: morning.light_sleep,
                rem_sleep: morning.rem_sleep,
                sleep_quality: morning.sleep_quality,
                body_battery_morning: morning.body_battery_morning,
                stress: evening.stress,
                body_battery_evening: evening.body_battery_evening,
                planned_tss: plan_day.total_tss,
                actual_tss,
                injury: false,
                fitness: post.fitness,
                fatigue: post.fatigue,
                form: post.form,
                acwr: post.acwr,
                flags: morning.flags,
            });
            activity_data.extend(activities);

            // 8. injury state machine
            let inputs = InjuryInputs {
                acwr: post.acwr,
                actual_tss,
                acute_mean_tss: history.mean_tss(self.config.training.acute_window),
                history_days: day_index + 1,
                wellness: WellnessInputs {
                    sleep_hours: morning.sleep_hours,
                    sleep_norm: athlete.lifestyle.sleep_norm,
                    sleep_quality: morning.sleep_quality,
                    stress: evening.stress,
                    body_battery_morning: morning.body_battery_morning,
                    fatigue: post.fatigue,
                    form: post.form,
                },
                modulation_factor: modulation.injury_risk_factor,
                circadian_factor: circadian_risk,
            };
            let engine = &self.injury;
            let transition = state.advance(day_index, n_days, || {
                engine.decide(&inputs, rng).map(|path| InjuryDecision {
                    path,
                    recovery_days: engine.recovery_days(path, rng),
                    lead: engine.onset_lead(rng),
                })
            });

            if transition.injured_today {
                if let Some(today) = daily_data.last_mut() {
                    today.injury = true;
                }
            }
            if let Some((path, recovery_days)) = transition.onset {
                let log = if patterns.precursors {
                    inject_realistic_injury_patterns(athlete, &daily_data, day_index, patterns.lookback_days, rng)
                } else {
                    PatchLog::new()
                };
                log.apply(&mut daily_data, day_index);

                let event = InjuryEvent {
                    onset_date: date,
                    onset_index: day_index,
                    path,
                    recovery_days,
                    precursor_days: log.touched_indices().len(),
                };
                debug!(
                    athlete = %athlete.id,
                    date = %date,
                    path = %path,
                    recovery_days,
                    acwr = post.acwr,
                    patched = log.len(),
                    "Injury onset"
                );
                injuries.push(event);
                patches.extend(log);
            }
            state = transition.state;

            // 9. carry today into tomorrow
            prev = PrevDayState {
                training_stress: actual_tss,
                resting_hr: morning.resting_hr,
                hrv: morning.hrv,
                stress: evening.stress,
                fatigue: post.fatigue,
                form: post.form,
                body_battery_evening: evening.body_battery_evening,
            };

            // 10. false alarms; a blocked window retries tomorrow
            if patterns.false_alarms && false_alarms.tick() {
                let length = uniform_int(rng, patterns.false_alarm_length.0, patterns.false_alarm_length.1) as usize;
                if state.is_healthy()
                    && !transition.injured_today
                    && window_is_clear(&daily_data, day_index, length)
                {
                    let log = create_false_alarm_patterns(athlete, &daily_data, day_index, length, rng);
                    log.apply(&mut daily_data, day_index);
                    debug!(athlete = %athlete.id, date = %date, length, patched = log.len(), "False alarm injected");
                    patches.extend(log);
                    false_alarms.reschedule(patterns, rng);
                }
            }

            trace!(
                date = %date,
                planned = plan_day.total_tss,
                actual = actual_tss,
                acwr = post.acwr,
                injured = transition.injured_today,
                "Day simulated"
            );
        }

        let year_result = AthleteYear {
            athlete: athlete.clone(),
            plan,
            daily_data,
            activity_data,
            injuries,
            patches,
            spikes,
        };
        info!(
            athlete = %athlete.id,
            days = year_result.daily_data.len(),
            injuries = year_result.injuries.len(),
            injury_days = year_result.injury_days(),
            total_tss = round_to(year_result.total_actual_tss(), 0),
            "Athlete-year simulated"
        );
        Ok(year_result)
    }

    /// Pull noisy morning readings back into the physiological bands
    fn clamp_morning(&self, athlete: &AthleteProfile, mut morning: MorningMetrics) -> MorningMetrics {
        let rhr = athlete.resting_hr;
        morning.resting_hr = clip(morning.resting_hr, rhr * (1.0 - RHR_BAND), rhr * (1.0 + RHR_BAND));

        let hrv = athlete.hrv_baseline;
        let band = morning.flags.hrv_band();
        morning.hrv = clip(morning.hrv, hrv * (1.0 - band), hrv * (1.0 + band));

        morning.sleep_hours = morning.sleep_hours.max(self.config.metrics.min_sleep_hours);
        morning.light_sleep = (morning.sleep_hours * 60.0 - morning.deep_sleep - morning.rem_sleep).max(0.0);
        morning
    }
}

/// The plan day scaled down to a fraction of its load
fn suppress(plan_day: &TrainingPlanDay, fraction: f64) -> TrainingPlanDay {
    let sport_tss = plan_day.sport_tss.scaled(fraction);
    let sport_minutes = plan_day.sport_minutes.scaled(fraction);
    TrainingPlanDay {
        total_tss: sport_tss.total(),
        total_minutes: sport_minutes.total(),
        sport_tss,
        sport_minutes,
        ..plan_day.clone()
    }
}

/// Stretch a session's load and duration at constant intensity
fn scale_activity(mut activity: ActivityRecord, factor: f64) -> ActivityRecord {
    activity.tss = round_to(activity.tss * factor, 1);
    activity.duration_minutes = round_to(activity.duration_minutes * factor, 1);
    activity
}
