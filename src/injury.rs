//! Daily injury risk and the injury/recovery state machine
//!
//! The risk model combines an ACWR zone score with a wellness
//! vulnerability score. A day's decision runs several independent paths in
//! a fixed order and the first one that fires picks the recovery range.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sampling::{chance, uniform_int};

/// Calibration constants of the injury model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjuryModelConfig {
    /// Upper edge of the undertrained zone
    pub acwr_undertrained: f64,
    /// ACWR with the lowest risk
    pub acwr_optimal_point: f64,
    /// Upper edge of the optimal zone
    pub acwr_optimal_upper: f64,
    /// Upper edge of the danger zone
    pub acwr_danger_upper: f64,
    /// ACWR at which the high-risk score stops rising
    pub acwr_saturation: f64,
    /// ACWR at which the undertrained score stops rising
    pub acwr_undertrained_floor: f64,

    /// Risk at the optimal point
    pub optimal_risk_min: f64,
    /// Risk at both edges of the optimal zone
    pub optimal_risk_edge: f64,
    /// Risk at the undertrained edge and at the floor
    pub undertrained_risk: (f64, f64),
    /// Risk across the danger zone
    pub danger_risk: (f64, f64),
    /// Risk from the danger edge to saturation
    pub high_risk: (f64, f64),

    /// Converts the dimensionless risk score into a daily probability
    pub base_daily_scale: f64,
    /// Hard cap on the modelled daily probability
    pub max_daily_probability: f64,

    pub high_acwr_chance: f64,
    pub danger_zone_chance: f64,
    pub undertrained_chance: f64,
    pub wellness_chance: f64,
    pub random_chance: f64,

    /// Vulnerability above which the wellness path is considered
    pub wellness_threshold: f64,
    /// Days of history needed before the wellness path is considered
    pub wellness_min_history: usize,

    /// Largest delay between the decision and the injury day
    pub onset_lead_max: u32,
    /// Fraction of planned load trained while injured
    pub injured_load_fraction: f64,

    pub recovery_days: RecoveryDayRanges,
}

impl Default for InjuryModelConfig {
    fn default() -> Self {
        Self {
            acwr_undertrained: 0.8,
            acwr_optimal_point: 1.0,
            acwr_optimal_upper: 1.3,
            acwr_danger_upper: 1.5,
            acwr_saturation: 2.0,
            acwr_undertrained_floor: 0.4,
            optimal_risk_min: 0.2,
            optimal_risk_edge: 0.35,
            undertrained_risk: (0.4, 0.9),
            danger_risk: (0.5, 0.8),
            high_risk: (0.8, 1.0),
            base_daily_scale: 0.0015,
            max_daily_probability: 0.05,
            high_acwr_chance: 0.03,
            danger_zone_chance: 0.01,
            undertrained_chance: 0.004,
            wellness_chance: 0.03,
            random_chance: 0.0004,
            wellness_threshold: 0.6,
            wellness_min_history: 30,
            onset_lead_max: 2,
            injured_load_fraction: 0.2,
            recovery_days: RecoveryDayRanges::default(),
        }
    }
}

/// Inclusive recovery-day ranges per injury path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryDayRanges {
    pub high_acwr: (u32, u32),
    pub danger_zone: (u32, u32),
    pub undertrained: (u32, u32),
    pub wellness: (u32, u32),
    pub model: (u32, u32),
    pub random: (u32, u32),
}

impl Default for RecoveryDayRanges {
    fn default() -> Self {
        Self {
            high_acwr: (3, 7),
            danger_zone: (3, 7),
            undertrained: (2, 5),
            wellness: (3, 6),
            model: (3, 10),
            random: (3, 7),
        }
    }
}

impl RecoveryDayRanges {
    pub fn for_path(&self, path: InjuryPath) -> (u32, u32) {
        match path {
            InjuryPath::HighAcwr => self.high_acwr,
            InjuryPath::DangerZone => self.danger_zone,
            InjuryPath::Undertrained => self.undertrained,
            InjuryPath::Wellness => self.wellness,
            InjuryPath::Model => self.model,
            InjuryPath::Random => self.random,
        }
    }

    /// Ranges keyed by their config name, for validation messages
    pub fn named(&self) -> [(&'static str, (u32, u32)); 6] {
        [
            ("high_acwr", self.high_acwr),
            ("danger_zone", self.danger_zone),
            ("undertrained", self.undertrained),
            ("wellness", self.wellness),
            ("model", self.model),
            ("random", self.random),
        ]
    }
}

/// Component weights of the wellness vulnerability score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WellnessWeights {
    pub sleep_deficit: f64,
    pub poor_sleep_quality: f64,
    pub high_stress: f64,
    pub low_recovery: f64,
    pub fatigue: f64,
    pub negative_form: f64,
}

impl Default for WellnessWeights {
    fn default() -> Self {
        Self {
            sleep_deficit: 0.25,
            poor_sleep_quality: 0.15,
            high_stress: 0.20,
            low_recovery: 0.15,
            fatigue: 0.15,
            negative_form: 0.10,
        }
    }
}

impl WellnessWeights {
    pub fn total(&self) -> f64 {
        self.sleep_deficit
            + self.poor_sleep_quality
            + self.high_stress
            + self.low_recovery
            + self.fatigue
            + self.negative_form
    }
}

/// ACWR zone an athlete's load ratio falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcwrZone {
    Undertrained,
    Optimal,
    Danger,
    HighRisk,
}

/// Which decision path produced an injury
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InjuryPath {
    HighAcwr,
    DangerZone,
    Undertrained,
    Wellness,
    Model,
    Random,
}

impl fmt::Display for InjuryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InjuryPath::HighAcwr => "high_acwr",
            InjuryPath::DangerZone => "danger_zone",
            InjuryPath::Undertrained => "undertrained",
            InjuryPath::Wellness => "wellness",
            InjuryPath::Model => "model",
            InjuryPath::Random => "random",
        };
        f.write_str(name)
    }
}

/// Same-day signals feeding the wellness vulnerability score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WellnessInputs {
    pub sleep_hours: f64,
    pub sleep_norm: f64,
    pub sleep_quality: f64,
    pub stress: f64,
    pub body_battery_morning: f64,
    pub fatigue: f64,
    pub form: f64,
}

/// Everything one injury decision looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InjuryInputs {
    pub acwr: f64,
    /// Load trained today
    pub actual_tss: f64,
    /// Mean load of the trailing acute window, today included
    pub acute_mean_tss: f64,
    /// Days of history available to the model
    pub history_days: usize,
    pub wellness: WellnessInputs,
    /// Multiplier from the physiological modulation of the day
    pub modulation_factor: f64,
    /// Multiplier from training outside the preferred time of day
    pub circadian_factor: f64,
}

/// Scores and samples daily injury onsets
#[derive(Debug, Clone, Default)]
pub struct InjuryRiskEngine {
    config: InjuryModelConfig,
    weights: WellnessWeights,
}

impl InjuryRiskEngine {
    pub fn new(config: InjuryModelConfig, weights: WellnessWeights) -> Self {
        Self { config, weights }
    }

    pub fn config(&self) -> &InjuryModelConfig {
        &self.config
    }

    pub fn zone(&self, acwr: f64) -> AcwrZone {
        let c = &self.config;
        if acwr < c.acwr_undertrained {
            AcwrZone::Undertrained
        } else if acwr <= c.acwr_optimal_upper {
            AcwrZone::Optimal
        } else if acwr <= c.acwr_danger_upper {
            AcwrZone::Danger
        } else {
            AcwrZone::HighRisk
        }
    }

    /// Dimensionless ACWR risk score
    ///
    /// Lowest at the optimal point and non-decreasing away from it in both
    /// directions, stepping up at each zone border.
    pub fn acwr_risk(&self, acwr: f64) -> f64 {
        let c = &self.config;
        match self.zone(acwr) {
            AcwrZone::Undertrained => {
                let (edge, floor) = c.undertrained_risk;
                let t = (c.acwr_undertrained - acwr)
                    / (c.acwr_undertrained - c.acwr_undertrained_floor);
                lerp(edge, floor, t.clamp(0.0, 1.0))
            }
            AcwrZone::Optimal => {
                let span = if acwr < c.acwr_optimal_point {
                    c.acwr_optimal_point - c.acwr_undertrained
                } else {
                    c.acwr_optimal_upper - c.acwr_optimal_point
                };
                let t = ((acwr - c.acwr_optimal_point).abs() / span).clamp(0.0, 1.0);
                lerp(c.optimal_risk_min, c.optimal_risk_edge, t)
            }
            AcwrZone::Danger => {
                let (low, high) = c.danger_risk;
                let t = (acwr - c.acwr_optimal_upper) / (c.acwr_danger_upper - c.acwr_optimal_upper);
                lerp(low, high, t.clamp(0.0, 1.0))
            }
            AcwrZone::HighRisk => {
                let (low, high) = c.high_risk;
                let t = (acwr - c.acwr_danger_upper) / (c.acwr_saturation - c.acwr_danger_upper);
                lerp(low, high, t.clamp(0.0, 1.0))
            }
        }
    }

    /// Weighted [0, 1] vulnerability from sleep, stress, battery and load
    pub fn wellness_vulnerability(&self, inputs: &WellnessInputs) -> f64 {
        let w = &self.weights;

        let sleep_deficit = ((inputs.sleep_norm - inputs.sleep_hours) / 2.0).clamp(0.0, 1.0);
        let poor_quality = ((0.8 - inputs.sleep_quality) / 0.4).clamp(0.0, 1.0);
        let high_stress = ((inputs.stress - 50.0) / 50.0).clamp(0.0, 1.0);
        let low_recovery = ((80.0 - inputs.body_battery_morning) / 20.0).clamp(0.0, 1.0);
        let fatigue = ((inputs.fatigue - 50.0) / 100.0).clamp(0.0, 1.0);
        let negative_form = (-inputs.form / 30.0).clamp(0.0, 1.0);

        (w.sleep_deficit * sleep_deficit
            + w.poor_sleep_quality * poor_quality
            + w.high_stress * high_stress
            + w.low_recovery * low_recovery
            + w.fatigue * fatigue
            + w.negative_form * negative_form)
            .clamp(0.0, 1.0)
    }

    /// Modelled daily probability, capped at `max_daily_probability`
    pub fn injury_probability(
        &self,
        acwr: f64,
        vulnerability: f64,
        modulation_factor: f64,
        circadian_factor: f64,
    ) -> f64 {
        let p = self.acwr_risk(acwr)
            * (1.0 + vulnerability)
            * self.config.base_daily_scale
            * modulation_factor
            * circadian_factor;
        p.clamp(0.0, self.config.max_daily_probability)
    }

    /// One injury decision for a healthy day
    ///
    /// Paths are tried in order with a separate draw each; the first that
    /// fires wins. Days without any load never produce an injury.
    pub fn decide<R: Rng + ?Sized>(&self, inputs: &InjuryInputs, rng: &mut R) -> Option<InjuryPath> {
        if inputs.actual_tss <= 0.0 {
            return None;
        }

        let c = &self.config;
        let vulnerability = self.wellness_vulnerability(&inputs.wellness);

        let fired = match self.zone(inputs.acwr) {
            AcwrZone::HighRisk if chance(rng, c.high_acwr_chance) => Some(InjuryPath::HighAcwr),
            AcwrZone::Danger if chance(rng, c.danger_zone_chance) => Some(InjuryPath::DangerZone),
            AcwrZone::Undertrained
                if inputs.actual_tss > inputs.acute_mean_tss
                    && chance(rng, c.undertrained_chance) =>
            {
                Some(InjuryPath::Undertrained)
            }
            _ => None,
        };
        if fired.is_some() {
            return fired;
        }

        if inputs.history_days >= c.wellness_min_history
            && vulnerability > c.wellness_threshold
            && chance(rng, c.wellness_chance * vulnerability)
        {
            return Some(InjuryPath::Wellness);
        }

        let p = self.injury_probability(
            inputs.acwr,
            vulnerability,
            inputs.modulation_factor,
            inputs.circadian_factor,
        );
        if chance(rng, p) {
            return Some(InjuryPath::Model);
        }

        if chance(rng, c.random_chance) {
            return Some(InjuryPath::Random);
        }

        None
    }

    /// Draw the number of injured days for a path
    pub fn recovery_days<R: Rng + ?Sized>(&self, path: InjuryPath, rng: &mut R) -> u32 {
        let (low, high) = self.config.recovery_days.for_path(path);
        uniform_int(rng, low, high).max(1)
    }

    /// Draw the delay between a decision and the injury day
    pub fn onset_lead<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        uniform_int(rng, 0, self.config.onset_lead_max)
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Injury/recovery state of one athlete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InjuryState {
    #[default]
    Healthy,
    /// An injury has been decided and starts on `onset_index`
    Pending {
        onset_index: usize,
        path: InjuryPath,
        recovery_days: u32,
    },
    /// Injured, with `remaining` flagged days still to come after today
    Injured { remaining: u32, path: InjuryPath },
    /// First day after an injury run; healthy, but no onset can fall on it
    Recovered,
}

/// Result of stepping the state machine through one day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: InjuryState,
    /// The day is flagged as injured
    pub injured_today: bool,
    /// Set on the first day of an injury
    pub onset: Option<(InjuryPath, u32)>,
}

/// A decided injury not yet turned into a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjuryDecision {
    pub path: InjuryPath,
    pub recovery_days: u32,
    /// Days between the decision and the injury day
    pub lead: u32,
}

impl InjuryState {
    pub fn is_healthy(&self) -> bool {
        matches!(self, InjuryState::Healthy | InjuryState::Recovered)
    }

    pub fn is_injured(&self) -> bool {
        matches!(self, InjuryState::Injured { .. })
    }

    /// Flagged days left after the current one, 0 unless injured
    pub fn recovery_days_remaining(&self) -> u32 {
        match self {
            InjuryState::Injured { remaining, .. } => *remaining,
            _ => 0,
        }
    }

    /// Step through day `day_index` of an `n_days` year
    ///
    /// `decide` is only consulted while healthy. An injury whose onset
    /// would fall past the last day is dropped. The day after a run is
    /// never flagged, so a decision made on it starts tomorrow at the
    /// earliest.
    pub fn advance<F>(self, day_index: usize, n_days: usize, decide: F) -> Transition
    where
        F: FnOnce() -> Option<InjuryDecision>,
    {
        match self {
            InjuryState::Healthy | InjuryState::Recovered => match decide() {
                Some(decision) => {
                    let min_lead = if self == InjuryState::Recovered { 1 } else { 0 };
                    let onset_index = day_index + decision.lead.max(min_lead) as usize;
                    if onset_index >= n_days {
                        Transition::quiet(InjuryState::Healthy)
                    } else if onset_index == day_index {
                        Transition::onset(decision.path, decision.recovery_days)
                    } else {
                        Transition::quiet(InjuryState::Pending {
                            onset_index,
                            path: decision.path,
                            recovery_days: decision.recovery_days,
                        })
                    }
                }
                None => Transition::quiet(InjuryState::Healthy),
            },
            InjuryState::Pending {
                onset_index,
                path,
                recovery_days,
            } => {
                if day_index >= onset_index {
                    Transition::onset(path, recovery_days)
                } else {
                    Transition::quiet(self)
                }
            }
            InjuryState::Injured { remaining, path } => {
                let state = if remaining <= 1 {
                    InjuryState::Recovered
                } else {
                    InjuryState::Injured {
                        remaining: remaining - 1,
                        path,
                    }
                };
                Transition {
                    state,
                    injured_today: true,
                    onset: None,
                }
            }
        }
    }
}

impl Transition {
    fn quiet(state: InjuryState) -> Self {
        Transition {
            state,
            injured_today: false,
            onset: None,
        }
    }

    fn onset(path: InjuryPath, recovery_days: u32) -> Self {
        let state = if recovery_days > 1 {
            InjuryState::Injured {
                remaining: recovery_days - 1,
                path,
            }
        } else {
            InjuryState::Recovered
        };
        Transition {
            state,
            injured_today: true,
            onset: Some((path, recovery_days)),
        }
    }
}

/// Record of one injury onset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjuryEvent {
    pub onset_date: chrono::NaiveDate,
    pub onset_index: usize,
    pub path: InjuryPath,
    pub recovery_days: u32,
    /// Distinct past days altered by the precursor pattern
    pub precursor_days: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::run_rng;

    fn engine() -> InjuryRiskEngine {
        InjuryRiskEngine::default()
    }

    fn calm_wellness() -> WellnessInputs {
        WellnessInputs {
            sleep_hours: 8.0,
            sleep_norm: 7.5,
            sleep_quality: 0.9,
            stress: 25.0,
            body_battery_morning: 95.0,
            fatigue: 40.0,
            form: 5.0,
        }
    }

    fn inputs(acwr: f64, actual_tss: f64) -> InjuryInputs {
        InjuryInputs {
            acwr,
            actual_tss,
            acute_mean_tss: 60.0,
            history_days: 60,
            wellness: calm_wellness(),
            modulation_factor: 1.0,
            circadian_factor: 1.0,
        }
    }

    #[test]
    fn test_acwr_risk_anchor_points() {
        let e = engine();
        assert!((e.acwr_risk(1.0) - 0.2).abs() < 1e-9);
        assert!((e.acwr_risk(0.8) - 0.35).abs() < 1e-9);
        assert!((e.acwr_risk(1.3) - 0.35).abs() < 1e-9);
        assert!((e.acwr_risk(1.5) - 0.8).abs() < 1e-9);
        assert!((e.acwr_risk(0.4) - 0.9).abs() < 1e-9);
        assert!((e.acwr_risk(0.1) - 0.9).abs() < 1e-9);
        assert!((e.acwr_risk(2.0) - 1.0).abs() < 1e-9);
        assert!((e.acwr_risk(3.5) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_acwr_risk_minimum_at_optimal_point() {
        let e = engine();
        let min = e.acwr_risk(1.0);
        for i in 0..300 {
            let acwr = i as f64 * 0.01;
            assert!(e.acwr_risk(acwr) >= min);
        }
    }

    #[test]
    fn test_zones() {
        let e = engine();
        assert_eq!(e.zone(0.7), AcwrZone::Undertrained);
        assert_eq!(e.zone(0.8), AcwrZone::Optimal);
        assert_eq!(e.zone(1.3), AcwrZone::Optimal);
        assert_eq!(e.zone(1.4), AcwrZone::Danger);
        assert_eq!(e.zone(1.6), AcwrZone::HighRisk);
    }

    #[test]
    fn test_wellness_vulnerability_bounds() {
        let e = engine();
        assert_eq!(e.wellness_vulnerability(&calm_wellness()), 0.0);

        let wrecked = WellnessInputs {
            sleep_hours: 4.0,
            sleep_norm: 8.0,
            sleep_quality: 0.2,
            stress: 100.0,
            body_battery_morning: 40.0,
            fatigue: 160.0,
            form: -60.0,
        };
        assert!((e.wellness_vulnerability(&wrecked) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_probability_is_capped() {
        let e = engine();
        let p = e.injury_probability(2.5, 1.0, 10.0, 10.0);
        assert_eq!(p, e.config().max_daily_probability);
        assert!(e.injury_probability(1.0, 0.0, 1.0, 1.0) < 0.01);
    }

    #[test]
    fn test_zero_load_never_injures() {
        let e = engine();
        let mut rng = run_rng(11, 0);
        for _ in 0..2000 {
            assert_eq!(e.decide(&inputs(2.5, 0.0), &mut rng), None);
        }
    }

    #[test]
    fn test_high_acwr_injures_more_often() {
        let e = engine();
        let mut rng = run_rng(12, 0);
        let count = |acwr: f64, rng: &mut crate::sampling::SimRng| {
            (0..5000)
                .filter(|_| e.decide(&inputs(acwr, 80.0), rng).is_some())
                .count()
        };
        let optimal = count(1.0, &mut rng);
        let high = count(1.8, &mut rng);
        assert!(high > optimal * 3, "high={} optimal={}", high, optimal);
    }

    #[test]
    fn test_recovery_days_within_path_range() {
        let e = engine();
        let mut rng = run_rng(13, 0);
        for _ in 0..200 {
            let days = e.recovery_days(InjuryPath::Undertrained, &mut rng);
            assert!((2..=5).contains(&days));
            let days = e.recovery_days(InjuryPath::Model, &mut rng);
            assert!((3..=10).contains(&days));
            assert!(e.onset_lead(&mut rng) <= 2);
        }
    }

    #[test]
    fn test_state_machine_run_length() {
        let decision = InjuryDecision {
            path: InjuryPath::Random,
            recovery_days: 4,
            lead: 2,
        };

        let mut state = InjuryState::Healthy;
        let mut flagged = Vec::new();
        let mut onsets = 0;
        for day in 0..20 {
            let t = state.advance(day, 365, || if day == 3 { Some(decision) } else { None });
            if t.injured_today {
                flagged.push(day);
            }
            if t.onset.is_some() {
                onsets += 1;
            }
            state = t.state;
        }

        assert_eq!(onsets, 1);
        assert_eq!(flagged, vec![5, 6, 7, 8]);
        assert!(state.is_healthy());
    }

    #[test]
    fn test_pending_onset_past_year_end_is_dropped() {
        let decision = InjuryDecision {
            path: InjuryPath::Model,
            recovery_days: 5,
            lead: 2,
        };
        let t = InjuryState::Healthy.advance(364, 365, || Some(decision));
        assert_eq!(t.state, InjuryState::Healthy);
        assert!(!t.injured_today);
    }

    #[test]
    fn test_injured_days_skip_decisions() {
        let state = InjuryState::Injured {
            remaining: 2,
            path: InjuryPath::Wellness,
        };
        let t = state.advance(10, 365, || panic!("no decision while injured"));
        assert!(t.injured_today);
        assert_eq!(t.state.recovery_days_remaining(), 1);
    }

    #[test]
    fn test_day_after_recovery_is_never_an_onset() {
        let decision = InjuryDecision {
            path: InjuryPath::Random,
            recovery_days: 3,
            lead: 0,
        };

        let last_day = InjuryState::Injured {
            remaining: 1,
            path: InjuryPath::Model,
        }
        .advance(20, 365, || None);
        assert!(last_day.injured_today);
        assert_eq!(last_day.state, InjuryState::Recovered);
        assert!(last_day.state.is_healthy());

        let next = last_day.state.advance(21, 365, || Some(decision));
        assert!(!next.injured_today);
        assert_eq!(next.onset, None);
        assert_eq!(
            next.state,
            InjuryState::Pending {
                onset_index: 22,
                path: InjuryPath::Random,
                recovery_days: 3,
            }
        );

        let onset = next.state.advance(22, 365, || None);
        assert!(onset.injured_today);
        assert_eq!(onset.onset, Some((InjuryPath::Random, 3)));
    }

    #[test]
    fn test_single_day_injury() {
        let decision = InjuryDecision {
            path: InjuryPath::Random,
            recovery_days: 1,
            lead: 0,
        };
        let t = InjuryState::Healthy.advance(0, 365, || Some(decision));
        assert!(t.injured_today);
        assert_eq!(t.onset, Some((InjuryPath::Random, 1)));
        assert!(t.state.is_healthy());
    }
}
