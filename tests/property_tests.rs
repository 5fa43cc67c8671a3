use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use trainsim::injury::{InjuryRiskEngine, WellnessInputs};
use trainsim::pmc::{HistoryEntry, RollingHistory};
use trainsim::sampling::run_rng;
use trainsim::training_plan::WeekKind;
use trainsim::{AthleteProfileGenerator, FitnessFatigueFormModel, TrainingPlanGenerator};

/// Property-based checks of the risk model, the load model and the plan

fn wellness() -> impl Strategy<Value = WellnessInputs> {
    (
        3.0f64..11.0,
        6.0f64..9.0,
        0.0f64..1.0,
        0.0f64..100.0,
        0.0f64..100.0,
        0.0f64..200.0,
        -60.0f64..40.0,
    )
        .prop_map(
            |(sleep_hours, sleep_norm, sleep_quality, stress, body_battery_morning, fatigue, form)| {
                WellnessInputs {
                    sleep_hours,
                    sleep_norm,
                    sleep_quality,
                    stress,
                    body_battery_morning,
                    fatigue,
                    form,
                }
            },
        )
}

proptest! {
    #[test]
    fn test_acwr_risk_rises_away_from_optimum(a in 1.0f64..3.0, b in 1.0f64..3.0, c in 0.0f64..1.0, d in 0.0f64..1.0) {
        let engine = InjuryRiskEngine::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(engine.acwr_risk(lo) <= engine.acwr_risk(hi) + 1e-12);

        let (lo, hi) = if c <= d { (c, d) } else { (d, c) };
        prop_assert!(engine.acwr_risk(hi) <= engine.acwr_risk(lo) + 1e-12);

        prop_assert!(engine.acwr_risk(1.0) <= engine.acwr_risk(a) + 1e-12);
        prop_assert!(engine.acwr_risk(1.0) <= engine.acwr_risk(c) + 1e-12);
    }

    #[test]
    fn test_probability_is_capped(
        acwr in 0.0f64..4.0,
        inputs in wellness(),
        modulation in 0.5f64..2.0,
        circadian in 1.0f64..1.5,
    ) {
        let engine = InjuryRiskEngine::default();
        let vulnerability = engine.wellness_vulnerability(&inputs);
        prop_assert!((0.0..=1.0).contains(&vulnerability));

        let p = engine.injury_probability(acwr, vulnerability, modulation, circadian);
        prop_assert!(p >= 0.0);
        prop_assert!(p <= engine.config().max_daily_probability);
    }

    #[test]
    fn test_steady_load_is_neutral(tss in 10.0f64..200.0, days in 7usize..60) {
        let model = FitnessFatigueFormModel::new();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let entries = (0..days)
            .map(|i| HistoryEntry { date: start + Days::new(i as u64), tss, hrv: 60.0 })
            .collect();
        let metrics = model.calculate_training_metrics(&RollingHistory::from_entries(entries), 60.0);
        prop_assert!((metrics.acwr - 1.0).abs() < 1e-9);
        prop_assert!(metrics.fitness >= 0.0 && metrics.fatigue >= 0.0);
    }

    #[test]
    fn test_short_history_acwr_is_one(tss in proptest::collection::vec(0.0f64..300.0, 0..7)) {
        let model = FitnessFatigueFormModel::new();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let entries = tss
            .iter()
            .enumerate()
            .map(|(i, t)| HistoryEntry { date: start + Days::new(i as u64), tss: *t, hrv: 55.0 })
            .collect();
        let metrics = model.calculate_training_metrics(&RollingHistory::from_entries(entries), 55.0);
        prop_assert_eq!(metrics.acwr, 1.0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_normal_weeks_grow_at_most_ten_percent(seed in any::<u64>(), year in 2000i32..2040) {
        let mut rng = run_rng(seed, 0);
        let athlete = AthleteProfileGenerator::new().generate_athlete_profile(&mut rng);
        let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
        let plan = TrainingPlanGenerator::generate_annual_training_plan(&athlete, start, &mut rng);

        prop_assert_eq!(plan.days.first().map(|d| d.date), Some(start));
        prop_assert_eq!(plan.days.last().map(|d| d.date), NaiveDate::from_ymd_opt(year, 12, 31));

        let mut last_normal: Option<f64> = None;
        for week in &plan.weeks {
            if week.kind != WeekKind::Normal {
                continue;
            }
            if let Some(reference) = last_normal {
                prop_assert!(
                    week.total_tss <= 1.1 * reference + 1e-6,
                    "week {} grew from {} to {}",
                    week.week_index,
                    reference,
                    week.total_tss
                );
            }
            last_normal = Some(week.total_tss);
        }

        for day in &plan.days {
            prop_assert!(day.total_tss >= 0.0);
            if day.is_rest_day {
                prop_assert_eq!(day.total_tss, 0.0);
            }
        }
    }
}
