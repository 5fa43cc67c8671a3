//! Synthetic athlete profiles for competitive age-group triathletes

use rand::Rng;

use crate::models::{
    AthleteProfile, Chronotype, Gender, Lifestyle, LifestyleArchetype, MenstrualConfig,
    RecoveryProfile, RecoverySignature, SensorProfile, Specialization, ZoneRange,
};
use crate::sampling::{chance, clip, normal, round_to, truncated_normal, uniform, uniform_int, weighted_choice};
use crate::zones::ZoneCalculator;

/// Years of structured training, skewed towards the early years
const EXPERIENCE_WEIGHTS: [(u32, f64); 19] = [
    (2, 0.10),
    (3, 0.10),
    (4, 0.10),
    (5, 0.10),
    (6, 0.10),
    (7, 0.08),
    (8, 0.08),
    (9, 0.06),
    (10, 0.06),
    (11, 0.04),
    (12, 0.04),
    (13, 0.03),
    (14, 0.03),
    (15, 0.02),
    (16, 0.02),
    (17, 0.01),
    (18, 0.01),
    (19, 0.01),
    (20, 0.01),
];

const ARCHETYPE_WEIGHTS: [(LifestyleArchetype, f64); 6] = [
    (LifestyleArchetype::HighlyDisciplined, 0.30),
    (LifestyleArchetype::BalancedCompetitor, 0.25),
    (LifestyleArchetype::WeekendSocializer, 0.12),
    (LifestyleArchetype::SleepDeprivedWorkaholic, 0.12),
    (LifestyleArchetype::UnderRecovered, 0.11),
    (LifestyleArchetype::HealthConscious, 0.10),
];

/// Uniform ranges for one archetype
struct LifestyleRanges {
    sleep: (f64, f64),
    sleep_quality: (f64, f64),
    nutrition: (f64, f64),
    drinking: (f64, f64),
    smoking: (f64, f64),
    stress: (f64, f64),
    exercise: (f64, f64),
}

fn lifestyle_ranges(archetype: LifestyleArchetype) -> LifestyleRanges {
    match archetype {
        LifestyleArchetype::HighlyDisciplined => LifestyleRanges {
            sleep: (7.5, 9.0),
            sleep_quality: (0.9, 1.0),
            nutrition: (0.9, 1.0),
            drinking: (0.0, 0.1),
            smoking: (0.0, 0.0),
            stress: (0.0, 0.2),
            exercise: (0.9, 1.0),
        },
        LifestyleArchetype::BalancedCompetitor => LifestyleRanges {
            sleep: (6.5, 8.0),
            sleep_quality: (0.7, 0.9),
            nutrition: (0.7, 0.9),
            drinking: (0.1, 0.2),
            smoking: (0.0, 0.0),
            stress: (0.2, 0.4),
            exercise: (0.7, 0.9),
        },
        LifestyleArchetype::WeekendSocializer => LifestyleRanges {
            sleep: (6.0, 7.5),
            sleep_quality: (0.6, 0.8),
            nutrition: (0.6, 0.8),
            drinking: (0.3, 0.6),
            smoking: (0.0, 0.1),
            stress: (0.3, 0.6),
            exercise: (0.6, 0.8),
        },
        LifestyleArchetype::SleepDeprivedWorkaholic => LifestyleRanges {
            sleep: (4.5, 6.5),
            sleep_quality: (0.4, 0.7),
            nutrition: (0.5, 0.8),
            drinking: (0.2, 0.4),
            smoking: (0.0, 0.0),
            stress: (0.6, 0.9),
            exercise: (0.6, 0.8),
        },
        LifestyleArchetype::UnderRecovered => LifestyleRanges {
            sleep: (5.0, 7.0),
            sleep_quality: (0.3, 0.6),
            nutrition: (0.4, 0.7),
            drinking: (0.2, 0.4),
            smoking: (0.0, 0.0),
            stress: (0.4, 0.8),
            exercise: (0.7, 0.9),
        },
        LifestyleArchetype::HealthConscious => LifestyleRanges {
            sleep: (7.0, 8.5),
            sleep_quality: (0.8, 1.0),
            nutrition: (0.8, 1.0),
            drinking: (0.0, 0.2),
            smoking: (0.0, 0.0),
            stress: (0.1, 0.3),
            exercise: (0.8, 1.0),
        },
    }
}

/// Draws athlete profiles from population-level distributions
#[derive(Debug, Clone)]
pub struct AthleteProfileGenerator {
    /// Share of female athletes in the cohort
    female_share: f64,
    /// Share of athletes wearing a chest strap and GPS watch
    garmin_share: f64,
}

impl Default for AthleteProfileGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AthleteProfileGenerator {
    pub fn new() -> Self {
        Self {
            female_share: 0.4,
            garmin_share: 0.6,
        }
    }

    pub fn with_female_share(mut self, share: f64) -> Self {
        self.female_share = share.clamp(0.0, 1.0);
        self
    }

    pub fn generate_athlete_cohort<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<AthleteProfile> {
        (0..n).map(|_| self.generate_athlete_profile(rng)).collect()
    }

    pub fn generate_athlete_profile<R: Rng + ?Sized>(&self, rng: &mut R) -> AthleteProfile {
        let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();

        let gender = if chance(rng, self.female_share) {
            Gender::Female
        } else {
            Gender::Male
        };
        let age = clip(normal(rng, 33.0, 6.0).trunc(), 18.0, 50.0) as u32;

        let height_cm = match gender {
            Gender::Male => normal(rng, 178.0, 7.0),
            Gender::Female => normal(rng, 165.0, 6.0),
        }
        .trunc();
        let base_weight = match gender {
            Gender::Male => normal(rng, 72.0 + (height_cm - 165.0) * 0.4, 6.0),
            Gender::Female => normal(rng, 58.0 + (height_cm - 165.0) * 0.3, 5.0),
        };

        let genetic_factor = truncated_normal(rng, 1.0, 0.1, 0.8, 1.2);
        let lifestyle = generate_lifestyle(rng);

        let weight_kg = base_weight - 2.0 * lifestyle.nutrition + 1.5 * lifestyle.drinking
            - 1.5 * lifestyle.exercise;

        let specialization = *weighted_choice(
            rng,
            &[
                (Specialization::SwimStrong, 1.0),
                (Specialization::BikeStrong, 1.0),
                (Specialization::RunStrong, 1.0),
                (Specialization::Balanced, 1.0),
            ],
        )
        .unwrap_or(&Specialization::Balanced);

        let training_experience = training_experience(rng, age);
        let vo2max = clip(
            vo2max(rng, age, training_experience, gender, &lifestyle, specialization, genetic_factor),
            50.0,
            75.0,
        );
        let weekly_training_hours = training_volume(rng, training_experience, &lifestyle);
        let ftp = functional_threshold_power(
            rng,
            gender,
            weight_kg,
            training_experience,
            genetic_factor,
            specialization,
            &lifestyle,
        );
        let css = critical_swim_speed(vo2max, weekly_training_hours, training_experience, specialization);
        let resting_hr = resting_heart_rate(rng, vo2max, &lifestyle);

        let mut max_hr = 208.0 - 0.7 * age as f64 + normal(rng, 0.0, 5.0);
        if gender == Gender::Female {
            max_hr *= 1.03;
        }

        let lthr = lactate_threshold_hr(rng, age, gender, max_hr, resting_hr, training_experience, vo2max);
        let threshold_pace = threshold_pace(
            rng,
            &PaceInputs {
                gender,
                age,
                weight_kg,
                vo2max,
                training_experience,
                weekly_training_hours,
                lifestyle_score: lifestyle.score(),
                genetic_factor,
                lthr,
                max_hr,
                running_specificity: if specialization == Specialization::RunStrong {
                    1.2
                } else {
                    1.0
                },
            },
        );

        let recovery_rate = recovery_rate(genetic_factor, vo2max, age, &lifestyle);
        let hrv_baseline = hrv_baseline(age, vo2max, resting_hr, training_experience, &lifestyle);

        let sensor_profile = if chance(rng, self.garmin_share) {
            SensorProfile::Garmin
        } else {
            SensorProfile::Optical
        };
        let chronotype = *weighted_choice(
            rng,
            &[
                (Chronotype::Lark, 1.0),
                (Chronotype::Owl, 1.0),
                (Chronotype::Intermediate, 1.0),
            ],
        )
        .unwrap_or(&Chronotype::Intermediate);

        let menstrual = match gender {
            Gender::Female => {
                let cycle_length = uniform_int(rng, 26, 32);
                Some(MenstrualConfig {
                    cycle_length,
                    luteal_length: uniform_int(rng, 12, 16),
                    day_offset: uniform_int(rng, 0, cycle_length - 1),
                })
            }
            Gender::Male => None,
        };

        let recovery_signature = recovery_signature(rng);

        AthleteProfile {
            id,
            gender,
            age,
            height_cm,
            weight_kg: round_to(weight_kg, 1),
            genetic_factor: round_to(genetic_factor, 2),
            vo2max: round_to(vo2max, 1),
            ftp: round_to(ftp, 1),
            css,
            lthr,
            max_hr: round_to(max_hr, 1),
            resting_hr,
            threshold_pace,
            hr_zones: ZoneCalculator::hr_zones_from_lthr(lthr, resting_hr, max_hr),
            power_zones: ZoneCalculator::power_zones_from_ftp(ftp),
            hrv_baseline,
            hrv_range: ZoneRange::new(round_to(hrv_baseline * 0.85, 1), round_to(hrv_baseline * 1.15, 1)),
            training_experience,
            weekly_training_hours: round_to(weekly_training_hours, 1),
            recovery_rate: round_to(recovery_rate, 2),
            lifestyle,
            specialization,
            sensor_profile,
            chronotype,
            menstrual,
            recovery_signature,
        }
    }
}

fn generate_lifestyle<R: Rng + ?Sized>(rng: &mut R) -> Lifestyle {
    let archetype = *weighted_choice(rng, &ARCHETYPE_WEIGHTS).unwrap_or(&LifestyleArchetype::BalancedCompetitor);
    let r = lifestyle_ranges(archetype);
    let mut draw = |(low, high): (f64, f64)| uniform(rng, low, high);

    Lifestyle {
        archetype,
        sleep_norm: clip(draw(r.sleep), 5.0, 9.0),
        sleep_quality: draw(r.sleep_quality),
        nutrition: draw(r.nutrition),
        drinking: draw(r.drinking),
        smoking: draw(r.smoking),
        stress: draw(r.stress),
        exercise: draw(r.exercise),
    }
}

fn training_experience<R: Rng + ?Sized>(rng: &mut R, age: u32) -> u32 {
    let drawn = weighted_choice(rng, &EXPERIENCE_WEIGHTS).copied().unwrap_or(2);
    let ceiling = age.saturating_sub(15).min(20);
    drawn.min(ceiling).max(2)
}

fn vo2max<R: Rng + ?Sized>(
    rng: &mut R,
    age: u32,
    experience: u32,
    gender: Gender,
    lifestyle: &Lifestyle,
    specialization: Specialization,
    genetic_factor: f64,
) -> f64 {
    let base = match gender {
        Gender::Female => normal(rng, 45.0, 4.0),
        Gender::Male => normal(rng, 49.0, 4.0),
    };

    let genetic_boost = if genetic_factor < 1.0 {
        uniform(rng, -2.0, 0.0)
    } else if genetic_factor > 1.0 {
        uniform(rng, 0.0, 5.0)
    } else {
        0.0
    };

    let training_boost = ((experience + 3) as f64 * uniform(rng, 1.5, 2.0)).min(30.0);
    let age_decline = ((age as f64 - 30.0) * 0.5).max(0.0);

    let lifestyle_effect = clip(
        lifestyle.sleep_norm * uniform(rng, 0.5, 1.5)
            + lifestyle.nutrition * uniform(rng, 1.0, 2.0)
            + lifestyle.exercise * uniform(rng, 1.5, 3.0)
            - lifestyle.stress * uniform(rng, 2.0, 5.0)
            - lifestyle.smoking * uniform(rng, 5.0, 15.0)
            - lifestyle.drinking * uniform(rng, 2.0, 7.0),
        -20.0,
        15.0,
    );

    let mut vo2 = base + training_boost - age_decline + lifestyle_effect + genetic_boost;
    if specialization == Specialization::RunStrong {
        vo2 *= 1.05;
    }
    vo2 = match gender {
        Gender::Male => clip(vo2, 50.0, 75.0),
        Gender::Female => clip(vo2, 50.0, 70.0),
    };
    if lifestyle.smoking > 0.7 {
        vo2 *= 0.85;
    }
    vo2
}

fn training_volume<R: Rng + ?Sized>(rng: &mut R, experience: u32, lifestyle: &Lifestyle) -> f64 {
    let hours = normal(rng, 12.0, 2.0)
        * (2.0 - 0.3 * lifestyle.drinking).min(1.0)
        * (1.0 + experience as f64 * 0.03)
        * lifestyle.exercise;
    clip(hours, 8.0, 16.0)
}

fn functional_threshold_power<R: Rng + ?Sized>(
    rng: &mut R,
    gender: Gender,
    weight_kg: f64,
    experience: u32,
    genetic_factor: f64,
    specialization: Specialization,
    lifestyle: &Lifestyle,
) -> f64 {
    let mut w_per_kg = match gender {
        Gender::Male => normal(rng, 3.8, 0.7),
        Gender::Female => normal(rng, 3.4, 0.7),
    };
    w_per_kg *= 1.0 + experience as f64 * 0.01;
    w_per_kg *= genetic_factor;
    if specialization == Specialization::BikeStrong {
        w_per_kg *= 1.1;
    }
    if lifestyle.smoking > 0.2 || lifestyle.drinking > 0.2 {
        w_per_kg *= 0.95;
    }
    clip(w_per_kg, 2.5, 5.5) * weight_kg
}

/// Critical swim speed, returned as seconds per 100m
fn critical_swim_speed(vo2max: f64, weekly_hours: f64, experience: u32, specialization: Specialization) -> f64 {
    let base = if specialization == Specialization::SwimStrong {
        0.80 * 1.08
    } else {
        0.80
    };
    let vo2_factor = (vo2max - 50.0) * 0.008;
    let training_factor = (weekly_hours * 0.25).min(15.0) * 0.015;
    let experience_factor = experience.min(10) as f64 * 0.015;

    let speed = clip(base + vo2_factor + training_factor + experience_factor, 0.80, 1.55);
    round_to(100.0 / speed, 1)
}

fn resting_heart_rate<R: Rng + ?Sized>(rng: &mut R, vo2max: f64, lifestyle: &Lifestyle) -> f64 {
    let mut rhr = (normal(rng, 53.0, 5.0) - vo2max * 0.05).trunc();
    rhr += lifestyle.stress * 2.0 + lifestyle.smoking * 3.0 - lifestyle.exercise * 2.0;
    if lifestyle.sleep_norm > 6.0 {
        rhr -= lifestyle.sleep_norm * 0.2;
    } else {
        rhr += lifestyle.sleep_norm * 0.5;
    }
    round_to(clip(rhr, 38.0, 60.0), 1)
}

fn lactate_threshold_hr<R: Rng + ?Sized>(
    rng: &mut R,
    age: u32,
    gender: Gender,
    max_hr: f64,
    resting_hr: f64,
    experience: u32,
    vo2max: f64,
) -> f64 {
    let age_modifier = match age {
        0..=24 => 1.03,
        25..=35 => 1.02,
        36..=45 => 1.0,
        _ => 0.98,
    };
    let years_modifier = (1.0 + experience as f64 * 0.015).min(1.15);
    let vo2_modifier = if vo2max > 65.0 {
        1.0 + (vo2max - 65.0) / 100.0 * 0.15
    } else if vo2max < 55.0 {
        1.0 - (55.0 - vo2max) / 100.0 * 0.1
    } else {
        1.0
    };
    let reserve = max_hr - resting_hr;
    let reserve_modifier = if reserve > 130.0 {
        1.02
    } else if reserve < 120.0 {
        0.98
    } else {
        1.0
    };
    let gender_modifier = if gender == Gender::Female { 1.03 } else { 1.0 };

    let modifier = age_modifier * years_modifier * vo2_modifier * reserve_modifier * gender_modifier;
    let lthr = max_hr * 0.87 * modifier * (1.0 + uniform(rng, -0.015, 0.015));
    clip(lthr, 160.0, 190.0).round()
}

struct PaceInputs {
    gender: Gender,
    age: u32,
    weight_kg: f64,
    vo2max: f64,
    training_experience: u32,
    weekly_training_hours: f64,
    lifestyle_score: f64,
    genetic_factor: f64,
    lthr: f64,
    max_hr: f64,
    running_specificity: f64,
}

/// Running threshold pace in min/km
fn threshold_pace<R: Rng + ?Sized>(rng: &mut R, p: &PaceInputs) -> f64 {
    let intercept = match p.gender {
        Gender::Male => 16.2,
        Gender::Female => 16.7,
    };
    let base = intercept - 0.16 * p.vo2max * (1.0 + uniform(rng, -0.025, 0.025));

    let (reference, sensitivity) = match p.gender {
        Gender::Male => (70.0, 0.0025),
        Gender::Female => (55.0, 0.0035),
    };
    let delta = p.weight_kg - reference;
    let weight_factor = if delta < 0.0 {
        1.0 + sensitivity * delta / 150.0
    } else {
        1.0 + sensitivity * delta * delta.abs() / 100.0
    };

    let peak_curve = (-((p.age as f64 - 28.0).powi(2)) / (2.0 * 11.0_f64.powi(2))).exp();
    let age_factor = 1.0 + (1.0 - peak_curve) * 0.12;

    let lt_fraction = p.lthr / p.max_hr;
    let hr_modifier = 1.0 - (lt_fraction - 0.86).abs().powf(1.7) * 0.45;

    let experience_modifier =
        (0.08 * (p.training_experience as f64).ln_1p() * p.running_specificity).min(0.85);
    let volume_modifier = (0.065 * p.weekly_training_hours.ln_1p() * p.running_specificity).min(0.8);

    let adjusted = base
        * weight_factor
        * age_factor
        * hr_modifier
        * (1.0 - experience_modifier)
        * (1.0 - volume_modifier);

    let pace = adjusted * (1.0 + (1.0 - p.lifestyle_score) * 0.2) / (p.genetic_factor * 0.8 + 0.2)
        + normal(rng, 0.0, 0.1);
    round_to(clip(pace, 3.0, 5.5), 2)
}

fn recovery_rate(genetic_factor: f64, vo2max: f64, age: u32, lifestyle: &Lifestyle) -> f64 {
    let rate = 0.8 * genetic_factor + (vo2max - 40.0) / 150.0
        + (lifestyle.sleep_norm - 6.0).max(0.0) * lifestyle.sleep_quality * 0.12
        + (lifestyle.sleep_norm - 6.0).min(0.0) * 0.1
        + lifestyle.nutrition * 0.08
        - age as f64 * 0.002
        - lifestyle.drinking * 0.15
        - lifestyle.smoking * 0.15
        - lifestyle.stress * 0.12;
    clip(rate, 0.5, 1.3)
}

/// Morning RMSSD baseline in ms, age-adjusted
fn hrv_baseline(age: u32, vo2max: f64, resting_hr: f64, experience: u32, lifestyle: &Lifestyle) -> f64 {
    let age = age as f64;
    let raw = 110.0 + vo2max * 1.2 - resting_hr * 0.5 + lifestyle.sleep_norm * 2.0
        - lifestyle.stress * 5.0
        - lifestyle.smoking * 10.0
        - lifestyle.drinking * 7.0
        + experience as f64 * 0.8;
    let scaled = raw * (100.0 - age * 0.8) / 100.0;

    let low = (110.0 - age * 1.2).max(40.0);
    let high = (150.0 - age * 1.5).max(50.0);
    round_to(clip(scaled, low, high), 1)
}

fn recovery_signature<R: Rng + ?Sized>(rng: &mut R) -> RecoverySignature {
    let profile = *weighted_choice(
        rng,
        &[
            (RecoveryProfile::HrvDominant, 1.0),
            (RecoveryProfile::SleepDominant, 1.0),
            (RecoveryProfile::RhrDominant, 1.0),
            (RecoveryProfile::StressDominant, 1.0),
            (RecoveryProfile::Balanced, 1.0),
        ],
    )
    .unwrap_or(&RecoveryProfile::Balanced);

    let mut signature = RecoverySignature {
        profile,
        hrv_sensitivity: uniform(rng, 0.8, 1.2),
        sleep_sensitivity: uniform(rng, 0.8, 1.2),
        rhr_sensitivity: uniform(rng, 0.8, 1.2),
        stress_sensitivity: uniform(rng, 0.8, 1.2),
    };

    match profile {
        RecoveryProfile::HrvDominant => {
            signature.hrv_sensitivity *= 1.6;
            signature.sleep_sensitivity *= 0.8;
        }
        RecoveryProfile::SleepDominant => {
            signature.sleep_sensitivity *= 1.6;
            signature.hrv_sensitivity *= 0.9;
        }
        RecoveryProfile::RhrDominant => {
            signature.rhr_sensitivity *= 1.6;
            signature.hrv_sensitivity *= 0.9;
        }
        RecoveryProfile::StressDominant => {
            signature.stress_sensitivity *= 1.6;
            signature.sleep_sensitivity *= 0.8;
        }
        RecoveryProfile::Balanced => {}
    }

    signature
}
