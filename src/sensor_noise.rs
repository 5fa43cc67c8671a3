//! Measurement noise of wearable devices
//!
//! Noise is applied after the physiology is simulated, so the underlying
//! signal stays clean and the device model can be swapped or disabled.

use rand::RngCore;

use crate::daily_metrics::MorningMetrics;
use crate::models::{ActivityRecord, AthleteProfile, SensorProfile};
use crate::sampling::{chance, normal, round_to, uniform};

/// Device-specific perturbation of recorded values
pub trait SensorNoise: Send + Sync {
    fn perturb_morning(&self, athlete: &AthleteProfile, morning: MorningMetrics, rng: &mut dyn RngCore) -> MorningMetrics;

    fn perturb_activity(
        &self,
        athlete: &AthleteProfile,
        activity: ActivityRecord,
        rng: &mut dyn RngCore,
    ) -> ActivityRecord;
}

/// Passes every value through untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNoise;

impl SensorNoise for NoNoise {
    fn perturb_morning(&self, _athlete: &AthleteProfile, morning: MorningMetrics, _rng: &mut dyn RngCore) -> MorningMetrics {
        morning
    }

    fn perturb_activity(
        &self,
        _athlete: &AthleteProfile,
        activity: ActivityRecord,
        _rng: &mut dyn RngCore,
    ) -> ActivityRecord {
        activity
    }
}

/// Noise model selected by the athlete's [`SensorProfile`]
///
/// Chest straps (Garmin) read clean but drop the occasional spike; wrist
/// optical sensors get noisier as intensity rises.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceNoise;

/// Lowest heart rate a device will report
const HR_FLOOR: f64 = 40.0;

impl DeviceNoise {
    fn hr_spike(hr: f64, probability: f64, rng: &mut dyn RngCore) -> f64 {
        if !chance(rng, probability) {
            return hr;
        }
        let spike = uniform(rng, 10.0, 30.0);
        if chance(rng, 0.8) {
            hr + spike
        } else {
            (hr - spike).max(HR_FLOOR)
        }
    }

    fn optical(hr: f64, intensity: f64, base: f64, rng: &mut dyn RngCore) -> f64 {
        let sd = base + intensity * intensity * 5.0;
        (hr + normal(rng, 0.0, sd)).max(HR_FLOOR)
    }
}

impl SensorNoise for DeviceNoise {
    fn perturb_morning(&self, _athlete: &AthleteProfile, mut morning: MorningMetrics, rng: &mut dyn RngCore) -> MorningMetrics {
        morning.resting_hr += normal(rng, 0.0, 0.5);
        morning.hrv += normal(rng, 0.0, 2.0);

        let measured = (morning.sleep_hours + normal(rng, 0.0, 0.25)).max(0.0);
        morning.sleep_hours = measured;
        morning.light_sleep = (measured * 60.0 - morning.deep_sleep - morning.rem_sleep).max(0.0);
        morning
    }

    fn perturb_activity(
        &self,
        athlete: &AthleteProfile,
        mut activity: ActivityRecord,
        rng: &mut dyn RngCore,
    ) -> ActivityRecord {
        match athlete.sensor_profile {
            SensorProfile::Garmin => {
                activity.avg_hr = Self::hr_spike(activity.avg_hr, 0.05, rng);
                activity.max_hr = Self::hr_spike(activity.max_hr, 0.1, rng);
            }
            SensorProfile::Optical => {
                let intensity = activity.intensity_factor;
                activity.avg_hr = Self::optical(activity.avg_hr, intensity, 2.0, rng);
                activity.max_hr = Self::optical(activity.max_hr, intensity, 4.0, rng);
            }
        }
        activity.avg_hr = round_to(activity.avg_hr, 0);
        activity.max_hr = round_to(activity.max_hr.max(activity.avg_hr), 0);
        activity
    }
}
