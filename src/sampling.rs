//! Random draws used across the simulation.
//!
//! Every stochastic function in the crate takes an explicit `&mut R: Rng`.
//! Nothing seeds a global generator; a run is seeded once through
//! [`run_rng`] and each athlete gets its own ChaCha stream.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use statrs::distribution::Normal;

/// Generator type used for simulation runs
pub type SimRng = ChaCha8Rng;

/// Create the generator for one athlete of a seeded run.
///
/// All athletes share the run seed and differ only by stream, so results do
/// not depend on how athletes are scheduled across threads.
pub fn run_rng(seed: u64, stream: u64) -> SimRng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Draw from N(mean, std_dev). A non-positive deviation returns the mean.
pub fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    match Normal::new(mean, std_dev) {
        Ok(dist) => dist.sample(rng),
        Err(_) => mean,
    }
}

/// Draw from N(mean, std_dev) restricted to `[low, high]`.
///
/// Uses rejection sampling and falls back to clamping after a bounded
/// number of attempts.
pub fn truncated_normal<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f64,
    std_dev: f64,
    low: f64,
    high: f64,
) -> f64 {
    for _ in 0..64 {
        let x = normal(rng, mean, std_dev);
        if (low..=high).contains(&x) {
            return x;
        }
    }
    mean.clamp(low, high)
}

/// Uniform draw on `[low, high)`; degenerate ranges return `low`.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if high <= low {
        return low;
    }
    rng.gen_range(low..high)
}

/// Uniform integer draw on `[low, high]`; inverted ranges return `low`.
pub fn uniform_int<R: Rng + ?Sized>(rng: &mut R, low: u32, high: u32) -> u32 {
    if high <= low {
        return low;
    }
    rng.gen_range(low..=high)
}

/// Bernoulli trial with probability `p` (clamped to [0, 1]).
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.gen::<f64>() < p.clamp(0.0, 1.0)
}

/// Weighted choice over `(item, weight)` pairs.
///
/// Returns `None` only for an empty slice or when every weight is zero.
pub fn weighted_choice<'a, R: Rng + ?Sized, T>(rng: &mut R, items: &'a [(T, f64)]) -> Option<&'a T> {
    items
        .choose_weighted(rng, |(_, weight)| *weight)
        .ok()
        .map(|(item, _)| item)
}

/// Clamp that never panics, even when the bounds cross.
pub fn clip(value: f64, low: f64, high: f64) -> f64 {
    value.max(low).min(high)
}

/// Round to a fixed number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
