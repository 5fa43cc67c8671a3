//! Yearly schedule of load perturbations
//!
//! Training camps, overreach blocks, single-day spikes and reduced-load
//! periods followed by a return from rest. Windows never overlap and all
//! start after the first four weeks, once the chronic load has settled.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sampling::{uniform, uniform_int};

/// Count, length and multiplier ranges for one kind of window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeRange {
    pub count: (u32, u32),
    pub length: (u32, u32),
    pub multiplier: (f64, f64),
}

impl SpikeRange {
    fn new(count: (u32, u32), length: (u32, u32), multiplier: (f64, f64)) -> Self {
        SpikeRange {
            count,
            length,
            multiplier,
        }
    }
}

/// Load-spike settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadSpikeConfig {
    pub enabled: bool,

    /// First day a window may start on
    pub start_day: usize,

    /// Half-width of the daily multiplicative jitter on actual load
    pub daily_jitter: f64,

    /// Placement attempts per window before giving up
    pub max_attempts: u32,

    pub training_camp: SpikeRange,
    pub overreach: SpikeRange,
    pub acute_spike: SpikeRange,
    pub reduced_load: SpikeRange,
    /// Count is ignored, one follows every reduced-load window
    pub return_from_rest: SpikeRange,
}

impl Default for LoadSpikeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_day: 28,
            daily_jitter: 0.15,
            max_attempts: 50,
            training_camp: SpikeRange::new((1, 2), (7, 12), (1.3, 1.5)),
            overreach: SpikeRange::new((1, 2), (10, 14), (1.15, 1.3)),
            acute_spike: SpikeRange::new((3, 6), (1, 3), (1.6, 2.2)),
            reduced_load: SpikeRange::new((2, 3), (7, 14), (0.4, 0.6)),
            return_from_rest: SpikeRange::new((1, 1), (3, 5), (1.3, 1.6)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpikeKind {
    TrainingCamp,
    Overreach,
    AcuteSpike,
    ReducedLoad,
    ReturnFromRest,
}

impl fmt::Display for SpikeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpikeKind::TrainingCamp => "training camp",
            SpikeKind::Overreach => "overreach",
            SpikeKind::AcuteSpike => "acute spike",
            SpikeKind::ReducedLoad => "reduced load",
            SpikeKind::ReturnFromRest => "return from rest",
        };
        f.write_str(name)
    }
}

/// A contiguous run of days sharing one load multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeWindow {
    pub kind: SpikeKind,
    /// First day index of the window
    pub start: usize,
    pub length: usize,
    pub multiplier: f64,
}

impl SpikeWindow {
    /// One past the last day of the window
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn contains(&self, day_index: usize) -> bool {
        day_index >= self.start && day_index < self.end()
    }

    fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end()
    }
}

/// Non-overlapping spike windows for one athlete-year, sorted by start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadSpikeSchedule {
    windows: Vec<SpikeWindow>,
}

impl LoadSpikeSchedule {
    /// Schedule with no windows
    pub fn empty() -> Self {
        Self::default()
    }

    /// Place windows over a year of `n_days`
    ///
    /// A window that cannot be placed within `max_attempts` draws is
    /// skipped, so a short year ends up with fewer windows.
    pub fn generate<R: Rng + ?Sized>(n_days: usize, config: &LoadSpikeConfig, rng: &mut R) -> Self {
        let mut schedule = Self::empty();
        if !config.enabled {
            return schedule;
        }

        let singles = [
            (SpikeKind::TrainingCamp, &config.training_camp),
            (SpikeKind::Overreach, &config.overreach),
            (SpikeKind::AcuteSpike, &config.acute_spike),
        ];
        for (kind, range) in singles {
            let count = uniform_int(rng, range.count.0, range.count.1);
            for _ in 0..count {
                let length = uniform_int(rng, range.length.0, range.length.1).max(1) as usize;
                if let Some(start) = schedule.find_slot(n_days, length, config, rng) {
                    let multiplier = uniform(rng, range.multiplier.0, range.multiplier.1);
                    schedule.windows.push(SpikeWindow {
                        kind,
                        start,
                        length,
                        multiplier,
                    });
                }
            }
        }

        // Reduced load is always followed directly by a return from rest
        let reduced = &config.reduced_load;
        let comeback = &config.return_from_rest;
        let count = uniform_int(rng, reduced.count.0, reduced.count.1);
        for _ in 0..count {
            let rest_len = uniform_int(rng, reduced.length.0, reduced.length.1).max(1) as usize;
            let back_len = uniform_int(rng, comeback.length.0, comeback.length.1).max(1) as usize;
            if let Some(start) = schedule.find_slot(n_days, rest_len + back_len, config, rng) {
                schedule.windows.push(SpikeWindow {
                    kind: SpikeKind::ReducedLoad,
                    start,
                    length: rest_len,
                    multiplier: uniform(rng, reduced.multiplier.0, reduced.multiplier.1),
                });
                schedule.windows.push(SpikeWindow {
                    kind: SpikeKind::ReturnFromRest,
                    start: start + rest_len,
                    length: back_len,
                    multiplier: uniform(rng, comeback.multiplier.0, comeback.multiplier.1),
                });
            }
        }

        schedule.windows.sort_by_key(|w| w.start);
        tracing::debug!(windows = schedule.windows.len(), "Load spike schedule generated");
        schedule
    }

    fn find_slot<R: Rng + ?Sized>(
        &self,
        n_days: usize,
        length: usize,
        config: &LoadSpikeConfig,
        rng: &mut R,
    ) -> Option<usize> {
        let earliest = config.start_day;
        let latest = n_days.checked_sub(length)?;
        if latest < earliest {
            return None;
        }
        for _ in 0..config.max_attempts {
            let start = rng.gen_range(earliest..=latest);
            let end = start + length;
            if !self.windows.iter().any(|w| w.overlaps(start, end)) {
                return Some(start);
            }
        }
        None
    }

    pub fn windows(&self) -> &[SpikeWindow] {
        &self.windows
    }

    pub fn window_at(&self, day_index: usize) -> Option<&SpikeWindow> {
        self.windows.iter().find(|w| w.contains(day_index))
    }

    pub fn kind_at(&self, day_index: usize) -> Option<SpikeKind> {
        self.window_at(day_index).map(|w| w.kind)
    }

    /// Load multiplier for a day, 1.0 outside every window
    pub fn multiplier_for(&self, day_index: usize) -> f64 {
        self.window_at(day_index).map_or(1.0, |w| w.multiplier)
    }
}
