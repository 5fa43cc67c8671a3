use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::daily_metrics::DailyMetricsConfig;
use crate::error::ConfigError;
use crate::injury::{InjuryModelConfig, WellnessWeights};
use crate::load_spikes::LoadSpikeConfig;
use crate::logging::LogConfig;
use crate::patterns::PatternConfig;
use crate::pmc::PmcConfig;

/// Main simulation configuration
///
/// Every section falls back to its defaults when missing from the TOML
/// file, so a config only needs to name the values it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Run-level settings (cohort size, seed, output)
    pub run: RunConfig,

    /// Fitness/fatigue model settings
    pub training: PmcConfig,

    /// Injury probability calibration
    pub injury: InjuryModelConfig,

    /// Wellness vulnerability component weights
    pub wellness: WellnessWeights,

    /// Morning and evening metric calibration
    pub metrics: DailyMetricsConfig,

    /// Yearly load-spike schedule
    pub load_spikes: LoadSpikeConfig,

    /// Precursor and false-alarm pattern injection
    pub patterns: PatternConfig,

    /// Logging output
    pub logging: LogConfig,
}

/// Run-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of athletes in the cohort
    pub n_athletes: usize,

    /// Calendar year to simulate
    pub year: i32,

    /// Seed for the whole run
    pub seed: u64,

    /// Worker threads for cohort simulation (None for rayon's default)
    pub threads: Option<usize>,

    /// Directory the exporters write into
    pub output_dir: PathBuf,

    /// Show a progress bar while simulating a cohort
    pub show_progress: bool,

    /// Apply device-specific sensor noise
    pub sensor_noise: bool,

    /// Apply physiological modulations such as the menstrual cycle
    pub modulations: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            n_athletes: 1,
            year: 2024,
            seed: 42,
            threads: None,
            output_dir: PathBuf::from("simulated_data"),
            show_progress: true,
            sensor_noise: true,
            modulations: true,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: SimulationConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".trainsim")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(path = %config_path.display(), error = %err, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Check that thresholds are ordered and ranges are well formed
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let injury = &self.injury;
        if !(injury.acwr_undertrained < injury.acwr_optimal_point
            && injury.acwr_optimal_point < injury.acwr_optimal_upper
            && injury.acwr_optimal_upper < injury.acwr_danger_upper
            && injury.acwr_danger_upper < injury.acwr_saturation)
        {
            return Err(invalid(
                "injury.acwr_*",
                "zone boundaries must be strictly increasing",
            ));
        }
        if injury.acwr_undertrained_floor <= 0.0
            || injury.acwr_undertrained_floor >= injury.acwr_undertrained
        {
            return Err(invalid(
                "injury.acwr_undertrained_floor",
                "must lie between 0 and acwr_undertrained",
            ));
        }
        if !(0.0..=1.0).contains(&injury.max_daily_probability) {
            return Err(invalid("injury.max_daily_probability", "must be within [0, 1]"));
        }
        for (name, range) in injury.recovery_days.named() {
            if range.0 == 0 || range.0 > range.1 {
                return Err(invalid(
                    &format!("injury.recovery_days.{}", name),
                    "needs 1 <= min <= max",
                ));
            }
        }

        if (self.wellness.total() - 1.0).abs() > 1e-6 {
            return Err(invalid("wellness", "weights must sum to 1.0"));
        }

        let training = &self.training;
        if training.acute_window == 0 || training.acute_window > training.chronic_window {
            return Err(invalid(
                "training.acute_window",
                "must be positive and not exceed chronic_window",
            ));
        }
        if training.ctl_time_constant == 0 || training.atl_time_constant == 0 {
            return Err(invalid("training.*_time_constant", "must be positive"));
        }

        let patterns = &self.patterns;
        if patterns.lookback_days == 0 || patterns.lookback_days > 14 {
            return Err(invalid("patterns.lookback_days", "must be within 1..=14"));
        }
        if patterns.false_alarm_length.0 > patterns.false_alarm_length.1
            || patterns.false_alarm_interval.0 > patterns.false_alarm_interval.1
            || patterns.false_alarm_first.0 > patterns.false_alarm_first.1
        {
            return Err(invalid("patterns.false_alarm_*", "ranges need min <= max"));
        }

        if self.metrics.stress_skew_exponent <= 0.0 {
            return Err(invalid("metrics.stress_skew_exponent", "must be positive"));
        }
        if self.metrics.evening_hour > 23 {
            return Err(invalid("metrics.evening_hour", "must be within 0..=23"));
        }

        if self.run.threads == Some(0) {
            return Err(invalid("run.threads", "must be at least 1 when set"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.run.seed, 42);
        assert_eq!(config.run.year, 2024);
    }

    #[test]
    fn test_config_serialization() {
        let config = SimulationConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: SimulationConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
            [run]
            n_athletes = 25
            seed = 7

            [injury]
            high_acwr_chance = 0.05
        "#;
        let config: SimulationConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.run.n_athletes, 25);
        assert_eq!(config.run.seed, 7);
        assert_eq!(config.run.year, 2024);
        assert_eq!(config.injury.high_acwr_chance, 0.05);
        assert_eq!(config.injury.danger_zone_chance, InjuryModelConfig::default().danger_zone_chance);
        assert_eq!(config.training, PmcConfig::default());
    }

    #[test]
    fn test_validation_rejects_unordered_zones() {
        let mut config = SimulationConfig::default();
        config.injury.acwr_danger_upper = 1.2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("acwr"));
    }

    #[test]
    fn test_validation_rejects_bad_weights() {
        let mut config = SimulationConfig::default();
        config.wellness.sleep_deficit = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_long_lookback() {
        let mut config = SimulationConfig::default();
        config.patterns.lookback_days = 21;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("sim.toml");

        let mut original = SimulationConfig::default();
        original.run.n_athletes = 12;
        original.injury.random_chance = 0.002;

        original.save_to_file(&config_path).unwrap();
        let loaded = SimulationConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded.run.n_athletes, 12);
        assert_eq!(loaded.injury.random_chance, 0.002);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("sim.toml");
        fs::write(&config_path, "[wellness]\nsleep_deficit = 0.9\n").unwrap();

        assert!(SimulationConfig::load_from_file(&config_path).is_err());
    }
}
