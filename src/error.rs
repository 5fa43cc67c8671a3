//! Unified error hierarchy for trainsim
//!
//! The simulation core is arithmetic-only and has almost no recoverable
//! error surface. The errors here cover the edges: configuration loading,
//! plan lookups that should never miss, and export I/O.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all trainsim operations
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Training plan errors
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Caller supplied input outside the supported domain
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field failed validation
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    /// Config file could not be read or written
    #[error("Config file {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    /// Config file could not be parsed
    #[error("Failed to parse config: {reason}")]
    Parse { reason: String },
}

/// Training plan errors
#[derive(Debug, Error)]
pub enum PlanError {
    /// The plan has no row for a simulated day
    #[error("No plan row for {date}")]
    MissingDay { date: NaiveDate },

    /// The requested year cannot be represented
    #[error("Unsupported simulation year: {year}")]
    InvalidYear { year: i32 },
}

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO failure while writing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Export target could not be prepared
    #[error("Export failed to {path}: {reason}")]
    ExportFailed { path: PathBuf, reason: String },
}

/// Result type alias for trainsim operations
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SimError::Config(ConfigError::Invalid { .. }) => ErrorSeverity::Warning,
            SimError::InvalidInput(_) => ErrorSeverity::Warning,
            SimError::Plan(_) => ErrorSeverity::Critical,
            SimError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            SimError::Config(ConfigError::Io { path, .. }) => {
                format!("Could not access config file: {}", path.display())
            }
            SimError::Config(ConfigError::Invalid { field, reason }) => {
                format!("Config value '{}' is not usable: {}", field, reason)
            }
            SimError::Plan(PlanError::MissingDay { date }) => {
                format!("The training plan does not cover {}. The athlete-year was discarded.", date)
            }
            SimError::Export(ExportError::ExportFailed { path, .. }) => {
                format!("Could not write output to {}", path.display())
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical error, the run cannot produce meaningful output
    Critical,
    /// Error that prevents the operation
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = SimError::Plan(PlanError::MissingDay {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);

        let err = SimError::Config(ConfigError::Invalid {
            field: "injury.acwr_danger_upper".to_string(),
            reason: "must exceed acwr_optimal_upper".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_user_messages() {
        let err = SimError::Config(ConfigError::Io {
            path: PathBuf::from("sim.toml"),
            reason: "missing".to_string(),
        });
        assert!(err.user_message().contains("sim.toml"));

        let err = SimError::Plan(PlanError::MissingDay {
            date: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        });
        assert!(err.user_message().contains("2024-02-29"));
    }

    #[test]
    fn test_from_conversions() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let err: SimError = io.into();
        assert!(matches!(err, SimError::Io(_)));

        let err: SimError = PlanError::InvalidYear { year: 400_000 }.into();
        assert!(err.to_string().contains("400000"));
    }
}
