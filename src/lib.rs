// Library interface for trainsim modules
// Integration tests and the CLI reach the simulation through this crate

pub mod athlete;
pub mod config;
pub mod daily_metrics;
pub mod error;
pub mod export;
pub mod injury;
pub mod load_spikes;
pub mod logging;
pub mod models;
pub mod modulation;
pub mod patterns;
pub mod pmc;
pub mod sampling;
pub mod sensor_noise;
pub mod simulation;
pub mod training_plan;
pub mod workout;
pub mod zones;

// Re-export commonly used types for convenience
pub use athlete::AthleteProfileGenerator;
pub use config::SimulationConfig;
pub use error::{Result, SimError};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::*;
pub use pmc::FitnessFatigueFormModel;
pub use simulation::{AthleteYear, YearOrchestrator};
pub use training_plan::TrainingPlanGenerator;
pub use zones::ZoneCalculator;
