use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use trainsim::config::SimulationConfig;
use trainsim::error::SimError;
use trainsim::export::{self, ExportFormat};
use trainsim::logging::init_logging;
use trainsim::sampling::run_rng;
use trainsim::sensor_noise::NoNoise;
use trainsim::simulation::{AthleteYear, YearOrchestrator};
use trainsim::training_plan::{AnnualPlan, TrainingPlanGenerator, WeekKind};

/// trainsim - Synthetic athlete-year simulator
///
/// Generates athlete profiles, annual training plans and day-by-day
/// wearable, training-load and injury data for injury-prediction research.
#[derive(Parser)]
#[command(name = "trainsim")]
#[command(author = "trainsim Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Athlete physiology and injury simulator", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a cohort for one year and export the results
    Simulate {
        /// Number of athletes
        #[arg(short, long)]
        athletes: Option<usize>,

        /// Calendar year to simulate
        #[arg(short, long)]
        year: Option<i32>,

        /// Seed for the whole run
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads (default: all cores)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Disable device sensor noise
        #[arg(long)]
        no_noise: bool,

        /// Export format (csv, json, both)
        #[arg(short = 'f', long, default_value = "both")]
        format: String,
    },

    /// Print generated athlete profiles as JSON
    Profile {
        /// Number of profiles
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Seed for profile generation
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },

    /// Print the weekly summary of an annual training plan
    Plan {
        /// Seed for the athlete and the plan
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Plan year
        #[arg(short, long, default_value = "2024")]
        year: i32,
    },

    /// Write or show configuration
    Config {
        /// Write the default configuration file
        #[arg(short, long)]
        init: bool,

        /// Print the effective configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(Tabled)]
struct WeekRow {
    #[tabled(rename = "Week")]
    week: usize,
    #[tabled(rename = "Start")]
    start: NaiveDate,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "TSS")]
    tss: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Races")]
    races: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SimulationConfig::load_or_default(),
    };
    config.logging = config.logging.clone().with_verbosity(cli.verbose);
    init_logging(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Simulate {
            athletes,
            year,
            seed,
            output,
            threads,
            no_noise,
            format,
        } => {
            if let Some(n) = athletes {
                config.run.n_athletes = n;
            }
            if let Some(y) = year {
                config.run.year = y;
            }
            if let Some(s) = seed {
                config.run.seed = s;
            }
            if let Some(dir) = output {
                config.run.output_dir = dir;
            }
            if threads.is_some() {
                config.run.threads = threads;
            }
            let format: ExportFormat = format.parse().map_err(anyhow::Error::msg)?;

            run_simulation(config, no_noise, format)?;
        }

        Commands::Profile { count, seed } => {
            let profiles = YearOrchestrator::generate_cohort(count, seed);
            let json = serde_json::to_string_pretty(&profiles).context("Failed to serialize profiles")?;
            println!("{}", json);
        }

        Commands::Plan { seed, year } => {
            let start = NaiveDate::from_ymd_opt(year, 1, 1)
                .with_context(|| format!("Unsupported year: {}", year))?;
            let athletes = YearOrchestrator::generate_cohort(1, seed);
            let athlete = athletes.first().context("No athlete generated")?;
            let plan = TrainingPlanGenerator::generate_annual_training_plan(athlete, start, &mut run_rng(seed, 0));
            print_plan(&plan);
        }

        Commands::Config { init, show } => {
            let path = cli.config.unwrap_or_else(SimulationConfig::default_config_path);
            if init {
                SimulationConfig::default().save_to_file(&path)?;
                println!("{} {}", "✓ Default configuration written to".green(), path.display());
            }
            if show || !init {
                let toml = toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
                println!("{}", toml);
            }
        }
    }

    Ok(())
}

fn run_simulation(config: SimulationConfig, no_noise: bool, format: ExportFormat) -> Result<()> {
    let run = config.run.clone();
    println!(
        "{}",
        format!(
            "Simulating {} athlete(s) for {} (seed {})...",
            run.n_athletes, run.year, run.seed
        )
        .blue()
        .bold()
    );

    let mut orchestrator = YearOrchestrator::new(config).map_err(report)?;
    if no_noise {
        orchestrator = orchestrator.with_sensor_noise(Box::new(NoNoise));
    }

    let years = orchestrator.run().map_err(report)?;
    print_summary(&years);

    let written = export::export_cohort(&years, &run.output_dir, format)
        .with_context(|| format!("Failed to export to {}", run.output_dir.display()))?;
    for file in &written.files {
        println!("  {} {}", "wrote".dimmed(), file.display());
    }
    println!("{}", "✓ Simulation completed successfully".green());
    Ok(())
}

/// Log a simulation error at its severity and turn it into a user message
fn report(err: SimError) -> anyhow::Error {
    match err.severity().to_tracing_level() {
        tracing::Level::ERROR => tracing::error!(error = %err, "Simulation failed"),
        tracing::Level::WARN => tracing::warn!(error = %err, "Simulation failed"),
        _ => tracing::info!(error = %err, "Simulation failed"),
    }
    anyhow::anyhow!(err.user_message())
}

fn print_summary(years: &[AthleteYear]) {
    let days: usize = years.iter().map(|y| y.daily_data.len()).sum();
    let injuries: usize = years.iter().map(|y| y.injuries.len()).sum();
    println!("\n{}", "Cohort Summary".bold().underline());
    println!("  Athletes:      {}", years.len());
    println!("  Athlete-days:  {}", days);
    println!("  Injuries:      {}", injuries.to_string().yellow());

    for year in years.iter().take(10) {
        let s = year.summary();
        let injuries = if s.injuries.is_empty() {
            "0".green()
        } else {
            s.injuries.len().to_string().red()
        };
        println!(
            "  {}  TSS {:>8.0}  ACWR {:.2}  injuries {}",
            s.athlete_id.to_string().cyan(),
            s.total_actual_tss,
            s.mean_acwr,
            injuries
        );
    }
    if years.len() > 10 {
        println!("  {}", format!("... and {} more", years.len() - 10).dimmed());
    }
}

fn print_plan(plan: &AnnualPlan) {
    println!(
        "{}",
        format!(
            "Annual plan {} to {} ({:?}, base {:.0} TSS/week)",
            plan.start, plan.end, plan.ability, plan.base_weekly_tss
        )
        .bold()
    );

    let rows: Vec<WeekRow> = plan
        .weeks
        .iter()
        .map(|week| {
            let days: Vec<_> = plan
                .days
                .iter()
                .filter(|d| d.week_index == week.week_index)
                .collect();
            let races: Vec<String> = days
                .iter()
                .filter_map(|d| d.race.map(|r| format!("{:?} {}", r, d.date.format("%m-%d"))))
                .collect();
            WeekRow {
                week: week.week_index + 1,
                start: week.start,
                phase: days.first().map(|d| d.phase.to_string()).unwrap_or_default(),
                tss: format!("{:.0}", week.total_tss),
                kind: match week.kind {
                    WeekKind::Normal => "normal".to_string(),
                    WeekKind::Recovery => "recovery".to_string(),
                },
                races: races.join(", "),
            }
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    println!("  Total planned TSS: {:.0}", plan.total_planned_tss());
}
