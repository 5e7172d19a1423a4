//! steps: developer CLI for the step accounting core.
//!
//! Drives a [`StepEngine`] backed by the simulated sensor against a real data
//! directory, so ledger persistence, reconciliation and goal math can be
//! exercised without a phone.
//!
//! ## Subcommands
//!
//! - `today`: authoritative count for today and where it came from
//! - `add`: manual step entry
//! - `walk`: live simulated session, printing each update
//! - `week` / `month`: approximate multi-day totals
//! - `goal`: daily goal progress and reward preview

mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use steps_core::{
    load_config, OfflineRemote, SensorVariant, SimulatedSensor, StepEngine, StepEstimate,
    StepsFfiError, StorageConfig, SystemClock,
};

#[derive(Parser)]
#[command(name = "steps")]
#[command(about = "Daily step accounting with a simulated pedometer")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to ~/.steps-rewards)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's step count
    Today {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add steps by hand
    Add {
        #[arg(value_name = "STEPS", allow_hyphen_values = true)]
        steps: i64,
    },

    /// Run a simulated live session and print each update
    Walk {
        /// How long to walk for
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },

    /// Approximate steps over the last seven days
    Week,

    /// Approximate steps since this date last month
    Month,

    /// Progress toward the daily goal
    Goal,
}

fn main() {
    let cli = Cli::parse();
    let storage = cli
        .data_dir
        .map(StorageConfig::with_root)
        .unwrap_or_default();
    let _logging_guard = logging::init(&storage.logs_dir());

    if let Err(e) = run(storage, cli.command) {
        tracing::error!(error = %e, "steps command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(storage: StorageConfig, command: Commands) -> Result<(), StepsFfiError> {
    let sensor = SimulatedSensor::with_auto_walk(load_config(&storage).simulator);
    let engine = StepEngine::with_parts(
        storage,
        SensorVariant::Simulated(sensor),
        Arc::new(OfflineRemote),
        Arc::new(SystemClock),
    )?;

    match command {
        Commands::Today { json } => {
            let snapshot = engine.today_snapshot();
            if json {
                let out = serde_json::to_string_pretty(&snapshot)
                    .map_err(|e| StepsFfiError::from(format!("Failed to encode snapshot: {e}")))?;
                println!("{out}");
            } else {
                println!("{} steps today ({})", snapshot.steps, snapshot.source);
            }
        }
        Commands::Add { steps } => {
            let total = engine.add_manual_steps(steps)?;
            println!("Added {steps} steps, {total} today");
        }
        Commands::Walk { seconds } => {
            let started = engine.start_tracking_with(Arc::new(|steps: u64| {
                println!("{steps} steps");
            }));
            if !started {
                return Err(StepsFfiError::from(
                    "Step sensor unavailable; use `steps add` instead",
                ));
            }
            thread::sleep(Duration::from_secs(seconds));
            engine.stop_tracking();
            println!("Walk finished at {} steps today", engine.get_today_steps());
        }
        Commands::Week => print_estimate("this week", engine.week_estimate()),
        Commands::Month => print_estimate("this month", engine.month_estimate()),
        Commands::Goal => {
            let progress = engine.goal_progress();
            println!(
                "{} / {} steps ({:.0}%)",
                progress.steps, progress.goal, progress.percent
            );
            println!("{}", progress.tier.message());
            println!("Reward preview: {} points", engine.reward_preview());
        }
    }
    Ok(())
}

fn print_estimate(label: &str, estimate: StepEstimate) {
    let marker = if estimate.approximate { "~" } else { "" };
    println!(
        "{marker}{} steps {label} ({} days)",
        estimate.steps, estimate.days
    );
}
