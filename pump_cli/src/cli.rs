//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "pump",
    version,
    about = "SPQR-IPF-2025 infusion pump firmware simulator"
)]
pub struct Cli {
    /// Path to config TOML (factory settings when omitted)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit console events, summaries and logs as JSON lines
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); overrides RUST_LOG and the config
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Options shared by the infusion-running commands.
#[derive(Args, Debug, Clone)]
pub struct DriveOpts {
    /// Pace ticks on the wall clock instead of fast-forwarding
    #[arg(long, action = ArgAction::SetTrue)]
    pub realtime: bool,

    /// Override simulation.tick_ms
    #[arg(long, value_name = "MS")]
    pub tick_ms: Option<u64>,

    /// Override simulation.max_ticks
    #[arg(long, value_name = "N")]
    pub max_ticks: Option<u64>,

    /// Write one CSV row per delivery tick
    #[arg(long, value_name = "FILE")]
    pub trace_csv: Option<PathBuf>,

    /// Append engine events and panel notices to a plain-text transcript
    #[arg(long, value_name = "FILE")]
    pub transcript: Option<PathBuf>,

    /// Patient identifier shown in the start report
    #[arg(long, value_name = "ID")]
    pub patient_id: Option<String>,

    /// Medication name shown in the start report
    #[arg(long, value_name = "NAME")]
    pub medication: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an infusion through the regular panel (UI caps apply)
    Run {
        /// Infusion rate in ml/hr
        #[arg(long, value_name = "ML_PER_HR")]
        rate: Option<u32>,
        /// Volume to infuse in ml (rederives duration)
        #[arg(long, value_name = "ML")]
        volume: Option<f64>,
        /// Duration in seconds (rederives volume)
        #[arg(long, value_name = "SECONDS")]
        duration: Option<u64>,
        #[command(flatten)]
        drive: DriveOpts,
    },
    /// Run an infusion with admin parameters (no caps)
    AdminRun {
        /// Admin password
        #[arg(long)]
        password: String,
        /// Infusion rate in ml/hr
        #[arg(long, value_name = "ML_PER_HR")]
        rate: u32,
        /// Volume to infuse in ml
        #[arg(long, value_name = "ML")]
        volume: f64,
        /// Duration in seconds
        #[arg(long, value_name = "SECONDS")]
        duration: u64,
        #[command(flatten)]
        drive: DriveOpts,
    },
    /// Show every stage of the delivery calculation for one time slice
    Calc {
        /// Infusion rate in ml/hr
        #[arg(long, value_name = "ML_PER_HR")]
        rate: u32,
        /// Time slice in milliseconds
        #[arg(long = "time-ms", value_name = "MS")]
        time_ms: u64,
    },
    /// Interactive menu-driven pump console on stdin/stdout
    Console {
        /// Append engine events and panel notices to a plain-text transcript
        #[arg(long, value_name = "FILE")]
        transcript: Option<PathBuf>,
    },
}
