//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// scangate -- CI scan orchestration and threshold gate.
///
/// Use `scangate <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "scangate", version, about, long_about = None)]
pub struct Cli {
    /// Path to the scangate.toml configuration file.
    #[arg(short, long, global = true, default_value = "scangate.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a downloaded XML scan report against the configured thresholds.
    Evaluate(EvaluateArgs),

    /// Show whether a build would run a full or incremental scan.
    Schedule(ScheduleArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- evaluate ----

/// Evaluate a stored scan report offline.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Path to the XML report (ScanReport.xml).
    pub report: PathBuf,

    /// Dependency-analysis high severity count to evaluate alongside the report.
    #[arg(long)]
    pub osa_high: Option<u32>,

    /// Dependency-analysis medium severity count.
    #[arg(long)]
    pub osa_medium: Option<u32>,

    /// Dependency-analysis low severity count.
    #[arg(long)]
    pub osa_low: Option<u32>,
}

impl EvaluateArgs {
    /// True if any dependency-analysis count was given.
    pub fn has_osa_counts(&self) -> bool {
        self.osa_high.is_some() || self.osa_medium.is_some() || self.osa_low.is_some()
    }
}

// ---- schedule ----

/// Decide the scan kind for a build number.
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Build number of the CI run.
    #[arg(short, long)]
    pub build_number: u64,
}

// ---- config ----

/// Manage scangate configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, server, global, job).
        #[arg(long)]
        section: Option<String>,
    },
}
