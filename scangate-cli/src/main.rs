//! scangate CLI -- offline report evaluation, scan scheduling and configuration checks.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use scangate_core::config::{GeneralConfig, ScangateConfig};

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // An unreadable config still gets default logging; the command reports the error.
    let mut general = ScangateConfig::load(&cli.config)
        .await
        .map(|config| config.general)
        .unwrap_or_else(|_| GeneralConfig::default());
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("warning: {e}");
    }

    tracing::debug!(config = %cli.config.display(), "scangate starting");

    let writer = OutputWriter::new(cli.output);
    let result = match cli.command {
        Commands::Evaluate(args) => commands::evaluate::execute(args, &cli.config, &writer).await,
        Commands::Schedule(args) => commands::schedule::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
