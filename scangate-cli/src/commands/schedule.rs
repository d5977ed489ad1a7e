//! `scangate schedule` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use scangate_core::config::{FULL_SCAN_CYCLE_MAX, FULL_SCAN_CYCLE_MIN, JobConfig, ScangateConfig};
use scangate_engine::schedule::decide;
use scangate_engine::types::ScanKind;

use crate::cli::ScheduleArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `schedule` command.
pub async fn execute(
    args: ScheduleArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = ScangateConfig::load(config_path).await?;
    let report = schedule_report(args.build_number, &config.job);
    writer.render(&report)?;
    Ok(())
}

/// Decide the scan kind for `build_number` under the job settings.
pub fn schedule_report(build_number: u64, job: &JobConfig) -> ScheduleReport {
    ScheduleReport {
        build_number,
        kind: decide(
            build_number,
            job.incremental,
            job.full_scans_scheduled,
            job.full_scan_cycle,
        ),
        incremental: job.incremental,
        full_scans_scheduled: job.full_scans_scheduled,
        full_scan_cycle: job.full_scan_cycle,
        cycle_in_range: (FULL_SCAN_CYCLE_MIN..=FULL_SCAN_CYCLE_MAX).contains(&job.full_scan_cycle),
    }
}

/// Scan scheduling decision.
#[derive(Debug, Serialize)]
pub struct ScheduleReport {
    pub build_number: u64,
    pub kind: ScanKind,
    pub incremental: bool,
    pub full_scans_scheduled: bool,
    pub full_scan_cycle: i32,
    /// False if the cycle is outside 1-99 and periodic full scans are ignored
    pub cycle_in_range: bool,
}

impl Render for ScheduleReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Build #{}: {} scan",
            self.build_number,
            self.kind.to_string().bold()
        )?;
        writeln!(w, "  Incremental requested: {}", self.incremental)?;
        writeln!(w, "  Periodic full scans:   {}", self.full_scans_scheduled)?;
        if self.incremental && self.full_scans_scheduled {
            writeln!(w, "  Full scan cycle:       {}", self.full_scan_cycle)?;
            if !self.cycle_in_range {
                writeln!(
                    w,
                    "  {}",
                    format!(
                        "cycle must be {FULL_SCAN_CYCLE_MIN}-{FULL_SCAN_CYCLE_MAX}, every build runs incremental"
                    )
                    .yellow()
                )?;
            }
        }
        Ok(())
    }
}
