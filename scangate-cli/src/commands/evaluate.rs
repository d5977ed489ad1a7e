//! `scangate evaluate` command handler
//!
//! Parses an XML report that was already downloaded (for example by an earlier
//! pipeline step), applies the thresholds resolved from the configuration and
//! maps the outcome to the exit code.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use scangate_core::config::{ScangateConfig, ThresholdSource};
use scangate_core::types::{BuildOutcome, Severity};
use scangate_engine::report::parse_report_file;
use scangate_engine::threshold::{ThresholdPlan, Verdict, Violation};
use scangate_engine::types::{ScanResult, SeverityCounts};

use crate::cli::EvaluateArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `evaluate` command.
pub async fn execute(
    args: EvaluateArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = ScangateConfig::load(config_path).await?;

    // Missing report is an IO error, not an invalid result.
    tokio::fs::metadata(&args.report).await?;

    info!(report = %args.report.display(), "evaluating scan report");
    let server_url = config.effective_server().url.clone();
    let result = parse_report_file(args.report.clone(), server_url).await;
    if !result.valid {
        return Err(CliError::Command(format!(
            "failed to parse report {}: {}",
            args.report.display(),
            result.error_message.as_deref().unwrap_or("unknown error")
        )));
    }

    let osa = args.has_osa_counts().then(|| SeverityCounts {
        high: args.osa_high.unwrap_or(0),
        medium: args.osa_medium.unwrap_or(0),
        low: args.osa_low.unwrap_or(0),
        info: 0,
    });

    let report = evaluate(
        &config,
        args.report.display().to_string(),
        &result,
        osa.as_ref(),
    );
    writer.render(&report)?;

    let summary = match report.violations.len() {
        1 => "1 threshold violation".to_owned(),
        n => format!("{n} threshold violations"),
    };
    match report.outcome {
        BuildOutcome::Success => Ok(()),
        BuildOutcome::Unstable => Err(CliError::Unstable(summary)),
        BuildOutcome::Failure => Err(CliError::Failure(summary)),
    }
}

/// Apply the configured thresholds to parsed report counts.
pub fn evaluate(
    config: &ScangateConfig,
    source: String,
    result: &ScanResult,
    osa: Option<&SeverityCounts>,
) -> EvaluationReport {
    let plan = ThresholdPlan::resolve(&config.global, &config.job);

    if osa.is_some() && plan.legacy_osa_mix {
        warn!("legacy OSA threshold mix is enabled: OSA medium/low are compared against SAST counts");
    }
    let Verdict {
        outcome,
        violations,
    } = plan.judge(&result.counts, osa);

    let queries = Severity::THRESHOLDED
        .iter()
        .chain(std::iter::once(&Severity::Info))
        .flat_map(|&severity| result.queries_for(severity))
        .map(|q| QueryLine {
            name: q.pretty_name(),
            severity: q.severity,
            count: q.count,
        })
        .collect();

    EvaluationReport {
        source,
        deep_link: result.metadata.deep_link.clone(),
        scan_type: result.metadata.scan_type.clone(),
        sast: result.counts,
        osa: osa.copied(),
        queries,
        thresholds_active: plan.active,
        threshold_source: plan.source,
        violations,
        outcome,
    }
}

/// Findings of one query.
#[derive(Debug, Serialize)]
pub struct QueryLine {
    pub name: String,
    pub severity: Severity,
    pub count: u32,
}

/// Threshold evaluation report.
#[derive(Debug, Serialize)]
pub struct EvaluationReport {
    /// Report file path
    pub source: String,
    /// Link to the scan in the service UI (empty if unknown)
    pub deep_link: String,
    /// Scan type recorded in the report
    pub scan_type: String,
    /// Static analysis counts from the report
    pub sast: SeverityCounts,
    /// Dependency-analysis counts given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osa: Option<SeverityCounts>,
    /// Queries with findings, most severe first
    pub queries: Vec<QueryLine>,
    /// Whether thresholds were evaluated at all
    pub thresholds_active: bool,
    /// Where the thresholds came from
    pub threshold_source: ThresholdSource,
    /// Crossed thresholds
    pub violations: Vec<Violation>,
    /// Resulting build outcome
    pub outcome: BuildOutcome,
}

impl Render for EvaluationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Scan Report: {}", self.source.bold())?;
        if !self.deep_link.is_empty() {
            writeln!(w, "  Link: {}", self.deep_link)?;
        }
        if !self.scan_type.is_empty() {
            writeln!(w, "  Type: {}", self.scan_type)?;
        }
        writeln!(w)?;

        write_counts(w, "SAST", &self.sast)?;
        if let Some(osa) = &self.osa {
            write_counts(w, "OSA", osa)?;
        }

        if !self.queries.is_empty() {
            writeln!(w)?;
            writeln!(w, "{:<8} {:<50} {:>6}", "Severity", "Query", "Count")?;
            writeln!(w, "{}", "-".repeat(66))?;
            for q in &self.queries {
                writeln!(w, "{:<8} {:<50} {:>6}", q.severity, q.name, q.count)?;
            }
        }

        writeln!(w)?;
        if !self.thresholds_active {
            writeln!(w, "Thresholds: {}", "disabled".dimmed())?;
        } else {
            let source = match self.threshold_source {
                ThresholdSource::Job => "job",
                ThresholdSource::Global => "global",
            };
            writeln!(w, "Thresholds: enabled (source: {source})")?;
        }

        if !self.violations.is_empty() {
            writeln!(w, "Build failed due to:")?;
            for v in &self.violations {
                writeln!(w, "  {}", v.to_string().red())?;
            }
        }

        let outcome = match self.outcome {
            BuildOutcome::Success => self.outcome.to_string().green().bold(),
            BuildOutcome::Unstable => self.outcome.to_string().yellow().bold(),
            BuildOutcome::Failure => self.outcome.to_string().red().bold(),
        };
        writeln!(w, "Result: {outcome}")?;

        Ok(())
    }
}

fn write_counts(w: &mut dyn Write, label: &str, counts: &SeverityCounts) -> std::io::Result<()> {
    writeln!(
        w,
        "{label:<5} High: {}  Medium: {}  Low: {}  Info: {}",
        counts.high, counts.medium, counts.low, counts.info
    )
}
