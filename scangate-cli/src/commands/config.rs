//! `scangate config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use scangate_core::config::{ScangateConfig, ServerConfig};

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const REDACTED: &str = "***REDACTED***";

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load and validate the configuration file, reporting any errors.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails (missing file, invalid values, parse errors).
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = match ScangateConfig::load(config_path).await {
        Ok(config) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
            warnings: warnings_for(&config),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
            warnings: Vec::new(),
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Show the effective configuration (file + env overrides + defaults).
///
/// Passwords are redacted.
///
/// # Errors
///
/// Returns `CliError::Core` if loading fails or `CliError::Command` if the section name is invalid.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let mut config = ScangateConfig::load(config_path).await?;
    redact_credentials(&mut config);

    let config_toml = match section.as_deref() {
        None => toml::to_string_pretty(&config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("server") => toml::to_string_pretty(&config.server),
        Some("global") => toml::to_string_pretty(&config.global),
        Some("job") => toml::to_string_pretty(&config.job),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: general, server, global, job)"
            )));
        }
    }
    .map_err(|e| CliError::Command(format!("failed to serialize configuration: {e}")))?;

    let report = ConfigReport {
        source: config_path.display().to_string(),
        section,
        config_toml,
    };
    writer.render(&report)?;

    Ok(())
}

/// Replace every non-empty password with a placeholder.
fn redact_credentials(config: &mut ScangateConfig) {
    redact_server(&mut config.server);
    if let Some(own) = config.job.own_server.as_mut() {
        redact_server(own);
    }
}

fn redact_server(server: &mut ServerConfig) {
    if !server.password.is_empty() {
        server.password = REDACTED.to_owned();
    }
}

/// Settings that load fine but will not do what the user probably expects.
fn warnings_for(config: &ScangateConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if config.effective_server().url.is_empty() {
        warnings.push("no server url configured; only offline commands will work".to_owned());
    }
    if config.job.project_name.is_empty() {
        warnings.push("job.project_name is empty".to_owned());
    }
    if config.global.legacy_osa_threshold_mix {
        warnings.push(
            "global.legacy_osa_threshold_mix compares OSA medium/low thresholds against SAST counts"
                .to_owned(),
        );
    }
    warnings
}

/// Configuration display report.
///
/// The `config_toml` field is skipped during JSON serialization (only used for text rendering).
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Serialized TOML configuration (with redacted credentials)
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
    /// Non-fatal findings
    pub warnings: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }
        for warning in &self.warnings {
            writeln!(w, "  Warning: {}", warning.yellow())?;
        }

        Ok(())
    }
}
