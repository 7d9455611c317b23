//! `elbenwald config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use elbenwald_core::config::ElbenwaldConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Sections accepted by `config show --section`.
const SECTIONS: [&str; 6] = ["general", "check", "classifier", "source", "report", "metrics"];

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

/// Loads and validates the configuration, rendering every problem found.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails (parse errors, missing or
/// invalid values).
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = match ElbenwaldConfig::load(config_path).await {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Displays the effective configuration (file + env overrides + defaults).
///
/// # Errors
///
/// Returns `CliError::Core` if loading fails or `CliError::Command` if the
/// section name is unknown.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = ElbenwaldConfig::load(config_path).await?;
    let report = ConfigReport::build(config_path, &config, section)?;
    writer.render(&report)
}

/// Configuration display report.
///
/// JSON carries the structured config; text shows it as TOML.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub config: serde_json::Value,
    #[serde(skip)]
    pub config_toml: String,
}

impl ConfigReport {
    fn build(
        config_path: &Path,
        config: &ElbenwaldConfig,
        section: Option<String>,
    ) -> Result<Self, CliError> {
        let (value, config_toml) = match section.as_deref() {
            None => section_output(config)?,
            Some("general") => section_output(&config.general)?,
            Some("check") => section_output(&config.check)?,
            Some("classifier") => section_output(&config.classifier)?,
            Some("source") => section_output(&config.source)?,
            Some("report") => section_output(&config.report)?,
            Some("metrics") => section_output(&config.metrics)?,
            Some(other) => {
                return Err(CliError::Command(format!(
                    "unknown section: {} (expected: {})",
                    other,
                    SECTIONS.join(", ")
                )));
            }
        };

        Ok(Self {
            source: config_path.display().to_string(),
            section,
            config: value,
            config_toml,
        })
    }
}

fn section_output<T: Serialize>(section: &T) -> Result<(serde_json::Value, String), CliError> {
    let value = serde_json::to_value(section)?;
    let config_toml = toml::to_string_pretty(section)
        .map_err(|e| CliError::Command(format!("failed to render TOML: {e}")))?;
    Ok((value, config_toml))
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
    pub source: String,
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
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

        Ok(())
    }
}
