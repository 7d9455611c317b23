//! `elbenwald check` command handler

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use elbenwald_adapters::{AppendFileEventLog, ConfiguredSource};
use elbenwald_core::aggregator::HealthAggregator;
use elbenwald_core::check::HealthCheck;
use elbenwald_core::classify::classifier_from_config;
use elbenwald_core::config::ElbenwaldConfig;

use crate::cli::CheckArgs;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Execute the `check` command.
///
/// Checks every load balancer in order, printing each report as it is
/// produced. Remaining load balancers are still checked after a failure.
///
/// # Errors
///
/// - `CliError::Config` if the configuration is invalid
/// - `CliError::DataSource` if any check produced no report
/// - `CliError::Delivery` if a report or the error log could not be written
pub async fn execute(
    args: CheckArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path, &args.load_balancers).await?;

    let classifier =
        classifier_from_config(&config.classifier).map_err(|e| CliError::Config(e.to_string()))?;
    let source = ConfiguredSource::from_config(&config).await?;
    let check = HealthCheck::new(
        source,
        HealthAggregator::new(classifier),
        *writer,
        AppendFileEventLog::new(&config.check.log_path),
    )
    .with_fetch_timeout(Duration::from_secs(config.check.fetch_timeout_secs));

    let mut failed = Vec::new();
    let mut undelivered = Vec::new();

    for name in &config.check.load_balancers {
        match check.run(name).await {
            Ok(outcome) => {
                if let Err(e) = &outcome.report_delivery {
                    undelivered.push(format!("{name}: report: {e}"));
                }
                if let Err(e) = &outcome.event_log {
                    undelivered.push(format!("{name}: event log: {e}"));
                }
            }
            Err(e) => {
                warn!(load_balancer = %name, error = %e, "check failed");
                failed.push(format!("{name}: {e}"));
            }
        }
    }

    info!(
        checks = config.check.load_balancers.len(),
        failed = failed.len(),
        undelivered = undelivered.len(),
        "check command finished"
    );

    if !failed.is_empty() {
        return Err(CliError::DataSource(failed.join("; ")));
    }
    if !undelivered.is_empty() {
        return Err(CliError::Delivery(undelivered.join("; ")));
    }
    Ok(())
}

/// File, then environment, then `--load-balancer`, then validation.
async fn load_config(
    config_path: &Path,
    load_balancers: &[String],
) -> Result<ElbenwaldConfig, CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let mut config = ElbenwaldConfig::from_file(config_path)
        .await
        .map_err(|e| CliError::Config(e.to_string()))?;
    config.apply_env_overrides();
    config.override_load_balancers(load_balancers);
    config
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(config)
}
