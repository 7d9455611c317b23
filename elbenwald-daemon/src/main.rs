use anyhow::Result;
use clap::Parser;

use elbenwald_core::config::ElbenwaldConfig;
use elbenwald_daemon::cli::DaemonCli;
use elbenwald_daemon::logging::init_tracing;
use elbenwald_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // file < environment < command line
    let mut config = ElbenwaldConfig::from_file(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load {}: {}", cli.config.display(), e))?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    init_tracing(&config.general)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "elbenwald-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config).await?;

    if cli.once {
        orchestrator.run_once().await
    } else {
        orchestrator.run().await
    }
}
