//! Logging initialization for elbenwald-daemon.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `ElbenwaldConfig`: JSON lines or human-readable pretty output, filtered by
//! `RUST_LOG` when set and `general.log_level` otherwise.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use elbenwald_core::config::GeneralConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Builds the filter: `RUST_LOG` wins over the configured level.
pub fn env_filter(config: &GeneralConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

fn format_layer(log_format: &str) -> Result<BoxedLayer> {
    match log_format {
        "json" => Ok(tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .boxed()),
        "pretty" => Ok(tracing_subscriber::fmt::layer().pretty().boxed()),
        other => Err(anyhow::anyhow!(
            "unknown log format '{}', expected 'json' or 'pretty'",
            other
        )),
    }
}

/// Initialize the global tracing subscriber.
///
/// Must be called once, before the first check runs.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let layer = format_layer(&config.log_format)?;

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter(config))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}
