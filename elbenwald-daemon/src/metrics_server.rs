//! Prometheus metrics HTTP endpoint.
//!
//! Uses the built-in HTTP listener of `metrics-exporter-prometheus`. Once
//! installed, every `metrics::gauge!()` call in the checks and sinks shows up
//! on `http://<listen_addr>:<port>/metrics`.

use std::net::SocketAddr;

use anyhow::Result;
use elbenwald_core::config::MetricsConfig;
use elbenwald_core::metrics as m;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

/// Parses `listen_addr:port`.
pub fn listen_socket(config: &MetricsConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))
}

/// Installs the global recorder and starts the HTTP listener.
///
/// Call once per process; a second call fails because the global recorder
/// is already set.
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr = listen_socket(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(m::CHECK_DURATION_SECONDS.to_owned()),
            &m::CHECK_DURATION_BUCKETS,
        )
        .map_err(|e| anyhow::anyhow!("invalid histogram buckets: {}", e))?
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    m::describe_all();

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");
    Ok(())
}
