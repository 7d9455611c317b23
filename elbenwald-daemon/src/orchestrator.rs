//! Check scheduling -- assembly, rounds, and lifecycle management.
//!
//! The [`Orchestrator`] loads configuration, builds the shared
//! [`HealthCheck`] and runs one round per interval tick until a shutdown
//! signal arrives.
//!
//! # Rounds
//!
//! Every configured load balancer is checked in its own task of a
//! `JoinSet`, so a slow or failing load balancer never delays the others.
//! A round is bounded by the fetch timeout. Ticks missed while a round is
//! still running are skipped.
//!
//! # Shutdown
//!
//! SIGTERM/SIGINT (or [`Orchestrator::shutdown_handle`]) is broadcast to the
//! background tasks. A round in flight completes before the daemon exits.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use elbenwald_adapters::{AppendFileEventLog, CompositeReportSink, ConfiguredSource};
use elbenwald_core::aggregator::HealthAggregator;
use elbenwald_core::check::HealthCheck;
use elbenwald_core::classify::classifier_from_config;
use elbenwald_core::config::ElbenwaldConfig;
use elbenwald_core::metrics as m;

use crate::health::{CheckStatus, DaemonHealth, LoadBalancerHealth, aggregate_status};
use crate::metrics_server;
use crate::pid_file::PidFile;

/// The check the daemon runs for every load balancer.
pub type DaemonCheck = HealthCheck<ConfiguredSource, CompositeReportSink, AppendFileEventLog>;

/// The daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: ElbenwaldConfig,
    /// Shared by every check task of a round.
    check: Arc<DaemonCheck>,
    /// Shutdown broadcast sender (signals the loop and background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
    /// Rounds started since launch.
    rounds: u64,
    /// Results of the latest round, in configuration order.
    last_round: Vec<LoadBalancerHealth>,
}

impl Orchestrator {
    /// Loads `elbenwald.toml` (with environment overrides) and builds the
    /// orchestrator.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = ElbenwaldConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Builds from an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// - configuration validation fails
    /// - the metrics recorder cannot be installed
    /// - the data source cannot be built (e.g. unreadable credentials)
    pub async fn build_from_config(config: ElbenwaldConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            record_daemon_metrics();
        }

        let classifier = classifier_from_config(&config.classifier)
            .map_err(|e| anyhow::anyhow!("invalid classifier: {}", e))?;
        let source = ConfiguredSource::from_config(&config)
            .await
            .map_err(|e| anyhow::anyhow!("failed to build data source: {}", e))?;
        let reports = CompositeReportSink::from_config(&config);
        let event_log = AppendFileEventLog::new(&config.check.log_path);

        let check = HealthCheck::new(source, HealthAggregator::new(classifier), reports, event_log)
            .with_fetch_timeout(Duration::from_secs(config.check.fetch_timeout_secs));

        let (shutdown_tx, _) = broadcast::channel(16);

        tracing::info!(
            load_balancers = ?config.check.load_balancers,
            interval_secs = config.check.interval_secs,
            source = %config.source.kind,
            log_path = %config.check.log_path,
            report_path = %config.report.path,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            check: Arc::new(check),
            shutdown_tx,
            start_time: Instant::now(),
            rounds: 0,
            last_round: Vec::new(),
        })
    }

    /// Checks every configured load balancer once, concurrently.
    ///
    /// Returns one entry per load balancer in configuration order.
    pub async fn run_round(&mut self) -> &[LoadBalancerHealth] {
        self.rounds += 1;
        metrics::counter!(m::DAEMON_ROUNDS_TOTAL).increment(1);
        let round = self.rounds;
        let started = Instant::now();

        let load_balancers = &self.config.check.load_balancers;
        let mut tasks = JoinSet::new();
        let mut slots_by_task = HashMap::new();
        for (slot, name) in load_balancers.iter().enumerate() {
            let check = Arc::clone(&self.check);
            let lb = name.clone();
            let handle = tasks.spawn(async move {
                let result = check.run(&lb).await;
                LoadBalancerHealth::from_result(&lb, &result)
            });
            slots_by_task.insert(handle.id(), slot);
        }

        let mut slots: Vec<Option<LoadBalancerHealth>> = vec![None; load_balancers.len()];
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, health)) => {
                    if let Some(&slot) = slots_by_task.get(&id) {
                        slots[slot] = Some(health);
                    }
                }
                Err(e) => {
                    let Some(&slot) = slots_by_task.get(&e.id()) else {
                        continue;
                    };
                    let name = &load_balancers[slot];
                    tracing::error!(load_balancer = %name, error = %e, "check task failed");
                    slots[slot] = Some(LoadBalancerHealth::failed(
                        name,
                        format!("check task failed: {e}"),
                    ));
                }
            }
        }

        self.last_round = slots.into_iter().flatten().collect();

        let status = aggregate_status(&self.last_round);
        let failed = self
            .last_round
            .iter()
            .filter(|lb| lb.status.is_failed())
            .count();
        match &status {
            CheckStatus::Healthy => tracing::info!(
                round,
                checks = self.last_round.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "round completed"
            ),
            CheckStatus::Degraded(reason) | CheckStatus::Failed(reason) => tracing::warn!(
                round,
                checks = self.last_round.len(),
                failed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                reason = %reason,
                "round completed with problems"
            ),
        }

        &self.last_round
    }

    /// Runs a single round.
    ///
    /// # Errors
    ///
    /// Fails when any check produced no report.
    pub async fn run_once(&mut self) -> Result<()> {
        let results = self.run_round().await;
        let failed: Vec<&str> = results
            .iter()
            .filter(|lb| lb.status.is_failed())
            .map(|lb| lb.name.as_str())
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "{} of {} checks failed: {}",
                failed.len(),
                results.len(),
                failed.join(", ")
            ))
        }
    }

    /// Runs one round per interval until shutdown.
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    /// - a message on [`shutdown_handle`](Self::shutdown_handle)
    pub async fn run(&mut self) -> Result<()> {
        let _pid_file = if self.config.general.pid_file.is_empty() {
            None
        } else {
            Some(PidFile::create(&self.config.general.pid_file)?)
        };

        let mut uptime_updater = if self.config.metrics.enabled {
            Some(spawn_uptime_updater(
                self.start_time,
                self.shutdown_tx.subscribe(),
            ))
        } else {
            None
        };

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let signal = wait_for_shutdown_signal();
        tokio::pin!(signal);

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.check.interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("entering check loop");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_round().await;
                }
                received = &mut signal => {
                    let name = received?;
                    tracing::info!(signal = name, "shutdown signal received");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
            }
        }

        let _ = self.shutdown_tx.send(());
        if let Some(task) = uptime_updater.take() {
            let _ = task.await;
        }

        tracing::info!(rounds = self.rounds, "elbenwald-daemon shut down");
        Ok(())
    }

    /// Sender that stops [`run`](Self::run) when a message is sent.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Health of the latest round.
    pub fn health(&self) -> DaemonHealth {
        DaemonHealth {
            status: aggregate_status(&self.last_round),
            uptime_secs: self.start_time.elapsed().as_secs(),
            rounds: self.rounds,
            load_balancers: self.last_round.clone(),
        }
    }

    pub fn config(&self) -> &ElbenwaldConfig {
        &self.config
    }
}

/// Waits for SIGTERM or SIGINT and returns the signal name.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

fn record_daemon_metrics() {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "daemon metrics recorded");
}

/// Keeps the uptime gauge fresh for Prometheus scrapes.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
