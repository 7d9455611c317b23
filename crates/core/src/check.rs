//! One health check: fetch → aggregate → deliver.
//!
//! [`HealthCheck`] is the caller side of the aggregator. Fetch and
//! aggregation failures abort the check before anything is written. Once a
//! report exists, report delivery and event logging run concurrently and
//! their results are returned side by side in [`CheckOutcome`], so a failing
//! log destination never hides the report and vice versa.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::aggregator::HealthAggregator;
use crate::error::{ConfigError, DataSourceError, ElbenwaldError, LogWriteError, ReportError};
use crate::metrics as m;
use crate::pipeline::{EventLogSink, HealthDataSource, ReportEnvelope, ReportSink};
use crate::types::UnhealthyEvent;

/// Fetch timeout used when none is configured.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a finished check produced.
#[derive(Debug)]
pub struct CheckOutcome {
    pub envelope: ReportEnvelope,
    pub events: Vec<UnhealthyEvent>,
    pub report_delivery: Result<(), ReportError>,
    pub event_log: Result<(), LogWriteError>,
}

impl CheckOutcome {
    /// Both the report and the events reached their destinations.
    pub fn is_fully_delivered(&self) -> bool {
        self.report_delivery.is_ok() && self.event_log.is_ok()
    }
}

/// Data source, aggregator and sinks for checking load balancers.
pub struct HealthCheck<S, R, L> {
    source: S,
    aggregator: HealthAggregator,
    reports: R,
    event_log: L,
    fetch_timeout: Duration,
}

impl<S, R, L> HealthCheck<S, R, L>
where
    S: HealthDataSource,
    R: ReportSink,
    L: EventLogSink,
{
    pub fn new(source: S, aggregator: HealthAggregator, reports: R, event_log: L) -> Self {
        Self {
            source,
            aggregator,
            reports,
            event_log,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn reports(&self) -> &R {
        &self.reports
    }

    pub fn event_log(&self) -> &L {
        &self.event_log
    }

    /// Runs one check of `load_balancer`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingValue`] for an empty name, before any fetch
    /// - [`DataSourceError`] when records cannot be fetched in time
    /// - [`AggregateError`](crate::error::AggregateError) for records without a zone
    ///
    /// Sink failures are not errors here; they are reported in the outcome.
    pub async fn run(&self, load_balancer: &str) -> Result<CheckOutcome, ElbenwaldError> {
        let load_balancer = load_balancer.trim();
        if load_balancer.is_empty() {
            return Err(ConfigError::MissingValue {
                field: "load_balancer".to_owned(),
            }
            .into());
        }

        let started = Instant::now();
        debug!(load_balancer, source = self.source.name(), "fetching instance health");

        let fetched = tokio::time::timeout(
            self.fetch_timeout,
            self.source.fetch_instance_health(load_balancer),
        )
        .await
        .unwrap_or_else(|_| {
            Err(DataSourceError::Timeout {
                load_balancer: load_balancer.to_owned(),
                timeout_secs: self.fetch_timeout.as_secs(),
            })
        });

        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                warn!(load_balancer, error = %e, "failed to fetch instance health");
                record_check(load_balancer, "fetch_error", started);
                return Err(e.into());
            }
        };

        let aggregation = match self.aggregator.aggregate(&records) {
            Ok(aggregation) => aggregation,
            Err(e) => {
                warn!(load_balancer, error = %e, "rejected health records");
                record_check(load_balancer, "aggregate_error", started);
                return Err(e.into());
            }
        };

        let envelope = ReportEnvelope::new(load_balancer, aggregation.report);
        let events = aggregation.events;

        let (report_delivery, event_log) = tokio::join!(
            self.reports.deliver(&envelope),
            self.event_log.append(load_balancer, &events),
        );

        if let Err(e) = &report_delivery {
            warn!(load_balancer, error = %e, "failed to deliver report");
            metrics::counter!(m::REPORT_FAILURES_TOTAL, m::LABEL_LOAD_BALANCER => load_balancer.to_owned())
                .increment(1);
        }
        if let Err(e) = &event_log {
            warn!(load_balancer, error = %e, "failed to append unhealthy events");
            metrics::counter!(m::EVENT_LOG_FAILURES_TOTAL, m::LABEL_LOAD_BALANCER => load_balancer.to_owned())
                .increment(1);
        }

        metrics::counter!(m::UNHEALTHY_EVENTS_TOTAL, m::LABEL_LOAD_BALANCER => load_balancer.to_owned())
            .increment(events.len() as u64);
        record_check(load_balancer, "success", started);

        info!(
            load_balancer,
            check_id = %envelope.check_id,
            instances = records.len(),
            total = envelope.report.total,
            zones = envelope.report.zones,
            unhealthy_zones = envelope.report.unhealthy_zones,
            unknown_zones = envelope.report.unknown_zones,
            unhealthy_events = events.len(),
            "health check completed"
        );

        Ok(CheckOutcome {
            envelope,
            events,
            report_delivery,
            event_log,
        })
    }
}

fn record_check(load_balancer: &str, result: &'static str, started: Instant) {
    metrics::counter!(
        m::CHECKS_TOTAL,
        m::LABEL_LOAD_BALANCER => load_balancer.to_owned(),
        m::LABEL_RESULT => result
    )
    .increment(1);
    metrics::histogram!(m::CHECK_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::AggregateError;
    use crate::types::InstanceHealthRecord;

    struct StaticSource {
        result: Mutex<Option<Result<Vec<InstanceHealthRecord>, DataSourceError>>>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn ok(records: Vec<InstanceHealthRecord>) -> Self {
            Self {
                result: Mutex::new(Some(Ok(records))),
                calls: AtomicUsize::new(0),
            }
        }

        fn err(e: DataSourceError) -> Self {
            Self {
                result: Mutex::new(Some(Err(e))),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl HealthDataSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch_instance_health(
            &self,
            _load_balancer: &str,
        ) -> Result<Vec<InstanceHealthRecord>, DataSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    struct SlowSource;

    impl HealthDataSource for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch_instance_health(
            &self,
            _load_balancer: &str,
        ) -> Result<Vec<InstanceHealthRecord>, DataSourceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingReports {
        delivered: Mutex<Vec<ReportEnvelope>>,
        fail: bool,
    }

    impl ReportSink for RecordingReports {
        async fn deliver(&self, envelope: &ReportEnvelope) -> Result<(), ReportError> {
            if self.fail {
                return Err(ReportError::Write("monitoring host unreachable".to_owned()));
            }
            self.delivered.lock().unwrap().push(envelope.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingLog {
        lines: Mutex<Vec<String>>,
        fail: bool,
    }

    impl EventLogSink for RecordingLog {
        async fn append(
            &self,
            load_balancer: &str,
            events: &[UnhealthyEvent],
        ) -> Result<(), LogWriteError> {
            if self.fail {
                return Err(LogWriteError::Open {
                    path: "/var/log/elbenwald.log".into(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                });
            }
            let mut lines = self.lines.lock().unwrap();
            lines.extend(events.iter().map(|e| e.log_line(load_balancer)));
            Ok(())
        }
    }

    fn mixed_records() -> Vec<InstanceHealthRecord> {
        vec![
            InstanceHealthRecord::in_service("i-1", "a"),
            InstanceHealthRecord::out_of_service("i-2", "a", "transient error"),
            InstanceHealthRecord::out_of_service("i-3", "b", "failed health checks"),
        ]
    }

    fn check(
        source: StaticSource,
        reports: RecordingReports,
        log: RecordingLog,
    ) -> HealthCheck<StaticSource, RecordingReports, RecordingLog> {
        HealthCheck::new(source, HealthAggregator::default(), reports, log)
    }

    #[tokio::test]
    async fn successful_check_delivers_report_and_events() {
        // Given: a source with mixed records
        let check = check(
            StaticSource::ok(mixed_records()),
            RecordingReports::default(),
            RecordingLog::default(),
        );

        // When: running the check
        let outcome = check.run("web").await.expect("check should succeed");

        // Then: report delivered and both unhealthy events logged
        assert!(outcome.is_fully_delivered());
        assert_eq!(outcome.envelope.load_balancer, "web");
        assert_eq!(outcome.envelope.report.total, 2);
        assert_eq!(outcome.events.len(), 2);
        assert_eq!(check.reports().delivered.lock().unwrap().len(), 1);
        let lines = check.event_log().lines.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[web] [a] [i-2] [transient error]"));
    }

    #[tokio::test]
    async fn empty_load_balancer_name_is_rejected_before_fetch() {
        let check = check(
            StaticSource::ok(mixed_records()),
            RecordingReports::default(),
            RecordingLog::default(),
        );

        let err = check.run("   ").await.unwrap_err();

        assert!(matches!(
            err,
            ElbenwaldError::Config(ConfigError::MissingValue { .. })
        ));
        assert_eq!(check.source().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_failure_produces_no_report_and_no_events() {
        let check = check(
            StaticSource::err(DataSourceError::UnknownLoadBalancer("web".to_owned())),
            RecordingReports::default(),
            RecordingLog::default(),
        );

        let err = check.run("web").await.unwrap_err();

        assert!(matches!(
            err,
            ElbenwaldError::DataSource(DataSourceError::UnknownLoadBalancer(_))
        ));
        assert!(check.reports().delivered.lock().unwrap().is_empty());
        assert!(check.event_log().lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_zone_aborts_check() {
        let check = check(
            StaticSource::ok(vec![InstanceHealthRecord::out_of_service("i-9", "", "x")]),
            RecordingReports::default(),
            RecordingLog::default(),
        );

        let err = check.run("web").await.unwrap_err();

        assert!(matches!(
            err,
            ElbenwaldError::Aggregate(AggregateError::MissingZone { .. })
        ));
        assert!(check.reports().delivered.lock().unwrap().is_empty());
        assert!(check.event_log().lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn log_failure_does_not_suppress_report() {
        let check = check(
            StaticSource::ok(mixed_records()),
            RecordingReports::default(),
            RecordingLog {
                fail: true,
                ..RecordingLog::default()
            },
        );

        let outcome = check.run("web").await.expect("check should succeed");

        assert!(outcome.report_delivery.is_ok());
        assert!(outcome.event_log.is_err());
        assert!(!outcome.is_fully_delivered());
        assert_eq!(check.reports().delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn report_failure_does_not_suppress_event_log() {
        let check = check(
            StaticSource::ok(mixed_records()),
            RecordingReports {
                fail: true,
                ..RecordingReports::default()
            },
            RecordingLog::default(),
        );

        let outcome = check.run("web").await.expect("check should succeed");

        assert!(outcome.report_delivery.is_err());
        assert!(outcome.event_log.is_ok());
        assert_eq!(check.event_log().lines.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out() {
        let check = HealthCheck::new(
            SlowSource,
            HealthAggregator::default(),
            RecordingReports::default(),
            RecordingLog::default(),
        )
        .with_fetch_timeout(Duration::from_secs(5));

        let err = check.run("web").await.unwrap_err();

        match err {
            ElbenwaldError::DataSource(DataSourceError::Timeout {
                load_balancer,
                timeout_secs,
            }) => {
                assert_eq!(load_balancer, "web");
                assert_eq!(timeout_secs, 5);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(check.reports().delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_fleet_still_delivers_empty_report() {
        let check = check(
            StaticSource::ok(Vec::new()),
            RecordingReports::default(),
            RecordingLog::default(),
        );

        let outcome = check.run("web").await.expect("empty fleet is not an error");

        assert!(outcome.envelope.report.is_empty());
        assert!(outcome.events.is_empty());
        assert_eq!(check.reports().delivered.lock().unwrap().len(), 1);
    }
}
