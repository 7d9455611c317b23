//! Report and event log sinks.

mod event_log;
mod metrics;
mod report;

use elbenwald_core::config::ElbenwaldConfig;
use elbenwald_core::error::ReportError;
use elbenwald_core::pipeline::{ReportEnvelope, ReportSink};

pub use event_log::AppendFileEventLog;
pub use metrics::MetricsReportSink;
pub use report::JsonLinesReportSink;

/// One member of a [`CompositeReportSink`].
#[derive(Debug)]
pub enum ReportDestination {
    JsonLines(JsonLinesReportSink),
    Metrics(MetricsReportSink),
}

impl ReportSink for ReportDestination {
    async fn deliver(&self, envelope: &ReportEnvelope) -> Result<(), ReportError> {
        match self {
            Self::JsonLines(sink) => sink.deliver(envelope).await,
            Self::Metrics(sink) => sink.deliver(envelope).await,
        }
    }
}

/// Fans a report out to several destinations.
///
/// Every destination is attempted; the first error is returned.
#[derive(Debug, Default)]
pub struct CompositeReportSink {
    destinations: Vec<ReportDestination>,
}

impl CompositeReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, destination: ReportDestination) -> Self {
        self.destinations.push(destination);
        self
    }

    /// JSON lines at `[report] path`, plus gauges when `[metrics]` is enabled.
    pub fn from_config(config: &ElbenwaldConfig) -> Self {
        let sink = Self::new().with(ReportDestination::JsonLines(JsonLinesReportSink::new(
            &config.report.path,
        )));
        if config.metrics.enabled {
            sink.with(ReportDestination::Metrics(MetricsReportSink::new()))
        } else {
            sink
        }
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

impl ReportSink for CompositeReportSink {
    async fn deliver(&self, envelope: &ReportEnvelope) -> Result<(), ReportError> {
        let mut first_error = None;
        for destination in &self.destinations {
            if let Err(e) = destination.deliver(envelope).await {
                tracing::debug!(error = %e, "report destination failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use elbenwald_core::aggregator::AggregateReport;

    use super::*;

    fn envelope() -> ReportEnvelope {
        ReportEnvelope::new("web", AggregateReport::from_zone_stats(BTreeMap::new()))
    }

    #[test]
    fn from_config_adds_metrics_only_when_enabled() {
        let mut config = ElbenwaldConfig::default();
        assert_eq!(CompositeReportSink::from_config(&config).len(), 1);

        config.metrics.enabled = true;
        assert_eq!(CompositeReportSink::from_config(&config).len(), 2);
    }

    #[tokio::test]
    async fn failing_member_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let good = dir.path().join("reports.jsonl");

        let sink = CompositeReportSink::new()
            .with(ReportDestination::JsonLines(JsonLinesReportSink::new(
                blocker.join("x.jsonl").to_str().unwrap(),
            )))
            .with(ReportDestination::JsonLines(JsonLinesReportSink::new(
                good.to_str().unwrap(),
            )));

        let err = sink.deliver(&envelope()).await.unwrap_err();

        assert!(matches!(err, ReportError::Write(_)));
        assert_eq!(std::fs::read_to_string(&good).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn empty_composite_succeeds() {
        let sink = CompositeReportSink::new();
        assert!(sink.is_empty());
        assert!(sink.deliver(&envelope()).await.is_ok());
    }
}
