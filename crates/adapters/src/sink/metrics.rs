//! Publishes reports as gauges through the `metrics` facade.

use elbenwald_core::error::ReportError;
use elbenwald_core::metrics as m;
use elbenwald_core::pipeline::{ReportEnvelope, ReportSink};

/// Sets one gauge per report field, labelled by load balancer (and zone).
///
/// With no recorder installed every call is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsReportSink;

impl MetricsReportSink {
    pub fn new() -> Self {
        Self
    }

    fn publish(envelope: &ReportEnvelope) {
        let lb = envelope.load_balancer.clone();
        let report = &envelope.report;

        for (zone, stats) in &report.zone_stats {
            metrics::gauge!(
                m::ZONE_HEALTHY_INSTANCES,
                m::LABEL_LOAD_BALANCER => lb.clone(),
                m::LABEL_ZONE => zone.clone()
            )
            .set(stats.healthy_count as f64);
            metrics::gauge!(
                m::ZONE_TRANSIENT_INSTANCES,
                m::LABEL_LOAD_BALANCER => lb.clone(),
                m::LABEL_ZONE => zone.clone()
            )
            .set(stats.transient_count as f64);
        }

        metrics::gauge!(m::HEALTHY_INSTANCES, m::LABEL_LOAD_BALANCER => lb.clone())
            .set(report.total as f64);
        metrics::gauge!(m::ZONES, m::LABEL_LOAD_BALANCER => lb.clone()).set(report.zones as f64);
        metrics::gauge!(m::HEALTHY_ZONES, m::LABEL_LOAD_BALANCER => lb.clone())
            .set(report.healthy_zones as f64);
        metrics::gauge!(m::UNHEALTHY_ZONES, m::LABEL_LOAD_BALANCER => lb.clone())
            .set(report.unhealthy_zones as f64);
        metrics::gauge!(m::UNKNOWN_ZONES, m::LABEL_LOAD_BALANCER => lb.clone())
            .set(report.unknown_zones as f64);
        if let Some(minimum) = report.minimum {
            metrics::gauge!(m::MINIMUM_ZONE_HEALTHY, m::LABEL_LOAD_BALANCER => lb.clone())
                .set(minimum as f64);
        }
        metrics::gauge!(m::AVERAGE_ZONE_HEALTHY, m::LABEL_LOAD_BALANCER => lb).set(report.average);
    }
}

impl ReportSink for MetricsReportSink {
    async fn deliver(&self, envelope: &ReportEnvelope) -> Result<(), ReportError> {
        Self::publish(envelope);
        Ok(())
    }
}
