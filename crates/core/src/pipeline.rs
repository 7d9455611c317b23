//! Collaborator traits -- the I/O seams around the aggregator.
//!
//! ```text
//!  HealthDataSource ──records──▶ HealthAggregator ──report──▶ ReportSink
//!                                        │
//!                                        └──events──▶ EventLogSink
//! ```
//!
//! Implementations live in `elbenwald-adapters`; tests use in-memory mocks.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregator::AggregateReport;
use crate::error::{DataSourceError, LogWriteError, ReportError};
use crate::types::{InstanceHealthRecord, UnhealthyEvent};

/// Supplies the current health of every instance behind a load balancer.
pub trait HealthDataSource: Send + Sync + 'static {
    /// Short name for logs (`"file"`, `"command"`).
    fn name(&self) -> &str;

    /// Fetches one record per registered instance.
    ///
    /// # Errors
    ///
    /// Any [`DataSourceError`]; the caller skips aggregation for the cycle.
    fn fetch_instance_health(
        &self,
        load_balancer: &str,
    ) -> impl Future<Output = Result<Vec<InstanceHealthRecord>, DataSourceError>> + Send;
}

/// One delivered report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEnvelope {
    /// Unique id of the check that produced the report
    pub check_id: String,
    pub load_balancer: String,
    pub generated_at: DateTime<Utc>,
    pub report: AggregateReport,
}

impl ReportEnvelope {
    pub fn new(load_balancer: impl Into<String>, report: AggregateReport) -> Self {
        Self {
            check_id: uuid::Uuid::new_v4().to_string(),
            load_balancer: load_balancer.into(),
            generated_at: Utc::now(),
            report,
        }
    }
}

/// Receives one aggregate report per check.
pub trait ReportSink: Send + Sync + 'static {
    fn deliver(
        &self,
        envelope: &ReportEnvelope,
    ) -> impl Future<Output = Result<(), ReportError>> + Send;
}

/// Append-only destination for unhealthy-instance events.
pub trait EventLogSink: Send + Sync + 'static {
    /// Appends `events` in order. Prior content is never rewritten.
    fn append(
        &self,
        load_balancer: &str,
        events: &[UnhealthyEvent],
    ) -> impl Future<Output = Result<(), LogWriteError>> + Send;
}
