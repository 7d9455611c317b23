//! Per-round health of the checked load balancers.
//!
//! Every check in a round yields one [`LoadBalancerHealth`]. The round
//! status is the worst status among them.
//!
//! # Aggregation Rule
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Failed -> Degraded(reasons)
//! - Any Failed -> Failed(reasons)

use chrono::{DateTime, Utc};
use serde::Serialize;

use elbenwald_core::check::CheckOutcome;
use elbenwald_core::error::ElbenwaldError;

/// Outcome of one load balancer check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CheckStatus {
    /// Report delivered and events logged
    Healthy,
    /// Report produced, but a sink failed
    Degraded(String),
    /// No report (fetch, aggregation or task failure)
    Failed(String),
}

impl CheckStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Health of one load balancer after the latest round.
#[derive(Debug, Clone, Serialize)]
pub struct LoadBalancerHealth {
    pub name: String,
    pub status: CheckStatus,
    /// Id of the delivered report, if one was produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_id: Option<String>,
    /// Zones without healthy instances in the produced report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhealthy_zones: Option<usize>,
    /// When the check finished
    pub checked_at: DateTime<Utc>,
}

impl LoadBalancerHealth {
    /// Classifies the result of `HealthCheck::run`.
    pub fn from_result(name: &str, result: &Result<CheckOutcome, ElbenwaldError>) -> Self {
        match result {
            Ok(outcome) => {
                let mut problems = Vec::new();
                if let Err(e) = &outcome.report_delivery {
                    problems.push(format!("report: {e}"));
                }
                if let Err(e) = &outcome.event_log {
                    problems.push(format!("event log: {e}"));
                }
                let status = if problems.is_empty() {
                    CheckStatus::Healthy
                } else {
                    CheckStatus::Degraded(problems.join("; "))
                };
                Self {
                    name: name.to_owned(),
                    status,
                    check_id: Some(outcome.envelope.check_id.clone()),
                    unhealthy_zones: Some(outcome.envelope.report.unhealthy_zones),
                    checked_at: Utc::now(),
                }
            }
            Err(e) => Self::failed(name, e.to_string()),
        }
    }

    /// A check that produced no report.
    pub fn failed(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_owned(),
            status: CheckStatus::Failed(reason.into()),
            check_id: None,
            unhealthy_zones: None,
            checked_at: Utc::now(),
        }
    }
}

/// Aggregated daemon health.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Worst status of the latest round
    pub status: CheckStatus,
    pub uptime_secs: u64,
    /// Rounds started since launch
    pub rounds: u64,
    pub load_balancers: Vec<LoadBalancerHealth>,
}

/// Worst status across `checks`: Failed > Degraded > Healthy.
pub fn aggregate_status(checks: &[LoadBalancerHealth]) -> CheckStatus {
    let mut any_failed = false;
    let mut reasons = Vec::new();

    for check in checks {
        match &check.status {
            CheckStatus::Healthy => {}
            CheckStatus::Degraded(reason) => {
                reasons.push(format!("{}: {}", check.name, reason));
            }
            CheckStatus::Failed(reason) => {
                any_failed = true;
                reasons.push(format!("{}: {}", check.name, reason));
            }
        }
    }

    if reasons.is_empty() {
        CheckStatus::Healthy
    } else if any_failed {
        CheckStatus::Failed(reasons.join("; "))
    } else {
        CheckStatus::Degraded(reasons.join("; "))
    }
}
