//! Domain types shared by the aggregator, the collaborators and the binaries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in the error log, e.g. `2024-01-15 12:00:00 +0000`.
pub const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Health state reported by the load balancer for one instance.
///
/// Only `InService` counts as serving traffic. Any state string the source
/// reports that is not one of the well-known values is kept verbatim in
/// `Other` and treated as a non-service state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceState {
    /// Instance passes health checks and receives traffic
    InService,
    /// Instance fails health checks
    OutOfService,
    /// Load balancer cannot determine the state yet
    Unknown,
    /// Any other non-service state
    Other(String),
}

impl InstanceState {
    /// Whether the instance is serving traffic.
    pub fn is_in_service(&self) -> bool {
        matches!(self, Self::InService)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InService => "InService",
            Self::OutOfService => "OutOfService",
            Self::Unknown => "Unknown",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for InstanceState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "InService" => Self::InService,
            "OutOfService" => Self::OutOfService,
            "Unknown" => Self::Unknown,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for InstanceState {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<InstanceState> for String {
    fn from(state: InstanceState) -> Self {
        match state {
            InstanceState::Other(s) => s,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health of one instance registered behind a load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceHealthRecord {
    /// Opaque instance identifier
    pub instance_id: String,
    /// Zone the instance runs in; the aggregation key
    pub availability_zone: String,
    /// Reported state
    pub state: InstanceState,
    /// Reason text, meaningful when the instance is not in service
    #[serde(default)]
    pub description: String,
}

impl InstanceHealthRecord {
    pub fn new(
        instance_id: impl Into<String>,
        availability_zone: impl Into<String>,
        state: impl Into<InstanceState>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            availability_zone: availability_zone.into(),
            state: state.into(),
            description: description.into(),
        }
    }

    /// Shorthand for a record that is in service.
    pub fn in_service(instance_id: impl Into<String>, availability_zone: impl Into<String>) -> Self {
        Self::new(instance_id, availability_zone, InstanceState::InService, "N/A")
    }

    /// Shorthand for an out-of-service record with the given reason.
    pub fn out_of_service(
        instance_id: impl Into<String>,
        availability_zone: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            instance_id,
            availability_zone,
            InstanceState::OutOfService,
            description,
        )
    }
}

/// One instance observed outside of `InService`.
///
/// Events are write-once: fields are only readable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnhealthyEvent {
    observed_at: DateTime<Utc>,
    zone: String,
    instance_id: String,
    description: String,
}

impl UnhealthyEvent {
    pub fn new(
        observed_at: DateTime<Utc>,
        zone: impl Into<String>,
        instance_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            observed_at,
            zone: zone.into(),
            instance_id: instance_id.into(),
            description: description.into(),
        }
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Formats the event as one error log line (without the trailing newline):
    ///
    /// `[<timestamp>] [<load_balancer>] [<zone>] [<instance_id>] [<description>]`
    ///
    /// Line breaks inside the description are flattened so one event never
    /// spans several lines.
    pub fn log_line(&self, load_balancer: &str) -> String {
        let description: String = self
            .description
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        format!(
            "[{}] [{}] [{}] [{}] [{}]",
            self.observed_at.format(EVENT_TIMESTAMP_FORMAT),
            load_balancer,
            self.zone,
            self.instance_id,
            description,
        )
    }
}

impl fmt::Display for UnhealthyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {}: {}",
            self.instance_id, self.zone, self.description
        )
    }
}
