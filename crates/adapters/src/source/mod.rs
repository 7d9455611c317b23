//! Health data sources.
//!
//! Both sources speak the same JSON snapshot format, parsed by
//! [`parse_snapshot`]:
//!
//! ```json
//! {"InstanceStates": [
//!   {"InstanceId": "i-0a1b", "AvailabilityZone": "eu-west-1a",
//!    "State": "OutOfService", "Description": "A transient error occurred."}
//! ]}
//! ```
//!
//! A bare array of records and the snake_case keys of
//! [`InstanceHealthRecord`] are accepted as well.

mod command;
mod file;

use std::collections::HashSet;

use elbenwald_core::config::ElbenwaldConfig;
use elbenwald_core::error::{ConfigError, DataSourceError, ElbenwaldError};
use elbenwald_core::pipeline::HealthDataSource;
use elbenwald_core::types::InstanceHealthRecord;
use serde::Deserialize;
use tracing::info;

use crate::credentials::AwsCredentials;

pub use command::CommandSource;
pub use file::FileSource;

#[derive(Deserialize)]
struct WireRecord {
    #[serde(alias = "InstanceId")]
    instance_id: String,
    #[serde(alias = "AvailabilityZone", default)]
    availability_zone: Option<String>,
    #[serde(alias = "State")]
    state: String,
    #[serde(alias = "Description", default)]
    description: Option<String>,
}

/// Parses one snapshot document into records.
///
/// # Errors
///
/// - [`DataSourceError::MalformedResponse`] for invalid JSON or an unexpected shape
/// - [`DataSourceError::MalformedRecord`] for an empty instance id, a
///   missing zone or a duplicate instance id
pub fn parse_snapshot(json: &str) -> Result<Vec<InstanceHealthRecord>, DataSourceError> {
    let document: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| DataSourceError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let list = match document {
        serde_json::Value::Array(items) => serde_json::Value::Array(items),
        serde_json::Value::Object(mut object) => object
            .remove("instances")
            .or_else(|| object.remove("InstanceStates"))
            .ok_or_else(|| {
                DataSourceError::MalformedResponse(
                    "expected an 'instances' or 'InstanceStates' array".to_owned(),
                )
            })?,
        _ => {
            return Err(DataSourceError::MalformedResponse(
                "expected a JSON array or object".to_owned(),
            ));
        }
    };

    let wire: Vec<WireRecord> = serde_json::from_value(list)
        .map_err(|e| DataSourceError::MalformedResponse(format!("invalid record list: {e}")))?;

    let mut seen = HashSet::with_capacity(wire.len());
    let mut records = Vec::with_capacity(wire.len());

    for record in wire {
        if record.instance_id.trim().is_empty() {
            return Err(DataSourceError::MalformedRecord {
                instance_id: record.instance_id,
                reason: "empty instance id".to_owned(),
            });
        }

        let zone = record.availability_zone.unwrap_or_default();
        if zone.trim().is_empty() {
            return Err(DataSourceError::MalformedRecord {
                instance_id: record.instance_id,
                reason: "missing availability zone".to_owned(),
            });
        }

        if !seen.insert(record.instance_id.clone()) {
            return Err(DataSourceError::MalformedRecord {
                instance_id: record.instance_id,
                reason: "duplicate instance id".to_owned(),
            });
        }

        records.push(InstanceHealthRecord::new(
            record.instance_id,
            zone,
            record.state,
            record.description.unwrap_or_default(),
        ));
    }

    Ok(records)
}

/// The data source selected by the `[source]` config section.
#[derive(Debug)]
pub enum ConfiguredSource {
    File(FileSource),
    Command(CommandSource),
}

impl ConfiguredSource {
    /// Builds the configured source.
    ///
    /// Credentials are only loaded for the command source.
    pub async fn from_config(config: &ElbenwaldConfig) -> Result<Self, ElbenwaldError> {
        let source = &config.source;
        match source.kind.as_str() {
            "file" => {
                info!(snapshot_dir = %source.snapshot_dir, "using file source");
                Ok(Self::File(FileSource::new(&source.snapshot_dir)))
            }
            "command" => {
                let credentials = AwsCredentials::load(&config.check.credentials_path).await?;
                info!(program = %source.program, "using command source");
                Ok(Self::Command(CommandSource::new(
                    &source.program,
                    source.args.clone(),
                    credentials,
                )))
            }
            other => Err(ConfigError::InvalidValue {
                field: "source.kind".to_owned(),
                reason: format!("unknown source '{other}'"),
            }
            .into()),
        }
    }
}

impl HealthDataSource for ConfiguredSource {
    fn name(&self) -> &str {
        match self {
            Self::File(source) => source.name(),
            Self::Command(source) => source.name(),
        }
    }

    async fn fetch_instance_health(
        &self,
        load_balancer: &str,
    ) -> Result<Vec<InstanceHealthRecord>, DataSourceError> {
        match self {
            Self::File(source) => source.fetch_instance_health(load_balancer).await,
            Self::Command(source) => source.fetch_instance_health(load_balancer).await,
        }
    }
}
