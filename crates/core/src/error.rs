//! Error types, one enum per failure domain.

use std::path::PathBuf;

/// Top-level elbenwald error.
#[derive(Debug, thiserror::Error)]
pub enum ElbenwaldError {
    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Health records could not be retrieved
    #[error("data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// Health records violated the aggregation preconditions
    #[error("aggregate error: {0}")]
    Aggregate(#[from] AggregateError),

    /// Unhealthy events could not be appended to the error log
    #[error("log write error: {0}")]
    LogWrite(#[from] LogWriteError),

    /// The aggregate report could not be delivered
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors. Always raised before any health data is fetched.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Config could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// Value present but invalid
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Required value missing or empty
    #[error("missing required config value '{field}'")]
    MissingValue { field: String },
}

/// Failures of the health data source collaborator.
///
/// Any of these aborts the check for that cycle: no report and no events
/// are produced.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    /// Network failure, exporter crash, or other transport problem
    #[error("health data unavailable: {0}")]
    Unavailable(String),

    /// The source does not know the load balancer
    #[error("unknown load balancer: {0}")]
    UnknownLoadBalancer(String),

    /// Credentials were rejected
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// Fetch did not complete within the configured timeout
    #[error("fetching health of '{load_balancer}' timed out after {timeout_secs}s")]
    Timeout {
        load_balancer: String,
        timeout_secs: u64,
    },

    /// Payload is not a health snapshot
    #[error("malformed health response: {0}")]
    MalformedResponse(String),

    /// A single record breaks the record invariants
    #[error("malformed health record for instance '{instance_id}': {reason}")]
    MalformedRecord { instance_id: String, reason: String },

    /// Credentials file missing or unusable
    #[error("credentials error: {0}")]
    Credentials(String),
}

/// Precondition violations detected by the aggregator.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AggregateError {
    /// Record without an availability zone
    #[error("instance '{instance_id}' has no availability zone")]
    MissingZone { instance_id: String },
}

/// Failures appending to the error log destination.
#[derive(Debug, thiserror::Error)]
pub enum LogWriteError {
    /// Destination could not be opened for appending
    #[error("failed to open error log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Append failed midway (disk full, permission revoked, ...)
    #[error("failed to append to error log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures delivering an aggregate report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Report could not be encoded
    #[error("failed to serialize report: {0}")]
    Serialize(String),

    /// Report could not be written to its destination
    #[error("failed to write report: {0}")]
    Write(String),
}
