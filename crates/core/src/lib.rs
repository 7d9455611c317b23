#![doc = include_str!("../README.md")]

pub mod aggregator;
pub mod check;
pub mod classify;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- re-exports ---

// errors
pub use error::{
    AggregateError, ConfigError, DataSourceError, ElbenwaldError, LogWriteError, ReportError,
};

// config
pub use config::ElbenwaldConfig;

// aggregation
pub use aggregator::{AggregateReport, Aggregation, HealthAggregator, ZoneStatistics};
pub use classify::{RegexClassifier, SubstringClassifier, TransientClassifier};

// collaborators
pub use check::{CheckOutcome, HealthCheck};
pub use pipeline::{EventLogSink, HealthDataSource, ReportEnvelope, ReportSink};

// domain types
pub use types::{InstanceHealthRecord, InstanceState, UnhealthyEvent};
