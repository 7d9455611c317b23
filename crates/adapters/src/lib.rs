//! Concrete collaborators for `elbenwald-core`.
//!
//! - [`source`]: where instance health records come from
//!   ([`FileSource`], [`CommandSource`], [`ConfiguredSource`])
//! - [`sink`]: where reports and unhealthy events go
//!   ([`AppendFileEventLog`], [`JsonLinesReportSink`], [`MetricsReportSink`],
//!   [`CompositeReportSink`])
//! - [`credentials`]: the YAML credentials handed to the command source

pub mod credentials;
pub mod sink;
pub mod source;

pub use credentials::AwsCredentials;
pub use sink::{
    AppendFileEventLog, CompositeReportSink, JsonLinesReportSink, MetricsReportSink,
    ReportDestination,
};
pub use source::{CommandSource, ConfiguredSource, FileSource, parse_snapshot};
