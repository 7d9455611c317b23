//! CLI-specific error types and exit code mapping

use elbenwald_core::error::ElbenwaldError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// At least one check could not fetch or aggregate health data.
    #[error("check failed: {0}")]
    DataSource(String),

    /// A report or the error log could not be written.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from elbenwald-core.
    #[error("{0}")]
    Core(#[from] ElbenwaldError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | General / command error                  |
    /// | 2    | Configuration error                      |
    /// | 5    | Health data could not be fetched         |
    /// | 6    | Report or error log delivery failed      |
    /// | 10   | IO error                                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::DataSource(_) => 5,
            Self::Delivery(_) => 6,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) => 1,
            Self::Core(e) => match e {
                ElbenwaldError::Config(_) => 2,
                ElbenwaldError::DataSource(_) | ElbenwaldError::Aggregate(_) => 5,
                ElbenwaldError::LogWrite(_) | ElbenwaldError::Report(_) => 6,
                ElbenwaldError::Io(_) => 10,
            },
        }
    }
}
