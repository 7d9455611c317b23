//! Configuration -- `elbenwald.toml` parsing and validation.
//!
//! [`ElbenwaldConfig`] is the top-level structure; every section falls back to
//! its `Default` so a partial file is enough.
//!
//! # Loading precedence
//! 1. CLI arguments (applied by the binaries)
//! 2. Environment variables (`ELBENWALD_CHECK_LOG_PATH=/tmp/x.log`)
//! 3. Config file (`elbenwald.toml`)
//! 4. Defaults
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), elbenwald_core::error::ElbenwaldError> {
//! use elbenwald_core::config::ElbenwaldConfig;
//!
//! let config = ElbenwaldConfig::load("elbenwald.toml").await?;
//! let config = ElbenwaldConfig::parse("[check]\nload_balancers = [\"web\"]")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classify::{DEFAULT_TRANSIENT_PATTERN, classifier_from_config};
use crate::error::{ConfigError, ElbenwaldError};

/// Placeholder substituted with the load balancer name in command arguments.
pub const LOAD_BALANCER_PLACEHOLDER: &str = "{load_balancer}";

/// Report path meaning "write to stdout".
pub const STDOUT_REPORT_PATH: &str = "-";

/// Elbenwald configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElbenwaldConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub check: CheckConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl ElbenwaldConfig {
    /// Loads a config file, applies environment overrides and validates.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ElbenwaldError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parses a config file without overrides or validation.
    ///
    /// Binaries that layer CLI overrides on top call this, then
    /// [`apply_env_overrides`](Self::apply_env_overrides), then
    /// [`validate`](Self::validate).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ElbenwaldError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ElbenwaldError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ElbenwaldError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ElbenwaldError> {
        toml::from_str(toml_str).map_err(|e| {
            ElbenwaldError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies `ELBENWALD_{SECTION}_{FIELD}` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "ELBENWALD_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "ELBENWALD_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "ELBENWALD_GENERAL_PID_FILE");

        // Check
        override_csv(
            &mut self.check.load_balancers,
            "ELBENWALD_CHECK_LOAD_BALANCERS",
        );
        override_u64(&mut self.check.interval_secs, "ELBENWALD_CHECK_INTERVAL_SECS");
        override_u64(
            &mut self.check.fetch_timeout_secs,
            "ELBENWALD_CHECK_FETCH_TIMEOUT_SECS",
        );
        override_string(
            &mut self.check.credentials_path,
            "ELBENWALD_CHECK_CREDENTIALS_PATH",
        );
        override_string(&mut self.check.log_path, "ELBENWALD_CHECK_LOG_PATH");

        // Classifier
        override_string(&mut self.classifier.kind, "ELBENWALD_CLASSIFIER_KIND");
        override_string(&mut self.classifier.pattern, "ELBENWALD_CLASSIFIER_PATTERN");
        override_bool(
            &mut self.classifier.case_sensitive,
            "ELBENWALD_CLASSIFIER_CASE_SENSITIVE",
        );

        // Source
        override_string(&mut self.source.kind, "ELBENWALD_SOURCE_KIND");
        override_string(&mut self.source.program, "ELBENWALD_SOURCE_PROGRAM");
        override_string(&mut self.source.snapshot_dir, "ELBENWALD_SOURCE_SNAPSHOT_DIR");

        // Report
        override_string(&mut self.report.path, "ELBENWALD_REPORT_PATH");

        // Metrics
        override_bool(&mut self.metrics.enabled, "ELBENWALD_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "ELBENWALD_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "ELBENWALD_METRICS_PORT");
    }

    /// Replaces the configured load balancers when `names` is non-empty.
    pub fn override_load_balancers(&mut self, names: &[String]) {
        if !names.is_empty() {
            self.check.load_balancers = names.iter().map(|n| n.trim().to_owned()).collect();
        }
    }

    /// Validates every section.
    ///
    /// Runs before any health data is fetched; the first violation wins.
    pub fn validate(&self) -> Result<(), ElbenwaldError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // check
        if self.check.load_balancers.is_empty() {
            return Err(missing("check.load_balancers"));
        }
        if self
            .check
            .load_balancers
            .iter()
            .any(|name| name.trim().is_empty())
        {
            return Err(invalid(
                "check.load_balancers",
                "load balancer names must not be empty".to_owned(),
            ));
        }
        if self.check.credentials_path.trim().is_empty() {
            return Err(missing("check.credentials_path"));
        }
        if self.check.log_path.trim().is_empty() {
            return Err(missing("check.log_path"));
        }
        if self.check.interval_secs == 0 {
            return Err(invalid(
                "check.interval_secs",
                "must be greater than 0".to_owned(),
            ));
        }
        if self.check.fetch_timeout_secs == 0 {
            return Err(invalid(
                "check.fetch_timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        // classifier: building it validates kind, pattern and regex syntax
        classifier_from_config(&self.classifier)?;

        // source
        match self.source.kind.as_str() {
            "command" => {
                if self.source.program.trim().is_empty() {
                    return Err(missing("source.program"));
                }
            }
            "file" => {
                if self.source.snapshot_dir.trim().is_empty() {
                    return Err(missing("source.snapshot_dir"));
                }
            }
            other => {
                return Err(invalid(
                    "source.kind",
                    format!("unknown source '{other}', expected 'command' or 'file'"),
                ));
            }
        }

        // report
        if self.report.path.trim().is_empty() {
            return Err(missing("report.path"));
        }

        // metrics
        if self.metrics.enabled {
            if self.metrics.endpoint != "/metrics" {
                return Err(invalid(
                    "metrics.endpoint",
                    "only '/metrics' is supported".to_owned(),
                ));
            }
            if self.metrics.port == 0 {
                return Err(invalid("metrics.port", "must not be 0".to_owned()));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> ElbenwaldError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

fn missing(field: &str) -> ElbenwaldError {
    ConfigError::MissingValue {
        field: field.to_owned(),
    }
    .into()
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (json, pretty)
    pub log_format: String,
    /// PID file path (daemon only, empty disables)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: "/var/run/elbenwald.pid".to_owned(),
        }
    }
}

/// What to check, how often, and where failures are logged
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Load balancers to report on
    pub load_balancers: Vec<String>,
    /// Seconds between check rounds (daemon)
    pub interval_secs: u64,
    /// Upper bound for one health data fetch
    pub fetch_timeout_secs: u64,
    /// YAML credentials file handed to the data source
    pub credentials_path: String,
    /// Append-only log of unhealthy instances
    pub log_path: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            load_balancers: Vec::new(),
            interval_secs: 60,
            fetch_timeout_secs: 30,
            credentials_path: "/etc/elbenwald/credentials.yml".to_owned(),
            log_path: "/var/log/elbenwald/elbenwald.log".to_owned(),
        }
    }
}

/// Transient-error classification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// substring, regex
    pub kind: String,
    pub pattern: String,
    pub case_sensitive: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: "substring".to_owned(),
            pattern: DEFAULT_TRANSIENT_PATTERN.to_owned(),
            case_sensitive: true,
        }
    }
}

/// Health data source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// command, file
    pub kind: String,
    /// Exporter executed by the command source
    pub program: String,
    /// Exporter arguments; `{load_balancer}` is substituted
    pub args: Vec<String>,
    /// Directory of `<load_balancer>.json` snapshots for the file source
    pub snapshot_dir: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: "command".to_owned(),
            program: "elbenwald-instance-health".to_owned(),
            args: vec![
                "--load-balancer".to_owned(),
                LOAD_BALANCER_PLACEHOLDER.to_owned(),
            ],
            snapshot_dir: "/var/lib/elbenwald/snapshots".to_owned(),
        }
    }
}

/// Report destination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// JSON-lines file, or `-` for stdout
    pub path: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: "/var/lib/elbenwald/reports.jsonl".to_owned(),
        }
    }
}

/// Prometheus endpoint (daemon)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: String,
    pub port: u16,
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9184,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- env override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
