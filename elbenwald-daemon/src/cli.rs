//! CLI argument definitions for elbenwald-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use elbenwald_core::config::ElbenwaldConfig;

/// Elbenwald load balancer zone health daemon.
///
/// Checks every configured load balancer once per interval, writes the
/// zone health report and appends unhealthy instances to the error log.
#[derive(Parser, Debug)]
#[command(name = "elbenwald-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to elbenwald.toml configuration file.
    #[arg(short, long, default_value = "/etc/elbenwald/elbenwald.toml")]
    pub config: PathBuf,

    /// Load balancer to check (repeatable). Replaces `check.load_balancers`.
    #[arg(short = 'b', long = "load-balancer", value_name = "NAME")]
    pub load_balancers: Vec<String>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without checking anything.
    #[arg(long)]
    pub validate: bool,

    /// Run a single round and exit; non-zero exit if any check failed.
    #[arg(long)]
    pub once: bool,

    /// Override PID file path (empty disables).
    #[arg(long)]
    pub pid_file: Option<String>,
}

impl DaemonCli {
    /// Applies command-line overrides on top of file and environment values.
    pub fn apply_overrides(&self, config: &mut ElbenwaldConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(pid_file) = &self.pid_file {
            config.general.pid_file = pid_file.clone();
        }
        config.override_load_balancers(&self.load_balancers);
    }
}
