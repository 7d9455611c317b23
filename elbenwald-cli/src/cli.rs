//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Elbenwald -- availability zone health of load balancers.
///
/// Use `elbenwald <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "elbenwald", version, about, long_about = None)]
pub struct Cli {
    /// Path to the elbenwald.toml configuration file.
    #[arg(short, long, default_value = "elbenwald.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error). Logs go to stderr.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check load balancers once and print their zone health reports.
    Check(CheckArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- check ----

/// Run one check per load balancer.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Load balancer to check (repeatable). Replaces `check.load_balancers`.
    #[arg(short = 'b', long = "load-balancer", value_name = "NAME")]
    pub load_balancers: Vec<String>,
}

// ---- config ----

/// Manage elbenwald configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, check, classifier, source, report, metrics).
        #[arg(long)]
        section: Option<String>,
    },
}
