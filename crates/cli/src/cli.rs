//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// syncset - inspect and replay sync-set input stream handler configurations
#[derive(Parser, Debug)]
#[command(
    name = "syncset",
    author,
    version,
    about = "Sync-set input stream handler tooling",
    long_about = "Validate node configurations, show how inputs are partitioned into sync sets,\n\
                  and replay recorded packet scenarios through the input stream handler."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SYNCSET_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SYNCSET_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a node configuration file
    Validate(ValidateArgs),

    /// Show channels and resolved sync sets of a node
    Info(InfoArgs),

    /// Replay a packet scenario through the node's input stream handler
    Replay(ReplayArgs),
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to node configuration file (TOML or JSON)
    #[arg(short, long, default_value = "node.toml", env = "SYNCSET_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to node configuration file
    #[arg(short, long, default_value = "node.toml", env = "SYNCSET_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `replay` command
#[derive(Parser, Debug, Clone)]
pub struct ReplayArgs {
    /// Path to node configuration file
    #[arg(short, long, default_value = "node.toml", env = "SYNCSET_CONFIG")]
    pub config: PathBuf,

    /// Path to scenario file (TOML or JSON)
    #[arg(short, long, env = "SYNCSET_SCENARIO")]
    pub scenario: PathBuf,

    /// Maximum invocations scheduled per event (0 = unlimited)
    #[arg(long, default_value = "0", env = "SYNCSET_MAX_ALLOWANCE")]
    pub max_allowance: usize,

    /// Channel buffer size between the event producer and the scheduler
    #[arg(long, default_value = "64", env = "SYNCSET_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SYNCSET_METRICS_PORT")]
    pub metrics_port: u16,

    /// Output invocations and statistics as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
