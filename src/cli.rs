//! CLI arguments and subcommands for proc-status-page.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "proc-status-page",
    about = "Live HTML status page with process memory and a top listing",
    long_about = "Live HTML status page with process memory and a top listing.\n\n\
                  Serves a single page showing the identity of this process, its memory \
                  counters and the output of a process-listing command filtered to the \
                  current user. Collected data is cached for a short staleness window.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Serve cached status data for N seconds before collecting again
    #[arg(long)]
    pub stale_after_secs: Option<u64>,

    /// Kill the process-listing command after N seconds
    #[arg(long)]
    pub listing_timeout_secs: Option<u64>,

    /// User name substituted into the listing command (default: current user)
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Page title and heading
    #[arg(long)]
    pub title: Option<String>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate configuration files
    Config {
        /// Output file path (stdout if omitted)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },

    /// Collect status once and print it
    Collect {
        /// Print only the process listing instead of the HTML page
        #[arg(long)]
        listing_only: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let args = Args::try_parse_from([
            "proc-status-page",
            "-p",
            "8081",
            "--stale-after-secs",
            "2",
            "--user",
            "svc",
        ])
        .unwrap();
        assert_eq!(args.port, Some(8081));
        assert_eq!(args.stale_after_secs, Some(2));
        assert_eq!(args.user.as_deref(), Some("svc"));
        assert!(args.command.is_none());
    }

    #[test]
    fn test_parse_collect_subcommand() {
        let args = Args::try_parse_from(["proc-status-page", "collect", "--listing-only"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::Collect { listing_only: true })
        ));
    }
}
