//! Command-line interface (CLI) argument parsing module.
//!
//! This module provides CLI argument parsing using `clap`.
//! It supports running a latency test, listing servers and hostnames,
//! and exporting the effective server list.

use crate::config::TestSettings;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// CLI argument parser using clap derive macro.
///
/// # Example
///
/// ```ignore
/// let cli = Cli::parse();
/// match cli.command {
///     Some(Commands::Run(args)) => { /* ... */ }
///     Some(Commands::List { .. }) => { /* ... */ }
///     None => { /* run with defaults */ }
/// }
/// ```
#[derive(Parser, Debug)]
#[command(
    name = "dohspeed",
    version,
    about = "DNS-over-HTTPS latency benchmark",
    long_about = "Measure round-trip latency of DNS-over-HTTPS resolvers and recommend the fastest ones",
    infer_subcommands = true
)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default, human-readable)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
    /// TSV format (tab-separated)
    Tsv,
}

impl OutputFormat {
    /// Get all available output format names.
    #[must_use]
    pub fn names() -> &'static [&'static str] {
        &["table", "json", "csv", "tsv"]
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            _ => Err(format!(
                "Unknown format: {}. Valid options are: {:?}",
                s,
                Self::names()
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Tsv => write!(f, "tsv"),
        }
    }
}

/// Available commands for the dohspeed CLI.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the latency test (default)
    ///
    /// Probe every hostname against every DoH server and rank the servers
    /// by average response time. Ctrl-C cancels and prints partial results.
    #[command(alias = "r")]
    Run(RunArgs),

    /// List the DoH servers that would be tested
    #[command(alias = "l")]
    List {
        /// Server list file (JSON format)
        #[arg(short, long)]
        servers: Option<PathBuf>,
    },

    /// List the hostnames that would be probed
    #[command(alias = "h")]
    Hosts {
        /// Hostname list file (JSON format)
        #[arg(long = "hosts")]
        hosts: Option<PathBuf>,
    },

    /// Export the effective server list to a JSON file
    #[command(alias = "e")]
    Export {
        /// Output file path
        #[arg(short, long, default_value = "servers.json")]
        output: PathBuf,

        /// Server list file to export instead of the default list
        #[arg(short, long)]
        servers: Option<PathBuf>,
    },
}

/// Options of the `run` command.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Server list file (JSON format)
    #[arg(short, long)]
    pub servers: Option<PathBuf>,

    /// Hostname list file (JSON format)
    #[arg(long = "hosts")]
    pub hosts: Option<PathBuf>,

    /// Custom DoH servers (format: URL#Name)
    #[arg(long = "server")]
    pub server_args: Vec<String>,

    /// Custom hostnames to probe
    #[arg(long = "host")]
    pub host_args: Vec<String>,

    /// Per-probe timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    pub timeout: u64,

    /// Servers tested concurrently
    #[arg(short, long, default_value = "5")]
    pub concurrency: usize,

    /// Extra attempts after a timed-out request
    #[arg(short, long, default_value = "1")]
    pub retries: u32,

    /// Number of recommended servers
    #[arg(long, default_value = "3")]
    pub top: usize,

    /// Sort results by average latency (fastest first)
    #[arg(long = "sort")]
    pub sort_by_latency: bool,
}

impl RunArgs {
    /// Run settings derived from the flags.
    #[must_use]
    pub fn settings(&self) -> TestSettings {
        TestSettings {
            timeout: Duration::from_millis(self.timeout),
            concurrency: self.concurrency,
            max_retries: self.retries,
            top_n: self.top,
            ..TestSettings::default()
        }
    }
}

impl Default for RunArgs {
    fn default() -> Self {
        let defaults = TestSettings::default();
        Self {
            servers: None,
            hosts: None,
            server_args: Vec::new(),
            host_args: Vec::new(),
            timeout: defaults.timeout.as_millis() as u64,
            concurrency: defaults.concurrency,
            retries: defaults.max_retries,
            top: defaults.top_n,
            sort_by_latency: false,
        }
    }
}

/// Parse CLI arguments and return verbose flag.
///
/// # Returns
///
/// Returns a tuple of `(Cli, verbose)` where `verbose` indicates
/// whether verbose logging was enabled.
#[must_use]
pub fn parse_verbose() -> (Cli, bool) {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    (cli, verbose)
}
