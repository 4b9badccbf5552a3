//! dohspeed - A DNS-over-HTTPS latency benchmark.
//!
//! This crate provides both a library API and a CLI tool for:
//! - Measuring round-trip latency of DoH resolvers over GET or POST
//! - Testing many servers in paced, cancellable batches
//! - Retrying timed-out probes under a bounded policy
//! - Ranking servers by average latency
//! - Multiple output formats (table, JSON, CSV, TSV)
//!
//! # Library Usage
//!
//! ```ignore
//! use dohspeed::{rank, BatchScheduler, NoopObserver, ServerConfig, TestSettings};
//!
//! let scheduler = BatchScheduler::from_settings(&TestSettings::default())?;
//! let servers = vec![ServerConfig::new("Cloudflare", Some("https://cloudflare-dns.com/dns-query"))];
//! let hostnames = vec!["example.com".to_string()];
//!
//! let outcome = scheduler.run_all(&servers, &hostnames, &NoopObserver).await?;
//! let report = outcome.report();
//! match rank(&report.results, 3) {
//!     Ranking::Ranked(top) => { /* fastest first */ }
//!     Ranking::NoReliable { best_by_success } => { /* fallback */ }
//! }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Test the default server list (default command)
//! dohspeed
//! dohspeed run --sort
//! dohspeed run --server https://dns.google/dns-query#Google --host example.com
//!
//! # List servers and hostnames
//! dohspeed list
//! dohspeed hosts
//!
//! # Export the server list
//! dohspeed export --output mylist.json
//! ```
//!
//! # Known limitation
//!
//! Servers tested without CORS (`allowCors: false`) are timed on opaque
//! responses: any completed HTTP exchange counts as success, so an error
//! status from such a server is still recorded as a valid timing.

pub mod cli;
pub mod config;
pub mod dns;
pub mod error;

// Re-export commonly used types
pub use cli::{Cli, Commands, OutputFormat, RunArgs};
pub use config::{ConfigLoader, HostnameList, ServerList, TestSettings};
pub use dns::types::{GetFormat, HttpMethod, ProbeOutcome, ServerConfig, ServerStats};
pub use dns::{
    rank, BatchScheduler, HttpProber, NoopObserver, Prober, Ranking, RetryPolicy, RunObserver,
    RunOutcome, RunReport, ServerTester,
};
pub use error::{Error, ErrorKind, ProbeError, Result};
