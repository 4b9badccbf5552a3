//! DNS module.
//!
//! This module provides the DoH latency engine:
//! - Minimal query encoding
//! - Timed probes over GET or POST
//! - Result caching
//! - Per-server testing with retries
//! - Batched runs with cancellation
//! - Ranking of the results

pub mod cache;
pub mod probe;
pub mod query;
pub mod ranking;
pub mod scheduler;
pub mod state;
pub mod tester;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::ResultCache;
pub use probe::{HttpProber, ProbeTarget, Prober};
pub use ranking::{rank, Ranking};
pub use scheduler::BatchScheduler;
pub use state::{NoopObserver, RunObserver, RunOutcome, RunReport, ServerError, TestRunState};
pub use tester::{RetryPolicy, ServerTester};
pub use types::*;
