//! Per-run state, progress observation and run reports.

use crate::dns::types::ServerStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Receives progress from a running test.
///
/// All methods default to no-ops so observers implement only what they
/// render.
pub trait RunObserver: Send + Sync {
    /// One hostname of `server_name` has been probed.
    fn on_progress(&self, _current: usize, _total: usize, _server_name: &str) {}

    /// A server has finished, with real statistics or a placeholder.
    fn on_server_complete(&self, _stats: &ServerStats) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// A server whose test failed outright.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerError {
    pub server: String,
    pub message: String,
}

/// State of one test run; created at run start and consumed at run end.
#[derive(Debug)]
pub struct TestRunState {
    cancel: CancellationToken,
    results: Vec<ServerStats>,
    errors: Vec<ServerError>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl TestRunState {
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            results: Vec::new(),
            errors: Vec::new(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Record a finished server, along with its error if it failed outright.
    pub fn record(&mut self, stats: ServerStats, error: Option<ServerError>) {
        self.results.push(stats);
        self.errors.extend(error);
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.results.len()
    }

    /// Close the run and produce its report.
    #[must_use]
    pub fn into_report(self) -> RunReport {
        RunReport {
            results: self.results,
            errors: self.errors,
            started_at: self.started_at,
            elapsed_ms: self.started.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// One entry per server tested, in server-list order
    pub results: Vec<ServerStats>,
    pub errors: Vec<ServerError>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: f64,
}

impl RunReport {
    /// Number of servers that produced timing.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.has_timing()).count()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every server was tested.
    Completed(RunReport),
    /// The run was cancelled; the report holds the servers finished so far.
    Cancelled(RunReport),
}

impl RunOutcome {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    #[must_use]
    pub fn report(&self) -> &RunReport {
        match self {
            Self::Completed(report) | Self::Cancelled(report) => report,
        }
    }

    #[must_use]
    pub fn into_report(self) -> RunReport {
        match self {
            Self::Completed(report) | Self::Cancelled(report) => report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::types::{ProbeOutcome, ServerConfig};

    #[test]
    fn test_state_into_report() {
        let mut state = TestRunState::new(CancellationToken::new());
        let ok = ServerConfig::new("Ok", Some("https://ok.example/dns-query"));
        let bad = ServerConfig::new("Bad", Some("https://bad.example/dns-query"));

        state.record(
            ServerStats::from_outcomes(&ok, vec![ProbeOutcome::success("a.com", 5.0)]),
            None,
        );
        state.record(
            ServerStats::failed(&bad, "boom"),
            Some(ServerError {
                server: "Bad".into(),
                message: "boom".into(),
            }),
        );
        assert_eq!(state.completed(), 2);

        let report = state.into_report();
        assert_eq!(report.success_count(), 1);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.results[1].error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_outcome_accessors() {
        let report = TestRunState::new(CancellationToken::new()).into_report();
        let outcome = RunOutcome::Cancelled(report.clone());
        assert!(outcome.is_cancelled());
        assert!(outcome.report().results.is_empty());
        assert!(!RunOutcome::Completed(report).is_cancelled());
    }

    #[test]
    fn test_state_reflects_token() {
        let token = CancellationToken::new();
        let state = TestRunState::new(token.clone());
        assert!(!state.is_cancelled());
        token.cancel();
        assert!(state.is_cancelled());
    }
}
