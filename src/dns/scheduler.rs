//! Batched test runs across the whole server list.
//!
//! Servers are tested in fixed-size batches; every server inside a batch is
//! tested concurrently on the calling task, and a short pacing delay separates
//! batches. At most one run is active per scheduler at a time.

#![allow(clippy::missing_errors_doc)]

use crate::config::TestSettings;
use crate::dns::cache::ResultCache;
use crate::dns::probe::HttpProber;
use crate::dns::state::{RunObserver, RunOutcome, ServerError, TestRunState};
use crate::dns::tester::{RetryPolicy, ServerTester};
use crate::dns::types::{ServerConfig, ServerStats};
use crate::error::{Error, Result};
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default number of servers tested concurrently.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default pause between batches.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(100);

/// Runs [`ServerTester`] over a server list under a concurrency cap.
pub struct BatchScheduler {
    tester: ServerTester,
    concurrency: usize,
    batch_delay: Duration,
    running: AtomicBool,
    active: Mutex<Option<CancellationToken>>,
}

/// Clears the single-flight flag and releases the run's token on every exit path.
struct RunGuard<'a> {
    scheduler: &'a BatchScheduler,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.scheduler.active.lock() {
            active.take();
        }
        self.scheduler.running.store(false, Ordering::SeqCst);
    }
}

impl BatchScheduler {
    /// Create a scheduler around an existing tester.
    #[must_use]
    pub fn new(tester: ServerTester) -> Self {
        Self {
            tester,
            concurrency: DEFAULT_CONCURRENCY,
            batch_delay: DEFAULT_BATCH_DELAY,
            running: AtomicBool::new(false),
            active: Mutex::new(None),
        }
    }

    /// Build the HTTP prober, shared cache and tester described by `settings`.
    pub fn from_settings(settings: &TestSettings) -> Result<Self> {
        settings.validate()?;

        let cache = Arc::new(ResultCache::with_ttl(settings.cache_ttl));
        let prober = HttpProber::with_timeout(settings.timeout)?.with_cache(cache.clone());
        let tester = ServerTester::new(Arc::new(prober))
            .with_cache(cache)
            .with_retry(RetryPolicy::new(settings.max_retries));

        Ok(Self::new(tester)
            .with_concurrency(settings.concurrency)
            .with_batch_delay(settings.batch_delay))
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request cancellation of the active run.
    ///
    /// Returns `false` (and does nothing) when no run is active.
    pub fn cancel(&self) -> bool {
        let Ok(active) = self.active.lock() else {
            return false;
        };
        match active.as_ref() {
            Some(token) => {
                tracing::info!("Test cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn begin(&self) -> Result<(RunGuard<'_>, CancellationToken)> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::state("Test already running"));
        }
        let guard = RunGuard { scheduler: self };
        let token = CancellationToken::new();
        let mut active = self
            .active
            .lock()
            .map_err(|_| Error::state("run state lock poisoned"))?;
        *active = Some(token.clone());
        Ok((guard, token))
    }

    /// Test every server against every hostname.
    ///
    /// Every server that runs to completion yields exactly one
    /// [`ServerStats`], either real or a placeholder carrying the error.
    /// Fails with [`Error::State`] if a run is already active. A cancelled
    /// run returns [`RunOutcome::Cancelled`] holding only the servers that
    /// finished before the cancellation; no batch starts after it.
    pub async fn run_all(
        &self,
        servers: &[ServerConfig],
        hostnames: &[String],
        observer: &dyn RunObserver,
    ) -> Result<RunOutcome> {
        let (_guard, token) = self.begin()?;
        let mut state = TestRunState::new(token);

        tracing::info!(
            "Testing {} servers x {} hostnames (concurrency {})",
            servers.len(),
            hostnames.len(),
            self.concurrency
        );

        let batches = servers.chunks(self.concurrency);
        let batch_count = batches.len();

        for (idx, batch) in batches.enumerate() {
            if state.is_cancelled() {
                return Ok(cancelled(state, servers.len()));
            }

            let finished = {
                let cancel = state.cancel_token();
                join_all(
                    batch
                        .iter()
                        .map(|server| self.test_one(server, hostnames, cancel, observer)),
                )
                .await
            };

            for (stats, error) in finished.into_iter().flatten() {
                state.record(stats, error);
            }

            if state.is_cancelled() {
                return Ok(cancelled(state, servers.len()));
            }

            if idx + 1 < batch_count {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        let report = state.into_report();
        tracing::info!(
            "Run completed: {} servers with timing, {} errors, {:.1}s",
            report.success_count(),
            report.error_count(),
            report.elapsed_ms / 1000.0
        );
        Ok(RunOutcome::Completed(report))
    }

    /// Test one server; `None` when the test was cancelled before finishing.
    async fn test_one(
        &self,
        server: &ServerConfig,
        hostnames: &[String],
        cancel: &CancellationToken,
        observer: &dyn RunObserver,
    ) -> Option<(ServerStats, Option<ServerError>)> {
        let attempt = AssertUnwindSafe(self.tester.test(server, hostnames, cancel, observer))
            .catch_unwind()
            .await;

        let failure = match attempt {
            Ok(Ok(stats)) => {
                observer.on_server_complete(&stats);
                return Some((stats, None));
            }
            Ok(Err(e)) if e.is_cancelled() => {
                tracing::debug!("{} cancelled before finishing", server.name);
                return None;
            }
            Ok(Err(e)) => e,
            Err(panic) => Error::server(&server.name, panic_message(panic.as_ref())),
        };

        let message = failure.to_string();
        tracing::warn!("{message}");
        let stats = ServerStats::failed(server, message.clone());
        observer.on_server_complete(&stats);
        Some((
            stats,
            Some(ServerError {
                server: server.name.clone(),
                message,
            }),
        ))
    }
}

fn cancelled(state: TestRunState, total: usize) -> RunOutcome {
    tracing::warn!("Run cancelled after {} of {} servers", state.completed(), total);
    RunOutcome::Cancelled(state.into_report())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}
