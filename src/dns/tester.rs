//! Per-server DoH latency test.
//!
//! Probes every configured hostname against one server, retrying timeouts
//! under a [`RetryPolicy`], and aggregates the outcomes into [`ServerStats`].

#![allow(clippy::missing_errors_doc)]

use crate::dns::cache::ResultCache;
use crate::dns::probe::{ProbeTarget, Prober};
use crate::dns::state::RunObserver;
use crate::dns::types::{ProbeOutcome, ServerConfig, ServerStats};
use crate::error::{Error, ErrorKind, ProbeError, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Default number of extra attempts after a timed-out request.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Bounded retry policy for individual probes.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts allowed after the first failure
    pub max_retries: u32,
    retryable: fn(ErrorKind) -> bool,
}

impl RetryPolicy {
    /// Retry timeouts up to `max_retries` times.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            retryable: |kind| kind == ErrorKind::Timeout,
        }
    }

    /// Never retry.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Replace the retryable-kinds predicate.
    #[must_use]
    pub fn with_predicate(mut self, retryable: fn(ErrorKind) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    #[must_use]
    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        kind != ErrorKind::Cancelled && (self.retryable)(kind)
    }

    /// Whether another attempt is allowed after `retries_done` retries failed with `err`.
    #[must_use]
    pub fn should_retry(&self, err: &ProbeError, retries_done: u32) -> bool {
        retries_done < self.max_retries && self.is_retryable(err.kind)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

/// Runs the hostname battery for a single server.
#[derive(Clone)]
pub struct ServerTester {
    prober: Arc<dyn Prober>,
    cache: Option<Arc<ResultCache>>,
    retry: RetryPolicy,
}

impl ServerTester {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            cache: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Serve fresh cached times instead of probing.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Test one server against every hostname, in order.
    ///
    /// Probe failures end up in the outcomes. The only errors returned are
    /// [`Error::Cancelled`], passed through unchanged, and
    /// [`Error::Server`] for anything else that prevents a result.
    pub async fn test(
        &self,
        server: &ServerConfig,
        hostnames: &[String],
        cancel: &CancellationToken,
        observer: &dyn RunObserver,
    ) -> Result<ServerStats> {
        let Some(target) = ProbeTarget::from_server(server) else {
            tracing::warn!("{} has no usable DoH URL, marking unavailable", server.name);
            return Ok(ServerStats::unavailable(server, hostnames));
        };

        if hostnames.is_empty() {
            return Err(Error::server(&server.name, "no hostnames to test"));
        }

        let total = hostnames.len();
        let mut outcomes = Vec::with_capacity(total);

        for (idx, hostname) in hostnames.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let outcome = self.probe_hostname(&target, hostname, cancel).await?;
            outcomes.push(outcome);
            observer.on_progress(idx + 1, total, &server.name);
        }

        let stats = ServerStats::from_outcomes(server, outcomes);
        tracing::debug!(
            "{}: {}/{} ok, avg {:?} ms",
            server.name,
            stats.success_count(),
            total,
            stats.avg
        );
        Ok(stats)
    }

    async fn probe_hostname(
        &self,
        target: &ProbeTarget,
        hostname: &str,
        cancel: &CancellationToken,
    ) -> Result<ProbeOutcome> {
        if let Some(ms) = self
            .cache
            .as_ref()
            .and_then(|c| c.get(target.cache_key(), hostname))
        {
            return Ok(ProbeOutcome::from_cache(hostname, ms));
        }

        let mut retries = 0;
        loop {
            match self.prober.probe(target, hostname, cancel).await {
                Ok(ms) => return Ok(ProbeOutcome::success(hostname, ms).with_retried(retries > 0)),
                Err(e) if e.kind == ErrorKind::Cancelled => return Err(Error::Cancelled),
                Err(e) if self.retry.should_retry(&e, retries) => {
                    retries += 1;
                    tracing::debug!(
                        "Retrying {} for {hostname} (attempt {retries}): {e}",
                        target.endpoint
                    );
                }
                Err(e) => {
                    return Ok(ProbeOutcome::failure(hostname, &e).with_retried(retries > 0));
                }
            }
        }
    }
}
