//! Scripted prober for unit tests.

use crate::dns::probe::{ProbeTarget, Prober};
use crate::error::ProbeError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub enum Step {
    Ok(f64),
    Fail(ProbeError),
    /// Sleep, then succeed with the given time.
    Slow(Duration, f64),
    Panic,
}

/// Replays queued steps per (endpoint, hostname), then falls back to a default.
#[derive(Debug)]
pub struct ScriptedProber {
    scripts: Mutex<HashMap<(String, String), VecDeque<Step>>>,
    fallback: Step,
    calls: AtomicUsize,
}

impl ScriptedProber {
    pub fn new(fallback: Step) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn script(self, endpoint: &str, hostname: &str, steps: Vec<Step>) -> Self {
        let key = (url::Url::parse(endpoint).unwrap().to_string(), hostname.to_string());
        self.scripts.lock().unwrap().insert(key, steps.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(
        &self,
        target: &ProbeTarget,
        hostname: &str,
        cancel: &CancellationToken,
    ) -> Result<f64, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = (target.endpoint.to_string(), hostname.to_string());
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Ok(ms) => Ok(ms),
            Step::Fail(err) => Err(err),
            Step::Slow(delay, ms) => tokio::select! {
                () = cancel.cancelled() => Err(ProbeError::cancelled()),
                () = tokio::time::sleep(delay) => Ok(ms),
            },
            Step::Panic => panic!("scripted prober panic for {hostname}"),
        }
    }
}
