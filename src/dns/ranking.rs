//! Ranking of finished server statistics.

use crate::dns::types::ServerStats;
use std::cmp::{Ordering, Reverse};

/// Default number of recommended servers.
pub const DEFAULT_TOP_N: usize = 3;

/// Recommendation derived from a finished run.
#[derive(Debug, Clone, PartialEq)]
pub enum Ranking<'a> {
    /// Fastest servers by average latency, best first.
    Ranked(Vec<&'a ServerStats>),
    /// No server produced reliable timing; the best server by successful
    /// probe count is offered instead of a numeric ranking.
    NoReliable {
        best_by_success: Option<&'a ServerStats>,
    },
}

impl<'a> Ranking<'a> {
    #[must_use]
    pub fn is_reliable(&self) -> bool {
        matches!(self, Self::Ranked(_))
    }

    /// Top recommendation, if any.
    #[must_use]
    pub fn best(&self) -> Option<&'a ServerStats> {
        match self {
            Self::Ranked(list) => list.first().copied(),
            Self::NoReliable { best_by_success } => *best_by_success,
        }
    }
}

/// Rank servers by average latency and keep the `top_n` fastest.
///
/// Only servers with a positive average take part; equal averages keep
/// their input order. When none qualifies, falls back to the server with
/// the most successful probes (first one wins ties).
#[must_use]
pub fn rank(stats: &[ServerStats], top_n: usize) -> Ranking<'_> {
    let mut timed: Vec<&ServerStats> = stats.iter().filter(|s| reliable_avg(s).is_some()).collect();

    if timed.is_empty() {
        let best_by_success = stats
            .iter()
            .min_by_key(|s| Reverse(s.success_count()));
        return Ranking::NoReliable { best_by_success };
    }

    timed.sort_by(|a, b| compare_avg(a, b));
    timed.truncate(top_n);
    Ranking::Ranked(timed)
}

/// Sort full results fastest first, servers without timing last.
pub fn sort_by_latency(stats: &mut [ServerStats]) {
    stats.sort_by(compare_avg);
}

fn reliable_avg(stats: &ServerStats) -> Option<f64> {
    stats.avg.filter(|avg| *avg > 0.0 && avg.is_finite())
}

fn compare_avg(a: &ServerStats, b: &ServerStats) -> Ordering {
    let a = reliable_avg(a).unwrap_or(f64::MAX);
    let b = reliable_avg(b).unwrap_or(f64::MAX);
    a.total_cmp(&b)
}
