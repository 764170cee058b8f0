//! Summary statistics over the result log.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::probe::{ProbeResult, ProbeState};

/// Aggregate counts derived from a result log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub pending_count: usize,
    pub count_by_target: BTreeMap<String, usize>,
    /// Successes over settled results, 0.0 when nothing has settled.
    pub success_rate: f64,
    /// Mean elapsed time of settled results in milliseconds.
    pub avg_elapsed_ms: f64,
}

/// Summarize a result log.
pub fn summarize<'a, I>(log: I) -> Summary
where
    I: IntoIterator<Item = &'a ProbeResult>,
{
    let mut summary = Summary::default();
    let mut elapsed_total: u64 = 0;

    for result in log {
        summary.total += 1;
        *summary
            .count_by_target
            .entry(result.target.clone())
            .or_insert(0) += 1;

        match result.state {
            ProbeState::Success => summary.success_count += 1,
            ProbeState::Error => summary.error_count += 1,
            ProbeState::Pending => {
                summary.pending_count += 1;
                continue;
            }
        }
        elapsed_total += result.elapsed_ms;
    }

    let settled = summary.success_count + summary.error_count;
    if settled > 0 {
        summary.success_rate = summary.success_count as f64 / settled as f64;
        summary.avg_elapsed_ms = elapsed_total as f64 / settled as f64;
    }

    summary
}
