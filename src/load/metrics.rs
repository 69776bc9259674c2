use crate::load::injector::TransactionOutcome;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregated view of one injection window.
///
/// Latency statistics cover successful outcomes only; a window with zero
/// successes reports zeroes rather than poisoning the averages with retry
/// and failure timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadResults {
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    pub duration_s: f64,
    pub tps: f64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub p99_latency_ms: f64,
    /// Failure counts grouped by error kind, in first-seen order.
    pub error_distribution: IndexMap<String, u64>,
}

pub fn aggregate(outcomes: &[TransactionOutcome], elapsed: Duration) -> LoadResults {
    let duration_s = elapsed.as_secs_f64();
    let mut latencies: Vec<f64> = outcomes
        .iter()
        .filter(|o| o.success)
        .map(|o| o.duration_ms)
        .collect();
    latencies.sort_by(|a, b| a.total_cmp(b));

    let successes = latencies.len() as u64;
    let failures = outcomes.len() as u64 - successes;

    let mut error_distribution = IndexMap::new();
    for outcome in outcomes.iter().filter(|o| !o.success) {
        let kind = outcome
            .error_kind
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        *error_distribution.entry(kind).or_insert(0u64) += 1;
    }

    let (avg, min, max, p99) = if latencies.is_empty() {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        let avg = latencies.iter().sum::<f64>() / latencies.len() as f64;
        let min = latencies[0];
        let max = latencies[latencies.len() - 1];
        let p99_index = (latencies.len() * 99 / 100).min(latencies.len() - 1);
        (avg, min, max, latencies[p99_index])
    };

    let tps = if duration_s > 0.0 {
        successes as f64 / duration_s
    } else {
        0.0
    };

    LoadResults {
        total: outcomes.len() as u64,
        successes,
        failures,
        duration_s,
        tps,
        avg_latency_ms: avg,
        min_latency_ms: min,
        max_latency_ms: max,
        p99_latency_ms: p99,
        error_distribution,
    }
}

impl LoadResults {
    pub fn success_rate_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successes as f64 / self.total as f64 * 100.0
        }
    }
}
