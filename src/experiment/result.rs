use anyhow::{Context, Result};
use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExperimentParams {
    pub nodes: u32,
    pub tx: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExperimentMetrics {
    pub duration_s: f64,
    pub tps: f64,
    pub avg_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub cpu_percent: f64,
    pub bandwidth_bps: f64,
    pub storage_latency_ms: f64,
}

/// One measured cell of the (node-count × transaction-count) matrix.
/// Immutable once computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentPoint {
    pub params: ExperimentParams,
    pub metrics: ExperimentMetrics,
}

/// The final artifact of a run, serialized to JSON and rendered to Markdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub name: String,
    pub description: String,
    /// Points in execution order.
    pub points: Vec<ExperimentPoint>,
    pub metadata: IndexMap<String, String>,
    /// Run-wide failure counts by error kind; empty when everything passed.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub error_distribution: IndexMap<String, u64>,
}

impl ExperimentResult {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        Ok(())
    }
}

/// Deterministic artifact name: label plus run timestamp, so repeated runs
/// never clobber each other.
pub fn artifact_filename(label: &str, extension: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.{}", label, timestamp, extension)
}

/// Matrix artifact name embedding the swept parameters, so two runs with
/// different shapes are distinguishable at a glance.
pub fn matrix_artifact_filename(
    label: &str,
    node_counts: &[u32],
    tx_counts: &[u64],
    extension: &str,
) -> String {
    let nodes: Vec<String> = node_counts.iter().map(u32::to_string).collect();
    let txs: Vec<String> = tx_counts.iter().map(u64::to_string).collect();
    artifact_filename(
        &format!("{}_n{}_t{}", label, nodes.join("-"), txs.join("-")),
        extension,
    )
}
