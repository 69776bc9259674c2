use crate::cluster::{ClusterLifecycleManager, NodeRegistry, RpcClient};
use crate::config::BenchConfig;
use crate::experiment::result::{
    ExperimentMetrics, ExperimentParams, ExperimentPoint, ExperimentResult,
};
use crate::experiment::storage;
use crate::load::runner::cluster_healthy;
use crate::load::{monitor, LoadTestRunner, SequencingMode};
use anyhow::Result;
use indexmap::IndexMap;
use owo_colors::OwoColorize;
use std::sync::Arc;
use tokio::time::sleep;

const STORAGE_PROBE_WRITES: u32 = 50;

/// Drives the full (node-count × transaction-count) matrix.
///
/// One cluster is started per node-count and reused across all transaction
/// counts for it, then torn down before the next node-count. A readiness or
/// health failure cancels the remaining cells for that node-count only;
/// points already collected are always preserved and reported.
pub struct ExperimentOrchestrator {
    config: Arc<BenchConfig>,
    node_counts: Vec<u32>,
    tx_counts: Vec<u64>,
    mode: SequencingMode,
}

impl ExperimentOrchestrator {
    pub fn new(
        config: Arc<BenchConfig>,
        node_counts: Vec<u32>,
        tx_counts: Vec<u64>,
        mode: SequencingMode,
    ) -> Self {
        Self {
            config,
            node_counts,
            tx_counts,
            mode,
        }
    }

    pub async fn run(&self) -> Result<ExperimentResult> {
        let rpc = RpcClient::new(self.config.http_timeout)?;
        let runner = LoadTestRunner::new(Arc::clone(&self.config));
        let mut points = Vec::new();
        let mut error_distribution: IndexMap<String, u64> = IndexMap::new();

        for &node_count in &self.node_counts {
            let data_root = self.config.run_data_root(node_count);
            let log_dir = self.config.run_log_dir(node_count);
            let mut lifecycle = ClusterLifecycleManager::new(
                Arc::clone(&self.config),
                data_root.clone(),
                log_dir,
            )?;

            println!(
                "{} Starting {}-node cluster...",
                "→".cyan(),
                node_count.to_string().bright_white()
            );
            if let Err(e) = lifecycle.start(node_count).await {
                eprintln!(
                    "{} {}-node cluster failed to start: {}",
                    "✗".red(),
                    node_count,
                    e
                );
                lifecycle.stop().await;
                continue;
            }
            sleep(self.config.settle_delay).await;

            let nodes = NodeRegistry::load(&self.config, &data_root, node_count);
            if let Err(e) = NodeRegistry::require_quorum(&nodes, 2) {
                eprintln!("{} {}", "✗".red(), e);
                lifecycle.stop().await;
                continue;
            }

            for &tx_count in &self.tx_counts {
                if !cluster_healthy(&rpc, &nodes).await {
                    eprintln!(
                        "{} cluster unhealthy, skipping remaining cells for {} nodes",
                        "✗".red(),
                        node_count
                    );
                    break;
                }

                let run = match runner.run(&nodes, tx_count, self.mode).await {
                    Ok(run) => run,
                    Err(e) => {
                        eprintln!("{} injection window failed: {}", "✗".red(), e);
                        break;
                    }
                };

                for (kind, count) in &run.results.error_distribution {
                    *error_distribution.entry(kind.clone()).or_insert(0) += count;
                }

                let probe_dir = BenchConfig::node_home(&data_root, 1).join("data");
                let storage_latency_ms = tokio::task::spawn_blocking(move || {
                    storage::probe_write_latency(&probe_dir, STORAGE_PROBE_WRITES)
                })
                .await
                .unwrap_or(0.0);

                let metrics = ExperimentMetrics {
                    duration_s: run.results.duration_s,
                    tps: run.results.tps,
                    avg_latency_ms: run.results.avg_latency_ms,
                    p99_latency_ms: run.results.p99_latency_ms,
                    cpu_percent: monitor::average_cpu(&run.samples),
                    bandwidth_bps: monitor::average_bandwidth(&run.samples),
                    storage_latency_ms,
                };
                println!(
                    "  {} nodes × {} txs: {:.2} tx/s, avg {:.2}ms, p99 {:.2}ms, cpu {:.1}%",
                    node_count,
                    tx_count,
                    metrics.tps,
                    metrics.avg_latency_ms,
                    metrics.p99_latency_ms,
                    metrics.cpu_percent
                );
                points.push(ExperimentPoint {
                    params: ExperimentParams {
                        nodes: node_count,
                        tx: tx_count,
                    },
                    metrics,
                });
            }

            println!("{} Stopping {}-node cluster...", "→".cyan(), node_count);
            lifecycle.stop().await;
            sleep(self.config.settle_delay).await;
        }

        let mut metadata = IndexMap::new();
        metadata.insert("label".to_string(), self.config.run_label.clone());
        metadata.insert("chain_id".to_string(), self.config.chain_id.clone());
        metadata.insert("binary".to_string(), self.config.binary_name());
        metadata.insert("sequencing".to_string(), format!("{:?}", self.mode));

        Ok(ExperimentResult {
            name: self.config.run_label.clone(),
            description: "Transaction volume × node count scaling on a live consensus cluster"
                .to_string(),
            points,
            metadata,
            error_distribution,
        })
    }
}
