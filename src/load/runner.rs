use crate::cluster::{AccountStateFetcher, NodeDescriptor, RpcClient};
use crate::config::BenchConfig;
use crate::load::metrics::{self, LoadResults};
use crate::load::monitor::{ResourceMonitor, ResourceSample};
use crate::load::{SequencingMode, TransactionInjector, TransactionOutcome};
use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Output of one injection window: the aggregates and the resource samples
/// recorded concurrently with it.
pub struct LoadRun {
    pub results: LoadResults,
    pub samples: Vec<ResourceSample>,
}

/// Drives one injection window: a resource monitor plus exactly one
/// submission worker per node, so no two workers contend on the same
/// account's sequence numbers.
pub struct LoadTestRunner {
    config: Arc<BenchConfig>,
}

impl LoadTestRunner {
    pub fn new(config: Arc<BenchConfig>) -> Self {
        Self { config }
    }

    pub async fn run(
        &self,
        nodes: &[NodeDescriptor],
        total_txs: u64,
        mode: SequencingMode,
    ) -> Result<LoadRun> {
        let node_count = nodes.len() as u64;
        anyhow::ensure!(node_count > 0, "no nodes to inject through");

        let fetcher = Arc::new(AccountStateFetcher::new(Arc::clone(&self.config))?);
        let injector = Arc::new(TransactionInjector::new(Arc::clone(&self.config)));
        let outcomes: Arc<Mutex<Vec<TransactionOutcome>>> = Arc::new(Mutex::new(Vec::new()));

        println!(
            "{} Injecting {} transactions across {} nodes...",
            "→".cyan(),
            total_txs,
            node_count
        );

        // The monitor overlaps the whole window, including the worker tail.
        let monitor = ResourceMonitor::new(self.config.sample_interval, self.config.binary_name());
        let handle = monitor.start();
        let started = Instant::now();

        let per_node = total_txs / node_count;
        let remainder = total_txs % node_count;

        let mut workers = FuturesUnordered::new();
        for (index, sender) in nodes.iter().enumerate() {
            let count = per_node + if (index as u64) < remainder { 1 } else { 0 };
            if count == 0 {
                continue;
            }
            let sender = sender.clone();
            let receiver = nodes[(index + 1) % nodes.len()].clone();
            let fetcher = Arc::clone(&fetcher);
            let injector = Arc::clone(&injector);
            let outcomes = Arc::clone(&outcomes);

            workers.push(tokio::spawn(async move {
                let baseline = fetcher.fetch(&sender).await;
                // Unknown baseline means we cannot pick sequences ourselves.
                let effective_mode = if baseline.is_unknown() {
                    SequencingMode::Implicit
                } else {
                    mode
                };
                println!(
                    "  node{} → node{}: {} txs (account {}, seq {}, {:?})",
                    sender.id,
                    receiver.id,
                    count,
                    baseline.account_number,
                    baseline.sequence,
                    effective_mode
                );
                let worker_outcomes = injector
                    .submit(&sender, &receiver, count, effective_mode, baseline)
                    .await;
                outcomes.lock().await.extend(worker_outcomes);
            }));
        }

        while let Some(joined) = workers.next().await {
            if let Err(e) = joined {
                eprintln!("{} injection worker panicked: {}", "⚠".yellow(), e);
            }
        }

        let elapsed = started.elapsed();
        let samples = handle.stop().await;

        let outcomes = outcomes.lock().await;
        let results = metrics::aggregate(&outcomes, elapsed);
        println!(
            "{} Window complete: {}/{} accepted in {:.2}s ({:.2} tx/s)",
            "✔".green(),
            results.successes,
            results.total,
            results.duration_s,
            results.tps
        );
        Ok(LoadRun {
            results,
            samples,
        })
    }
}

/// The cluster is healthy when its first and last node both answer `/status`
/// with a chain height of at least one produced block.
pub async fn cluster_healthy(rpc: &RpcClient, nodes: &[NodeDescriptor]) -> bool {
    let Some(first) = nodes.first() else {
        return false;
    };
    let Some(last) = nodes.last() else {
        return false;
    };
    for node in [first, last] {
        match rpc.latest_height(&node.rpc).await {
            Ok(height) if height >= 1 => {}
            _ => {
                eprintln!("{} node{} is not at height 1 yet", "⚠".yellow(), node.id);
                return false;
            }
        }
    }
    true
}
