use crate::cluster::{NodeRegistry, RpcClient};
use crate::config::BenchConfig;
use crate::experiment::result::artifact_filename;
use crate::load::runner::cluster_healthy;
use crate::load::{LoadTestRunner, SequencingMode};
use crate::report::render_load_report;
use crate::utils::parse_duration;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

pub struct LoadOptions {
    pub nodes: u32,
    pub txs: u64,
    pub sequencing: String,
    pub data_root: PathBuf,
    pub binary: PathBuf,
    pub chain_id: String,
    pub retry_backoff: String,
    pub max_retries: u32,
    pub output: Option<PathBuf>,
    pub label: String,
}

pub fn parse_sequencing(input: &str) -> Result<SequencingMode> {
    match input {
        "explicit" => Ok(SequencingMode::Explicit),
        "implicit" => Ok(SequencingMode::Implicit),
        other => anyhow::bail!(
            "Invalid sequencing mode '{}'. Use: explicit, implicit",
            other
        ),
    }
}

/// Run one injection window against an already-running cluster.
pub async fn handle_load(options: LoadOptions) -> Result<()> {
    let mode = parse_sequencing(&options.sequencing)?;
    let retry_backoff = parse_duration(&options.retry_backoff)?;
    let config = Arc::new(BenchConfig {
        binary: options.binary,
        data_root: options.data_root,
        chain_id: options.chain_id,
        retry_backoff,
        max_retries: options.max_retries,
        run_label: options.label,
        ..BenchConfig::default()
    });

    println!("{} Loading node registry...", "→".cyan());
    let nodes = NodeRegistry::load(&config, &config.data_root, options.nodes);
    NodeRegistry::require_quorum(&nodes, 2)?;
    println!("Loaded {} nodes.", nodes.len().to_string().bright_white());

    let rpc = RpcClient::new(config.http_timeout)?;
    if !cluster_healthy(&rpc, &nodes).await {
        // Nothing was measured yet, so this is the one case worth a
        // non-zero exit.
        anyhow::bail!("Network not ready; start the cluster and wait for block 1 first");
    }

    let runner = LoadTestRunner::new(Arc::clone(&config));
    let run = runner.run(&nodes, options.txs, mode).await?;

    println!("{} Sampling recent blocks...", "→".cyan());
    let blocks = rpc.recent_blocks(&nodes[0].rpc, 50).await;

    let report = render_load_report(nodes.len(), &run.results, &run.samples, &blocks);
    let default_name = artifact_filename(
        &format!("{}_n{}_t{}", config.run_label, nodes.len(), options.txs),
        "md",
    );
    let path = options.output.unwrap_or_else(|| PathBuf::from(default_name));
    fs::write(&path, report)?;

    println!();
    println!("{} Load test completed", "✔".green().bold());
    println!(
        "Success rate: {}%",
        format!("{:.2}", run.results.success_rate_percent()).bright_white()
    );
    println!(
        "Throughput: {} tx/s",
        format!("{:.2}", run.results.tps).bright_white()
    );
    println!(
        "Avg latency: {} ms",
        format!("{:.2}", run.results.avg_latency_ms).bright_white()
    );
    if run.results.failures > 0 {
        println!(
            "{} Failures: {}",
            "⚠".yellow(),
            run.results.failures.to_string().bright_white()
        );
    }
    println!("Report written to: {}", path.display());
    Ok(())
}
