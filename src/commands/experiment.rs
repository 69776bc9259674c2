use crate::commands::load::parse_sequencing;
use crate::config::BenchConfig;
use crate::experiment::result::matrix_artifact_filename;
use crate::experiment::ExperimentOrchestrator;
use crate::report::render_experiment_report;
use crate::utils::parse_u64_list;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Cluster sizes must survive the u32 port arithmetic; an out-of-range
/// entry is an argument error, not a silent truncation.
fn parse_node_counts(list: &str) -> Result<Vec<u32>> {
    parse_u64_list(list)?
        .into_iter()
        .map(|n| u32::try_from(n).map_err(|_| anyhow::anyhow!("Node count out of range: {}", n)))
        .collect()
}

pub struct ExperimentOptions {
    pub full: bool,
    pub node_counts: Option<String>,
    pub tx_counts: Option<String>,
    pub sequencing: String,
    pub data_root: PathBuf,
    pub log_dir: PathBuf,
    pub binary: PathBuf,
    pub bootstrap_dir: PathBuf,
    pub chain_id: String,
    pub label: String,
    pub out_dir: PathBuf,
}

/// Run the full lifecycle + injection matrix and write both artifacts.
pub async fn handle_experiment(options: ExperimentOptions) -> Result<()> {
    let mode = parse_sequencing(&options.sequencing)?;

    let (default_nodes, default_txs): (Vec<u64>, Vec<u64>) = if options.full {
        (vec![4, 8, 16, 32], vec![100, 500, 1000])
    } else {
        (vec![4, 8], vec![100])
    };
    let node_counts: Vec<u32> = match &options.node_counts {
        Some(list) => parse_node_counts(list)?,
        None => default_nodes.into_iter().map(|n| n as u32).collect(),
    };
    let tx_counts = match &options.tx_counts {
        Some(list) => parse_u64_list(list)?,
        None => default_txs,
    };

    let config = Arc::new(BenchConfig {
        binary: options.binary,
        bootstrap_dir: options.bootstrap_dir,
        data_root: options.data_root,
        log_dir: options.log_dir,
        chain_id: options.chain_id,
        run_label: options.label,
        ..BenchConfig::default()
    });

    println!(
        "{} Experiment matrix: {:?} nodes × {:?} txs",
        "→".cyan(),
        node_counts,
        tx_counts
    );

    let orchestrator = ExperimentOrchestrator::new(
        Arc::clone(&config),
        node_counts.clone(),
        tx_counts.clone(),
        mode,
    );
    // Failed configurations are skipped inside the orchestrator; whatever
    // was collected gets written before the exit code is decided.
    let result = orchestrator.run().await?;
    fs::create_dir_all(&options.out_dir)?;
    let json_path = options.out_dir.join(matrix_artifact_filename(
        &config.run_label,
        &node_counts,
        &tx_counts,
        "json",
    ));
    let md_path = options.out_dir.join(matrix_artifact_filename(
        &config.run_label,
        &node_counts,
        &tx_counts,
        "md",
    ));
    result.write_json(&json_path)?;
    fs::write(&md_path, render_experiment_report(&result))?;

    println!();
    println!("JSON results: {}", json_path.display());
    println!("Markdown report: {}", md_path.display());

    if result.points.is_empty() {
        anyhow::bail!("No experiment configuration produced data");
    }
    println!(
        "{} {} experiment points collected",
        "✔".green().bold(),
        result.points.len().to_string().bright_white()
    );
    Ok(())
}
