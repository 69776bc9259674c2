use crate::cluster::BlockSummary;
use crate::experiment::ExperimentResult;
use crate::load::monitor::{self, ResourceSample};
use crate::load::LoadResults;
use chrono::Utc;

pub fn format_float(value: f64, precision: usize) -> String {
    format!("{:.*}", precision, value)
}

/// Render a Markdown table from headers and pre-formatted rows.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!("| {} |", headers.join(" | ")));
    lines.push(format!("| {} |", vec!["---"; headers.len()].join(" | ")));
    for row in rows {
        lines.push(format!("| {} |", row.join(" | ")));
    }
    lines.join("\n")
}

/// Render the experiment matrix as a Markdown document: one table row per
/// point in input order, plus configuration and analysis narrative. Pure
/// function; writing the document anywhere is the caller's business.
pub fn render_experiment_report(result: &ExperimentResult) -> String {
    let headers = [
        "Nodes",
        "Txs",
        "Duration (s)",
        "TPS",
        "Avg Latency (ms)",
        "P99 Latency (ms)",
        "CPU (%)",
        "Bandwidth (KB/s)",
        "Storage (ms)",
    ];
    let rows: Vec<Vec<String>> = result
        .points
        .iter()
        .map(|p| {
            vec![
                p.params.nodes.to_string(),
                p.params.tx.to_string(),
                format_float(p.metrics.duration_s, 2),
                format_float(p.metrics.tps, 2),
                format_float(p.metrics.avg_latency_ms, 2),
                format_float(p.metrics.p99_latency_ms, 2),
                format_float(p.metrics.cpu_percent, 1),
                format_float(p.metrics.bandwidth_bps / 1024.0, 1),
                format_float(p.metrics.storage_latency_ms, 2),
            ]
        })
        .collect();

    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", result.name));
    out.push_str(&format!("{}\n\n", result.description));
    out.push_str(&format!(
        "**Date:** {}\n\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    out.push_str("## Configuration\n\n");
    for (key, value) in &result.metadata {
        out.push_str(&format!("- **{}**: {}\n", key, value));
    }
    out.push_str("- **Broadcast mode**: sync (mempool acceptance, not commitment)\n");
    out.push_str("- **TPS**: accepted transactions / injection wall time\n");
    out.push_str("- **CPU**: mean usage of the consensus node processes\n");
    out.push_str("- **Bandwidth**: total NIC traffic during the window\n");
    out.push_str("- **Storage**: mean 1KB fsynced write into the node data dir\n");

    out.push_str("\n## Results\n\n");
    if result.points.is_empty() {
        out.push_str("No configuration completed; see the run log.\n");
    } else {
        out.push_str(&render_table(&headers, &rows));
        out.push('\n');
    }

    if !result.error_distribution.is_empty() {
        out.push_str("\n## Error Distribution\n\n");
        for (kind, count) in &result.error_distribution {
            out.push_str(&format!("- {}: {}\n", kind, count));
        }
    }

    out.push_str("\n## Analysis\n\n");
    out.push_str(
        "- Bandwidth should grow with node count as consensus traffic scales O(n²).\n",
    );
    out.push_str(
        "- Rising P99 latency at larger clusters points at added consensus rounds.\n",
    );
    out.push_str(
        "- Low TPS with idle CPU suggests the local store, not consensus, is the bottleneck.\n",
    );
    out
}

/// Render the single-window load report: executive summary, error breakdown,
/// resource usage, and the sampled recent blocks.
pub fn render_load_report(
    node_count: usize,
    results: &LoadResults,
    samples: &[ResourceSample],
    blocks: &[BlockSummary],
) -> String {
    let mut out = String::new();
    out.push_str("# Consensus Load Test Report\n\n");
    out.push_str(&format!(
        "**Date:** {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("**Nodes:** {}\n", node_count));
    out.push_str(&format!("**Total Transactions:** {}\n\n", results.total));

    out.push_str("## Summary\n\n");
    out.push_str(&format!(
        "- **Success Rate:** {}/{} ({}%)\n",
        results.successes,
        results.total,
        format_float(results.success_rate_percent(), 2)
    ));
    out.push_str(&format!(
        "- **Total Duration:** {} seconds\n",
        format_float(results.duration_s, 2)
    ));
    out.push_str(&format!(
        "- **Throughput:** {} tx/sec (submission rate)\n",
        format_float(results.tps, 2)
    ));
    out.push_str(&format!(
        "- **Submission Latency:** avg {} ms, min {} ms, max {} ms, p99 {} ms\n",
        format_float(results.avg_latency_ms, 2),
        format_float(results.min_latency_ms, 2),
        format_float(results.max_latency_ms, 2),
        format_float(results.p99_latency_ms, 2)
    ));
    out.push_str(&format!("- **Failures:** {}\n", results.failures));

    if !results.error_distribution.is_empty() {
        out.push_str("\n### Error Distribution\n\n");
        for (kind, count) in &results.error_distribution {
            out.push_str(&format!("- {}: {}\n", kind, count));
        }
    }

    out.push_str("\n## Resource Usage\n\n");
    out.push_str(&format!(
        "- **Average Load (1m):** {}\n",
        format_float(monitor::average_load(samples), 2)
    ));
    out.push_str(&format!(
        "- **Average Node CPU:** {}%\n",
        format_float(monitor::average_cpu(samples), 1)
    ));
    out.push_str(&format!(
        "- **Average Bandwidth:** {} KB/s\n",
        format_float(monitor::average_bandwidth(samples) / 1024.0, 1)
    ));
    out.push_str(&format!(
        "- **Peak Memory Usage:** {} MB (whole host)\n",
        format_float(monitor::peak_memory_kb(samples) as f64 / 1024.0, 2)
    ));

    out.push_str("\n## Consensus Activity (recent blocks)\n\n");
    if blocks.is_empty() {
        out.push_str("- No block data available.\n");
    } else {
        out.push_str(&format!(
            "- **Sampled Blocks:** {} to {}\n",
            blocks[0].height,
            blocks[blocks.len() - 1].height
        ));
        out.push_str(&format!(
            "- **Transactions in Sample:** {}\n",
            blocks.iter().map(|b| b.txs).sum::<usize>()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_precision_formatting() {
        assert_eq!(format_float(3.14159, 2), "3.14");
        assert_eq!(format_float(55.55, 1), "55.6");
        assert_eq!(format_float(0.0, 2), "0.00");
    }

    #[test]
    fn tables_render_one_row_per_entry() {
        let table = render_table(
            &["A", "B"],
            &[
                vec!["1".to_string(), "2".to_string()],
                vec!["3".to_string(), "4".to_string()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "| A | B |");
        assert_eq!(lines[1], "| --- | --- |");
        assert_eq!(lines[3], "| 3 | 4 |");
    }
}
