use chainbench::cluster::BlockSummary;
use chainbench::experiment::{
    ExperimentMetrics, ExperimentParams, ExperimentPoint, ExperimentResult,
};
use chainbench::load::injector::TransactionOutcome;
use chainbench::load::metrics::aggregate;
use chainbench::report::{render_experiment_report, render_load_report};
use chrono::Utc;
use indexmap::IndexMap;
use std::time::Duration;

fn point(nodes: u32, tx: u64, tps: f64) -> ExperimentPoint {
    ExperimentPoint {
        params: ExperimentParams { nodes, tx },
        metrics: ExperimentMetrics {
            duration_s: 10.0,
            tps,
            avg_latency_ms: 120.456,
            p99_latency_ms: 333.333,
            cpu_percent: 48.21,
            bandwidth_bps: 4096.0,
            storage_latency_ms: 2.5,
        },
    }
}

fn outcome(success: bool, kind: Option<&str>) -> TransactionOutcome {
    TransactionOutcome {
        success,
        hash: success.then(|| "AB".to_string()),
        submitted_at: Utc::now(),
        duration_ms: 25.0,
        error_kind: kind.map(str::to_string),
        raw: None,
    }
}

#[test]
fn experiment_report_renders_rows_in_point_order() {
    let result = ExperimentResult {
        name: "scale_matrix".to_string(),
        description: "desc".to_string(),
        points: vec![point(4, 100, 20.0), point(8, 100, 15.0)],
        metadata: IndexMap::new(),
        error_distribution: IndexMap::new(),
    };
    let report = render_experiment_report(&result);

    let four = report.find("| 4 | 100 |").expect("row for 4 nodes");
    let eight = report.find("| 8 | 100 |").expect("row for 8 nodes");
    assert!(four < eight);
    // Two decimals for latencies, one for CPU.
    assert!(report.contains("120.46"));
    assert!(report.contains("48.2"));
    // No failures anywhere: the error section must be absent.
    assert!(!report.contains("Error Distribution"));
}

#[test]
fn experiment_report_includes_error_breakdown_when_present() {
    let mut errors = IndexMap::new();
    errors.insert("cli_error".to_string(), 1u64);
    errors.insert("json_parse_error".to_string(), 2u64);
    let result = ExperimentResult {
        name: "scale_matrix".to_string(),
        description: String::new(),
        points: vec![point(4, 100, 20.0)],
        metadata: IndexMap::new(),
        error_distribution: errors,
    };
    let report = render_experiment_report(&result);
    assert!(report.contains("## Error Distribution"));
    assert!(report.contains("- cli_error: 1"));
    assert!(report.contains("- json_parse_error: 2"));
}

#[test]
fn load_report_shows_full_success_without_error_section() {
    let outcomes: Vec<_> = (0..9).map(|_| outcome(true, None)).collect();
    let results = aggregate(&outcomes, Duration::from_secs(3));
    let report = render_load_report(3, &results, &[], &[]);

    assert!(report.contains("**Success Rate:** 9/9 (100.00%)"));
    assert!(!report.contains("Error Distribution"));
    assert!(report.contains("No block data available"));
}

#[test]
fn load_report_lists_error_groups_and_block_sample() {
    let outcomes = vec![
        outcome(false, Some("cli_error")),
        outcome(false, Some("json_parse_error")),
        outcome(false, Some("json_parse_error")),
    ];
    let results = aggregate(&outcomes, Duration::from_secs(1));
    let blocks = vec![
        BlockSummary {
            height: 40,
            time: "2026-08-24T10:00:00Z".to_string(),
            txs: 3,
        },
        BlockSummary {
            height: 41,
            time: "2026-08-24T10:00:01Z".to_string(),
            txs: 5,
        },
    ];
    let report = render_load_report(2, &results, &[], &blocks);

    assert!(report.contains("### Error Distribution"));
    assert!(report.contains("- cli_error: 1"));
    assert!(report.contains("- json_parse_error: 2"));
    assert!(report.contains("**Sampled Blocks:** 40 to 41"));
    assert!(report.contains("**Transactions in Sample:** 8"));
}

#[test]
fn empty_result_still_renders_a_document() {
    let result = ExperimentResult {
        name: "aborted".to_string(),
        description: String::new(),
        points: Vec::new(),
        metadata: IndexMap::new(),
        error_distribution: IndexMap::new(),
    };
    let report = render_experiment_report(&result);
    assert!(report.contains("No configuration completed"));
}
