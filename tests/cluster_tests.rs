use chainbench::cluster::account::decode_account;
use chainbench::cluster::{
    AccountState, ClusterError, ClusterLifecycleManager, ClusterState, NodeRegistry,
};
use chainbench::config::BenchConfig;
use chainbench::load::injector::{planned_sequence, SequencingMode};
use chainbench::load::ResourceMonitor;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write_node(root: &Path, id: u32, address: &str) {
    let home = BenchConfig::node_home(root, id);
    fs::create_dir_all(&home).unwrap();
    fs::write(home.join("address"), format!("{}\n", address)).unwrap();
}

#[test]
fn registry_skips_missing_nodes_without_failing() {
    let dir = TempDir::new().unwrap();
    let config = BenchConfig::default();
    write_node(dir.path(), 1, "hcp1sender");
    write_node(dir.path(), 2, "hcp1receiver");
    // node3 never initialized

    let nodes = NodeRegistry::load(&config, dir.path(), 3);
    assert_eq!(nodes.len(), 2);
    assert!(NodeRegistry::require_quorum(&nodes, 2).is_ok());

    match NodeRegistry::require_quorum(&nodes, 3).unwrap_err() {
        ClusterError::IncompleteCluster { found, required } => {
            assert_eq!((found, required), (2, 3));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// A bootstrap that exits without bringing any node up: readiness can only
/// time out. The manager must tear down, report the timeout, and remain
/// observably failed even after a later teardown call.
#[tokio::test]
async fn start_timeout_tears_down_and_stays_failed() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("start_nodes.sh"), "exit 0\n").unwrap();

    let config = Arc::new(BenchConfig {
        bootstrap_dir: dir.path().to_path_buf(),
        // A port nothing listens on, with the readiness window shrunk so
        // the timeout fires quickly.
        base_rpc_port: 45731,
        port_timeout: Duration::from_millis(200),
        poll_interval: Duration::from_millis(50),
        ..BenchConfig::default()
    });
    let mut manager = ClusterLifecycleManager::new(
        Arc::clone(&config),
        dir.path().join("data"),
        dir.path().join("logs"),
    )
    .unwrap();

    let err = manager.start(2).await.unwrap_err();
    assert!(matches!(
        err,
        ClusterError::StartTimeout {
            phase: "port-reachable",
            ..
        }
    ));
    assert_eq!(manager.state(), ClusterState::Failed);

    manager.stop().await;
    assert_eq!(manager.state(), ClusterState::Failed);
}

#[tokio::test]
async fn lifecycle_stop_is_idempotent_even_without_start() {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(BenchConfig::default());
    let mut manager = ClusterLifecycleManager::new(
        config,
        dir.path().join("data"),
        dir.path().join("logs"),
    )
    .unwrap();

    manager.stop().await;
    manager.stop().await;
    assert_eq!(manager.state(), ClusterState::Stopped);
}

/// A `{0,0}` account baseline means both lookup paths failed; the injector
/// must fall back to node-assigned sequencing instead of erroring.
#[test]
fn unknown_baseline_falls_back_to_implicit_sequencing() {
    let baseline = AccountState::default();
    assert!(baseline.is_unknown());

    let effective = if baseline.is_unknown() {
        SequencingMode::Implicit
    } else {
        SequencingMode::Explicit
    };
    assert_eq!(planned_sequence(effective, baseline, 0), None);
}

#[test]
fn account_decode_handles_both_envelope_shapes() {
    let direct = json!({
        "account": { "account_number": "11", "sequence": "4" }
    });
    let wrapped = json!({
        "account": { "base_account": { "account_number": 11, "sequence": 4 } }
    });
    let expected = AccountState {
        account_number: 11,
        sequence: 4,
    };
    assert_eq!(decode_account(&direct), Some(expected));
    assert_eq!(decode_account(&wrapped), Some(expected));
    assert_eq!(decode_account(&json!({"height": "0"})), None);
}

#[tokio::test]
async fn monitor_sample_list_is_stable_after_stop() {
    let monitor = ResourceMonitor::new(Duration::from_millis(25), "hcpd".to_string());
    let handle = monitor.start();
    tokio::time::sleep(Duration::from_millis(120)).await;

    let samples = handle.stop().await;
    let frozen = samples.len();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(samples.len(), frozen);
}
