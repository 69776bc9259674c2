#![cfg(unix)]

use chainbench::cluster::{AccountState, NodeDescriptor};
use chainbench::config::BenchConfig;
use chainbench::load::injector::TransactionInjector;
use chainbench::load::SequencingMode;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Shell script standing in for the node binary, so the full submit loop
/// runs against canned broadcast output.
fn write_stub_binary(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("hcpd-stub");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn node(config: &BenchConfig, id: u32, root: &Path) -> NodeDescriptor {
    NodeDescriptor {
        id,
        address: format!("hcp1node{}", id),
        home: root.join(format!("node{}", id)),
        rpc: config.rpc_url(id),
        api: config.api_url(id),
    }
}

#[tokio::test]
async fn accepted_submissions_yield_one_outcome_per_slot() {
    let dir = TempDir::new().unwrap();
    let binary = write_stub_binary(
        dir.path(),
        r#"echo '{"code":0,"txhash":"STUBHASH","raw_log":""}'"#,
    );
    let config = Arc::new(BenchConfig {
        binary,
        ..BenchConfig::default()
    });
    let sender = node(&config, 1, dir.path());
    let receiver = node(&config, 2, dir.path());
    let baseline = AccountState {
        account_number: 1,
        sequence: 10,
    };

    let injector = TransactionInjector::new(Arc::clone(&config));
    let outcomes = injector
        .submit(&sender, &receiver, 4, SequencingMode::Explicit, baseline)
        .await;

    assert_eq!(outcomes.len(), 4);
    assert!(outcomes.iter().all(|o| o.success));
    assert!(outcomes
        .iter()
        .all(|o| o.hash.as_deref() == Some("STUBHASH")));
}

/// A node that answers "sequence mismatch" forever must burn the bounded
/// retry budget and record a terminal outcome for every slot, never hang.
#[tokio::test]
async fn transient_failures_exhaust_the_retry_budget() {
    let dir = TempDir::new().unwrap();
    let binary = write_stub_binary(
        dir.path(),
        r#"echo '{"code":32,"txhash":"","raw_log":"account sequence mismatch, expected 7, got 6"}'"#,
    );
    let config = Arc::new(BenchConfig {
        binary,
        max_retries: 1,
        retry_backoff: Duration::from_millis(10),
        ..BenchConfig::default()
    });
    let sender = node(&config, 1, dir.path());
    let receiver = node(&config, 2, dir.path());

    let injector = TransactionInjector::new(Arc::clone(&config));
    let outcomes = injector
        .submit(
            &sender,
            &receiver,
            3,
            SequencingMode::Implicit,
            AccountState::default(),
        )
        .await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| !o.success));
    assert!(outcomes
        .iter()
        .all(|o| o.error_kind.as_deref() == Some("retry_exhausted")));
}

#[tokio::test]
async fn terminal_rejection_is_not_retried() {
    let dir = TempDir::new().unwrap();
    let binary = write_stub_binary(
        dir.path(),
        r#"echo '{"code":5,"txhash":"","raw_log":"insufficient funds"}'"#,
    );
    let config = Arc::new(BenchConfig {
        binary,
        ..BenchConfig::default()
    });
    let sender = node(&config, 1, dir.path());
    let receiver = node(&config, 2, dir.path());

    let injector = TransactionInjector::new(Arc::clone(&config));
    let outcomes = injector
        .submit(
            &sender,
            &receiver,
            1,
            SequencingMode::Implicit,
            AccountState::default(),
        )
        .await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].error_kind.as_deref(), Some("insufficient funds"));
}
