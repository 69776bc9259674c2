use crate::cluster::{AccountState, NodeDescriptor};
use crate::config::BenchConfig;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::sleep;
use uuid::Uuid;

/// How sequence numbers are assigned to outgoing transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencingMode {
    /// The injector supplies `baseline.sequence + slot` explicitly. Required
    /// when the node does not serialize submissions for an account itself.
    Explicit,
    /// The sequence flag is omitted and the node assigns it. Only safe when
    /// the node guarantees single-writer ordering per account.
    Implicit,
}

/// Terminal result of one transaction slot.
#[derive(Debug, Clone)]
pub struct TransactionOutcome {
    pub success: bool,
    pub hash: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub duration_ms: f64,
    pub error_kind: Option<String>,
    pub raw: Option<Value>,
}

/// Per-slot classification of the submission command's output.
#[derive(Debug, PartialEq)]
pub enum Disposition {
    Accepted { hash: String, raw: Value },
    Retry,
    Rejected { kind: String, raw: Option<Value> },
}

/// Classify one submission attempt. "Not ready" and "sequence mismatch" are
/// transient node-startup races and retryable; everything else is terminal.
pub fn classify_output(exit_ok: bool, stdout: &str, stderr: &str) -> Disposition {
    let is_transient =
        |text: &str| text.contains("not ready") || text.contains("account sequence mismatch");

    if !exit_ok {
        if is_transient(stdout) || is_transient(stderr) {
            return Disposition::Retry;
        }
        return Disposition::Rejected {
            kind: "cli_error".to_string(),
            raw: Some(Value::String(stderr.to_string())),
        };
    }

    let parsed: Value = match serde_json::from_str(stdout.trim()) {
        Ok(value) => value,
        Err(_) => {
            return Disposition::Rejected {
                kind: "json_parse_error".to_string(),
                raw: Some(Value::String(stdout.to_string())),
            }
        }
    };

    let code = parsed.get("code").and_then(Value::as_u64).unwrap_or(0);
    if code == 0 {
        let hash = parsed
            .get("txhash")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Disposition::Accepted { hash, raw: parsed };
    }

    let raw_log = parsed
        .get("raw_log")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if is_transient(&raw_log) {
        return Disposition::Retry;
    }
    let kind = if raw_log.is_empty() {
        format!("code_{}", code)
    } else {
        raw_log
    };
    Disposition::Rejected {
        kind,
        raw: Some(parsed),
    }
}

/// Sequence to attach to a slot, if any. In explicit mode the run is
/// contiguous and gap-free from the fetched baseline; a retried slot keeps
/// its sequence so the run stays dense.
pub fn planned_sequence(mode: SequencingMode, baseline: AccountState, slot: u64) -> Option<u64> {
    match mode {
        SequencingMode::Explicit => Some(baseline.sequence + slot),
        SequencingMode::Implicit => None,
    }
}

/// Submits a bounded number of transfers from one node to another,
/// sequentially, retrying transient failures with a fixed backoff.
pub struct TransactionInjector {
    config: Arc<BenchConfig>,
}

impl TransactionInjector {
    pub fn new(config: Arc<BenchConfig>) -> Self {
        Self { config }
    }

    /// Submit `count` transfers. Returns exactly one outcome per slot.
    pub async fn submit(
        &self,
        sender: &NodeDescriptor,
        receiver: &NodeDescriptor,
        count: u64,
        mode: SequencingMode,
        baseline: AccountState,
    ) -> Vec<TransactionOutcome> {
        let base_args = self.base_args(sender, receiver, mode, baseline);
        let mut outcomes = Vec::with_capacity(count as usize);
        for slot in 0..count {
            outcomes
                .push(self.submit_slot(&base_args, mode, baseline, slot).await);
        }
        outcomes
    }

    /// Command template shared by every slot of one worker. Broadcast mode
    /// "sync" acknowledges on mempool acceptance rather than commitment; the
    /// measured latency is submission latency, not finality.
    fn base_args(
        &self,
        sender: &NodeDescriptor,
        receiver: &NodeDescriptor,
        mode: SequencingMode,
        baseline: AccountState,
    ) -> Vec<String> {
        let cfg = &self.config;
        let mut args = vec![
            "tx".to_string(),
            "bank".to_string(),
            "send".to_string(),
            format!("node{}", sender.id),
            receiver.address.clone(),
            cfg.transfer_amount.clone(),
            "--chain-id".to_string(),
            cfg.chain_id.clone(),
            "--home".to_string(),
            sender.home.to_string_lossy().into_owned(),
            "--node".to_string(),
            sender.rpc.to_string(),
            "--keyring-backend".to_string(),
            cfg.keyring_backend.clone(),
            "--output".to_string(),
            "json".to_string(),
            "--yes".to_string(),
            "--broadcast-mode".to_string(),
            "sync".to_string(),
            "--gas".to_string(),
            cfg.gas.clone(),
            "--gas-prices".to_string(),
            cfg.gas_prices.clone(),
        ];
        if mode == SequencingMode::Explicit {
            args.push("--account-number".to_string());
            args.push(baseline.account_number.to_string());
        }
        args
    }

    async fn submit_slot(
        &self,
        base_args: &[String],
        mode: SequencingMode,
        baseline: AccountState,
        slot: u64,
    ) -> TransactionOutcome {
        let submitted_at = Utc::now();
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            let mut args = base_args.to_vec();
            if let Some(sequence) = planned_sequence(mode, baseline, slot) {
                args.push("--sequence".to_string());
                args.push(sequence.to_string());
            }
            args.push("--note".to_string());
            args.push(format!("tx-{}", Uuid::new_v4()));

            let output = Command::new(&self.config.binary).args(&args).output().await;
            let output = match output {
                Ok(output) => output,
                Err(e) => {
                    return failure(submitted_at, started, e.to_string(), None);
                }
            };

            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            match classify_output(output.status.success(), &stdout, &stderr) {
                Disposition::Accepted { hash, raw } => {
                    return TransactionOutcome {
                        success: true,
                        hash: Some(hash),
                        submitted_at,
                        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
                        error_kind: None,
                        raw: Some(raw),
                    };
                }
                Disposition::Retry => {
                    attempts += 1;
                    if attempts > self.config.max_retries {
                        return failure(
                            submitted_at,
                            started,
                            "retry_exhausted".to_string(),
                            None,
                        );
                    }
                    sleep(self.config.retry_backoff).await;
                }
                Disposition::Rejected { kind, raw } => {
                    return failure(submitted_at, started, kind, raw);
                }
            }
        }
    }
}

fn failure(
    submitted_at: DateTime<Utc>,
    started: Instant,
    kind: String,
    raw: Option<Value>,
) -> TransactionOutcome {
    TransactionOutcome {
        success: false,
        hash: None,
        submitted_at,
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        error_kind: Some(kind),
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_sequences_are_contiguous_from_baseline() {
        let baseline = AccountState {
            account_number: 3,
            sequence: 41,
        };
        let run: Vec<u64> = (0..5)
            .map(|slot| planned_sequence(SequencingMode::Explicit, baseline, slot).unwrap())
            .collect();
        assert_eq!(run, vec![41, 42, 43, 44, 45]);
    }

    #[test]
    fn implicit_mode_defers_to_the_node() {
        let baseline = AccountState::default();
        assert_eq!(
            planned_sequence(SequencingMode::Implicit, baseline, 7),
            None
        );
    }

    #[test]
    fn accepted_when_code_is_zero() {
        let stdout = r#"{"code":0,"txhash":"ABC123","raw_log":""}"#;
        match classify_output(true, stdout, "") {
            Disposition::Accepted { hash, .. } => assert_eq!(hash, "ABC123"),
            other => panic!("expected Accepted, got {:?}", other),
        }
    }

    #[test]
    fn sequence_mismatch_is_retried_not_failed() {
        let stdout = r#"{"code":32,"txhash":"","raw_log":"account sequence mismatch, expected 5, got 4"}"#;
        assert_eq!(classify_output(true, stdout, ""), Disposition::Retry);
        // The same phrase on stderr of a failed invocation is also transient.
        assert_eq!(
            classify_output(false, "", "error: hcpd is not ready"),
            Disposition::Retry
        );
    }

    #[test]
    fn nonzero_exit_is_cli_error() {
        match classify_output(false, "", "panic: keyring locked") {
            Disposition::Rejected { kind, .. } => assert_eq!(kind, "cli_error"),
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn malformed_stdout_is_json_parse_error() {
        match classify_output(true, "gas estimate: 81234", "") {
            Disposition::Rejected { kind, .. } => assert_eq!(kind, "json_parse_error"),
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn protocol_failure_keeps_the_raw_log_as_kind() {
        let stdout = r#"{"code":5,"txhash":"","raw_log":"insufficient funds"}"#;
        match classify_output(true, stdout, "") {
            Disposition::Rejected { kind, .. } => assert_eq!(kind, "insufficient funds"),
            other => panic!("expected Rejected, got {:?}", other),
        }
    }
}
