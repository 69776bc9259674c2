use crate::cluster::NodeDescriptor;
use crate::config::BenchConfig;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::process::Command;

/// On-chain account number and sequence at fetch time.
///
/// `{0, 0}` is the "unknown" sentinel: both lookup paths failed and the
/// caller should fall back to letting the node assign sequences itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub account_number: u64,
    pub sequence: u64,
}

impl AccountState {
    pub fn is_unknown(&self) -> bool {
        self.account_number == 0 && self.sequence == 0
    }
}

/// Resolves account state via the REST API, falling back to the node binary's
/// query CLI. Never fails: total lookup failure yields the unknown sentinel.
pub struct AccountStateFetcher {
    client: Client,
    config: Arc<BenchConfig>,
}

impl AccountStateFetcher {
    pub fn new(config: Arc<BenchConfig>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to create account query client")?;
        Ok(Self { client, config })
    }

    pub async fn fetch(&self, node: &NodeDescriptor) -> AccountState {
        if let Some(state) = self.fetch_http(node).await {
            return state;
        }
        if let Some(state) = self.fetch_cli(node).await {
            return state;
        }
        eprintln!(
            "{} node{}: account state unknown, deferring sequencing to the node",
            "⚠".yellow(),
            node.id
        );
        AccountState::default()
    }

    async fn fetch_http(&self, node: &NodeDescriptor) -> Option<AccountState> {
        let url = node
            .api
            .join(&format!("/cosmos/auth/v1beta1/accounts/{}", node.address))
            .ok()?;
        let resp = self.client.get(url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let body: Value = resp.json().await.ok()?;
        decode_account(&body)
    }

    async fn fetch_cli(&self, node: &NodeDescriptor) -> Option<AccountState> {
        let output = Command::new(&self.config.binary)
            .args(["query", "auth", "account"])
            .arg(&node.address)
            .arg("--node")
            .arg(node.rpc.as_str())
            .arg("--home")
            .arg(&node.home)
            .args(["--output", "json"])
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let body: Value = serde_json::from_slice(&output.stdout).ok()?;
        decode_account(&body)
    }
}

/// Decode the account envelope's two shapes: fields directly on the account
/// object, or nested under a `base_account` wrapper. Shape variance is
/// normal, not an error; anything else yields `None`.
pub fn decode_account(body: &Value) -> Option<AccountState> {
    let account = body.get("account").unwrap_or(body);
    decode_fields(account).or_else(|| account.get("base_account").and_then(decode_fields))
}

fn decode_fields(obj: &Value) -> Option<AccountState> {
    Some(AccountState {
        account_number: as_u64_loose(obj.get("account_number")?)?,
        sequence: as_u64_loose(obj.get("sequence")?)?,
    })
}

/// Account fields arrive as JSON strings from the REST gateway and as
/// numbers from some CLI builds; accept both.
fn as_u64_loose(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
