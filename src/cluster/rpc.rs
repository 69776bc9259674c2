use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Summary of one committed block, taken from `/block?height=H`.
#[derive(Debug, Clone)]
pub struct BlockSummary {
    pub height: u64,
    /// Header time as reported by the node (RFC 3339).
    pub time: String,
    pub txs: usize,
}

/// Thin client for the Tendermint-style RPC surface the nodes expose.
#[derive(Clone)]
pub struct RpcClient {
    client: Client,
}

impl RpcClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create RPC client")?;
        Ok(Self { client })
    }

    /// `GET /status` → `result.sync_info.latest_block_height`.
    pub async fn latest_height(&self, rpc: &Url) -> Result<u64> {
        let url = rpc.join("/status")?;
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("status endpoint returned {}", resp.status()));
        }
        let body: Value = resp.json().await?;
        let height = body
            .pointer("/result/sync_info/latest_block_height")
            .ok_or_else(|| anyhow!("status response missing latest_block_height"))?;
        parse_height(height).ok_or_else(|| anyhow!("unparseable block height: {height}"))
    }

    /// `GET /block?height=H` → header time and transaction count.
    pub async fn block_summary(&self, rpc: &Url, height: u64) -> Result<BlockSummary> {
        let url = rpc.join(&format!("/block?height={}", height))?;
        let body: Value = self.client.get(url).send().await?.json().await?;
        let block = body
            .pointer("/result/block")
            .ok_or_else(|| anyhow!("block response missing result.block"))?;
        let time = block
            .pointer("/header/time")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let txs = block
            .pointer("/data/txs")
            .and_then(Value::as_array)
            .map(|txs| txs.len())
            .unwrap_or(0);
        Ok(BlockSummary { height, time, txs })
    }

    /// Fetch up to `depth` most recent blocks, best effort. Individual block
    /// fetch failures end the scan early rather than failing the caller.
    pub async fn recent_blocks(&self, rpc: &Url, depth: u64) -> Vec<BlockSummary> {
        let latest = match self.latest_height(rpc).await {
            Ok(h) => h,
            Err(_) => return Vec::new(),
        };
        let start = latest.saturating_sub(depth).max(1);
        let mut blocks = Vec::new();
        for height in start..=latest {
            match self.block_summary(rpc, height).await {
                Ok(block) => blocks.push(block),
                Err(_) => break,
            }
        }
        blocks
    }
}

/// Tendermint reports heights as JSON strings; tolerate numbers too.
fn parse_height(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
