use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Immutable run configuration shared by every component.
///
/// All paths, ports, and timing parameters live here as named fields; nothing
/// reads ambient environment state. The defaults match the conventional
/// single-host testnet layout (Tendermint RPC on 26657 with a stride of 10
/// per node, REST API on 1317 with a stride of 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Consensus node binary, used both for transaction submission and the
    /// CLI account-query fallback.
    pub binary: PathBuf,
    /// Directory containing the cluster bootstrap script.
    pub bootstrap_dir: PathBuf,
    /// Bootstrap script name, invoked as `bash <script> <node_count>`.
    pub bootstrap_script: String,
    /// Root directory holding one `node<i>` home per cluster node.
    pub data_root: PathBuf,
    /// Directory the bootstrap script writes node logs into.
    pub log_dir: PathBuf,
    pub chain_id: String,
    /// Amount sent per transaction, e.g. "1stake".
    pub transfer_amount: String,
    pub gas: String,
    pub gas_prices: String,
    pub keyring_backend: String,

    pub base_rpc_port: u16,
    pub rpc_port_stride: u16,
    pub base_api_port: u16,
    pub api_port_stride: u16,

    /// Timeout for every HTTP call against a node endpoint.
    pub http_timeout: Duration,
    /// Interval between readiness poll attempts.
    pub poll_interval: Duration,
    /// How long to wait for the RPC ports to accept TCP connections.
    pub port_timeout: Duration,
    /// How long to wait for the chain to report a block height of at least 1.
    pub height_timeout: Duration,
    /// Grace period between SIGINT and SIGKILL on teardown.
    pub shutdown_grace: Duration,

    /// Backoff between retries of a transient submission failure.
    pub retry_backoff: Duration,
    /// Retry cap per transaction slot. The scripts this tool replaces retried
    /// "not ready"/"sequence mismatch" forever; exceeding this cap records a
    /// terminal `retry_exhausted` outcome instead.
    pub max_retries: u32,

    /// Resource sampling cadence during the injection window.
    pub sample_interval: Duration,
    /// Pause between experiment configurations, letting the host settle.
    pub settle_delay: Duration,

    /// Label used in report and result filenames.
    pub run_label: String,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("hcpd"),
            bootstrap_dir: PathBuf::from("."),
            bootstrap_script: "start_nodes.sh".to_string(),
            data_root: PathBuf::from(".nodes"),
            log_dir: PathBuf::from("logs"),
            chain_id: "hcp-testnet-1".to_string(),
            transfer_amount: "1stake".to_string(),
            gas: "200000".to_string(),
            gas_prices: "0.025stake".to_string(),
            keyring_backend: "test".to_string(),
            base_rpc_port: 26657,
            rpc_port_stride: 10,
            base_api_port: 1317,
            api_port_stride: 1,
            http_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(2),
            port_timeout: Duration::from_secs(120),
            height_timeout: Duration::from_secs(180),
            shutdown_grace: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(1),
            max_retries: 60,
            sample_interval: Duration::from_secs(1),
            settle_delay: Duration::from_secs(5),
            run_label: "chainbench".to_string(),
        }
    }
}

impl BenchConfig {
    pub fn rpc_port(&self, node_id: u32) -> u16 {
        scaled_port(self.base_rpc_port, self.rpc_port_stride, node_id)
    }

    pub fn api_port(&self, node_id: u32) -> u16 {
        scaled_port(self.base_api_port, self.api_port_stride, node_id)
    }

    pub fn rpc_url(&self, node_id: u32) -> Url {
        Url::parse(&format!("http://127.0.0.1:{}", self.rpc_port(node_id)))
            .expect("loopback url is well-formed")
    }

    pub fn api_url(&self, node_id: u32) -> Url {
        Url::parse(&format!("http://127.0.0.1:{}", self.api_port(node_id)))
            .expect("loopback url is well-formed")
    }

    pub fn node_home(data_root: &Path, node_id: u32) -> PathBuf {
        data_root.join(format!("node{}", node_id))
    }

    /// Data root for one experiment configuration; wiped on cluster start.
    pub fn run_data_root(&self, node_count: u32) -> PathBuf {
        self.data_root.join(format!("exp_nodes_{}", node_count))
    }

    pub fn run_log_dir(&self, node_count: u32) -> PathBuf {
        self.log_dir.join(format!("exp_nodes_{}", node_count))
    }

    /// File name of the node binary, used for the scoped process-kill
    /// safety net and for process discovery during resource sampling.
    pub fn binary_name(&self) -> String {
        self.binary
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.binary.to_string_lossy().into_owned())
    }
}

/// Computed in u32 and saturated so an oversized node id cannot overflow
/// the u16 port space; the CLI caps cluster sizes well below this anyway.
fn scaled_port(base: u16, stride: u16, node_id: u32) -> u16 {
    let port = u32::from(base)
        .saturating_add(node_id.saturating_sub(1).saturating_mul(u32::from(stride)));
    u16::try_from(port).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_follow_testnet_layout() {
        let config = BenchConfig::default();
        assert_eq!(config.rpc_port(1), 26657);
        assert_eq!(config.rpc_port(12), 26657 + 11 * 10);
        assert_eq!(config.api_port(1), 1317);
        assert_eq!(config.api_port(3), 1319);
    }

    #[test]
    fn port_arithmetic_saturates_instead_of_overflowing() {
        let config = BenchConfig::default();
        // 26657 + 3999 * 10 exceeds the u16 port space.
        assert_eq!(config.rpc_port(4000), u16::MAX);
        assert_eq!(config.rpc_port(32), 26657 + 31 * 10);
        assert_eq!(config.api_port(u32::MAX), u16::MAX);
    }

    #[test]
    fn rpc_url_points_at_loopback() {
        let config = BenchConfig::default();
        let url = config.rpc_url(2);
        assert_eq!(url.host_str(), Some("127.0.0.1"));
        assert_eq!(url.port(), Some(26667));
    }

    #[test]
    fn node_home_is_indexed_from_one() {
        let home = BenchConfig::node_home(Path::new("/tmp/nodes"), 4);
        assert_eq!(home, PathBuf::from("/tmp/nodes/node4"));
    }

    #[test]
    fn run_paths_embed_node_count() {
        let config = BenchConfig::default();
        assert!(config
            .run_data_root(8)
            .to_string_lossy()
            .contains("exp_nodes_8"));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = BenchConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: BenchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chain_id, config.chain_id);
        assert_eq!(back.max_retries, config.max_retries);
        assert_eq!(back.height_timeout, config.height_timeout);
    }
}
