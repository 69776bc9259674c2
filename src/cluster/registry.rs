use crate::cluster::ClusterError;
use crate::config::BenchConfig;
use owo_colors::OwoColorize;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Identity and endpoints of one cluster node. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    pub id: u32,
    /// Bech32 account address read from the node's `address` file.
    pub address: String,
    /// Node home directory (keyring, config, data).
    pub home: PathBuf,
    /// Tendermint RPC endpoint.
    pub rpc: Url,
    /// REST API endpoint for account queries.
    pub api: Url,
}

pub struct NodeRegistry;

impl NodeRegistry {
    /// Load descriptors for nodes `1..=cluster_size` from the data root.
    ///
    /// A node whose `address` file is missing is skipped with a warning
    /// rather than failing the load; whether the remaining set is enough is
    /// the caller's policy, enforced via [`NodeRegistry::require_quorum`].
    pub fn load(config: &BenchConfig, data_root: &Path, cluster_size: u32) -> Vec<NodeDescriptor> {
        let mut nodes = Vec::with_capacity(cluster_size as usize);
        for id in 1..=cluster_size {
            let home = BenchConfig::node_home(data_root, id);
            let addr_file = home.join("address");
            match fs::read_to_string(&addr_file) {
                Ok(address) => nodes.push(NodeDescriptor {
                    id,
                    address: address.trim().to_string(),
                    home,
                    rpc: config.rpc_url(id),
                    api: config.api_url(id),
                }),
                Err(_) => {
                    eprintln!(
                        "{} node{}: no address file at {}, skipping",
                        "⚠".yellow(),
                        id,
                        addr_file.display()
                    );
                }
            }
        }
        nodes
    }

    pub fn require_quorum(nodes: &[NodeDescriptor], required: usize) -> Result<(), ClusterError> {
        if nodes.len() < required {
            return Err(ClusterError::IncompleteCluster {
                found: nodes.len(),
                required,
            });
        }
        Ok(())
    }
}
