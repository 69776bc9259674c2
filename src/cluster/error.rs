use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster did not become {phase} within {timeout:?}")]
    StartTimeout {
        phase: &'static str,
        timeout: Duration,
    },

    #[error("only {found} of {required} node homes present under the data root")]
    IncompleteCluster { found: usize, required: usize },

    #[error("RPC port {0} is already serving a node; stop the running cluster first")]
    PortInUse(u16),

    #[error("failed to launch cluster bootstrap: {0}")]
    Spawn(#[from] std::io::Error),
}
