use crate::cluster::{ClusterError, RpcClient};
use crate::config::BenchConfig;
use crate::ui::create_spinner;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    Stopped,
    Starting,
    Ready,
    Stopping,
    Failed,
}

/// Starts the cluster bootstrap for N nodes, waits for readiness, and tears
/// the cluster down again.
///
/// Readiness means both the first and last node accept TCP connections on
/// their RPC ports and report a chain height of at least one produced block.
/// Teardown is graceful-then-forced, with a narrowly scoped kill-by-pattern
/// safety net for children the bootstrap script spawned that we do not own.
pub struct ClusterLifecycleManager {
    config: Arc<BenchConfig>,
    data_root: PathBuf,
    log_dir: PathBuf,
    state: ClusterState,
    child: Option<Child>,
    /// Whether a bootstrap was ever launched; gates the pattern-kill net.
    launched: bool,
    rpc: RpcClient,
}

impl ClusterLifecycleManager {
    pub fn new(
        config: Arc<BenchConfig>,
        data_root: PathBuf,
        log_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let rpc = RpcClient::new(config.http_timeout)?;
        Ok(Self {
            config,
            data_root,
            log_dir,
            state: ClusterState::Stopped,
            child: None,
            launched: false,
            rpc,
        })
    }

    pub fn state(&self) -> ClusterState {
        self.state
    }

    /// Launch the bootstrap script and block until the cluster is ready.
    ///
    /// On timeout the cluster is torn down before the error is returned, so
    /// the caller never inherits half-started node processes.
    pub async fn start(&mut self, node_count: u32) -> Result<(), ClusterError> {
        // Refuse to stomp on a cluster someone else is running.
        if self.rpc.latest_height(&self.config.rpc_url(1)).await.is_ok() {
            return Err(ClusterError::PortInUse(self.config.base_rpc_port));
        }

        if self.data_root.exists() {
            std::fs::remove_dir_all(&self.data_root)?;
        }
        std::fs::create_dir_all(&self.log_dir)?;

        let child = Command::new("bash")
            .arg(&self.config.bootstrap_script)
            .arg(node_count.to_string())
            .current_dir(&self.config.bootstrap_dir)
            .env("DATA_ROOT", &self.data_root)
            .env("LOG_DIR", &self.log_dir)
            .env("USE_CPU_AFFINITY", "true")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        self.child = Some(child);
        self.launched = true;
        self.state = ClusterState::Starting;

        if let Err(e) = self.wait_until_ready(node_count).await {
            self.stop().await;
            self.state = ClusterState::Failed;
            return Err(e);
        }
        self.state = ClusterState::Ready;
        Ok(())
    }

    async fn wait_until_ready(&self, node_count: u32) -> Result<(), ClusterError> {
        let edge_nodes = [1, node_count.max(1)];
        let spinner = create_spinner(&format!("Waiting for {} node RPC ports...", node_count));

        // Phase 1: RPC ports of the first and last node accept connections.
        let port_deadline = Instant::now() + self.config.port_timeout;
        loop {
            let mut reachable = true;
            for id in edge_nodes {
                let addr = format!("127.0.0.1:{}", self.config.rpc_port(id));
                let connect = timeout(self.config.poll_interval, TcpStream::connect(&addr)).await;
                if !matches!(connect, Ok(Ok(_))) {
                    reachable = false;
                    break;
                }
            }
            if reachable {
                break;
            }
            if Instant::now() >= port_deadline {
                spinner.finish_with_message("RPC ports never became reachable".to_string());
                return Err(ClusterError::StartTimeout {
                    phase: "port-reachable",
                    timeout: self.config.port_timeout,
                });
            }
            sleep(self.config.poll_interval).await;
        }

        // Phase 2: both edge nodes report at least one produced block.
        spinner.set_message("Waiting for the chain to produce its first block...");
        let height_deadline = Instant::now() + self.config.height_timeout;
        loop {
            let mut at_height = true;
            for id in edge_nodes {
                match self.rpc.latest_height(&self.config.rpc_url(id)).await {
                    Ok(height) if height >= 1 => {}
                    _ => {
                        at_height = false;
                        break;
                    }
                }
            }
            if at_height {
                spinner.finish_with_message(format!("{} nodes ready", node_count));
                return Ok(());
            }
            if Instant::now() >= height_deadline {
                spinner.finish_with_message("chain never reached height 1".to_string());
                return Err(ClusterError::StartTimeout {
                    phase: "chain-height",
                    timeout: self.config.height_timeout,
                });
            }
            sleep(self.config.poll_interval).await;
        }
    }

    /// Tear the cluster down. Idempotent and safe to call when `start` was
    /// never invoked or never reached readiness. A cluster that failed to
    /// start stays observably `Failed`; teardown still runs but does not
    /// launder the state.
    pub async fn stop(&mut self) {
        let terminal = if self.state == ClusterState::Failed {
            ClusterState::Failed
        } else {
            ClusterState::Stopped
        };
        if !self.launched && self.child.is_none() {
            self.state = terminal;
            return;
        }
        self.state = ClusterState::Stopping;

        if let Some(mut child) = self.child.take() {
            terminate_child(&mut child, self.config.shutdown_grace).await;
        }

        // The bootstrap script spawns node processes we do not own directly.
        // Match the binary name together with this run's data root so other
        // clusters sharing the binary are left alone.
        let pattern = format!(
            "{}.*{}",
            self.config.binary_name(),
            self.data_root.display()
        );
        let result = Command::new("pkill")
            .args(["-9", "-f", &pattern])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if result.is_err() {
            eprintln!("{} pkill safety net unavailable", "⚠".yellow());
        }

        self.state = terminal;
    }
}

/// SIGINT, wait out the grace period, then SIGKILL and reap.
async fn terminate_child(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = child.id() else {
            return; // already exited
        };
        let pid = Pid::from_raw(pid as i32);

        if let Err(e) = kill(pid, Signal::SIGINT) {
            if e != nix::errno::Errno::ESRCH {
                eprintln!("{} SIGINT to bootstrap failed: {}", "⚠".yellow(), e);
            }
        }

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if child.try_wait().ok().flatten().is_some() {
                return;
            }
            sleep(Duration::from_millis(100)).await;
        }

        if let Err(e) = kill(pid, Signal::SIGKILL) {
            if e != nix::errno::Errno::ESRCH {
                eprintln!("{} SIGKILL to bootstrap failed: {}", "⚠".yellow(), e);
            }
        }
        let _ = child.wait().await;
    }

    #[cfg(not(unix))]
    {
        let _ = grace;
        let _ = child.kill().await;
        let _ = child.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let config = Arc::new(BenchConfig::default());
        let mut manager = ClusterLifecycleManager::new(
            config,
            PathBuf::from("/tmp/chainbench-test-never-started"),
            PathBuf::from("/tmp/chainbench-test-logs"),
        )
        .unwrap();

        manager.stop().await;
        assert_eq!(manager.state(), ClusterState::Stopped);

        // Second call must be just as safe.
        manager.stop().await;
        assert_eq!(manager.state(), ClusterState::Stopped);
    }
}
