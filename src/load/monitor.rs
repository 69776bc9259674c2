use anyhow::Result;
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sysinfo::{Networks, ProcessesToUpdate, System};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};

/// One resource reading, taken on a fixed cadence during injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSample {
    pub timestamp: DateTime<Utc>,
    /// Mean CPU usage of the tracked consensus processes, percent.
    pub cpu_percent: f64,
    /// Total NIC traffic (sent + received) since the previous sample,
    /// normalized to bytes per second.
    pub bandwidth_bps: f64,
    pub load_1m: f64,
    pub mem_used_kb: u64,
}

/// Background sampler decoupled from injection timing.
///
/// `start` consumes the monitor and returns a handle; stopping through the
/// handle is the only way to observe the samples, so the list is frozen by
/// construction once `stop` returns. The stop signal is checked before each
/// append, never after, so no sample lands once `stop` resolves.
pub struct ResourceMonitor {
    sample_interval: Duration,
    /// Process name fragment identifying the consensus node processes.
    process_name: String,
}

pub struct MonitorHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<Vec<ResourceSample>>,
}

impl ResourceMonitor {
    pub fn new(sample_interval: Duration, process_name: String) -> Self {
        Self {
            sample_interval,
            process_name,
        }
    }

    pub fn start(self) -> MonitorHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut sampler = Sampler::new(&self.process_name);
            let mut samples = Vec::new();
            let mut ticker = interval(self.sample_interval);
            ticker.tick().await; // the first tick fires immediately

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                        match sampler.take() {
                            Ok(sample) => samples.push(sample),
                            Err(e) => {
                                // One bad reading never fails the window.
                                eprintln!("{} resource sample skipped: {}", "⚠".yellow(), e);
                            }
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
            samples
        });
        MonitorHandle { stop_tx, task }
    }
}

impl MonitorHandle {
    /// Signal the sampler to stop and wait for it; returns the frozen list.
    pub async fn stop(self) -> Vec<ResourceSample> {
        let _ = self.stop_tx.send(true);
        self.task.await.unwrap_or_default()
    }
}

struct Sampler {
    sys: System,
    process_name: String,
    last_net_total: u64,
    last_taken: Instant,
}

impl Sampler {
    fn new(process_name: &str) -> Self {
        let sys = System::new_all();
        let last_net_total = net_total(&Networks::new_with_refreshed_list());
        Self {
            sys,
            process_name: process_name.to_string(),
            last_net_total,
            last_taken: Instant::now(),
        }
    }

    fn take(&mut self) -> Result<ResourceSample> {
        self.sys.refresh_cpu_all();
        self.sys.refresh_processes(ProcessesToUpdate::All, true);
        let networks = Networks::new_with_refreshed_list();

        let tracked: Vec<f64> = self
            .sys
            .processes()
            .values()
            .filter(|p| p.name().to_string_lossy().contains(&self.process_name))
            .map(|p| p.cpu_usage() as f64)
            .collect();
        let cpu_percent = if tracked.is_empty() {
            // Fall back to host-wide usage when no node process is visible.
            self.sys.global_cpu_usage() as f64
        } else {
            tracked.iter().sum::<f64>() / tracked.len() as f64
        };

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_taken).as_secs_f64();
        let total = net_total(&networks);
        let bandwidth_bps = if elapsed > 0.0 {
            total.saturating_sub(self.last_net_total) as f64 / elapsed
        } else {
            0.0
        };
        self.last_net_total = total;
        self.last_taken = now;

        Ok(ResourceSample {
            timestamp: Utc::now(),
            cpu_percent,
            bandwidth_bps,
            load_1m: System::load_average().one,
            mem_used_kb: self.sys.used_memory() / 1024,
        })
    }
}

fn net_total(networks: &Networks) -> u64 {
    networks
        .iter()
        .map(|(_, data)| data.total_received() + data.total_transmitted())
        .sum()
}

pub fn average_cpu(samples: &[ResourceSample]) -> f64 {
    mean(samples.iter().map(|s| s.cpu_percent))
}

pub fn average_bandwidth(samples: &[ResourceSample]) -> f64 {
    mean(samples.iter().map(|s| s.bandwidth_bps))
}

pub fn average_load(samples: &[ResourceSample]) -> f64 {
    mean(samples.iter().map(|s| s.load_1m))
}

pub fn peak_memory_kb(samples: &[ResourceSample]) -> u64 {
    samples.iter().map(|s| s.mem_used_kb).max().unwrap_or(0)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        0.0
    } else {
        collected.iter().sum::<f64>() / collected.len() as f64
    }
}
