use rand::RngCore;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Approximate the node store's local write latency by timing small fsynced
/// writes into its data directory. A coarse proxy for the storage engine's
/// own instrumentation, measured after the injection window so the probe's
/// I/O does not distort the throughput numbers.
///
/// Returns the mean latency in milliseconds, or 0.0 when the directory is
/// not writable.
pub fn probe_write_latency(data_dir: &Path, iterations: u32) -> f64 {
    let probe_file = data_dir.join("io_probe.dat");
    let mut payload = [0u8; 1024];
    let mut latencies = Vec::with_capacity(iterations as usize);

    for _ in 0..iterations {
        rand::thread_rng().fill_bytes(&mut payload);
        let started = Instant::now();
        let written = File::create(&probe_file).and_then(|mut f| {
            f.write_all(&payload)?;
            f.sync_all()
        });
        if written.is_err() {
            break;
        }
        latencies.push(started.elapsed().as_secs_f64() * 1000.0);
    }
    let _ = fs::remove_file(&probe_file);

    if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<f64>() / latencies.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probes_a_writable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let latency = probe_write_latency(dir.path(), 5);
        assert!(latency > 0.0);
        // The probe cleans up after itself.
        assert!(!dir.path().join("io_probe.dat").exists());
    }

    #[test]
    fn unwritable_directory_yields_zero() {
        let latency = probe_write_latency(Path::new("/nonexistent/chainbench"), 5);
        assert_eq!(latency, 0.0);
    }
}
