pub mod injector;
pub mod metrics;
pub mod monitor;
pub mod runner;

pub use injector::{SequencingMode, TransactionInjector, TransactionOutcome};
pub use metrics::LoadResults;
pub use monitor::{MonitorHandle, ResourceMonitor, ResourceSample};
pub use runner::{LoadRun, LoadTestRunner};
