pub mod orchestrator;
pub mod result;
pub mod storage;

pub use orchestrator::ExperimentOrchestrator;
pub use result::{ExperimentMetrics, ExperimentParams, ExperimentPoint, ExperimentResult};
