pub mod account;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod rpc;

pub use account::{AccountState, AccountStateFetcher};
pub use error::ClusterError;
pub use lifecycle::{ClusterLifecycleManager, ClusterState};
pub use registry::{NodeDescriptor, NodeRegistry};
pub use rpc::{BlockSummary, RpcClient};
