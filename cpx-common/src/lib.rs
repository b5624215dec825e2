// cpx-common/src/lib.rs
pub mod cache;
pub mod config;
pub mod dependency;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod registry;

// Re-export key types
pub use cache::Cache;
pub use config::Config;
pub use dependency::{
    BuiltinFilter, DependencyResolver, NodeId, PackageNode, Requirement, Requirements,
    ResolvedGraph,
};
pub use error::{CpxError, Result};
pub use pipeline::{RunReport, SchedulerEvent, TaskFailure};
pub use registry::{DistributionRef, ModuleInfo, Registry, ReleaseInfo};
