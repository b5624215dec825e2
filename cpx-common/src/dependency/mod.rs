// cpx-common/src/dependency/mod.rs
pub mod builtin;
pub mod definition;
pub mod graph;
pub mod resolver;

pub use builtin::BuiltinFilter;
pub use definition::{
    DependencyPhase, DependencyRelationship, ReleaseDependency, Requirement, Requirements,
};
pub use graph::{NodeId, PackageNode, ResolvedGraph};
pub use resolver::DependencyResolver;
