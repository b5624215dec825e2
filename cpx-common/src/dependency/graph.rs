// cpx-common/src/dependency/graph.rs
//! Arena-backed dependency graph.
//!
//! Every package name resolves to at most one [`PackageNode`] per resolution
//! run. Edges are stored as [`NodeId`]s into the arena, so two parents that
//! depend on the same package point at the same node.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::CpxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageNode {
    pub name: String,
    /// Constraint the node was first resolved under; later occurrences reuse it.
    pub version_constraint: String,
    pub download_url: String,
    /// Direct dependencies by name. Sorted, which fixes sibling dispatch order.
    pub dependencies: BTreeMap<String, NodeId>,
}

impl PackageNode {
    pub(crate) fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedGraph {
    nodes: Vec<PackageNode>,
    by_name: HashMap<String, NodeId>,
    roots: BTreeMap<String, NodeId>,
    unresolved: BTreeMap<String, String>,
}

impl ResolvedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_placeholder(&mut self, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(PackageNode::placeholder(name));
        self.by_name.insert(name.to_string(), id);
        self.unresolved.remove(name);
        id
    }

    pub(crate) fn record_unresolved(&mut self, name: &str, error: &CpxError) {
        self.unresolved.insert(name.to_string(), error.to_string());
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut PackageNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn set_roots(&mut self, roots: BTreeMap<String, NodeId>) {
        self.roots = roots;
    }

    /// Adds a fully formed node. Intended for building graphs by hand.
    pub fn add_node(
        &mut self,
        name: &str,
        version_constraint: &str,
        download_url: &str,
        dependencies: BTreeMap<String, NodeId>,
    ) -> NodeId {
        if let Some(existing) = self.by_name.get(name) {
            return *existing;
        }
        let id = self.insert_placeholder(name);
        let node = self.node_mut(id);
        node.version_constraint = version_constraint.to_string();
        node.download_url = download_url.to_string();
        node.dependencies = dependencies;
        id
    }

    /// Adds an edge `from -> to`; allows closing cycles in hand-built graphs.
    pub fn add_dependency(&mut self, from: NodeId, to: NodeId) {
        let name = self.node(to).name.clone();
        self.node_mut(from).dependencies.insert(name, to);
    }

    pub fn add_root(&mut self, name: &str, id: NodeId) {
        self.roots.insert(name.to_string(), id);
    }

    pub fn node(&self, id: NodeId) -> &PackageNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, name: &str) -> Option<&PackageNode> {
        self.by_name.get(name).map(|id| self.node(*id))
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Top-level requirements that survived filtering, keyed by name.
    pub fn roots(&self) -> &BTreeMap<String, NodeId> {
        &self.roots
    }

    /// Names the registry could not resolve, with the reason.
    pub fn unresolved(&self) -> &BTreeMap<String, String> {
        &self.unresolved
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &PackageNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Number of distinct nodes reachable from the roots.
    pub fn reachable_count(&self) -> usize {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack: Vec<NodeId> = self.roots.values().copied().collect();
        let mut count = 0;
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            count += 1;
            stack.extend(self.node(id).dependencies.values().copied());
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Name-level view of the graph: every node with its sorted dependency names.
    pub fn edges(&self) -> BTreeMap<String, Vec<String>> {
        self.nodes
            .iter()
            .map(|n| (n.name.clone(), n.dependencies.keys().cloned().collect()))
            .collect()
    }
}
