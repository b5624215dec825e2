// cpx-common/src/dependency/resolver.rs

use std::collections::BTreeMap;

use tracing::{debug, instrument, warn};

use crate::dependency::builtin::BuiltinFilter;
use crate::dependency::definition::{followed_requirements, Requirements};
use crate::dependency::graph::{NodeId, ResolvedGraph};
use crate::error::Result;
use crate::registry::{DistributionRef, Registry, ReleaseInfo};

/// Expands requirements into a deduplicated dependency graph by querying a
/// [`Registry`] one name at a time.
///
/// Lookups are best-effort: a name the registry cannot resolve is logged and
/// left out of the graph together with everything only it would have pulled in.
/// Version constraints are recorded on the nodes but never used to choose
/// between releases.
pub struct DependencyResolver<'a> {
    registry: &'a dyn Registry,
    filter: &'a BuiltinFilter,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(registry: &'a dyn Registry, filter: &'a BuiltinFilter) -> Self {
        Self { registry, filter }
    }

    /// Resolves `requirements` into a fresh graph. The graph doubles as the
    /// memo for this call, so every name maps to exactly one node.
    #[instrument(skip_all, fields(requirements = requirements.len()))]
    pub fn resolve(&self, requirements: &Requirements) -> ResolvedGraph {
        debug!(
            "Starting dependency resolution for: {:?}",
            requirements.keys().collect::<Vec<_>>()
        );
        let mut memo = ResolvedGraph::new();
        let roots = self.resolve_level(requirements, &mut memo);
        memo.set_roots(roots);
        debug!(
            "Resolution finished: {} roots, {} nodes, {} unresolved",
            memo.roots().len(),
            memo.nodes().count(),
            memo.unresolved().len()
        );
        memo
    }

    fn resolve_level(
        &self,
        requirements: &Requirements,
        memo: &mut ResolvedGraph,
    ) -> BTreeMap<String, NodeId> {
        let mut level = BTreeMap::new();

        for (name, constraint) in requirements {
            if let Some(existing) = memo.id_of(name) {
                debug!("'{}' already resolved, reusing node", name);
                level.insert(name.clone(), existing);
                continue;
            }

            if self.filter.should_skip(name) {
                debug!("Skipping built-in '{}'", name);
                continue;
            }

            let release = match self.fetch_release(name, constraint) {
                Ok(release) => release,
                Err(e) => {
                    if e.is_lookup_failure() {
                        warn!("Could not resolve '{}', omitting it: {}", name, e);
                    } else {
                        warn!("Unexpected error resolving '{}', omitting it: {:?}", name, e);
                    }
                    memo.record_unresolved(name, &e);
                    continue;
                }
            };

            let children = followed_requirements(&release.dependencies);
            debug!(
                "'{}' requires {:?}",
                name,
                children.keys().collect::<Vec<_>>()
            );

            // Registered before recursing so a cycle back to `name` finds it.
            let id = memo.insert_placeholder(name);
            let dependencies = self.resolve_level(&children, memo);

            let node = memo.node_mut(id);
            node.version_constraint = constraint.clone();
            node.download_url = release.download_url;
            node.dependencies = dependencies;

            level.insert(name.clone(), id);
        }

        level
    }

    fn fetch_release(&self, name: &str, constraint: &str) -> Result<ReleaseInfo> {
        let module = self.registry.lookup_module(name)?;
        // Unconstrained names pin author/distribution/version. The version is
        // the release's, taken from the release name, not the module's own.
        let dist_ref: DistributionRef = if constraint.is_empty() {
            module.pinned_release()
        } else {
            module.current_release()
        };
        debug!("Fetching release {} for '{}'", dist_ref, name);
        self.registry.lookup_release(&dist_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::memory::MemoryRegistry;

    fn reqs(items: &[(&str, &str)]) -> Requirements {
        items
            .iter()
            .map(|(n, c)| (n.to_string(), c.to_string()))
            .collect()
    }

    fn foo_bar_registry() -> MemoryRegistry {
        let mut registry = MemoryRegistry::new();
        registry.add_package("Foo", &[]);
        registry.add_package("Bar", &[("Foo", "runtime", "requires")]);
        registry
    }

    #[test]
    fn shared_dependency_is_a_single_node() {
        let registry = foo_bar_registry();
        let filter = BuiltinFilter::new();
        let graph =
            DependencyResolver::new(&registry, &filter).resolve(&reqs(&[("Foo", ""), ("Bar", ">=1.0")]));

        assert_eq!(graph.roots().len(), 2);
        assert_eq!(graph.nodes().count(), 2);
        let foo = graph.roots()["Foo"];
        let bar = graph.node(graph.roots()["Bar"]);
        assert_eq!(bar.dependencies["Foo"], foo);
        assert_eq!(bar.version_constraint, ">=1.0");
        assert_eq!(graph.node(foo).version_constraint, "");
    }

    #[test]
    fn builtins_never_become_nodes() {
        let mut registry = MemoryRegistry::new();
        registry.add_package(
            "Baz",
            &[("strict", "runtime", "requires"), ("Qux", "runtime", "requires")],
        );
        registry.add_package("Qux", &[("perl", "runtime", "requires")]);
        let filter = BuiltinFilter::new();
        let graph =
            DependencyResolver::new(&registry, &filter).resolve(&reqs(&[("strict", ""), ("Baz", "")]));

        assert_eq!(graph.roots().keys().collect::<Vec<_>>(), vec!["Baz"]);
        assert!(!graph.contains("strict"));
        assert!(!graph.contains("perl"));
        assert!(graph.contains("Qux"));
        assert_eq!(registry.module_lookups("strict"), 0);
    }

    #[test]
    fn failed_lookup_omits_name_and_its_subtree() {
        let mut registry = MemoryRegistry::new();
        registry.add_package("Broken", &[("OnlyViaBroken", "runtime", "requires")]);
        registry.add_package("OnlyViaBroken", &[]);
        registry.add_package("Fine", &[]);
        registry.fail_module("Broken");
        let filter = BuiltinFilter::new();
        let graph =
            DependencyResolver::new(&registry, &filter).resolve(&reqs(&[("Broken", ""), ("Fine", "")]));

        assert!(!graph.contains("Broken"));
        assert!(!graph.contains("OnlyViaBroken"));
        assert!(graph.contains("Fine"));
        assert!(graph.unresolved().contains_key("Broken"));
    }

    #[test]
    fn failed_release_lookup_is_also_skipped() {
        let mut registry = MemoryRegistry::new();
        registry.add_package("NoRelease", &[]);
        registry.fail_release("NoRelease");
        let filter = BuiltinFilter::new();
        let graph = DependencyResolver::new(&registry, &filter).resolve(&reqs(&[("NoRelease", "")]));
        assert!(graph.is_empty());
        assert_eq!(graph.nodes().count(), 0);
    }

    #[test]
    fn develop_and_recommends_edges_are_not_followed() {
        let mut registry = MemoryRegistry::new();
        registry.add_package(
            "App",
            &[
                ("Lib", "runtime", "requires"),
                ("TestLib", "test", "requires"),
                ("DevTool", "develop", "requires"),
                ("Nice", "runtime", "recommends"),
            ],
        );
        for name in ["Lib", "TestLib", "DevTool", "Nice"] {
            registry.add_package(name, &[]);
        }
        let filter = BuiltinFilter::new();
        let graph = DependencyResolver::new(&registry, &filter).resolve(&reqs(&[("App", "")]));

        let app = graph.get("App").unwrap();
        assert_eq!(
            app.dependencies.keys().collect::<Vec<_>>(),
            vec!["Lib", "TestLib"]
        );
        assert!(!graph.contains("DevTool"));
        assert!(!graph.contains("Nice"));
    }

    #[test]
    fn cycles_terminate_and_share_the_in_progress_node() {
        let mut registry = MemoryRegistry::new();
        registry.add_package("A", &[("B", "runtime", "requires")]);
        registry.add_package("B", &[("A", "runtime", "requires")]);
        let filter = BuiltinFilter::new();
        let graph = DependencyResolver::new(&registry, &filter).resolve(&reqs(&[("A", "")]));

        let a = graph.roots()["A"];
        let b = graph.node(a).dependencies["B"];
        assert_eq!(graph.node(b).dependencies["A"], a);
        assert_eq!(registry.module_lookups("A"), 1);
        assert_eq!(registry.module_lookups("B"), 1);
    }

    #[test]
    fn repeated_names_query_the_registry_once() {
        let mut registry = MemoryRegistry::new();
        registry.add_package("Common", &[]);
        registry.add_package("L", &[("Common", "runtime", "requires")]);
        registry.add_package("R", &[("Common", "runtime", "requires")]);
        let filter = BuiltinFilter::new();
        DependencyResolver::new(&registry, &filter)
            .resolve(&reqs(&[("L", ""), ("R", ""), ("Common", "")]));
        assert_eq!(registry.module_lookups("Common"), 1);
    }

    #[test]
    fn constrained_and_unconstrained_use_different_release_refs() {
        let mut registry = MemoryRegistry::new();
        registry.add_package("Pinned", &[]);
        registry.add_package("Ranged", &[]);
        let filter = BuiltinFilter::new();
        DependencyResolver::new(&registry, &filter)
            .resolve(&reqs(&[("Pinned", ""), ("Ranged", ">= 2")]));

        let refs = registry.release_requests();
        assert!(refs.iter().any(|r| matches!(r, DistributionRef::Exact { distribution, .. } if distribution == "Pinned")));
        assert!(refs.iter().any(|r| matches!(r, DistributionRef::Latest { distribution } if distribution == "Ranged")));
    }

    #[test]
    fn extra_ignores_are_respected() {
        let registry = foo_bar_registry();
        let filter = BuiltinFilter::with_ignores(["Foo"]);
        let graph = DependencyResolver::new(&registry, &filter).resolve(&reqs(&[("Bar", "")]));
        assert!(graph.get("Bar").unwrap().dependencies.is_empty());
        assert!(!graph.contains("Foo"));
    }

    #[test]
    fn resolving_twice_yields_identical_structure() {
        let registry = foo_bar_registry();
        let filter = BuiltinFilter::new();
        let resolver = DependencyResolver::new(&registry, &filter);
        let requirements = reqs(&[("Bar", ""), ("Foo", "")]);
        let first = resolver.resolve(&requirements);
        let second = resolver.resolve(&requirements);
        assert_eq!(first.edges(), second.edges());
    }
}
