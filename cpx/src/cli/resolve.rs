// cpx/src/cli/resolve.rs
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use clap::Args;
use cpx_common::config::Config;
use cpx_common::dependency::{BuiltinFilter, DependencyResolver, NodeId, ResolvedGraph};
use cpx_common::error::{CpxError, Result};
use cpx_common::manifest::load_manifest;
use cpx_net::MetaCpanClient;
use serde::Serialize;
use tracing::{instrument, warn};

use super::status::create_spinner;
use super::SourceArgs;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print the graph as JSON instead of a tree
    #[arg(long)]
    pub json: bool,
}

impl ResolveArgs {
    pub fn run(&self, mut config: Config) -> Result<bool> {
        self.source.apply(&mut config);
        config.validate()?;
        let graph = resolve_manifest(&config)?;
        if self.json {
            println!("{}", render_json(&graph)?);
        } else {
            print!("{}", render_tree(&graph));
        }
        Ok(true)
    }
}

/// Reads the manifest and expands it against the registry. `config` must
/// already be validated.
#[instrument(skip_all, fields(manifest = %config.manifest_path().display()))]
pub fn resolve_manifest(config: &Config) -> Result<ResolvedGraph> {
    let requirements = load_manifest(config.manifest_path())?;
    if requirements.is_empty() {
        warn!(
            "{} declares no runtime requirements",
            config.manifest_path().display()
        );
    }

    let client = MetaCpanClient::new(config)?;
    let filter = BuiltinFilter::with_ignores(config.extra_ignores.iter().cloned());

    let spinner = create_spinner("Resolving dependencies...");
    let graph = DependencyResolver::new(&client, &filter).resolve(&requirements);
    spinner.finish_and_clear();

    Ok(graph)
}

/// One line per node, children indented under their parent. A node reached a
/// second time is printed once more, marked with `(*)`, without its subtree.
pub fn render_tree(graph: &ResolvedGraph) -> String {
    let mut out = String::new();
    let mut printed = HashSet::new();
    for id in graph.roots().values() {
        write_node(graph, *id, "", None, &mut printed, &mut out);
    }
    out
}

fn write_node(
    graph: &ResolvedGraph,
    id: NodeId,
    prefix: &str,
    branch: Option<bool>,
    printed: &mut HashSet<NodeId>,
    out: &mut String,
) {
    let node = graph.node(id);
    let connector = match branch {
        None => "",
        Some(true) => "└── ",
        Some(false) => "├── ",
    };
    let mut label = node.name.clone();
    if !node.version_constraint.is_empty() {
        let _ = write!(label, " ({})", node.version_constraint);
    }

    if !printed.insert(id) {
        let _ = writeln!(out, "{prefix}{connector}{label} (*)");
        return;
    }
    let _ = writeln!(out, "{prefix}{connector}{label}");

    let child_prefix = match branch {
        None => String::new(),
        Some(true) => format!("{prefix}    "),
        Some(false) => format!("{prefix}│   "),
    };
    let count = node.dependencies.len();
    for (i, child) in node.dependencies.values().enumerate() {
        write_node(
            graph,
            *child,
            &child_prefix,
            Some(i + 1 == count),
            printed,
            out,
        );
    }
}

#[derive(Serialize)]
struct GraphJson<'a> {
    roots: Vec<&'a str>,
    packages: BTreeMap<&'a str, PackageJson<'a>>,
    unresolved: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct PackageJson<'a> {
    version_constraint: &'a str,
    download_url: &'a str,
    dependencies: Vec<&'a str>,
}

pub fn render_json(graph: &ResolvedGraph) -> Result<String> {
    let doc = GraphJson {
        roots: graph.roots().keys().map(String::as_str).collect(),
        packages: graph
            .nodes()
            .map(|(_, node)| {
                (
                    node.name.as_str(),
                    PackageJson {
                        version_constraint: &node.version_constraint,
                        download_url: &node.download_url,
                        dependencies: node.dependencies.keys().map(String::as_str).collect(),
                    },
                )
            })
            .collect(),
        unresolved: graph.unresolved(),
    };
    serde_json::to_string_pretty(&doc).map_err(CpxError::from)
}
