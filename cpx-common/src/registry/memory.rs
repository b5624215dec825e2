// cpx-common/src/registry/memory.rs
//! In-memory [`Registry`] for offline resolution and tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::dependency::{DependencyPhase, DependencyRelationship, ReleaseDependency};
use crate::error::{CpxError, Result};
use crate::registry::{DistributionRef, ModuleInfo, Registry, ReleaseInfo};

const MEMORY_AUTHOR: &str = "LOCAL";
const MEMORY_VERSION: &str = "1.0";

#[derive(Default)]
pub struct MemoryRegistry {
    modules: HashMap<String, ModuleInfo>,
    releases: HashMap<String, ReleaseInfo>,
    failing_modules: HashSet<String>,
    failing_releases: HashSet<String>,
    module_calls: Mutex<HashMap<String, usize>>,
    release_calls: Mutex<Vec<DistributionRef>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` as its own distribution with `(module, phase, relationship)` edges.
    pub fn add_package(&mut self, name: &str, deps: &[(&str, &str, &str)]) {
        let distribution = name.replace("::", "-");
        let dependencies = deps
            .iter()
            .map(|(module, phase, relationship)| ReleaseDependency {
                module: module.to_string(),
                version: "0".to_string(),
                phase: DependencyPhase::from(*phase),
                relationship: DependencyRelationship::from(*relationship),
            })
            .collect();

        self.modules.insert(
            name.to_string(),
            ModuleInfo {
                distribution: distribution.clone(),
                author: MEMORY_AUTHOR.to_string(),
                version: MEMORY_VERSION.to_string(),
                release: Some(format!("{distribution}-{MEMORY_VERSION}")),
            },
        );
        self.releases.insert(
            distribution.clone(),
            ReleaseInfo {
                dependencies,
                download_url: format!("https://cpan.test/{distribution}-{MEMORY_VERSION}.tar.gz"),
            },
        );
    }

    pub fn fail_module(&mut self, name: &str) {
        self.failing_modules.insert(name.to_string());
    }

    pub fn fail_release(&mut self, name: &str) {
        self.failing_releases.insert(name.replace("::", "-"));
    }

    pub fn module_lookups(&self, name: &str) -> usize {
        self.module_calls
            .lock()
            .map(|calls| calls.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn release_requests(&self) -> Vec<DistributionRef> {
        self.release_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl Registry for MemoryRegistry {
    fn lookup_module(&self, name: &str) -> Result<ModuleInfo> {
        if let Ok(mut calls) = self.module_calls.lock() {
            *calls.entry(name.to_string()).or_default() += 1;
        }
        if self.failing_modules.contains(name) {
            return Err(CpxError::Registry(format!("lookup of '{name}' failed")));
        }
        self.modules
            .get(name)
            .cloned()
            .ok_or_else(|| CpxError::NotFound(format!("module '{name}'")))
    }

    fn lookup_release(&self, dist: &DistributionRef) -> Result<ReleaseInfo> {
        if let Ok(mut calls) = self.release_calls.lock() {
            calls.push(dist.clone());
        }
        let distribution = dist.distribution();
        if self.failing_releases.contains(distribution) {
            return Err(CpxError::Registry(format!("release {dist} unavailable")));
        }
        self.releases
            .get(distribution)
            .cloned()
            .ok_or_else(|| CpxError::NotFound(format!("release {dist}")))
    }
}
