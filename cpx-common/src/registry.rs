// cpx-common/src/registry.rs
pub mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dependency::ReleaseDependency;
use crate::error::Result;

/// Canonical distribution identity of a module, as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub distribution: String,
    pub author: String,
    #[serde(default, deserialize_with = "crate::dependency::definition::version_string")]
    pub version: String,
    /// Release name such as `Moose-2.2206`, when the registry reports one.
    #[serde(default)]
    pub release: Option<String>,
}

impl ModuleInfo {
    /// Pins the release the registry currently considers latest for this module.
    ///
    /// The version comes from the release name when present, since a module's
    /// own version can differ from the version of the distribution shipping it.
    pub fn pinned_release(&self) -> DistributionRef {
        let version = self
            .release
            .as_deref()
            .and_then(|r| r.strip_prefix(self.distribution.as_str()))
            .and_then(|rest| rest.strip_prefix('-'))
            .filter(|v| !v.is_empty())
            .unwrap_or(self.version.as_str())
            .to_string();
        DistributionRef::Exact {
            author: self.author.clone(),
            distribution: self.distribution.clone(),
            version,
        }
    }

    pub fn current_release(&self) -> DistributionRef {
        DistributionRef::Latest {
            distribution: self.distribution.clone(),
        }
    }
}

/// Which release of a distribution to fetch metadata for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DistributionRef {
    /// Let the registry pick the current release of the distribution.
    Latest { distribution: String },
    /// A specific author/distribution/version release.
    Exact {
        author: String,
        distribution: String,
        version: String,
    },
}

impl DistributionRef {
    pub fn distribution(&self) -> &str {
        match self {
            Self::Latest { distribution } | Self::Exact { distribution, .. } => distribution,
        }
    }

    /// Path of the release document relative to the registry base URL.
    pub fn request_path(&self) -> String {
        match self {
            Self::Latest { distribution } => format!("release/{distribution}"),
            Self::Exact {
                author,
                distribution,
                version,
            } => format!("release/{author}/{distribution}-{version}"),
        }
    }
}

impl fmt::Display for DistributionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest { distribution } => write!(f, "{distribution} (latest)"),
            Self::Exact {
                author,
                distribution,
                version,
            } => write!(f, "{author}/{distribution}-{version}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<ReleaseDependency>,
    #[serde(default)]
    pub download_url: String,
}

/// Metadata source consumed by the resolver. Any error means "skip this name".
pub trait Registry: Send + Sync {
    fn lookup_module(&self, name: &str) -> Result<ModuleInfo>;
    fn lookup_release(&self, dist: &DistributionRef) -> Result<ReleaseInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_paths_follow_registry_layout() {
        let latest = DistributionRef::Latest {
            distribution: "Moose".to_string(),
        };
        assert_eq!(latest.request_path(), "release/Moose");

        let exact = DistributionRef::Exact {
            author: "ETHER".to_string(),
            distribution: "Moose".to_string(),
            version: "2.2206".to_string(),
        };
        assert_eq!(exact.request_path(), "release/ETHER/Moose-2.2206");
        assert_eq!(exact.to_string(), "ETHER/Moose-2.2206");
    }

    #[test]
    fn pinned_release_prefers_release_name_version() {
        let module: ModuleInfo = serde_json::from_str(
            r#"{"distribution": "Moose", "author": "ETHER", "version": 2.2206, "release": "Moose-2.2207"}"#,
        )
        .unwrap();
        assert_eq!(module.version, "2.2206");
        assert_eq!(
            module.pinned_release(),
            DistributionRef::Exact {
                author: "ETHER".to_string(),
                distribution: "Moose".to_string(),
                version: "2.2207".to_string(),
            }
        );

        let bare = ModuleInfo {
            release: None,
            ..module
        };
        assert_eq!(
            bare.pinned_release().request_path(),
            "release/ETHER/Moose-2.2206"
        );
    }

    #[test]
    fn release_document_parses_dependency_list() {
        let release: ReleaseInfo = serde_json::from_str(
            r#"{
                "name": "Moo-2.005005",
                "download_url": "https://cpan.metacpan.org/authors/id/H/HA/HAARG/Moo-2.005005.tar.gz",
                "dependency": [
                    {"module": "Sub::Quote", "version": "2.006006", "phase": "runtime", "relationship": "requires"},
                    {"module": "Test::More", "version": "0.94", "phase": "test", "relationship": "requires"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(release.dependencies.len(), 2);
        assert!(release.download_url.ends_with("Moo-2.005005.tar.gz"));
    }
}
