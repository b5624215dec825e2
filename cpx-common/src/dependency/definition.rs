// cpx-common/src/dependency/definition.rs
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Requirement name -> version constraint. An empty constraint means "latest".
pub type Requirements = BTreeMap<String, String>;

/// A single named requirement as produced by the manifest parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    #[serde(default)]
    pub version_constraint: String,
}

impl Requirement {
    pub fn new(name: impl Into<String>, version_constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_constraint: version_constraint.into(),
        }
    }
}

/// Collects requirements into a mapping; the first occurrence of a name wins.
pub fn to_requirements<I>(items: I) -> Requirements
where
    I: IntoIterator<Item = Requirement>,
{
    let mut map = Requirements::new();
    for req in items {
        map.entry(req.name).or_insert(req.version_constraint);
    }
    map
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyPhase {
    Runtime,
    Build,
    Configure,
    Test,
    Develop,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyRelationship {
    Requires,
    Recommends,
    Suggests,
    Conflicts,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for DependencyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Runtime => write!(f, "runtime"),
            Self::Build => write!(f, "build"),
            Self::Configure => write!(f, "configure"),
            Self::Test => write!(f, "test"),
            Self::Develop => write!(f, "develop"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for DependencyPhase {
    fn from(s: &str) -> Self {
        match s {
            "runtime" => Self::Runtime,
            "build" => Self::Build,
            "configure" => Self::Configure,
            "test" => Self::Test,
            "develop" => Self::Develop,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<&str> for DependencyRelationship {
    fn from(s: &str) -> Self {
        match s {
            "requires" => Self::Requires,
            "recommends" => Self::Recommends,
            "suggests" => Self::Suggests,
            "conflicts" => Self::Conflicts,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One entry of a release's declared dependency list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseDependency {
    pub module: String,
    #[serde(default, deserialize_with = "version_string")]
    pub version: String,
    pub phase: DependencyPhase,
    pub relationship: DependencyRelationship,
}

impl ReleaseDependency {
    /// Hard requirements outside the `develop` phase are followed by the resolver.
    pub fn is_followed(&self) -> bool {
        self.phase != DependencyPhase::Develop
            && self.relationship == DependencyRelationship::Requires
    }
}

/// Keeps only the followed edges of a release, normalising `0` to unconstrained.
pub fn followed_requirements(deps: &[ReleaseDependency]) -> Requirements {
    to_requirements(deps.iter().filter(|d| d.is_followed()).map(|d| {
        let constraint = normalize_constraint(&d.version);
        Requirement::new(d.module.clone(), constraint)
    }))
}

/// `0`, `0.0` and blank constraints carry no information.
pub fn normalize_constraint(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '0' || c == '.') {
        String::new()
    } else {
        trimmed.to_string()
    }
}

// The registry reports versions as either strings or bare numbers.
pub(crate) fn version_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(module: &str, phase: &str, rel: &str) -> ReleaseDependency {
        serde_json::from_value(serde_json::json!({
            "module": module,
            "version": "0",
            "phase": phase,
            "relationship": rel,
        }))
        .unwrap()
    }

    #[test]
    fn develop_and_soft_relationships_are_not_followed() {
        assert!(dep("Moo", "runtime", "requires").is_followed());
        assert!(dep("ExtUtils::MakeMaker", "configure", "requires").is_followed());
        assert!(dep("Test::More", "test", "requires").is_followed());
        assert!(!dep("Dist::Zilla", "develop", "requires").is_followed());
        assert!(!dep("JSON::XS", "runtime", "recommends").is_followed());
        assert!(!dep("Foo", "runtime", "suggests").is_followed());
    }

    #[test]
    fn string_conversion_matches_the_wire_names() {
        for name in ["runtime", "build", "configure", "test", "develop", "x_custom"] {
            let wire: DependencyPhase = serde_json::from_value(serde_json::json!(name)).unwrap();
            assert_eq!(DependencyPhase::from(name), wire);
        }
        for name in ["requires", "recommends", "suggests", "conflicts", "x_rel"] {
            let wire: DependencyRelationship =
                serde_json::from_value(serde_json::json!(name)).unwrap();
            assert_eq!(DependencyRelationship::from(name), wire);
        }
    }

    #[test]
    fn unknown_phase_is_preserved() {
        let d = dep("Foo", "x_custom", "requires");
        assert_eq!(d.phase, DependencyPhase::Other("x_custom".to_string()));
        assert!(d.is_followed());
    }

    #[test]
    fn numeric_versions_deserialize_as_strings() {
        let d: ReleaseDependency = serde_json::from_value(serde_json::json!({
            "module": "Moo",
            "version": 2.004,
            "phase": "runtime",
            "relationship": "requires",
        }))
        .unwrap();
        assert_eq!(d.version, "2.004");
    }

    #[test]
    fn followed_requirements_keep_first_constraint() {
        let mut runtime = dep("Moo", "runtime", "requires");
        runtime.version = "2.0".to_string();
        let test = dep("Moo", "test", "requires");
        let reqs = followed_requirements(&[runtime, test, dep("X", "develop", "requires")]);
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs["Moo"], "2.0");
    }

    #[test]
    fn zero_constraints_are_unconstrained() {
        assert_eq!(normalize_constraint("0"), "");
        assert_eq!(normalize_constraint(" 0.0 "), "");
        assert_eq!(normalize_constraint(">= 1.0"), ">= 1.0");
    }
}
