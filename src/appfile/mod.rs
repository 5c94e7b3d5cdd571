//! Compiled appfile types — applications, projects, infrastructure
//! selections, customizations, and the compiled dependency graph.
//!
//! These are the inputs the orchestration core walks. How an appfile is
//! authored and merged from source is not handled here; `parser` only reads
//! the already-compiled document.

pub mod graph;
pub mod parser;

pub use graph::{Graph, Vertex};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One application's compiled definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    /// Stable identity, unique within the graph
    pub id: String,

    /// Source directory of the application (used by app providers)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Application metadata
    pub application: Application,

    /// Project this application belongs to
    pub project: Project,

    /// Infrastructure definitions available to the project
    #[serde(default)]
    pub infrastructure: Vec<Infrastructure>,

    /// Provider customizations
    #[serde(default)]
    pub customization: Option<CustomizationSet>,
}

impl File {
    /// The infrastructure selected by the project, if it is defined.
    pub fn active_infrastructure(&self) -> Option<&Infrastructure> {
        self.infrastructure
            .iter()
            .find(|i| i.name == self.project.infrastructure)
    }

    /// Whether the ID can name a single directory (`dep-<id>`, `cache/<id>`).
    pub fn has_path_safe_id(&self) -> bool {
        !self.id.is_empty()
            && self.id != "."
            && self.id != ".."
            && !self.id.contains(['/', '\\', '\0'])
    }

    /// Whether any customizations are present.
    pub fn has_customizations(&self) -> bool {
        self.customization
            .as_ref()
            .is_some_and(|c| !c.raw.is_empty())
    }

    /// Derive a copy whose customizations are narrowed to `scope`.
    ///
    /// The receiver is left untouched; callers holding the graph-wide
    /// appfile keep seeing every customization.
    pub fn scoped(&self, scope: &str) -> File {
        let mut scoped = self.clone();
        if let Some(ref set) = self.customization {
            scoped.customization = Some(CustomizationSet {
                raw: set.filter(scope),
            });
        }
        scoped
    }
}

/// Application metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    /// Application name
    pub name: String,

    /// Application type (first element of the app tuple)
    #[serde(rename = "type")]
    pub app_type: String,

    /// IDs of applications this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Project metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project name
    pub name: String,

    /// Name of the active infrastructure definition
    pub infrastructure: String,
}

/// A named infrastructure definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infrastructure {
    /// Definition name (referenced by `Project::infrastructure`)
    pub name: String,

    /// Infrastructure type, e.g. "aws"
    #[serde(rename = "type")]
    pub infra_type: String,

    /// Infrastructure flavor, e.g. "simple"
    pub flavor: String,

    /// Foundations layered on this infrastructure, in order
    #[serde(default)]
    pub foundations: Vec<Foundation>,
}

/// A foundation enabled on an infrastructure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Foundation {
    /// Foundation name (its type)
    pub name: String,

    /// Foundation configuration
    #[serde(default)]
    pub config: IndexMap<String, serde_json::Value>,
}

/// The customizations declared for an application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomizationSet {
    pub raw: Vec<Customization>,
}

impl CustomizationSet {
    /// Customizations applicable to the given scope.
    pub fn filter(&self, scope: &str) -> Vec<Customization> {
        self.raw
            .iter()
            .filter(|c| c.scope == scope)
            .cloned()
            .collect()
    }
}

/// A single customization block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customization {
    /// Scope the customization applies to ("app", "dev", "infra", ...)
    #[serde(rename = "type")]
    pub scope: String,

    /// Customization settings
    #[serde(default)]
    pub config: IndexMap<String, serde_json::Value>,
}

/// A compiled appfile: the root file plus its dependency graph.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub graph: Graph,
}

impl Compiled {
    /// The root application's file.
    pub fn file(&self) -> &std::sync::Arc<File> {
        &self.graph.root().file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_file() -> File {
        File {
            id: "web".to_string(),
            path: None,
            application: Application {
                name: "web".to_string(),
                app_type: "go".to_string(),
                dependencies: vec![],
            },
            project: Project {
                name: "demo".to_string(),
                infrastructure: "prod".to_string(),
            },
            infrastructure: vec![
                Infrastructure {
                    name: "staging".to_string(),
                    infra_type: "aws".to_string(),
                    flavor: "simple".to_string(),
                    foundations: vec![],
                },
                Infrastructure {
                    name: "prod".to_string(),
                    infra_type: "aws".to_string(),
                    flavor: "vpc-public-private".to_string(),
                    foundations: vec![],
                },
            ],
            customization: Some(CustomizationSet {
                raw: vec![
                    Customization {
                        scope: "app".to_string(),
                        config: IndexMap::new(),
                    },
                    Customization {
                        scope: "dev".to_string(),
                        config: IndexMap::new(),
                    },
                ],
            }),
        }
    }

    #[test]
    fn test_appfile_active_infrastructure() {
        let f = make_file();
        let infra = f.active_infrastructure().unwrap();
        assert_eq!(infra.flavor, "vpc-public-private");
    }

    #[test]
    fn test_appfile_active_infrastructure_missing() {
        let mut f = make_file();
        f.project.infrastructure = "nope".to_string();
        assert!(f.active_infrastructure().is_none());
    }

    #[test]
    fn test_appfile_scoped_leaves_original() {
        let f = make_file();
        let scoped = f.scoped("app");
        assert_eq!(scoped.customization.as_ref().unwrap().raw.len(), 1);
        assert_eq!(scoped.customization.as_ref().unwrap().raw[0].scope, "app");
        assert_eq!(f.customization.as_ref().unwrap().raw.len(), 2);
    }

    #[test]
    fn test_appfile_has_customizations() {
        let mut f = make_file();
        assert!(f.has_customizations());
        f.customization = Some(CustomizationSet::default());
        assert!(!f.has_customizations());
        f.customization = None;
        assert!(!f.has_customizations());
    }
}
