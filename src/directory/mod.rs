//! Directory backend — durable records of compiled apps and their
//! dev/build/deploy/infra state.

pub mod folder;
pub mod memory;

pub use folder::FolderBackend;
pub use memory::MemoryBackend;

use crate::appfile::{File, Graph, Vertex};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Storage for directory records.
pub trait Backend: Send + Sync {
    /// Store a compiled application.
    fn put_app(&self, lookup: &AppLookup, app: &App) -> Result<()>;
    fn get_app(&self, lookup: &AppLookup) -> Result<Option<App>>;

    fn put_dev(&self, dev: &Dev) -> Result<()>;
    fn get_dev(&self, lookup: &AppLookup) -> Result<Option<Dev>>;

    fn put_build(&self, build: &Build) -> Result<()>;
    fn get_build(&self, lookup: &AppLookup) -> Result<Option<Build>>;

    fn put_deploy(&self, deploy: &Deploy) -> Result<()>;
    fn get_deploy(&self, lookup: &AppLookup) -> Result<Option<Deploy>>;

    fn put_infra(&self, infra: &Infra) -> Result<()>;
    fn get_infra(&self, lookup: &InfraLookup) -> Result<Option<Infra>>;
}

/// Identity of an application on an infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppLookup {
    pub app_id: String,
    pub infra_type: String,
    pub infra_flavor: String,
}

impl AppLookup {
    /// Lookup for an appfile on its active infrastructure.
    pub fn for_file(file: &File) -> Result<Self> {
        let infra = file
            .active_infrastructure()
            .ok_or_else(|| Error::NoInfrastructure {
                name: file.project.infrastructure.clone(),
            })?;
        Ok(Self {
            app_id: file.id.clone(),
            infra_type: infra.infra_type.clone(),
            infra_flavor: infra.flavor.clone(),
        })
    }
}

impl fmt::Display for AppLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}/{}", self.app_id, self.infra_type, self.infra_flavor)
    }
}

/// Identity of an infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InfraLookup {
    /// Infrastructure definition name
    pub name: String,
}

/// A compiled application as stored in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub lookup: AppLookup,
    pub name: String,
    #[serde(rename = "type")]
    pub app_type: String,
    /// Lookups of the applications this one depends on
    #[serde(default)]
    pub dependencies: Vec<AppLookup>,
}

impl App {
    /// Build the directory record for a graph vertex.
    pub fn from_vertex(graph: &Graph, vertex: &Vertex) -> Result<Self> {
        let mut dependencies = Vec::new();
        for dep_id in graph.down_edges(vertex.id()) {
            let dep = graph
                .vertex(dep_id)
                .ok_or_else(|| Error::graph(format!("unknown vertex '{}'", dep_id)))?;
            dependencies.push(AppLookup::for_file(&dep.file)?);
        }

        Ok(Self {
            lookup: AppLookup::for_file(&vertex.file)?,
            name: vertex.file.application.name.clone(),
            app_type: vertex.file.application.app_type.clone(),
            dependencies,
        })
    }
}

/// Dev environment state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevState {
    #[default]
    NotCreated,
    Ready,
}

/// Dev environment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dev {
    pub lookup: AppLookup,
    pub state: DevState,
}

impl Dev {
    pub fn is_ready(&self) -> bool {
        self.state == DevState::Ready
    }
}

/// Build artifact record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub lookup: AppLookup,
    /// Artifact identifiers, e.g. image IDs per region
    #[serde(default)]
    pub artifact: BTreeMap<String, String>,
}

/// Deploy state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployState {
    #[default]
    New,
    Deployed,
    Failed,
}

/// Deploy record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deploy {
    pub lookup: AppLookup,
    pub state: DeployState,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

impl Deploy {
    pub fn is_deployed(&self) -> bool {
        self.state == DeployState::Deployed
    }

    pub fn is_failed(&self) -> bool {
        self.state == DeployState::Failed
    }
}

/// Infrastructure state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfraState {
    #[default]
    NotCreated,
    Partial,
    Ready,
}

/// Infrastructure record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infra {
    pub lookup: InfraLookup,
    pub state: InfraState,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

impl Infra {
    pub fn is_ready(&self) -> bool {
        self.state == InfraState::Ready
    }

    pub fn is_partial(&self) -> bool {
        self.state == InfraState::Partial
    }
}
