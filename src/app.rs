//! App providers — per-application-type compile, build, deploy and dev.

use crate::appfile::Application;
use crate::context::Shared;
use crate::error::{Error, ProviderResult, Result};
use crate::fsutil;
use crate::plan::Plan;
use crate::plugin::{Provider, Tuple};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// An app implementation for one (app type, infra type, infra flavor).
pub trait App: Provider {
    /// Generate the application's compiled output into `ctx.dir`.
    fn compile(&self, ctx: &Context) -> ProviderResult<Option<CompileResult>>;

    /// Plan the application's deployment. Must not modify infrastructure.
    fn plan(&self, _ctx: &Context) -> ProviderResult<Vec<Plan>> {
        Ok(Vec::new())
    }

    /// Build the deployable artifact.
    fn build(&self, ctx: &Context) -> ProviderResult<()>;

    /// Deploy the application; `ctx.action` selects a subaction.
    fn deploy(&self, ctx: &Context) -> ProviderResult<()>;

    /// Manage the development environment; `ctx.action` selects a subaction.
    fn dev(&self, ctx: &Context) -> ProviderResult<()>;

    /// Build what this application contributes to another application's
    /// dev environment. `dst` is the application being developed, `src` is
    /// this dependency.
    fn dev_dep(&self, dst: &Context, src: &Context) -> ProviderResult<Option<DevDep>>;
}

/// Context handed to an app provider for one call.
#[derive(Clone)]
pub struct Context {
    /// Result of this application's last compile, if any
    pub compile_result: Option<CompileResult>,

    /// Compiled output directory
    pub dir: PathBuf,

    /// Per-application cache directory, preserved across compiles
    pub cache_dir: PathBuf,

    /// Directory local to the appfile being operated on
    pub local_dir: PathBuf,

    /// Directory shared by all applications
    pub global_dir: PathBuf,

    /// Lookup key that selected the implementation
    pub tuple: Tuple,

    /// Application metadata
    pub application: Application,

    /// Address for the local development environment
    pub dev_ip_address: String,

    /// Requested subaction ("" for the default)
    pub action: String,

    /// Subaction arguments
    pub action_args: Vec<String>,

    /// Dev dependency fragments collected from dependencies
    pub dev_dep_fragments: Vec<String>,

    pub shared: Shared,
}

/// Result of compiling an application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileResult {
    /// Compile output format version
    #[serde(default)]
    pub version: u32,

    /// Configuration passed to foundations after the app compiles
    #[serde(default)]
    pub foundation_config: FoundationConfig,

    /// Fragment this application contributes to dependents' dev environments
    #[serde(default)]
    pub dev_dep_fragment_path: Option<String>,
}

/// What an application tells the foundations about itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoundationConfig {
    /// Service name to register, if the app exposes one
    #[serde(default)]
    pub service_name: Option<String>,
}

/// A dependency's contribution to a dev environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevDep {
    /// Files making up the dependency, relative to its cache directory
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// Provider-defined metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl DevDep {
    /// Rewrite every file to be relative to `dir`, failing if one lies
    /// outside it.
    pub fn rel_files(&mut self, dir: &Path) -> Result<()> {
        for file in &mut self.files {
            let rel = if file.is_absolute() {
                file.strip_prefix(dir)
                    .map(Path::to_path_buf)
                    .map_err(|_| outside(file, dir))?
            } else {
                file.clone()
            };

            if rel.components().any(|c| matches!(c, Component::ParentDir)) {
                return Err(outside(file, dir));
            }
            *file = rel;
        }
        Ok(())
    }
}

fn outside(file: &Path, dir: &Path) -> Error {
    Error::io(
        format!("dev dependency file {}", file.display()),
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("not within {}", dir.display()),
        ),
    )
}

/// Read a cached dev dependency.
pub fn read_dev_dep(path: &Path) -> Result<DevDep> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("cannot read {}", path.display()), e))?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a dev dependency to the cache.
pub fn write_dev_dep(path: &Path, dep: &DevDep) -> Result<()> {
    fsutil::write_json_atomic(path, dep)
}
