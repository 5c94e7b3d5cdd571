//! Foundation providers — cross-cutting add-ons layered on an infrastructure.
//!
//! Foundations are singletons per infrastructure selection. They compile
//! once for the infrastructure itself and then around every application's
//! compile, once before and once after.

use crate::app::FoundationConfig;
use crate::context::Shared;
use crate::error::ProviderResult;
use crate::plan::Plan;
use crate::plugin::{Provider, Tuple};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Subdirectories every per-app foundation directory must contain.
pub const APP_SUBDIRS: [&str; 4] = ["app-dev", "app-dev-dep", "app-build", "app-deploy"];

/// A foundation implementation for one (name, infra type, infra flavor).
pub trait Foundation: Provider {
    /// Generate the foundation's output into `ctx.dir`.
    fn compile(&self, ctx: &Context) -> ProviderResult<CompileResult>;

    /// Plan changes for the foundation. Must not modify infrastructure.
    fn plan(&self, ctx: &Context) -> ProviderResult<Vec<Plan>>;
}

/// Context handed to a foundation provider for one call.
#[derive(Clone)]
pub struct Context {
    /// Foundation configuration from the appfile
    pub config: IndexMap<String, serde_json::Value>,

    /// Output directory
    pub dir: PathBuf,

    /// Lookup key that selected the implementation
    pub tuple: Tuple,

    /// App-provided configuration, set after an app compiles
    pub app_config: Option<FoundationConfig>,

    pub shared: Shared,
}

/// Result of compiling a foundation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileResult {
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
