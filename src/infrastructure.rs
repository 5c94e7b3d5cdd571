//! Infrastructure providers — provision compute and network resources.

use crate::appfile;
use crate::context::{Credentials, Shared};
use crate::error::ProviderResult;
use crate::plan::Plan;
use crate::plugin::Provider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// An infrastructure implementation for one infrastructure type.
pub trait Infrastructure: Provider {
    /// Fetch credentials for talking to the infrastructure.
    fn creds(&self, ctx: &Context) -> ProviderResult<Credentials>;

    /// Generate the infrastructure's compiled output into `ctx.dir`.
    fn compile(&self, ctx: &Context) -> ProviderResult<CompileResult>;

    /// Plan changes to the infrastructure. Must not modify it.
    fn plan(&self, ctx: &Context) -> ProviderResult<Vec<Plan>>;
}

/// Context handed to an infrastructure provider for one call.
#[derive(Clone)]
pub struct Context {
    /// Extra data from the last infra compile (empty if none)
    pub compile_extra: BTreeMap<String, serde_json::Value>,

    /// Compiled output directory
    pub dir: PathBuf,

    /// The active infrastructure definition
    pub infra: appfile::Infrastructure,

    pub shared: Shared,
}

impl Context {
    /// Credentials fetched for this context, if any.
    pub fn creds(&self) -> &Credentials {
        &self.shared.infra_creds
    }
}

/// Result of compiling the infrastructure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileResult {
    /// Opaque data threaded back into later infra contexts
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
