//! Orchestration core — compile, plan, build, deploy, dev and status for a
//! compiled appfile and its dependencies.
//!
//! `Core` owns the compiled graph, the compile metadata store and the three
//! provider registries for its lifetime. Each pipeline operation resolves
//! fresh providers, hands them per-call contexts and releases them when the
//! call returns.

pub mod compile;
pub mod context;
pub mod metadata;
pub mod pipeline;
pub mod status;
mod walk;

#[cfg(test)]
pub(crate) mod testing;

pub use metadata::{CompileMetadata, MetadataStore};
pub use pipeline::{ExecuteOpts, ExecuteTask};
pub use status::StatusReport;

use crate::app::{self, App};
use crate::appfile::{Compiled, File};
use crate::directory::Backend;
use crate::error::Result;
use crate::foundation::Foundation;
use crate::infrastructure::Infrastructure;
use crate::localaddr::{AddressSource, CachedDb, Db};
use crate::plugin::{Handle, Registry, Tuple};
use crate::ui::Ui;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Configuration for [`Core::new`].
pub struct CoreConfig {
    /// Data global to every appfile on this machine
    pub data_dir: PathBuf,

    /// Data local to this appfile; survives recompiles
    pub local_dir: PathBuf,

    /// Compiled output; cleared by every compile
    pub compile_dir: PathBuf,

    /// The compiled appfile to operate on
    pub appfile: Compiled,

    pub directory: Arc<dyn Backend>,

    pub apps: Registry<Tuple, dyn App>,
    pub infrastructures: Registry<String, dyn Infrastructure>,
    pub foundations: Registry<Tuple, dyn Foundation>,

    pub ui: Arc<dyn Ui>,

    /// Dev address source; defaults to the allocation database under
    /// `data_dir` cached in `local_dir`
    pub address: Option<Arc<dyn AddressSource>>,

    /// Maximum concurrent graph visits; 0 picks the available parallelism
    pub parallelism: usize,
}

/// The orchestration engine for one compiled appfile.
pub struct Core {
    appfile: Arc<File>,
    compiled: Compiled,
    apps: Registry<Tuple, dyn App>,
    infras: Registry<String, dyn Infrastructure>,
    foundations: Registry<Tuple, dyn Foundation>,
    dir: Arc<dyn Backend>,
    address: Arc<dyn AddressSource>,
    data_dir: PathBuf,
    local_dir: PathBuf,
    compile_dir: PathBuf,
    ui: Arc<dyn Ui>,
    parallelism: usize,
    metadata: MetadataStore,
}

impl Core {
    pub fn new(config: CoreConfig) -> Self {
        let address = config.address.unwrap_or_else(|| {
            Arc::new(CachedDb::new(
                Db::new(config.data_dir.join("ip.db")),
                config.local_dir.join("dev_ip"),
            ))
        });

        let parallelism = match config.parallelism {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        };

        Self {
            appfile: Arc::clone(config.appfile.file()),
            metadata: MetadataStore::new(config.local_dir.join(metadata::METADATA_FILE)),
            compiled: config.appfile,
            apps: config.apps,
            infras: config.infrastructures,
            foundations: config.foundations,
            dir: config.directory,
            address,
            data_dir: config.data_dir,
            local_dir: config.local_dir,
            compile_dir: config.compile_dir,
            ui: config.ui,
            parallelism,
        }
    }

    /// The root application's provider and context.
    ///
    /// The provider is released when the returned handle is dropped.
    pub fn app(&self) -> Result<(Handle<dyn App>, app::Context)> {
        let ctx = self.app_context(&self.appfile)?;
        let app = self.app_impl(&ctx)?;
        Ok((app, ctx))
    }

    /// The configured directory backend.
    pub fn directory(&self) -> &Arc<dyn Backend> {
        &self.dir
    }

    /// The compiled appfile this core operates on.
    pub fn compiled(&self) -> &Compiled {
        &self.compiled
    }

    pub fn compile_dir(&self) -> &Path {
        &self.compile_dir
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }
}

/// Lock a mutex, recovering the data if a visitor panicked while holding it.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
