//! Compile metadata — cached and persisted results of the last successful
//! compile.

use crate::error::{Error, Result};
use crate::{app, foundation, fsutil, infrastructure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use super::lock;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// File name of the persisted metadata inside the local directory.
pub const METADATA_FILE: &str = "compile-metadata.json";

/// Results of one complete compile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileMetadata {
    #[serde(default)]
    pub infra: Option<infrastructure::CompileResult>,

    /// Keyed by foundation name
    #[serde(default)]
    pub foundations: BTreeMap<String, foundation::CompileResult>,

    /// Root application
    #[serde(default)]
    pub app: Option<app::CompileResult>,

    /// Keyed by dependency ID
    #[serde(default)]
    pub app_deps: BTreeMap<String, app::CompileResult>,
}

#[derive(Debug)]
enum Slot {
    /// Nothing read yet; the next `get` consults the file
    Unloaded,
    /// A compile is in progress; nothing is visible until it saves
    Cleared,
    Loaded(Arc<CompileMetadata>),
}

/// Single-slot cache in front of the persisted metadata file.
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    slot: Mutex<Slot>,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            slot: Mutex::new(Slot::Unloaded),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current metadata, loading it from disk on first use. A missing
    /// file means no compile has happened yet.
    pub fn get(&self) -> Result<Option<Arc<CompileMetadata>>> {
        let mut slot = lock(&self.slot);
        match &*slot {
            Slot::Loaded(md) => return Ok(Some(Arc::clone(md))),
            Slot::Cleared => return Ok(None),
            Slot::Unloaded => {}
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::io(
                    format!("cannot read {}", self.path.display()),
                    e,
                ))
            }
        };
        let md: CompileMetadata = serde_json::from_str(&content).map_err(|e| Error::Metadata {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        debug!("loaded compile metadata from {}", self.path.display());
        let md = Arc::new(md);
        *slot = Slot::Loaded(Arc::clone(&md));
        Ok(Some(md))
    }

    /// Hide cached metadata until the next successful `save`. The file on
    /// disk is left in place.
    pub fn reset(&self) {
        *lock(&self.slot) = Slot::Cleared;
    }

    /// End a compile that will not save. Whatever is on disk becomes
    /// visible again on the next `get`.
    pub fn abort(&self) {
        let mut slot = lock(&self.slot);
        if matches!(*slot, Slot::Cleared) {
            *slot = Slot::Unloaded;
        }
    }

    /// Persist `md` atomically and make it the cached value.
    pub fn save(&self, md: CompileMetadata) -> Result<()> {
        let mut slot = lock(&self.slot);
        if let Err(e) = fsutil::write_json_atomic(&self.path, &md) {
            // The previous file is still authoritative.
            *slot = Slot::Unloaded;
            return Err(e);
        }
        *slot = Slot::Loaded(Arc::new(md));
        Ok(())
    }
}
