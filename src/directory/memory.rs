//! In-memory directory backend.

use super::*;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    apps: HashMap<AppLookup, App>,
    devs: HashMap<AppLookup, Dev>,
    builds: HashMap<AppLookup, Build>,
    deploys: HashMap<AppLookup, Deploy>,
    infras: HashMap<InfraLookup, Infra>,
    /// Order of `put_app` calls
    put_log: Vec<AppLookup>,
}

/// Directory backend that keeps every record in memory.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookups passed to `put_app`, in call order.
    pub fn put_app_log(&self) -> Vec<AppLookup> {
        self.with(|t| t.put_log.clone()).unwrap_or_default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| Error::Directory("directory lock poisoned".to_string()))?;
        Ok(f(&mut tables))
    }
}

impl Backend for MemoryBackend {
    fn put_app(&self, lookup: &AppLookup, app: &App) -> Result<()> {
        self.with(|t| {
            t.put_log.push(lookup.clone());
            t.apps.insert(lookup.clone(), app.clone());
        })
    }

    fn get_app(&self, lookup: &AppLookup) -> Result<Option<App>> {
        self.with(|t| t.apps.get(lookup).cloned())
    }

    fn put_dev(&self, dev: &Dev) -> Result<()> {
        self.with(|t| {
            t.devs.insert(dev.lookup.clone(), dev.clone());
        })
    }

    fn get_dev(&self, lookup: &AppLookup) -> Result<Option<Dev>> {
        self.with(|t| t.devs.get(lookup).cloned())
    }

    fn put_build(&self, build: &Build) -> Result<()> {
        self.with(|t| {
            t.builds.insert(build.lookup.clone(), build.clone());
        })
    }

    fn get_build(&self, lookup: &AppLookup) -> Result<Option<Build>> {
        self.with(|t| t.builds.get(lookup).cloned())
    }

    fn put_deploy(&self, deploy: &Deploy) -> Result<()> {
        self.with(|t| {
            t.deploys.insert(deploy.lookup.clone(), deploy.clone());
        })
    }

    fn get_deploy(&self, lookup: &AppLookup) -> Result<Option<Deploy>> {
        self.with(|t| t.deploys.get(lookup).cloned())
    }

    fn put_infra(&self, infra: &Infra) -> Result<()> {
        self.with(|t| {
            t.infras.insert(infra.lookup.clone(), infra.clone());
        })
    }

    fn get_infra(&self, lookup: &InfraLookup) -> Result<Option<Infra>> {
        self.with(|t| t.infras.get(lookup).cloned())
    }
}
