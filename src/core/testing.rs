//! Counting fake providers and a temp-dir backed core for tests.

use super::{Core, CoreConfig};
use crate::app::{self, App, CompileResult, DevDep, FoundationConfig};
use crate::appfile::{self, Compiled, File, Graph};
use crate::context::Credentials;
use crate::directory::MemoryBackend;
use crate::error::{ProviderResult, Result};
use crate::foundation::{self, Foundation};
use crate::infrastructure::{self, Infrastructure};
use crate::localaddr::AddressSource;
use crate::plan::{Plan, Task};
use crate::plugin::{Provider, Registry, Tuple};
use crate::ui::MemoryUi;
use std::collections::{BTreeMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Shared call record for every fake provider.
#[derive(Default)]
pub(crate) struct Calls {
    log: Mutex<Vec<String>>,
    pub built: AtomicUsize,
    pub closed: AtomicUsize,
    pub creds: AtomicUsize,
    pub dev_dep: AtomicUsize,
    /// Application names whose compile fails
    pub fail_compile: Mutex<HashSet<String>>,
}

impl Calls {
    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    /// Every recorded call, in order.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Recorded calls starting with `prefix`.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.log()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    pub fn fail_compile_of(&self, name: &str) {
        self.fail_compile.lock().unwrap().insert(name.to_string());
    }

    fn close(&self) -> ProviderResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeApp {
    calls: Arc<Calls>,
}

impl Provider for FakeApp {
    fn close(&self) -> ProviderResult<()> {
        self.calls.close()
    }
}

impl App for FakeApp {
    fn compile(&self, ctx: &app::Context) -> ProviderResult<Option<CompileResult>> {
        let name = &ctx.application.name;
        self.calls.record(format!(
            "app.compile:{}:fragments={}",
            name,
            ctx.dev_dep_fragments.len()
        ));
        if self.calls.fail_compile.lock().unwrap().contains(name) {
            return Err(format!("{} refused to compile", name).into());
        }

        std::fs::create_dir_all(&ctx.dir)?;
        std::fs::write(ctx.dir.join("main.txt"), name)?;
        Ok(Some(CompileResult {
            version: 1,
            foundation_config: FoundationConfig {
                service_name: Some(format!("{}.service", name)),
            },
            dev_dep_fragment_path: Some(ctx.dir.join("fragment").display().to_string()),
        }))
    }

    fn build(&self, ctx: &app::Context) -> ProviderResult<()> {
        self.calls.record(format!(
            "app.build:{}:creds={}",
            ctx.application.name,
            ctx.shared.infra_creds.len()
        ));
        Ok(())
    }

    fn deploy(&self, ctx: &app::Context) -> ProviderResult<()> {
        self.calls.record(format!(
            "app.deploy:{}:{}:{}",
            ctx.application.name,
            ctx.action,
            ctx.action_args.join(" ")
        ));
        Ok(())
    }

    fn dev(&self, ctx: &app::Context) -> ProviderResult<()> {
        self.calls.record(format!(
            "app.dev:{}:{}:fragments={}",
            ctx.application.name,
            ctx.action,
            ctx.dev_dep_fragments.len()
        ));
        Ok(())
    }

    fn dev_dep(&self, dst: &app::Context, src: &app::Context) -> ProviderResult<Option<DevDep>> {
        self.calls.dev_dep.fetch_add(1, Ordering::SeqCst);
        self.calls.record(format!(
            "app.dev_dep:{}->{}",
            src.application.name, dst.application.name
        ));

        let fragment = src.cache_dir.join("dev.fragment");
        std::fs::write(&fragment, &src.application.name)?;
        Ok(Some(DevDep {
            files: vec![fragment],
            metadata: BTreeMap::from([("for".to_string(), dst.application.name.clone())]),
        }))
    }
}

struct FakeInfra {
    calls: Arc<Calls>,
}

impl Provider for FakeInfra {
    fn close(&self) -> ProviderResult<()> {
        self.calls.close()
    }
}

impl Infrastructure for FakeInfra {
    fn creds(&self, _ctx: &infrastructure::Context) -> ProviderResult<Credentials> {
        self.calls.creds.fetch_add(1, Ordering::SeqCst);
        Ok(BTreeMap::from([(
            "token".to_string(),
            "secret".to_string(),
        )]))
    }

    fn compile(&self, ctx: &infrastructure::Context) -> ProviderResult<infrastructure::CompileResult> {
        self.calls.record(format!("infra.compile:{}", ctx.infra.name));
        std::fs::create_dir_all(&ctx.dir)?;
        std::fs::write(ctx.dir.join("main.tf"), &ctx.infra.infra_type)?;
        Ok(infrastructure::CompileResult {
            extra: BTreeMap::from([("vpc".to_string(), serde_json::json!("vpc-1"))]),
        })
    }

    fn plan(&self, ctx: &infrastructure::Context) -> ProviderResult<Vec<Plan>> {
        self.calls.record(format!("infra.plan:creds={}", ctx.creds().len()));
        Ok(vec![
            plan("infra network", "terraform.apply"),
            plan("infra hosts", "terraform.apply"),
        ])
    }
}

struct FakeFoundation {
    calls: Arc<Calls>,
}

impl Provider for FakeFoundation {
    fn close(&self) -> ProviderResult<()> {
        self.calls.close()
    }
}

impl Foundation for FakeFoundation {
    fn compile(&self, ctx: &foundation::Context) -> ProviderResult<foundation::CompileResult> {
        let service = ctx
            .app_config
            .as_ref()
            .and_then(|c| c.service_name.clone())
            .unwrap_or_else(|| "-".to_string());
        self.calls.record(format!(
            "foundation.compile:{}:{}:{}",
            ctx.tuple.component,
            dir_name(&ctx.dir),
            service
        ));
        std::fs::create_dir_all(&ctx.dir)?;
        Ok(foundation::CompileResult::default())
    }

    fn plan(&self, ctx: &foundation::Context) -> ProviderResult<Vec<Plan>> {
        self.calls.record(format!(
            "foundation.plan:{}:creds={}",
            ctx.tuple.component,
            ctx.shared.infra_creds.len()
        ));
        Ok(vec![plan(&format!("foundation {}", ctx.tuple.component), "consul.join")])
    }
}

fn plan(description: &str, task_type: &str) -> Plan {
    Plan {
        description: description.to_string(),
        tasks: vec![Task {
            task_type: task_type.to_string(),
            description: description.to_string(),
            args: BTreeMap::new(),
        }],
    }
}

/// Last two path components, e.g. "app/foundation-consul".
fn dir_name(dir: &Path) -> String {
    let parts: Vec<_> = dir
        .components()
        .rev()
        .take(2)
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    parts.into_iter().rev().collect::<Vec<_>>().join("/")
}

/// Always hands out the same address.
pub(crate) struct FixedAddress(pub IpAddr);

impl AddressSource for FixedAddress {
    fn ip(&self) -> Result<IpAddr> {
        Ok(self.0)
    }
}

/// Temp directories, fakes and recorders behind a test core.
pub(crate) struct Harness {
    dir: TempDir,
    pub calls: Arc<Calls>,
    pub backend: Arc<MemoryBackend>,
    pub ui: Arc<MemoryUi>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            calls: Arc::default(),
            backend: Arc::new(MemoryBackend::new()),
            ui: Arc::new(MemoryUi::new()),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn local_dir(&self) -> PathBuf {
        self.dir.path().join("local")
    }

    pub fn compile_dir(&self) -> PathBuf {
        self.local_dir().join("compiled")
    }

    pub fn core(&self, appfile: Compiled) -> Core {
        self.core_with_parallelism(appfile, 2)
    }

    pub fn core_with_parallelism(&self, appfile: Compiled, parallelism: usize) -> Core {
        let mut apps: Registry<Tuple, dyn App> = Registry::new("app");
        let calls = Arc::clone(&self.calls);
        apps.register(Tuple::new("test", "aws", "simple"), move || {
            calls.built.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeApp {
                calls: Arc::clone(&calls),
            }))
        });

        let mut infrastructures: Registry<String, dyn Infrastructure> =
            Registry::new("infrastructure");
        let calls = Arc::clone(&self.calls);
        infrastructures.register("aws".to_string(), move || {
            calls.built.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeInfra {
                calls: Arc::clone(&calls),
            }))
        });

        let mut foundations: Registry<Tuple, dyn Foundation> = Registry::new("foundation");
        for name in ["consul", "vault"] {
            let calls = Arc::clone(&self.calls);
            foundations.register(Tuple::new(name, "aws", "simple"), move || {
                calls.built.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FakeFoundation {
                    calls: Arc::clone(&calls),
                }))
            });
        }

        Core::new(CoreConfig {
            data_dir: self.data_dir(),
            local_dir: self.local_dir(),
            compile_dir: self.compile_dir(),
            appfile,
            directory: self.backend.clone(),
            apps,
            infrastructures,
            foundations,
            ui: self.ui.clone(),
            address: Some(Arc::new(FixedAddress(IpAddr::V4(Ipv4Addr::new(
                172, 16, 1, 10,
            ))))),
            parallelism,
        })
    }

    /// Providers built and closed so far.
    pub fn built_and_closed(&self) -> (usize, usize) {
        (
            self.calls.built.load(Ordering::SeqCst),
            self.calls.closed.load(Ordering::SeqCst),
        )
    }
}

/// A compiled appfile from files and a root ID.
pub(crate) fn compiled(files: Vec<File>, root: &str) -> Compiled {
    Compiled {
        graph: Graph::new(files, root).unwrap(),
    }
}

/// Enable a foundation on the file's active infrastructure.
pub(crate) fn with_foundation(mut file: File, name: &str) -> File {
    for infra in &mut file.infrastructure {
        infra.foundations.push(appfile::Foundation {
            name: name.to_string(),
            config: Default::default(),
        });
    }
    file
}
