//! The `script` app type: build, deploy and dev are shell scripts kept next
//! to the application (`build.sh`, `deploy.sh`, `dev.sh`).

use super::shell::{self, ExecOutput};
use crate::app::{App, CompileResult, Context, DevDep, FoundationConfig};
use crate::directory::{
    AppLookup, Build, Deploy, DeployState, Dev, DevState, Infra, InfraLookup, InfraState,
};
use crate::error::ProviderResult;
use crate::fsutil;
use crate::plugin::Provider;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// App type name.
pub const APP_TYPE: &str = "script";

/// Fragment each application contributes to its dependents' dev runs.
const DEV_FRAGMENT: &str = "dev-dep.env";

#[derive(Debug, Default)]
pub struct ScriptApp;

impl ScriptApp {
    fn source_dir(ctx: &Context) -> PathBuf {
        ctx.shared
            .appfile
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn env(ctx: &Context) -> BTreeMap<String, String> {
        let mut env = BTreeMap::from([
            ("RIGGING_APP".to_string(), ctx.application.name.clone()),
            ("RIGGING_DEV_IP".to_string(), ctx.dev_ip_address.clone()),
            ("RIGGING_OUTPUT_DIR".to_string(), ctx.dir.display().to_string()),
            ("RIGGING_DEV_DEPS".to_string(), ctx.dev_dep_fragments.join(":")),
        ]);
        for (key, value) in &ctx.shared.infra_creds {
            env.insert(
                format!("RIGGING_CRED_{}", key.to_uppercase()),
                value.clone(),
            );
        }
        env
    }

    /// Run one of the application's scripts, echoing its output.
    fn run(ctx: &Context, file: &str, args: &[String]) -> ProviderResult<ExecOutput> {
        let source = Self::source_dir(ctx);
        if !source.join(file).is_file() {
            return Err(format!("{} not found in {}", file, source.display()).into());
        }

        debug!("running {} for '{}'", file, ctx.application.name);
        let out = shell::exec_local(&source, &shell::invocation(file, args), &Self::env(ctx))?;
        for line in out.stdout.lines() {
            ctx.shared.ui.message(line);
        }
        Ok(out)
    }

    fn lookup(ctx: &Context) -> ProviderResult<AppLookup> {
        Ok(AppLookup::for_file(&ctx.shared.appfile)?)
    }
}

impl Provider for ScriptApp {}

impl App for ScriptApp {
    fn compile(&self, ctx: &Context) -> ProviderResult<Option<CompileResult>> {
        let summary = json!({
            "name": ctx.application.name,
            "type": ctx.application.app_type,
            "source": Self::source_dir(ctx),
            "dependencies": ctx.application.dependencies,
            "dev_dep_fragments": ctx.dev_dep_fragments,
        });
        fsutil::write_json_atomic(&ctx.dir.join("app.json"), &summary)?;

        let fragment = ctx.dir.join(DEV_FRAGMENT);
        let var = ctx.application.name.to_uppercase().replace(['-', '.'], "_");
        fsutil::write_atomic(
            &fragment,
            format!("RIGGING_DEP_{}={}\n", var, ctx.dev_ip_address).as_bytes(),
        )?;

        Ok(Some(CompileResult {
            version: 1,
            foundation_config: FoundationConfig {
                service_name: Some(ctx.application.name.clone()),
            },
            dev_dep_fragment_path: Some(fragment.display().to_string()),
        }))
    }

    fn build(&self, ctx: &Context) -> ProviderResult<()> {
        ctx.shared.ui.header("Building with build.sh...");
        let out = Self::run(ctx, "build.sh", &[])?;
        if !out.success() {
            return Err(format!("build.sh exited with {}: {}", out.exit_code, out.stderr.trim()).into());
        }

        ctx.shared.directory.put_build(&Build {
            lookup: Self::lookup(ctx)?,
            artifact: BTreeMap::from([(
                "source".to_string(),
                Self::source_dir(ctx).display().to_string(),
            )]),
        })?;
        Ok(())
    }

    fn deploy(&self, ctx: &Context) -> ProviderResult<()> {
        let lookup = Self::lookup(ctx)?;
        match ctx.action.as_str() {
            "help" => {
                ctx.shared
                    .ui
                    .message("deploy [ARGS...] runs deploy.sh from the application directory");
                return Ok(());
            }
            "info" => {
                let state = ctx
                    .shared
                    .directory
                    .get_deploy(&lookup)?
                    .map(|d| format!("{:?}", d.state))
                    .unwrap_or_else(|| "New".to_string());
                ctx.shared.ui.message(&format!("Deploy state: {}", state));
                return Ok(());
            }
            _ => {}
        }

        let mut args = Vec::with_capacity(ctx.action_args.len() + 1);
        if !ctx.action.is_empty() {
            args.push(ctx.action.clone());
        }
        args.extend(ctx.action_args.iter().cloned());

        ctx.shared.ui.header("Deploying with deploy.sh...");
        let out = Self::run(ctx, "deploy.sh", &args)?;
        let state = if out.success() {
            DeployState::Deployed
        } else {
            DeployState::Failed
        };
        ctx.shared.directory.put_deploy(&Deploy {
            lookup,
            state,
            outputs: BTreeMap::new(),
        })?;
        if !out.success() {
            return Err(format!("deploy.sh exited with {}: {}", out.exit_code, out.stderr.trim()).into());
        }

        let infra = ctx
            .shared
            .appfile
            .active_infrastructure()
            .map(|i| i.name.clone())
            .unwrap_or_default();
        ctx.shared.directory.put_infra(&Infra {
            lookup: InfraLookup { name: infra },
            state: InfraState::Ready,
            outputs: BTreeMap::new(),
        })?;
        Ok(())
    }

    fn dev(&self, ctx: &Context) -> ProviderResult<()> {
        let lookup = Self::lookup(ctx)?;
        match ctx.action.as_str() {
            "" => {
                ctx.shared.ui.header("Starting dev environment with dev.sh...");
                let out = Self::run(ctx, "dev.sh", &ctx.action_args)?;
                if !out.success() {
                    return Err(format!("dev.sh exited with {}: {}", out.exit_code, out.stderr.trim()).into());
                }
                ctx.shared.directory.put_dev(&Dev {
                    lookup,
                    state: DevState::Ready,
                })?;
                ctx.shared.ui.message(&format!(
                    "Dev environment ready at {}",
                    ctx.dev_ip_address
                ));
            }
            "destroy" => {
                ctx.shared.directory.put_dev(&Dev {
                    lookup,
                    state: DevState::NotCreated,
                })?;
                ctx.shared.ui.message("Dev environment destroyed");
            }
            "address" => ctx.shared.ui.message(&ctx.dev_ip_address),
            other => return Err(format!("unknown dev action: {}", other).into()),
        }
        Ok(())
    }

    fn dev_dep(&self, dst: &Context, src: &Context) -> ProviderResult<Option<DevDep>> {
        let fragment = src.cache_dir.join(DEV_FRAGMENT);
        let var = src.application.name.to_uppercase().replace(['-', '.'], "_");
        fsutil::write_atomic(
            &fragment,
            format!("RIGGING_DEP_{}={}\n", var, src.dev_ip_address).as_bytes(),
        )?;

        Ok(Some(DevDep {
            files: vec![fragment],
            metadata: BTreeMap::from([
                ("app".to_string(), src.application.name.clone()),
                ("for".to_string(), dst.application.name.clone()),
            ]),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appfile::graph::tests::make_file;
    use crate::context::Shared;
    use crate::directory::{Backend, MemoryBackend};
    use crate::plugin::Tuple;
    use crate::ui::MemoryUi;
    use std::path::Path;
    use std::sync::Arc;

    struct Fixture {
        backend: Arc<MemoryBackend>,
        ui: Arc<MemoryUi>,
        ctx: Context,
    }

    fn fixture(source: &Path, name: &str) -> Fixture {
        let mut file = make_file(name, &[]);
        file.path = Some(source.to_path_buf());
        file.application.app_type = APP_TYPE.to_string();
        let backend = Arc::new(MemoryBackend::new());
        let ui = Arc::new(MemoryUi::new());
        let ctx = Context {
            compile_result: None,
            dir: source.join("out"),
            cache_dir: source.join("cache"),
            local_dir: source.join("local"),
            global_dir: source.join("global"),
            tuple: Tuple::new(APP_TYPE, "aws", "simple"),
            application: file.application.clone(),
            dev_ip_address: "172.16.1.2".to_string(),
            action: String::new(),
            action_args: vec![],
            dev_dep_fragments: vec![],
            shared: Shared {
                appfile: Arc::new(file),
                foundation_dirs: vec![],
                install_dir: source.join("binaries"),
                directory: backend.clone(),
                ui: ui.clone(),
                infra_creds: BTreeMap::from([("user".to_string(), "ops".to_string())]),
            },
        };
        Fixture { backend, ui, ctx }
    }

    #[test]
    fn test_script_compile_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(dir.path(), "my-api");
        let result = ScriptApp.compile(&f.ctx).unwrap().unwrap();

        assert!(f.ctx.dir.join("app.json").exists());
        let fragment = std::fs::read_to_string(f.ctx.dir.join(DEV_FRAGMENT)).unwrap();
        assert_eq!(fragment, "RIGGING_DEP_MY_API=172.16.1.2\n");
        assert_eq!(result.foundation_config.service_name.as_deref(), Some("my-api"));
    }

    #[test]
    fn test_script_build_records_artifact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("build.sh"),
            "echo \"building $RIGGING_APP as $RIGGING_CRED_USER\"",
        )
        .unwrap();
        let f = fixture(dir.path(), "web");
        ScriptApp.build(&f.ctx).unwrap();

        assert!(f.ui.contains("building web as ops"));
        let lookup = AppLookup::for_file(&f.ctx.shared.appfile).unwrap();
        assert!(f.backend.get_build(&lookup).unwrap().is_some());
    }

    #[test]
    fn test_script_build_missing_script() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(dir.path(), "web");
        let err = ScriptApp.build(&f.ctx).unwrap_err();
        assert!(err.to_string().contains("build.sh not found"));
    }

    #[test]
    fn test_script_deploy_failure_recorded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deploy.sh"), "echo nope >&2; exit 3").unwrap();
        let f = fixture(dir.path(), "web");
        let err = ScriptApp.deploy(&f.ctx).unwrap_err();
        assert!(err.to_string().contains("exited with 3: nope"));

        let lookup = AppLookup::for_file(&f.ctx.shared.appfile).unwrap();
        let deploy = f.backend.get_deploy(&lookup).unwrap().unwrap();
        assert!(deploy.is_failed());
    }

    #[test]
    fn test_script_deploy_success_marks_infra_ready() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deploy.sh"), "echo \"deploy $*\"").unwrap();
        let mut f = fixture(dir.path(), "web");
        f.ctx.action = "canary".to_string();
        f.ctx.action_args = vec!["10%".to_string()];
        ScriptApp.deploy(&f.ctx).unwrap();

        assert!(f.ui.contains("deploy canary 10%"));
        let infra = f
            .backend
            .get_infra(&InfraLookup {
                name: "main".to_string(),
            })
            .unwrap()
            .unwrap();
        assert!(infra.is_ready());
    }

    #[test]
    fn test_script_deploy_info_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fixture(dir.path(), "web");
        f.ctx.action = "info".to_string();
        ScriptApp.deploy(&f.ctx).unwrap();
        assert!(f.ui.contains("Deploy state: New"));
    }

    #[test]
    fn test_script_dev_actions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dev.sh"), "echo \"dev on $RIGGING_DEV_IP\"").unwrap();
        let mut f = fixture(dir.path(), "web");
        let lookup = AppLookup::for_file(&f.ctx.shared.appfile).unwrap();

        ScriptApp.dev(&f.ctx).unwrap();
        assert!(f.ui.contains("dev on 172.16.1.2"));
        assert!(f.backend.get_dev(&lookup).unwrap().unwrap().is_ready());

        f.ctx.action = "destroy".to_string();
        ScriptApp.dev(&f.ctx).unwrap();
        assert!(!f.backend.get_dev(&lookup).unwrap().unwrap().is_ready());

        f.ctx.action = "teleport".to_string();
        assert!(ScriptApp.dev(&f.ctx).is_err());
    }

    #[test]
    fn test_script_dev_dep_fragment_in_cache() {
        let dir = tempfile::tempdir().unwrap();
        let root = fixture(dir.path(), "web");
        let dep = fixture(dir.path(), "db");
        std::fs::create_dir_all(&dep.ctx.cache_dir).unwrap();

        let out = ScriptApp.dev_dep(&root.ctx, &dep.ctx).unwrap().unwrap();
        assert_eq!(out.files, vec![dep.ctx.cache_dir.join(DEV_FRAGMENT)]);
        assert_eq!(out.metadata["for"], "web");
    }
}
