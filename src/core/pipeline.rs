//! Plan, build, deploy, dev and ad-hoc task execution.

use super::{lock, Core};
use crate::app::{self, read_dev_dep, write_dev_dep};
use crate::error::{Error, Result};
use crate::plan::ExecutionPlan;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::debug;

/// Name of the dev dependency cache entry inside a dependency's cache dir.
pub const DEV_DEP_CACHE: &str = "dev-dep.json";

/// Deploy actions that only report and never need credentials.
const INFO_ACTIONS: [&str; 2] = ["help", "info"];

/// A task runnable through [`Core::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteTask {
    Dev,
}

impl FromStr for ExecuteTask {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dev" => Ok(Self::Dev),
            other => Err(Error::UnknownTask(other.to_string())),
        }
    }
}

impl fmt::Display for ExecuteTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dev => write!(f, "dev"),
        }
    }
}

/// Options for [`Core::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOpts {
    pub task: ExecuteTask,
    pub action: String,
    pub args: Vec<String>,
}

impl Core {
    /// Plan the infrastructure and then each foundation.
    ///
    /// Providers must not modify real infrastructure while planning.
    pub fn plan(&self) -> Result<ExecutionPlan> {
        let (infra, mut infra_ctx) = self.infra()?;
        self.infra_creds(&*infra, &mut infra_ctx)?;

        let mut foundations = self.foundations()?;
        for (_, ctx) in &mut foundations {
            ctx.shared.infra_creds = infra_ctx.shared.infra_creds.clone();
        }

        let mut plans = infra
            .plan(&infra_ctx)
            .map_err(|e| Error::provider("planning", &infra_ctx.infra.infra_type, e))?;

        for (f, ctx) in &foundations {
            let p = f
                .plan(ctx)
                .map_err(|e| Error::provider("planning", &ctx.tuple.component, e))?;
            plans.extend(p);
        }

        Ok(ExecutionPlan { plans })
    }

    /// Build the root application's deployable artifact. Dependencies are
    /// not built.
    pub fn build(&self) -> Result<()> {
        let (infra, mut infra_ctx) = self.infra()?;
        self.infra_creds(&*infra, &mut infra_ctx)?;

        let (root, mut ctx) = self.app()?;
        ctx.shared.infra_creds = infra_ctx.shared.infra_creds;

        root.build(&ctx)
            .map_err(|e| Error::provider("building", &ctx.application.name, e))
    }

    /// Deploy the root application. `action` is "" for the default deploy.
    pub fn deploy(&self, action: &str, args: &[String]) -> Result<()> {
        let (infra, mut infra_ctx) = self.infra()?;

        if !INFO_ACTIONS.contains(&action) {
            self.infra_creds(&*infra, &mut infra_ctx)?;
        }

        let (root, mut ctx) = self.app()?;
        ctx.shared.infra_creds = infra_ctx.shared.infra_creds;
        ctx.action = action.to_string();
        ctx.action_args = args.to_vec();

        root.deploy(&ctx)
            .map_err(|e| Error::provider("deploying", &ctx.application.name, e))
    }

    /// Prepare every dependency's dev artifact, then start the root
    /// application's dev environment.
    pub fn dev(&self) -> Result<()> {
        let (root, mut root_ctx) = self.app()?;

        let fragments = Mutex::new(Vec::new());
        self.walk(|imp, ctx, is_root| {
            if is_root {
                return Ok(());
            }

            let cache_path = ctx.cache_dir.join(DEV_DEP_CACHE);
            if read_dev_dep(&cache_path).is_ok() {
                ctx.shared.ui.header(&format!(
                    "Using cached dev dependency for '{}'",
                    ctx.application.name
                ));
                lock(&fragments).push(cache_path.display().to_string());
                return Ok(());
            }

            // The dependency gets its own copy of the root context.
            let dst = root_ctx.clone();
            debug!("core: calling DevDep for '{}'", ctx.application.name);
            let dep = imp.dev_dep(&dst, ctx).map_err(|e| {
                Error::provider("building dev dependency for", &ctx.application.name, e)
            })?;

            if let Some(mut dep) = dep.filter(|d| !d.files.is_empty()) {
                dep.rel_files(&ctx.cache_dir)?;
                write_dev_dep(&cache_path, &dep)?;
                lock(&fragments).push(cache_path.display().to_string());
            }
            Ok(())
        })?;

        let mut fragments = fragments
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        fragments.sort();
        root_ctx.dev_dep_fragments = fragments;

        debug!(
            "core: calling Dev for root app '{}'",
            root_ctx.application.name
        );
        root.dev(&root_ctx)
            .map_err(|e| Error::provider("starting dev for", &root_ctx.application.name, e))
    }

    /// Run a task against the root application, bypassing the graph.
    pub fn execute(&self, opts: &ExecuteOpts) -> Result<()> {
        match opts.task {
            ExecuteTask::Dev => self.execute_app(opts),
        }
    }

    fn execute_app(&self, opts: &ExecuteOpts) -> Result<()> {
        let mut ctx: app::Context = self.app_context(&self.appfile)?;
        let imp = self.app_impl(&ctx)?;

        ctx.action = opts.action.clone();
        ctx.action_args = opts.args.clone();

        match opts.task {
            ExecuteTask::Dev => imp
                .dev(&ctx)
                .map_err(|e| Error::provider("running dev for", &ctx.application.name, e)),
        }
    }
}
