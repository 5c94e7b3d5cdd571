//! Per-call provider contexts and provider resolution.

use super::Core;
use crate::app::{self, App};
use crate::appfile::File;
use crate::context::Shared;
use crate::error::{Error, Result};
use crate::foundation::{self, Foundation};
use crate::fsutil;
use crate::infrastructure::{self, Infrastructure};
use crate::plugin::{Handle, Tuple};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A resolved foundation with the context for its infrastructure-scoped
/// calls.
pub type FoundationPair = (Handle<dyn Foundation>, foundation::Context);

impl Core {
    /// Build the context for one application in the graph.
    pub fn app_context(&self, file: &Arc<File>) -> Result<app::Context> {
        let root = file.id == self.appfile.id;
        if !file.has_path_safe_id() {
            return Err(Error::graph(format!(
                "application id '{}' cannot be used as a directory name",
                file.id
            )));
        }

        let config = file
            .active_infrastructure()
            .ok_or_else(|| Error::NoInfrastructure {
                name: file.project.infrastructure.clone(),
            })?;
        let tuple = Tuple::new(
            file.application.app_type.as_str(),
            config.infra_type.as_str(),
            config.flavor.as_str(),
        );

        // Dependencies never share the root's output directory.
        let output_dir = if root {
            self.compile_dir.join("app")
        } else {
            self.compile_dir.join(format!("dep-{}", file.id))
        };

        let cache_dir = self.data_dir.join("cache").join(&file.id);
        fsutil::ensure_dir(&cache_dir)?;
        let global_dir = self.data_dir.join("global-data");
        fsutil::ensure_dir(&global_dir)?;

        let foundation_dirs = config
            .foundations
            .iter()
            .map(|f| output_dir.join(format!("foundation-{}", f.name)))
            .collect();

        let ip = self.address.ip()?;

        let compile_result = self.metadata.get()?.and_then(|md| {
            if root {
                md.app.clone()
            } else {
                md.app_deps.get(&file.id).cloned()
            }
        });

        let appfile = if file.has_customizations() {
            Arc::new(file.scoped("app"))
        } else {
            Arc::clone(file)
        };

        Ok(app::Context {
            compile_result,
            dir: output_dir,
            cache_dir,
            local_dir: self.local_dir.clone(),
            global_dir,
            tuple,
            application: appfile.application.clone(),
            dev_ip_address: ip.to_string(),
            action: String::new(),
            action_args: Vec::new(),
            dev_dep_fragments: Vec::new(),
            shared: Shared {
                appfile,
                foundation_dirs,
                ..self.shared()
            },
        })
    }

    /// Resolve the app provider selected by a context.
    pub(crate) fn app_impl(&self, ctx: &app::Context) -> Result<Handle<dyn App>> {
        self.apps.resolve(&ctx.tuple)
    }

    /// Resolve the active infrastructure's provider and build its context.
    pub fn infra(&self) -> Result<(Handle<dyn Infrastructure>, infrastructure::Context)> {
        let compile_extra = self
            .metadata
            .get()?
            .and_then(|md| md.infra.as_ref().map(|r| r.extra.clone()))
            .unwrap_or_default();

        let config = self.active_infrastructure()?;
        let infra = self.infras.resolve(&config.infra_type)?;

        let ctx = infrastructure::Context {
            compile_extra,
            dir: self
                .compile_dir
                .join(format!("infra-{}", self.appfile.project.infrastructure)),
            infra: config.clone(),
            shared: self.shared(),
        };
        Ok((infra, ctx))
    }

    /// Resolve every foundation enabled on the active infrastructure, in
    /// declaration order.
    pub fn foundations(&self) -> Result<Vec<FoundationPair>> {
        let config = self.active_infrastructure()?;

        let mut result = Vec::with_capacity(config.foundations.len());
        for f in &config.foundations {
            let tuple = Tuple::new(
                f.name.as_str(),
                config.infra_type.as_str(),
                config.flavor.as_str(),
            );
            let imp = self.foundations.resolve(&tuple)?;
            let ctx = foundation::Context {
                config: f.config.clone(),
                dir: self.compile_dir.join(format!("foundation-{}", f.name)),
                tuple,
                app_config: None,
                shared: self.shared(),
            };
            result.push((imp, ctx));
        }
        Ok(result)
    }

    /// Fetch credentials and store them on the infrastructure context.
    pub(crate) fn infra_creds(
        &self,
        infra: &dyn Infrastructure,
        ctx: &mut infrastructure::Context,
    ) -> Result<()> {
        let creds = infra
            .creds(ctx)
            .map_err(|e| Error::provider("fetching credentials for", &ctx.infra.infra_type, e))?;
        ctx.shared.infra_creds = creds;
        Ok(())
    }

    fn active_infrastructure(&self) -> Result<&crate::appfile::Infrastructure> {
        self.appfile
            .active_infrastructure()
            .ok_or_else(|| Error::NoInfrastructure {
                name: self.appfile.project.infrastructure.clone(),
            })
    }

    fn shared(&self) -> Shared {
        Shared {
            appfile: Arc::clone(&self.appfile),
            foundation_dirs: Vec::new(),
            install_dir: self.data_dir.join("binaries"),
            directory: Arc::clone(&self.dir),
            ui: Arc::clone(&self.ui),
            infra_creds: BTreeMap::new(),
        }
    }
}
