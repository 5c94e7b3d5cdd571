//! Compile — regenerate compiled output for the infrastructure, its
//! foundations and every application in the graph.

use super::context::FoundationPair;
use super::metadata::CompileMetadata;
use super::{lock, Core};
use crate::app::{self, FoundationConfig};
use crate::directory;
use crate::error::{Error, Result};
use crate::foundation::APP_SUBDIRS;
use crate::fsutil;
use crate::infrastructure::{self, Infrastructure};
use std::sync::Mutex;
use tracing::info;

impl Core {
    /// Compile the appfile and all of its dependencies.
    ///
    /// Metadata is saved only after every stage has succeeded.
    pub fn compile(&self) -> Result<()> {
        let (infra, infra_ctx) = self.infra()?;

        // Foundations are singletons per infrastructure, not per app.
        let foundations = self.foundations()?;

        info!(
            "deleting prior compilation contents: {}",
            self.compile_dir.display()
        );
        match std::fs::remove_dir_all(&self.compile_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::io(
                    format!("cannot remove {}", self.compile_dir.display()),
                    e,
                ))
            }
        }

        self.metadata.reset();
        let result = self.compile_all(&*infra, &infra_ctx, &foundations);
        if result.is_err() {
            self.metadata.abort();
        }
        result
    }

    /// Every compile stage after the output directory and metadata cache
    /// were cleared.
    fn compile_all(
        &self,
        infra: &dyn Infrastructure,
        infra_ctx: &infrastructure::Context,
        foundations: &[FoundationPair],
    ) -> Result<()> {
        info!("running infra compile...");
        self.ui.message("Compiling infra...");
        let infra_result = infra
            .compile(infra_ctx)
            .map_err(|e| Error::provider("compiling", &infra_ctx.infra.infra_type, e))?;

        let mut md = CompileMetadata {
            infra: Some(infra_result),
            ..Default::default()
        };

        info!("running foundation compilations");
        for (f, ctx) in foundations {
            self.ui
                .message(&format!("Compiling foundation: {}", ctx.tuple.component));
            let result = f
                .compile(ctx)
                .map_err(|e| Error::provider("compiling", &ctx.tuple.component, e))?;
            md.foundations.insert(ctx.tuple.component.clone(), result);
        }

        let md = Mutex::new(md);
        self.walk(|app, ctx, root| {
            if root {
                self.ui.header("Compiling main application...");
            } else {
                self.ui.header(&format!(
                    "Compiling dependency '{}'...",
                    ctx.application.name
                ));
            }

            if root {
                let md = lock(&md);
                ctx.dev_dep_fragments = md
                    .app_deps
                    .values()
                    .filter_map(|r| r.dev_dep_fragment_path.clone())
                    .filter(|p| !p.is_empty())
                    .collect();
            }

            // Before the app compiles.
            compile_app_foundations(foundations, ctx, None)?;

            let result = app
                .compile(ctx)
                .map_err(|e| Error::provider("compiling", &ctx.application.name, e))?;

            // After the app compiles, with what the app told us.
            let app_config = result.as_ref().map(|r| r.foundation_config.clone());
            compile_app_foundations(foundations, ctx, app_config)?;

            let mut md = lock(&md);
            if root {
                md.app = result;
            } else if let Some(result) = result {
                md.app_deps.insert(ctx.shared.appfile.id.clone(), result);
            }
            Ok(())
        })?;

        self.store_apps()?;

        let md = md.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.metadata.save(md)
    }

    /// Record every application in the directory, each dependency before
    /// anything that depends on it.
    fn store_apps(&self) -> Result<()> {
        let graph = &self.compiled.graph;
        for vertex in graph.leaves_first() {
            let record = directory::App::from_vertex(graph, vertex)?;
            self.dir.put_app(&record.lookup, &record).map_err(|e| {
                Error::Directory(format!("storing '{}': {}", record.lookup, e))
            })?;
        }
        Ok(())
    }
}

/// Compile each foundation into the app's foundation directory.
fn compile_app_foundations(
    foundations: &[FoundationPair],
    ctx: &app::Context,
    app_config: Option<FoundationConfig>,
) -> Result<()> {
    for (f, base) in foundations {
        let mut fctx = base.clone();
        fctx.dir = ctx.dir.join(format!("foundation-{}", base.tuple.component));
        fctx.app_config = app_config.clone();

        f.compile(&fctx)
            .map_err(|e| Error::provider("compiling", &fctx.tuple.component, e))?;

        for sub in APP_SUBDIRS {
            fsutil::ensure_dir(&fctx.dir.join(sub))?;
        }
    }
    Ok(())
}
