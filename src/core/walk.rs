//! Fail-fast walk over the compiled graph with a fresh provider per vertex.

use super::Core;
use crate::app::{self, App};
use crate::appfile::Vertex;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

impl Core {
    /// Visit every application, dependencies first.
    ///
    /// The visitor gets the vertex's provider, its context and whether it
    /// is the root. Once any visit fails, vertices that have not started
    /// yet return without calling the visitor; visits already running are
    /// left to finish. The failing visit's error is returned.
    pub(crate) fn walk<F>(&self, visitor: F) -> Result<()>
    where
        F: Fn(&dyn App, &mut app::Context, bool) -> Result<()> + Sync,
    {
        let root_id = self.compiled.graph.root().id();
        let stop = AtomicBool::new(false);

        self.compiled.graph.walk(self.parallelism, |vertex| {
            if stop.load(Ordering::SeqCst) {
                return Ok(());
            }

            let result = self.visit(vertex, vertex.id() == root_id, &visitor);
            if result.is_err() {
                stop.store(true, Ordering::SeqCst);
            }
            result
        })
    }

    fn visit<F>(&self, vertex: &Vertex, root: bool, visitor: &F) -> Result<()>
    where
        F: Fn(&dyn App, &mut app::Context, bool) -> Result<()>,
    {
        debug!("core walking app: {}", vertex.name());

        let mut ctx = self
            .app_context(&vertex.file)
            .map_err(|e| Error::vertex("loading appfile", vertex.name(), e))?;
        let app = self
            .app_impl(&ctx)
            .map_err(|e| Error::vertex("loading app implementation", vertex.name(), e))?;
        visitor(&*app, &mut ctx, root)
    }
}
