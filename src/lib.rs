//! Rigging — deployment orchestration across pluggable infrastructure,
//! foundation and app providers.
//!
//! A compiled appfile graph goes through compile, plan, build, deploy and
//! dev. The [`Core`](crate::core::Core) drives those stages; providers are resolved per
//! call from registries keyed by (component, infra type, infra flavor).

pub mod app;
pub mod appfile;
pub mod builtin;
pub mod cli;
pub mod context;
pub mod core;
pub mod directory;
pub mod error;
pub mod foundation;
pub mod fsutil;
pub mod infrastructure;
pub mod localaddr;
pub mod plan;
pub mod plugin;
pub mod ui;

pub use error::{Error, Result};
