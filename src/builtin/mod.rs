//! Built-in providers: the `local` infrastructure and the `script` app type.
//!
//! They let the `rigging` binary run a whole pipeline on one machine
//! without external plugins.

pub mod local;
pub mod script;
pub mod shell;

use crate::app::App;
use crate::foundation::Foundation;
use crate::infrastructure::Infrastructure;
use crate::plugin::{Registry, Tuple};

pub use local::LocalInfra;
pub use script::ScriptApp;

/// The three provider registries a core is built from.
pub struct Registries {
    pub apps: Registry<Tuple, dyn App>,
    pub infrastructures: Registry<String, dyn Infrastructure>,
    pub foundations: Registry<Tuple, dyn Foundation>,
}

/// Registries holding every built-in provider.
pub fn registries() -> Registries {
    let mut apps: Registry<Tuple, dyn App> = Registry::new("app");
    apps.register(
        Tuple::new(script::APP_TYPE, local::INFRA_TYPE, local::FLAVOR),
        || Ok(Box::new(ScriptApp)),
    );

    let mut infrastructures: Registry<String, dyn Infrastructure> =
        Registry::new("infrastructure");
    infrastructures.register(local::INFRA_TYPE.to_string(), || Ok(Box::new(LocalInfra)));

    Registries {
        apps,
        infrastructures,
        foundations: Registry::new("foundation"),
    }
}
