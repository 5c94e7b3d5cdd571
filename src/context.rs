//! Data shared by every provider context.

use crate::appfile::File;
use crate::directory::Backend;
use crate::ui::Ui;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Infrastructure credentials, keyed by name.
pub type Credentials = BTreeMap<String, String>;

/// References common to infra, foundation and app contexts.
///
/// Cloning is cheap; the directory backend and UI are shared read-only.
#[derive(Clone)]
pub struct Shared {
    /// The appfile this context targets
    pub appfile: Arc<File>,

    /// Output directory of each foundation, aligned with the foundation
    /// contexts built for the same infrastructure
    pub foundation_dirs: Vec<PathBuf>,

    /// Where provider-managed binaries are installed
    pub install_dir: PathBuf,

    /// Directory backend
    pub directory: Arc<dyn Backend>,

    /// User interface
    pub ui: Arc<dyn Ui>,

    /// Infrastructure credentials, when fetched
    pub infra_creds: Credentials,
}
