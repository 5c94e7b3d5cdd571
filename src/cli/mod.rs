//! CLI subcommands — validate, compile, plan, build, deploy, dev, status.

use crate::appfile::{parser, Compiled};
use crate::builtin;
use crate::core::{Core, CoreConfig, ExecuteOpts, ExecuteTask};
use crate::directory::FolderBackend;
use crate::error::{Error, Result};
use crate::plan::ExecutionPlan;
use crate::ui::{ConsoleUi, Ui};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Locations shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Compiled appfile
    #[arg(short, long, global = true, default_value = "Appfile.compiled.yaml")]
    pub appfile: PathBuf,

    /// Data shared by every appfile (default: ~/.rigging.d)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Data local to this appfile
    #[arg(long, global = true, default_value = ".rigging")]
    pub local_dir: PathBuf,

    /// Compiled output (default: <local-dir>/compiled)
    #[arg(long, global = true)]
    pub compile_dir: Option<PathBuf>,

    /// Maximum applications compiled at once (default: CPU count)
    #[arg(long, global = true)]
    pub parallelism: Option<usize>,
}

impl GlobalOpts {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".rigging.d"))
                .unwrap_or_else(|| PathBuf::from(".rigging.d"))
        })
    }

    pub fn compile_dir(&self) -> PathBuf {
        self.compile_dir
            .clone()
            .unwrap_or_else(|| self.local_dir.join("compiled"))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the compiled appfile without running any provider
    Validate,

    /// Compile the application and its dependencies
    Compile,

    /// Show what would change in the infrastructure
    Plan,

    /// Build the deployable artifact for the application
    Build,

    /// Deploy the application
    Deploy {
        /// Subaction ("info", "help", ...); empty for a plain deploy
        action: Option<String>,

        /// Subaction arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Start, or act on, the local development environment
    Dev {
        /// Subaction ("destroy", "address", ...); empty to start
        action: Option<String>,

        /// Subaction arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Show the status of every stage
    Status,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands, opts: &GlobalOpts) -> Result<()> {
    match cmd {
        Commands::Validate => cmd_validate(&opts.appfile),
        Commands::Compile => cmd_compile(opts),
        Commands::Plan => cmd_plan(opts),
        Commands::Build => open_core(opts)?.build(),
        Commands::Deploy { action, args } => {
            open_core(opts)?.deploy(action.as_deref().unwrap_or(""), &args)
        }
        Commands::Dev { action, args } => cmd_dev(opts, action, args),
        Commands::Status => open_core(opts)?.status().map(|_| ()),
    }
}

/// Parse and validate the compiled appfile.
fn parse_and_validate(file: &Path) -> Result<Compiled> {
    let compiled = parser::parse_compiled_file(file)?;
    let errors = parser::validate_compiled(&compiled);
    if errors.is_empty() {
        return Ok(compiled);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err(Error::Appfile(format!("{} validation error(s)", errors.len())))
}

/// Build a core over the built-in providers and the folder directory.
fn open_core(opts: &GlobalOpts) -> Result<Core> {
    open_core_with_ui(opts, Arc::new(ConsoleUi))
}

fn open_core_with_ui(opts: &GlobalOpts, ui: Arc<dyn Ui>) -> Result<Core> {
    let appfile = parse_and_validate(&opts.appfile)?;
    let data_dir = opts.data_dir();
    let registries = builtin::registries();

    Ok(Core::new(CoreConfig {
        directory: Arc::new(FolderBackend::new(data_dir.join("directory"))),
        data_dir,
        local_dir: opts.local_dir.clone(),
        compile_dir: opts.compile_dir(),
        appfile,
        apps: registries.apps,
        infrastructures: registries.infrastructures,
        foundations: registries.foundations,
        ui,
        address: None,
        parallelism: opts.parallelism.unwrap_or(0),
    }))
}

fn cmd_validate(file: &Path) -> Result<()> {
    let compiled = parse_and_validate(file)?;
    let root = compiled.file();
    println!(
        "OK: {} ({} application(s), infrastructure {})",
        root.application.name,
        compiled.graph.len(),
        root.project.infrastructure
    );
    Ok(())
}

fn cmd_compile(opts: &GlobalOpts) -> Result<()> {
    let core = open_core(opts)?;
    core.compile()?;
    println!();
    println!(
        "Compiled {} application(s) into {}",
        core.compiled().graph.len(),
        core.compile_dir().display()
    );
    Ok(())
}

fn cmd_plan(opts: &GlobalOpts) -> Result<()> {
    let plan = open_core(opts)?.plan()?;
    print_plan(&plan);
    Ok(())
}

/// Display a plan to stdout.
fn print_plan(plan: &ExecutionPlan) {
    if plan.is_empty() {
        println!("No changes. Infrastructure is up to date.");
        return;
    }

    for p in &plan.plans {
        println!("{}:", p.description);
        for task in &p.tasks {
            println!("  + {}", task);
        }
    }
    println!();
    println!(
        "Plan: {} plan(s), {} task(s).",
        plan.plans.len(),
        plan.task_count()
    );
}

fn cmd_dev(opts: &GlobalOpts, action: Option<String>, args: Vec<String>) -> Result<()> {
    let core = open_core(opts)?;
    match action {
        None => core.dev(),
        Some(action) => core.execute(&ExecuteOpts {
            task: ExecuteTask::Dev,
            action,
            args,
        }),
    }
}
