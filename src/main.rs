//! Rigging CLI — compile, plan, build, deploy and develop an appfile.

use clap::Parser;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "rigging",
    version,
    about = "Deployment orchestration — compile, plan, build, deploy and develop applications"
)]
struct Cli {
    #[command(flatten)]
    opts: rigging::cli::GlobalOpts,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: rigging::cli::Commands,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    if let Err(e) = rigging::cli::dispatch(cli.command, &cli.opts) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
