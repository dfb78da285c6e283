//! depsync — sync a dependency graph into Airtable.
//!
//! # Usage
//!
//! ```text
//! depsync sync --graph <file> [targets...] [--dry-run] [--json] [--airtable-* ...]
//! depsync graph dump --graph <file> [targets...]
//! depsync config init [--force]
//! depsync config show
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config::ConfigCommand, graph::GraphCommand, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "depsync",
    version,
    about = "Reconcile a local dependency graph into Airtable tables",
    long_about = None,
)]
struct Cli {
    /// Config file to use instead of ~/.depsync/config.yaml.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log every remote call (same as RUST_LOG=debug).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile the graph into the remote tables.
    Sync(SyncArgs),

    /// Inspect a graph snapshot.
    Graph {
        #[command(subcommand)]
        command: GraphCommand,
    },

    /// Create or print the configuration file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = commands::config_path(cli.config)?;
    match cli.command {
        Commands::Sync(args) => args.run(&config_path),
        Commands::Graph { command } => commands::graph::run(command),
        Commands::Config { command } => commands::config::run(command, &config_path),
    }
}

/// Logs go to stderr so `--json` output stays clean.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
