//! `depsync graph` — inspect a graph snapshot without touching the remote store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use depsync_core::{graph, Target};

#[derive(Subcommand, Debug)]
pub enum GraphCommand {
    /// Print the issues selected by the targets as JSON.
    Dump(DumpArgs),
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Targets to keep; everything is kept when omitted.
    pub targets: Vec<String>,

    /// Graph snapshot written by the collector.
    #[arg(long, short = 'g', value_name = "FILE")]
    pub graph: PathBuf,
}

pub fn run(cmd: GraphCommand) -> Result<()> {
    match cmd {
        GraphCommand::Dump(args) => dump(args),
    }
}

fn dump(args: DumpArgs) -> Result<()> {
    let targets = Target::parse_all(&args.targets)?;
    let issues = graph::load_filtered(&args.graph, &targets)
        .with_context(|| format!("failed to load graph '{}'", args.graph.display()))?;
    println!("{}", serde_json::to_string_pretty(&issues)?);
    Ok(())
}
