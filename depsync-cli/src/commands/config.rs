//! `depsync config` — create or print the configuration file.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use depsync_core::{config, SyncConfig};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a config file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration, token redacted.
    Show,
}

pub fn run(cmd: ConfigCommand, path: &Path) -> Result<()> {
    match cmd {
        ConfigCommand::Init { force } => init(path, force),
        ConfigCommand::Show => show(path),
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "config already exists at '{}'; pass --force to overwrite",
            path.display()
        );
    }
    config::save_to(path, &SyncConfig::default())
        .with_context(|| format!("failed to write config '{}'", path.display()))?;
    println!("✓ Wrote default config to {}", path.display());
    Ok(())
}

fn show(path: &Path) -> Result<()> {
    let mut config = config::load_from(path)
        .with_context(|| format!("failed to load config '{}'", path.display()))?;
    config.apply_env();
    config.airtable.token = redact(&config.airtable.token);
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

fn redact(token: &str) -> String {
    if token.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}
