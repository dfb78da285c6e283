pub mod config;
pub mod graph;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};

/// `--config` if given, else `~/.depsync/config.yaml`.
pub fn config_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(path),
        None => {
            let home = dirs::home_dir().context("could not determine home directory")?;
            Ok(depsync_core::config::config_path_at(&home))
        }
    }
}
