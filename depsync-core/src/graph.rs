//! Loading dependency-graph snapshots written by the collection subsystem.
//!
//! A snapshot is either a bare JSON array of issues or an object with an
//! `issues` array (plus whatever metadata the collector adds).

use std::path::Path;

use serde::Deserialize;

use crate::error::GraphError;
use crate::model::Issue;
use crate::target::{filter_by_targets, Target};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotCompat {
    Wrapped { issues: Vec<Issue> },
    Bare(Vec<Issue>),
}

/// Parse a snapshot from a JSON string.
pub fn parse(contents: &str, path: &Path) -> Result<Vec<Issue>, GraphError> {
    let snapshot: SnapshotCompat =
        serde_json::from_str(contents).map_err(|e| GraphError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(match snapshot {
        SnapshotCompat::Wrapped { issues } => issues,
        SnapshotCompat::Bare(issues) => issues,
    })
}

/// Read and parse the snapshot at `path`.
pub fn load_from(path: &Path) -> Result<Vec<Issue>, GraphError> {
    let contents = std::fs::read_to_string(path).map_err(|e| GraphError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(&contents, path)
}

/// Read the snapshot at `path` and keep only the issues selected by `targets`.
pub fn load_filtered(path: &Path, targets: &[Target]) -> Result<Vec<Issue>, GraphError> {
    Ok(filter_by_targets(load_from(path)?, targets))
}
