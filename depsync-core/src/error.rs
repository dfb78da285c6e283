//! Error types for depsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can arise while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// Base id or token is empty; nothing can be fetched without them.
    #[error("missing airtable {0}; set it in the config file, the environment or with a flag")]
    MissingCredentials(&'static str),

    /// A target selector could not be parsed.
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },
}

/// Errors that can arise while loading a dependency graph snapshot.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error, with the offending file.
    #[error("failed to parse graph at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
