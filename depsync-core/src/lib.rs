//! depsync core library — identity types, graph model, targets, configuration.
//!
//! - [`types`] — `ExternalId`, `RemoteId`, `TableKind`, `SyncState`
//! - [`model`] — the issue graph handed over by the collector
//! - [`target`] — target selectors and graph filtering
//! - [`graph`] — snapshot loading
//! - [`config`] — YAML configuration with environment overrides
//! - [`error`] — [`ConfigError`], [`GraphError`]

pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod target;
pub mod types;

pub use config::{AirtableConfig, SyncConfig, TableNames};
pub use error::{ConfigError, GraphError};
pub use model::{Account, Issue, IssueState, Label, Milestone, Provider, ProviderDriver, Repository};
pub use target::Target;
pub use types::{ExternalId, RemoteId, SyncState, TableKind};
