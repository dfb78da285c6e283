//! Error types for depsync-sync.

use thiserror::Error;

use depsync_core::{ConfigError, ExternalId, TableKind};

/// Fatal errors: the run stops and nothing after the failure point is applied.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing credentials or another configuration problem.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A table could not be listed; reconciliation needs a complete baseline.
    #[error("failed to fetch {kind} table '{table}': {source}")]
    Fetch {
        kind: TableKind,
        table: String,
        #[source]
        source: StoreError,
    },
}

/// Failure of a single call against the remote store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-retryable HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Retryable failures persisted past the retry budget.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// Injected or otherwise synthetic rejection (in-memory store).
    #[error("rejected: {0}")]
    Rejected(String),
}

/// A record body could not be built because a link target has no remote row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unresolved reference from {from} '{from_id}' to {kind} '{external_id}'")]
pub struct BuildError {
    /// Kind of the record being built.
    pub from: TableKind,
    pub from_id: ExternalId,
    /// Kind and id of the missing target.
    pub kind: TableKind,
    pub external_id: ExternalId,
}
