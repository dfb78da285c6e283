//! # depsync-sync
//!
//! Reconciliation engine: projects the local dependency graph into a remote
//! tabular store, one table per [`TableKind`](depsync_core::TableKind).
//!
//! A run goes through these stages:
//!
//! 1. [`dedup`] collapses the graph into one [`DesiredSet`] per kind.
//! 2. [`cache`] lists every remote table up front.
//! 3. For each kind in dependency order, [`classify`] builds record bodies
//!    with [`builder`] and matches them against the cache, then
//!    [`reconcile`] issues the creates, updates and deletes.
//!
//! Call [`pipeline::run`] with any [`RemoteStore`], or
//! [`pipeline::run_airtable`] to build the HTTP client from configuration.

pub mod builder;
pub mod cache;
pub mod classify;
pub mod dedup;
pub mod error;
pub mod feature;
pub mod limiter;
pub mod pipeline;
pub mod reconcile;
pub mod record;
pub mod report;
pub mod store;

pub use cache::{RemoteCache, RemoteTable};
pub use classify::{classify, Classification};
pub use dedup::{DesiredSet, DesiredState};
pub use error::{BuildError, StoreError, SyncError};
pub use feature::Feature;
pub use limiter::RateLimiter;
pub use pipeline::{run, run_airtable, run_desired, SyncOptions};
pub use reconcile::Reconciler;
pub use record::{FieldValue, RecordFields, RemoteRecord};
pub use report::{FinalState, RecordReport, SkippedRecord, Summary, SyncReport, TableReport};
pub use store::{AirtableStore, MemoryStore, PlanStore, RemoteStore};
