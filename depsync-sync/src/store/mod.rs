//! The remote tabular store seam.
//!
//! - [`AirtableStore`] — HTTP client for the real service
//! - [`PlanStore`] — dry-run wrapper: reads through, never writes
//! - [`MemoryStore`] — in-process store with call recording and failure injection

mod airtable;
mod memory;
mod plan;

pub use airtable::{AirtableStore, API_BASE};
pub use memory::{MemoryStore, StoreCall};
pub use plan::PlanStore;

use depsync_core::RemoteId;

use crate::error::StoreError;
use crate::record::{RecordFields, RemoteRecord};

/// Operations the reconciler needs from a remote table service.
///
/// Each call is bounded by the implementation's own timeout and retry policy;
/// an `Err` is final for that call.
pub trait RemoteStore {
    /// Every row of `table`.
    fn list(&self, table: &str) -> Result<Vec<RemoteRecord>, StoreError>;

    /// Create a row and return the id the store assigned to it.
    fn create(&self, table: &str, fields: &RecordFields) -> Result<RemoteId, StoreError>;

    /// Overwrite the given fields of an existing row.
    fn update(&self, table: &str, id: &RemoteId, fields: &RecordFields) -> Result<(), StoreError>;

    fn delete(&self, table: &str, id: &RemoteId) -> Result<(), StoreError>;
}

impl<S: RemoteStore + ?Sized> RemoteStore for &S {
    fn list(&self, table: &str) -> Result<Vec<RemoteRecord>, StoreError> {
        (**self).list(table)
    }

    fn create(&self, table: &str, fields: &RecordFields) -> Result<RemoteId, StoreError> {
        (**self).create(table, fields)
    }

    fn update(&self, table: &str, id: &RemoteId, fields: &RecordFields) -> Result<(), StoreError> {
        (**self).update(table, id, fields)
    }

    fn delete(&self, table: &str, id: &RemoteId) -> Result<(), StoreError> {
        (**self).delete(table, id)
    }
}
