use std::sync::atomic::{AtomicU64, Ordering};

use depsync_core::RemoteId;

use crate::error::StoreError;
use crate::record::{RecordFields, RemoteRecord};
use crate::store::RemoteStore;

/// Dry-run wrapper around a real store.
///
/// Listing goes through to the wrapped store; creates hand out `planned<N>`
/// placeholder ids so dependent kinds still resolve their links, and updates
/// and deletes do nothing.
#[derive(Debug)]
pub struct PlanStore<S> {
    inner: S,
    next_id: AtomicU64,
}

impl<S: RemoteStore> PlanStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            next_id: AtomicU64::new(0),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: RemoteStore> RemoteStore for PlanStore<S> {
    fn list(&self, table: &str) -> Result<Vec<RemoteRecord>, StoreError> {
        self.inner.list(table)
    }

    fn create(&self, table: &str, _fields: &RecordFields) -> Result<RemoteId, StoreError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!("[dry-run] would create a row in '{table}'");
        Ok(RemoteId(format!("planned{n}")))
    }

    fn update(&self, table: &str, id: &RemoteId, _fields: &RecordFields) -> Result<(), StoreError> {
        tracing::info!("[dry-run] would update {id} in '{table}'");
        Ok(())
    }

    fn delete(&self, table: &str, id: &RemoteId) -> Result<(), StoreError> {
        tracing::info!("[dry-run] would delete {id} from '{table}'");
        Ok(())
    }
}
