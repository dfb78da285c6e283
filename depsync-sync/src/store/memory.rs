use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use depsync_core::{ExternalId, RemoteId};

use crate::error::StoreError;
use crate::record::{external_id_of, RecordFields, RemoteRecord};
use crate::store::RemoteStore;

/// A call received by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    List {
        table: String,
    },
    Create {
        table: String,
        fields: RecordFields,
    },
    Update {
        table: String,
        id: RemoteId,
        fields: RecordFields,
    },
    Delete {
        table: String,
        id: RemoteId,
    },
}

impl StoreCall {
    pub fn table(&self) -> &str {
        match self {
            StoreCall::List { table }
            | StoreCall::Create { table, .. }
            | StoreCall::Update { table, .. }
            | StoreCall::Delete { table, .. } => table,
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, StoreCall::List { .. })
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, Vec<RemoteRecord>>,
    calls: Vec<StoreCall>,
    next_id: u64,
    failing_lists: HashSet<String>,
    failing_records: HashSet<(String, ExternalId)>,
}

/// In-process remote store.
///
/// Assigns `rec<N>` ids, drops blank fields the way the hosted service does,
/// records every call, and fails on demand.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the rows of `table`.
    pub fn seed(&self, table: &str, records: Vec<RemoteRecord>) {
        self.lock().tables.insert(table.to_string(), records);
    }

    /// Current rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<RemoteRecord> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Row of `table` whose external id is `ext`.
    pub fn find(&self, table: &str, ext: &ExternalId) -> Option<RemoteRecord> {
        self.rows(table)
            .into_iter()
            .find(|r| r.external_id().as_ref() == Some(ext))
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Creates, updates and deletes, in the order they were received.
    pub fn mutations(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make every `list` of `table` fail.
    pub fn fail_list(&self, table: &str) {
        self.lock().failing_lists.insert(table.to_string());
    }

    /// Make creates, updates and deletes of the `ext` row in `table` fail.
    pub fn fail_record(&self, table: &str, ext: impl Into<ExternalId>) {
        self.lock()
            .failing_records
            .insert((table.to_string(), ext.into()));
    }

    pub fn heal(&self) {
        let mut inner = self.lock();
        inner.failing_lists.clear();
        inner.failing_records.clear();
    }
}

fn without_blanks(fields: &RecordFields) -> RecordFields {
    fields
        .iter()
        .filter(|(_, v)| !v.is_blank())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

impl Inner {
    fn reject_if_failing(&self, table: &str, ext: Option<ExternalId>) -> Result<(), StoreError> {
        match ext {
            Some(ext) if self.failing_records.contains(&(table.to_string(), ext.clone())) => Err(
                StoreError::Rejected(format!("injected failure for {ext} in '{table}'")),
            ),
            _ => Ok(()),
        }
    }

    fn external_id_at(&self, table: &str, id: &RemoteId) -> Option<ExternalId> {
        self.tables
            .get(table)
            .and_then(|rows| rows.iter().find(|r| &r.id == id))
            .and_then(RemoteRecord::external_id)
    }
}

impl RemoteStore for MemoryStore {
    fn list(&self, table: &str) -> Result<Vec<RemoteRecord>, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::List {
            table: table.to_string(),
        });
        if inner.failing_lists.contains(table) {
            return Err(StoreError::Rejected(format!("injected list failure for '{table}'")));
        }
        Ok(inner.tables.get(table).cloned().unwrap_or_default())
    }

    fn create(&self, table: &str, fields: &RecordFields) -> Result<RemoteId, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Create {
            table: table.to_string(),
            fields: fields.clone(),
        });
        inner.reject_if_failing(table, external_id_of(fields))?;

        inner.next_id += 1;
        let id = RemoteId(format!("rec{}", inner.next_id));
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .push(RemoteRecord::fetched(id.clone(), without_blanks(fields)));
        Ok(id)
    }

    fn update(&self, table: &str, id: &RemoteId, fields: &RecordFields) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Update {
            table: table.to_string(),
            id: id.clone(),
            fields: fields.clone(),
        });
        let ext = inner.external_id_at(table, id);
        inner.reject_if_failing(table, ext)?;

        let row = inner
            .tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| &r.id == id))
            .ok_or_else(|| StoreError::Status {
                status: 404,
                body: format!("no row {id} in '{table}'"),
            })?;
        for (name, value) in fields {
            if value.is_blank() {
                row.fields.remove(name);
            } else {
                row.fields.insert(name.clone(), value.clone());
            }
        }
        Ok(())
    }

    fn delete(&self, table: &str, id: &RemoteId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Delete {
            table: table.to_string(),
            id: id.clone(),
        });
        let ext = inner.external_id_at(table, id);
        inner.reject_if_failing(table, ext)?;

        let rows = inner.tables.entry(table.to_string()).or_default();
        let before = rows.len();
        rows.retain(|r| &r.id != id);
        if rows.len() == before {
            return Err(StoreError::Status {
                status: 404,
                body: format!("no row {id} in '{table}'"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, EXTERNAL_ID_FIELD};

    fn body(ext: &str, name: &str) -> RecordFields {
        RecordFields::from([
            (EXTERNAL_ID_FIELD.to_string(), FieldValue::from(ext)),
            ("Name".to_string(), FieldValue::from(name)),
            ("Is Fork".to_string(), FieldValue::Bool(false)),
        ])
    }

    #[test]
    fn create_assigns_sequential_ids_and_drops_blanks() {
        let store = MemoryStore::new();
        let a = store.create("T", &body("a", "alice")).unwrap();
        let b = store.create("T", &body("b", "bob")).unwrap();
        assert_eq!(a, RemoteId::from("rec1"));
        assert_eq!(b, RemoteId::from("rec2"));

        let row = store.find("T", &"a".into()).expect("row");
        assert!(!row.fields.contains_key("Is Fork"));
        assert_eq!(row.fields["Name"], FieldValue::from("alice"));
    }

    #[test]
    fn update_patches_and_clears_blank_fields() {
        let store = MemoryStore::new();
        let id = store.create("T", &body("a", "alice")).unwrap();
        let patch = RecordFields::from([
            ("Name".to_string(), FieldValue::from("")),
            ("Login".to_string(), FieldValue::from("al")),
        ]);
        store.update("T", &id, &patch).unwrap();

        let row = store.find("T", &"a".into()).unwrap();
        assert!(!row.fields.contains_key("Name"));
        assert_eq!(row.fields["Login"], FieldValue::from("al"));
    }

    #[test]
    fn injected_failures_hit_only_their_record() {
        let store = MemoryStore::new();
        store.fail_record("T", "b");
        assert!(store.create("T", &body("a", "alice")).is_ok());
        assert!(matches!(
            store.create("T", &body("b", "bob")),
            Err(StoreError::Rejected(_))
        ));
        assert_eq!(store.rows("T").len(), 1);
        assert_eq!(store.mutations().len(), 2);
    }

    #[test]
    fn deleting_a_missing_row_is_a_404() {
        let store = MemoryStore::new();
        let err = store.delete("T", &"rec404".into()).unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 404, .. }));
    }
}
