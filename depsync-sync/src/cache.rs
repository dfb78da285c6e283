//! Per-run snapshot of the remote tables.
//!
//! [`RemoteCache`] owns one [`RemoteTable`] per kind. It is filled once at the
//! start of a run, then written back to by the reconciler as rows are created
//! and deleted, so later kinds resolve links against post-creation state.
//! Nothing in it outlives the run.

use std::collections::{BTreeMap, HashMap, HashSet};

use depsync_core::{ExternalId, RemoteId, TableKind, TableNames};

use crate::error::SyncError;
use crate::record::RemoteRecord;
use crate::store::RemoteStore;

// ---------------------------------------------------------------------------
// RemoteTable
// ---------------------------------------------------------------------------

/// Rows of one remote table plus an external-id index.
#[derive(Debug, Clone)]
pub struct RemoteTable {
    kind: TableKind,
    name: String,
    records: Vec<RemoteRecord>,
    index: HashMap<ExternalId, usize>,
}

impl RemoteTable {
    pub fn new(kind: TableKind, name: impl Into<String>, records: Vec<RemoteRecord>) -> Self {
        let mut table = Self {
            kind,
            name: name.into(),
            records,
            index: HashMap::new(),
        };
        table.reindex();
        table
    }

    pub fn empty(kind: TableKind, name: impl Into<String>) -> Self {
        Self::new(kind, name, Vec::new())
    }

    /// Rebuild the index. Only the first row per external id is indexed;
    /// duplicates and rows without an id stay unmatched.
    fn reindex(&mut self) {
        self.index.clear();
        for (pos, record) in self.records.iter().enumerate() {
            let Some(ext) = record.external_id() else {
                tracing::debug!("{} row {} has no external id", self.name, record.id);
                continue;
            };
            if self.index.contains_key(&ext) {
                tracing::warn!(
                    "{} has several rows for {ext}; extra row {} will not be matched",
                    self.name,
                    record.id
                );
                continue;
            }
            self.index.insert(ext, pos);
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RemoteRecord] {
        &self.records
    }

    pub fn position(&self, ext: &ExternalId) -> Option<usize> {
        self.index.get(ext).copied()
    }

    pub fn get(&self, ext: &ExternalId) -> Option<&RemoteRecord> {
        self.position(ext).map(|pos| &self.records[pos])
    }

    pub fn get_mut_at(&mut self, pos: usize) -> Option<&mut RemoteRecord> {
        self.records.get_mut(pos)
    }

    /// Remote id of the row matching `ext`, if any.
    pub fn remote_id(&self, ext: &ExternalId) -> Option<&RemoteId> {
        self.get(ext).map(|r| &r.id)
    }

    /// Append a row and index it. Returns its position.
    pub fn push(&mut self, record: RemoteRecord) -> usize {
        let pos = self.records.len();
        if let Some(ext) = record.external_id() {
            self.index.entry(ext).or_insert(pos);
        }
        self.records.push(record);
        pos
    }

    /// Drop rows whose remote id is in `ids`. Returns how many were removed.
    pub fn remove_ids(&mut self, ids: &HashSet<RemoteId>) -> usize {
        let before = self.records.len();
        self.records.retain(|r| !ids.contains(&r.id));
        let removed = before - self.records.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }
}

// ---------------------------------------------------------------------------
// RemoteCache
// ---------------------------------------------------------------------------

/// One [`RemoteTable`] per kind for the duration of a run.
#[derive(Debug, Clone, Default)]
pub struct RemoteCache {
    tables: BTreeMap<TableKind, RemoteTable>,
}

impl RemoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// List every kind. Any failure aborts: there is no partial baseline.
    pub fn fetch_all<S: RemoteStore + ?Sized>(
        store: &S,
        names: &TableNames,
    ) -> Result<Self, SyncError> {
        let mut cache = Self::new();
        for kind in TableKind::all() {
            cache.fetch(store, *kind, names.name(*kind))?;
        }
        Ok(cache)
    }

    /// List one table and replace whatever was cached for `kind`.
    pub fn fetch<S: RemoteStore + ?Sized>(
        &mut self,
        store: &S,
        kind: TableKind,
        name: &str,
    ) -> Result<(), SyncError> {
        let records = store.list(name).map_err(|source| SyncError::Fetch {
            kind,
            table: name.to_string(),
            source,
        })?;
        tracing::debug!("fetched {} rows from '{name}'", records.len());
        self.insert(RemoteTable::new(kind, name, records));
        Ok(())
    }

    pub fn insert(&mut self, table: RemoteTable) {
        self.tables.insert(table.kind(), table);
    }

    pub fn table(&self, kind: TableKind) -> Option<&RemoteTable> {
        self.tables.get(&kind)
    }

    pub fn table_mut(&mut self, kind: TableKind) -> Option<&mut RemoteTable> {
        self.tables.get_mut(&kind)
    }

    /// The `kind` table, created empty if it was never fetched.
    pub fn table_entry(&mut self, kind: TableKind) -> &mut RemoteTable {
        self.tables
            .entry(kind)
            .or_insert_with(|| RemoteTable::empty(kind, kind.to_string()))
    }

    /// Remote id currently known for `ext` in the `kind` table.
    pub fn resolve(&self, kind: TableKind, ext: &ExternalId) -> Option<&RemoteId> {
        self.table(kind).and_then(|t| t.remote_id(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, RecordFields, EXTERNAL_ID_FIELD};
    use crate::store::MemoryStore;

    fn row(id: &str, ext: Option<&str>) -> RemoteRecord {
        let mut fields = RecordFields::new();
        if let Some(ext) = ext {
            fields.insert(EXTERNAL_ID_FIELD.to_string(), FieldValue::from(ext));
        }
        RemoteRecord::fetched(id.into(), fields)
    }

    #[test]
    fn index_finds_rows_by_external_id() {
        let table = RemoteTable::new(
            TableKind::Account,
            "Accounts",
            vec![row("rec1", Some("a")), row("rec2", Some("b"))],
        );
        assert_eq!(table.position(&"b".into()), Some(1));
        assert_eq!(table.remote_id(&"a".into()), Some(&RemoteId::from("rec1")));
        assert!(table.get(&"zz".into()).is_none());
    }

    #[test]
    fn duplicates_and_anonymous_rows_are_not_indexed() {
        let table = RemoteTable::new(
            TableKind::Account,
            "Accounts",
            vec![row("rec1", Some("a")), row("rec2", Some("a")), row("rec3", None)],
        );
        assert_eq!(table.len(), 3);
        assert_eq!(table.remote_id(&"a".into()), Some(&RemoteId::from("rec1")));
    }

    #[test]
    fn push_indexes_new_rows() {
        let mut table = RemoteTable::empty(TableKind::Label, "Labels");
        let pos = table.push(row("rec7", Some("bug")));
        assert_eq!(pos, 0);
        assert_eq!(table.remote_id(&"bug".into()), Some(&RemoteId::from("rec7")));
    }

    #[test]
    fn remove_ids_reindexes() {
        let mut table = RemoteTable::new(
            TableKind::Label,
            "Labels",
            vec![row("rec1", Some("a")), row("rec2", Some("b"))],
        );
        let removed = table.remove_ids(&HashSet::from([RemoteId::from("rec1")]));
        assert_eq!(removed, 1);
        assert!(table.get(&"a".into()).is_none());
        assert_eq!(table.position(&"b".into()), Some(0));
    }

    #[test]
    fn fetch_all_loads_every_kind() {
        let names = TableNames::default();
        let store = MemoryStore::new();
        store.seed(names.name(TableKind::Provider), vec![row("rec1", Some("gh"))]);

        let cache = RemoteCache::fetch_all(&store, &names).expect("fetch");
        for kind in TableKind::all() {
            assert!(cache.table(*kind).is_some(), "{kind} not fetched");
        }
        assert_eq!(
            cache.resolve(TableKind::Provider, &"gh".into()),
            Some(&RemoteId::from("rec1"))
        );
    }

    #[test]
    fn fetch_failure_names_the_table() {
        let names = TableNames::default();
        let store = MemoryStore::new();
        store.fail_list(names.name(TableKind::Milestone));

        let err = RemoteCache::fetch_all(&store, &names).unwrap_err();
        match err {
            SyncError::Fetch { kind, table, .. } => {
                assert_eq!(kind, TableKind::Milestone);
                assert_eq!(table, "Milestones");
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
