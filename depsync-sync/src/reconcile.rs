//! Applies a [`Classification`] to the remote store.
//!
//! Creates run first and are written back into the cache as soon as the
//! store returns their id, so the next kind can link to them. Every failure
//! here is per record: it is logged, reported and the loop moves on.

use std::collections::HashSet;

use depsync_core::{RemoteId, SyncState};

use crate::cache::RemoteCache;
use crate::classify::Classification;
use crate::record::RemoteRecord;
use crate::report::{FinalState, RecordReport, SkippedRecord, TableReport};
use crate::store::RemoteStore;

/// Applies one kind at a time against `store`.
pub struct Reconciler<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    destroy_invalid_records: bool,
}

impl<'a, S: RemoteStore + ?Sized> Reconciler<'a, S> {
    /// Rows left unmatched are deleted only when `destroy_invalid_records`
    /// is set; otherwise they are reported and kept.
    pub fn new(store: &'a S, destroy_invalid_records: bool) -> Self {
        Self {
            store,
            destroy_invalid_records,
        }
    }

    /// Issue the calls for `classification` and update the cache to match.
    pub fn apply(&self, classification: Classification, cache: &mut RemoteCache) -> TableReport {
        let Classification {
            kind,
            creates,
            updates,
            skipped,
            ..
        } = classification;
        let table = cache.table_entry(kind);
        let name = table.name().to_string();
        let mut report = TableReport::new(kind, name.as_str());
        report.skipped = skipped.into_iter().map(SkippedRecord::from).collect();

        // 1. creates
        for create in creates {
            let ext = create.external_id;
            match self.store.create(&name, &create.fields) {
                Ok(id) => {
                    tracing::debug!("{name}: created {ext} as {id}");
                    let mut record = RemoteRecord::fetched(id.clone(), create.fields);
                    record.state = SyncState::New;
                    table.push(record);
                    report
                        .records
                        .push(RecordReport::ok(Some(ext), Some(id), FinalState::New));
                }
                Err(err) => {
                    tracing::warn!("{name}: failed to create {ext}: {err}");
                    report
                        .records
                        .push(RecordReport::failed(Some(ext), None, FinalState::New, err));
                }
            }
        }

        // 2. updates
        for update in updates {
            let Some(record) = table.records().get(update.position) else {
                continue;
            };
            let id = record.id.clone();
            let ext = record.external_id();
            match self.store.update(&name, &id, &update.fields) {
                Ok(()) => {
                    tracing::debug!("{name}: updated {record}");
                    report
                        .records
                        .push(RecordReport::ok(ext, Some(id), FinalState::Changed));
                }
                Err(err) => {
                    tracing::warn!("{name}: failed to update {record}: {err}");
                    report.records.push(RecordReport::failed(
                        ext,
                        Some(id),
                        FinalState::Changed,
                        err,
                    ));
                }
            }
        }

        // 3. unmatched rows
        let mut deleted: HashSet<RemoteId> = HashSet::new();
        for record in table.records() {
            if record.state != SyncState::Unmatched {
                continue;
            }
            let ext = record.external_id();
            if !self.destroy_invalid_records {
                tracing::warn!("{name}: {record} has no local counterpart; keeping it");
                report.records.push(RecordReport::ok(
                    ext,
                    Some(record.id.clone()),
                    FinalState::Unmatched,
                ));
                continue;
            }
            match self.store.delete(&name, &record.id) {
                Ok(()) => {
                    tracing::debug!("{name}: deleted {record}");
                    deleted.insert(record.id.clone());
                    report.records.push(RecordReport::ok(
                        ext,
                        Some(record.id.clone()),
                        FinalState::Deleted,
                    ));
                }
                Err(err) => {
                    tracing::warn!("{name}: failed to delete {record}: {err}");
                    report.records.push(RecordReport::failed(
                        ext,
                        Some(record.id.clone()),
                        FinalState::Unmatched,
                        err,
                    ));
                }
            }
        }
        table.remove_ids(&deleted);

        // 4. unchanged rows: no call
        for record in table.records() {
            if record.state == SyncState::Unchanged {
                tracing::debug!("{name}: {record} unchanged");
                report.records.push(RecordReport::ok(
                    record.external_id(),
                    Some(record.id.clone()),
                    FinalState::Unchanged,
                ));
            }
        }

        tracing::info!(
            "{name}: {} new, {} changed, {} deleted, {} unmatched, {} unchanged, {} failed, {} skipped",
            report.count(FinalState::New),
            report.count(FinalState::Changed),
            report.count(FinalState::Deleted),
            report.count(FinalState::Unmatched),
            report.count(FinalState::Unchanged),
            report.failures().count(),
            report.skipped.len(),
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depsync_core::{ExternalId, TableKind};

    use crate::cache::RemoteTable;
    use crate::classify::PendingCreate;
    use crate::record::{FieldValue, RecordFields, EXTERNAL_ID_FIELD};
    use crate::store::{MemoryStore, StoreCall};

    const TABLE: &str = "Labels";

    fn fields(ext: &str, name: &str) -> RecordFields {
        RecordFields::from([
            (EXTERNAL_ID_FIELD.to_string(), FieldValue::from(ext)),
            ("Name".to_string(), FieldValue::from(name)),
        ])
    }

    fn create(ext: &str) -> PendingCreate {
        PendingCreate {
            external_id: ext.into(),
            fields: fields(ext, ext),
        }
    }

    fn classification(creates: Vec<PendingCreate>) -> Classification {
        Classification {
            kind: TableKind::Label,
            creates,
            updates: Vec::new(),
            unchanged: 0,
            skipped: Vec::new(),
        }
    }

    fn cache_with(rows: Vec<RemoteRecord>) -> RemoteCache {
        let mut cache = RemoteCache::new();
        cache.insert(RemoteTable::new(TableKind::Label, TABLE, rows));
        cache
    }

    #[test]
    fn created_rows_become_resolvable() {
        let store = MemoryStore::new();
        let mut cache = cache_with(Vec::new());

        let report = Reconciler::new(&store, false)
            .apply(classification(vec![create("bug")]), &mut cache);

        let id = cache
            .resolve(TableKind::Label, &"bug".into())
            .cloned()
            .expect("indexed");
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].remote_id.as_ref(), Some(&id));
        assert_eq!(report.records[0].state, FinalState::New);
        assert!(store.find(TABLE, &"bug".into()).is_some());
    }

    #[test]
    fn one_failed_create_does_not_stop_the_others() {
        let store = MemoryStore::new();
        store.fail_record(TABLE, "b");
        let mut cache = cache_with(Vec::new());

        let report = Reconciler::new(&store, false).apply(
            classification(vec![create("a"), create("b"), create("c")]),
            &mut cache,
        );

        assert_eq!(report.count(FinalState::New), 2);
        let failed: Vec<&ExternalId> = report
            .failures()
            .filter_map(|r| r.external_id.as_ref())
            .collect();
        assert_eq!(failed, vec![&ExternalId::from("b")]);
        assert!(cache.resolve(TableKind::Label, &"b".into()).is_none());
        assert!(cache.resolve(TableKind::Label, &"c".into()).is_some());
    }

    #[test]
    fn unmatched_rows_are_kept_without_the_destroy_flag() {
        let store = MemoryStore::new();
        let stale = RemoteRecord::fetched("rec9".into(), fields("old", "old"));
        store.seed(TABLE, vec![stale.clone()]);
        let mut cache = cache_with(vec![stale]);

        let report = Reconciler::new(&store, false).apply(classification(vec![]), &mut cache);

        assert_eq!(report.count(FinalState::Unmatched), 1);
        assert!(store.mutations().is_empty());
        assert_eq!(cache.table(TableKind::Label).map(RemoteTable::len), Some(1));
    }

    #[test]
    fn unmatched_rows_are_deleted_with_the_destroy_flag() {
        let store = MemoryStore::new();
        let stale = RemoteRecord::fetched("rec9".into(), fields("old", "old"));
        store.seed(TABLE, vec![stale.clone()]);
        let mut cache = cache_with(vec![stale]);

        let report = Reconciler::new(&store, true).apply(classification(vec![]), &mut cache);

        assert_eq!(report.count(FinalState::Deleted), 1);
        assert_eq!(
            store.mutations(),
            vec![StoreCall::Delete {
                table: TABLE.to_string(),
                id: "rec9".into(),
            }]
        );
        assert!(store.rows(TABLE).is_empty());
        assert_eq!(cache.table(TableKind::Label).map(RemoteTable::len), Some(0));
    }

    #[test]
    fn unchanged_rows_are_reported_without_calls() {
        let store = MemoryStore::new();
        let mut row = RemoteRecord::fetched("rec1".into(), fields("bug", "bug"));
        row.state = SyncState::Unchanged;
        let mut cache = cache_with(vec![row]);

        let report = Reconciler::new(&store, true).apply(classification(vec![]), &mut cache);

        assert_eq!(report.count(FinalState::Unchanged), 1);
        assert!(store.calls().is_empty());
    }
}
