//! Matches desired entities against cached rows of the same kind.

use depsync_core::{ExternalId, SyncState, TableKind};

use crate::builder::build_record;
use crate::cache::RemoteCache;
use crate::dedup::DesiredSet;
use crate::error::BuildError;
use crate::record::{fields_equal, RecordFields};

/// A desired entity with no remote row yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCreate {
    pub external_id: ExternalId,
    pub fields: RecordFields,
}

/// A matched row whose synchronized fields differ from the desired ones.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    /// Position of the row in its [`RemoteTable`](crate::cache::RemoteTable).
    pub position: usize,
    pub fields: RecordFields,
}

/// Outcome of classifying one kind.
///
/// Matched rows carry their new state in the cache; rows still `Unmatched`
/// after classification are deletion candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: TableKind,
    pub creates: Vec<PendingCreate>,
    pub updates: Vec<PendingUpdate>,
    pub unchanged: usize,
    /// Entities whose links could not be resolved; left out of this run.
    pub skipped: Vec<BuildError>,
}

impl Classification {
    fn new(kind: TableKind) -> Self {
        Self {
            kind,
            creates: Vec::new(),
            updates: Vec::new(),
            unchanged: 0,
            skipped: Vec::new(),
        }
    }
}

/// Classify every entity of `desired` against the `kind` table of `cache`.
///
/// Every kind `kind` links to must already be reconciled in `cache`.
pub fn classify(kind: TableKind, desired: &DesiredSet, cache: &mut RemoteCache) -> Classification {
    let built: Vec<(ExternalId, Result<RecordFields, BuildError>)> = desired
        .iter()
        .map(|(ext, feature)| (ext.clone(), build_record(feature, cache)))
        .collect();

    let mut result = Classification::new(kind);
    let table = cache.table_entry(kind);
    for (ext, fields) in built {
        let fields = match fields {
            Ok(fields) => fields,
            Err(err) => {
                tracing::warn!("skipping {kind} '{ext}': {err}");
                if let Some(record) = table
                    .position(&ext)
                    .and_then(|position| table.get_mut_at(position))
                {
                    record.state = SyncState::Skipped;
                }
                result.skipped.push(err);
                continue;
            }
        };

        let Some(position) = table.position(&ext) else {
            result.creates.push(PendingCreate {
                external_id: ext,
                fields,
            });
            continue;
        };
        let Some(record) = table.get_mut_at(position) else {
            continue;
        };
        if fields_equal(&fields, &record.fields) {
            record.state = SyncState::Unchanged;
            result.unchanged += 1;
        } else {
            record.stage(&fields);
            record.state = SyncState::Changed;
            result.updates.push(PendingUpdate { position, fields });
        }
    }
    result
}
