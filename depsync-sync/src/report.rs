//! Per-table, per-record outcome of a run.

use serde::Serialize;

use depsync_core::{ExternalId, RemoteId, TableKind};

use crate::error::BuildError;

/// Where a row ended up after the apply phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalState {
    Unchanged,
    Changed,
    New,
    Deleted,
    Unmatched,
}

impl std::fmt::Display for FinalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinalState::Unchanged => write!(f, "unchanged"),
            FinalState::Changed => write!(f, "changed"),
            FinalState::New => write!(f, "new"),
            FinalState::Deleted => write!(f, "deleted"),
            FinalState::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// One row's outcome. `failure` is set when the remote call for it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub external_id: Option<ExternalId>,
    pub remote_id: Option<RemoteId>,
    pub state: FinalState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RecordReport {
    pub fn ok(external_id: Option<ExternalId>, remote_id: Option<RemoteId>, state: FinalState) -> Self {
        Self {
            external_id,
            remote_id,
            state,
            failure: None,
        }
    }

    pub fn failed(
        external_id: Option<ExternalId>,
        remote_id: Option<RemoteId>,
        state: FinalState,
        failure: impl ToString,
    ) -> Self {
        Self {
            external_id,
            remote_id,
            state,
            failure: Some(failure.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// An entity left out of the run because a link could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub external_id: ExternalId,
    pub reason: String,
}

impl From<BuildError> for SkippedRecord {
    fn from(err: BuildError) -> Self {
        Self {
            reason: err.to_string(),
            external_id: err.from_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub kind: TableKind,
    pub table: String,
    pub records: Vec<RecordReport>,
    pub skipped: Vec<SkippedRecord>,
}

impl TableReport {
    pub fn new(kind: TableKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Rows that reached `state` without a failure.
    pub fn count(&self, state: FinalState) -> usize {
        self.records
            .iter()
            .filter(|r| r.state == state && !r.is_failed())
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordReport> {
        self.records.iter().filter(|r| r.is_failed())
    }

    pub fn find(&self, ext: &ExternalId) -> Option<&RecordReport> {
        self.records
            .iter()
            .find(|r| r.external_id.as_ref() == Some(ext))
    }
}

/// Totals across every table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub unchanged: usize,
    pub changed: usize,
    pub new: usize,
    pub deleted: usize,
    pub unmatched: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub dry_run: bool,
    pub destroy_invalid_records: bool,
    pub tables: Vec<TableReport>,
}

impl SyncReport {
    pub fn table(&self, kind: TableKind) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.kind == kind)
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for table in &self.tables {
            summary.unchanged += table.count(FinalState::Unchanged);
            summary.changed += table.count(FinalState::Changed);
            summary.new += table.count(FinalState::New);
            summary.deleted += table.count(FinalState::Deleted);
            summary.unmatched += table.count(FinalState::Unmatched);
            summary.failed += table.failures().count();
            summary.skipped += table.skipped.len();
        }
        summary
    }

    /// Remote calls that failed, across every table.
    pub fn failure_count(&self) -> usize {
        self.tables.iter().map(|t| t.failures().count()).sum()
    }

    /// `true` if any remote call failed or any entity was skipped.
    pub fn has_problems(&self) -> bool {
        let summary = self.summary();
        summary.failed > 0 || summary.skipped > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_rows_are_counted_apart_from_their_state() {
        let mut table = TableReport::new(TableKind::Account, "Accounts");
        table.records.push(RecordReport::ok(
            Some("a".into()),
            Some("rec1".into()),
            FinalState::New,
        ));
        table.records.push(RecordReport::failed(
            Some("b".into()),
            None,
            FinalState::New,
            "HTTP 422",
        ));
        table.records.push(RecordReport::ok(
            Some("c".into()),
            Some("rec3".into()),
            FinalState::Unmatched,
        ));
        let report = SyncReport {
            dry_run: false,
            destroy_invalid_records: false,
            tables: vec![table],
        };

        let summary = report.summary();
        assert_eq!(summary.new, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(report.failure_count(), 1);
        assert!(report.has_problems());
        assert_eq!(
            report
                .table(TableKind::Account)
                .and_then(|t| t.find(&"b".into()))
                .and_then(|r| r.failure.as_deref()),
            Some("HTTP 422")
        );
    }

    #[test]
    fn skipped_record_keeps_the_offending_entity() {
        let skipped = SkippedRecord::from(BuildError {
            from: TableKind::Issue,
            from_id: "issue-1".into(),
            kind: TableKind::Repository,
            external_id: "repo-x".into(),
        });
        assert_eq!(skipped.external_id, ExternalId::from("issue-1"));
        assert!(skipped.reason.contains("repository 'repo-x'"));
    }

    #[test]
    fn serializes_states_lowercase() {
        let json = serde_json::to_value(RecordReport::ok(None, None, FinalState::Deleted)).unwrap();
        assert_eq!(json["state"], "deleted");
        assert!(json.get("failure").is_none());
    }
}
