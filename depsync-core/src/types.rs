//! Identity types and table kinds shared by the graph model and the sync engine.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Stable identifier assigned by the upstream provider.
///
/// Immutable and unique within its [`TableKind`]; used to match local
/// entities against remote rows across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(pub String);

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ExternalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ExternalId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque row identifier assigned by the remote store when a row is created.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(pub String);

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RemoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Entity category synchronized into its own remote table.
///
/// Variants are declared in dependency order: a kind may only hold links to
/// kinds that come before it. [`TableKind::ALL`] is the reconciliation order.
///
/// ```text
/// Provider
/// Account     -> Provider
/// Repository  -> Account, Provider
/// Label       -> Repository
/// Milestone   -> Repository, Account
/// Issue       -> every other kind
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Provider,
    Account,
    Repository,
    Label,
    Milestone,
    Issue,
}

impl TableKind {
    /// Every kind, in the order tables must be reconciled.
    pub const ALL: [TableKind; 6] = [
        TableKind::Provider,
        TableKind::Account,
        TableKind::Repository,
        TableKind::Label,
        TableKind::Milestone,
        TableKind::Issue,
    ];

    pub fn all() -> &'static [TableKind] {
        &Self::ALL
    }

    /// Kinds this kind may reference through link fields.
    pub fn dependencies(self) -> &'static [TableKind] {
        match self {
            TableKind::Provider => &[],
            TableKind::Account => &[TableKind::Provider],
            TableKind::Repository => &[TableKind::Account, TableKind::Provider],
            TableKind::Label => &[TableKind::Repository],
            TableKind::Milestone => &[TableKind::Repository, TableKind::Account],
            TableKind::Issue => &[
                TableKind::Provider,
                TableKind::Account,
                TableKind::Repository,
                TableKind::Label,
                TableKind::Milestone,
            ],
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Provider => write!(f, "provider"),
            TableKind::Account => write!(f, "account"),
            TableKind::Repository => write!(f, "repository"),
            TableKind::Label => write!(f, "label"),
            TableKind::Milestone => write!(f, "milestone"),
            TableKind::Issue => write!(f, "issue"),
        }
    }
}

/// Classification of a remote row during a run.
///
/// Every fetched row starts as `Unmatched`; classification moves matched rows
/// to `Unchanged` or `Changed`, and rows created this run are `New`. A matched
/// row whose record could not be built this run is `Skipped` and left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Unmatched,
    Unchanged,
    Changed,
    New,
    Skipped,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Unmatched => write!(f, "unmatched"),
            SyncState::Unchanged => write!(f, "unchanged"),
            SyncState::Changed => write!(f, "changed"),
            SyncState::New => write!(f, "new"),
            SyncState::Skipped => write!(f, "skipped"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(ExternalId::from("gh-1").to_string(), "gh-1");
        assert_eq!(RemoteId::from("rec1").to_string(), "rec1");
    }

    #[test]
    fn dependencies_always_precede_their_dependents() {
        for kind in TableKind::all() {
            for dep in kind.dependencies() {
                assert!(
                    dep < kind,
                    "{kind} references {dep}, which is not reconciled before it"
                );
            }
        }
    }

    #[test]
    fn all_is_sorted_by_declaration_order() {
        let mut sorted = TableKind::ALL;
        sorted.sort();
        assert_eq!(sorted, TableKind::ALL);
    }

    #[test]
    fn sync_state_defaults_to_unmatched() {
        assert_eq!(SyncState::default(), SyncState::Unmatched);
    }
}
