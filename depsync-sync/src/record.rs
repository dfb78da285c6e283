//! Remote rows and their field values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use depsync_core::{ExternalId, RemoteId, SyncState};

/// Field holding the [`ExternalId`] of every synchronized row.
pub const EXTERNAL_ID_FIELD: &str = "ID";

/// A single cell value as exchanged with the remote store.
///
/// Link fields are arrays of [`RemoteId`]s. Anything the store returns that
/// the builder never produces (attachments, collaborators, ...) lands in
/// `Other` and is only ever compared, never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Links(Vec<RemoteId>),
    Other(serde_json::Value),
}

impl FieldValue {
    /// Values the remote store omits from listings.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Bool(b) => !b,
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Links(ids) => ids.is_empty(),
            FieldValue::Other(v) => v.is_null(),
            FieldValue::Int(_) | FieldValue::Float(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<Vec<RemoteId>> for FieldValue {
    fn from(ids: Vec<RemoteId>) -> Self {
        FieldValue::Links(ids)
    }
}

/// Named field values of a row. Ordered so logs and request bodies are stable.
pub type RecordFields = BTreeMap<String, FieldValue>;

/// `true` if every synchronized field in `desired` matches `remote`.
///
/// Remote-only fields are ignored. A field missing on the remote side matches
/// a blank desired value.
pub fn fields_equal(desired: &RecordFields, remote: &RecordFields) -> bool {
    desired.iter().all(|(name, want)| match remote.get(name) {
        Some(have) => have == want || (have.is_blank() && want.is_blank()),
        None => want.is_blank(),
    })
}

/// Reads the [`EXTERNAL_ID_FIELD`] out of a field map.
pub fn external_id_of(fields: &RecordFields) -> Option<ExternalId> {
    fields
        .get(EXTERNAL_ID_FIELD)
        .and_then(FieldValue::as_text)
        .filter(|s| !s.is_empty())
        .map(ExternalId::from)
}

/// A row of a remote table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: RemoteId,
    #[serde(default)]
    pub fields: RecordFields,
    #[serde(skip)]
    pub state: SyncState,
}

impl RemoteRecord {
    /// A freshly fetched row, not yet classified.
    pub fn fetched(id: RemoteId, fields: RecordFields) -> Self {
        Self {
            id,
            fields,
            state: SyncState::Unmatched,
        }
    }

    pub fn external_id(&self) -> Option<ExternalId> {
        external_id_of(&self.fields)
    }

    /// Copy `fields` over the current values, keeping remote-only fields.
    pub fn stage(&mut self, fields: &RecordFields) {
        for (name, value) in fields {
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

impl fmt::Display for RemoteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.external_id() {
            Some(ext) => write!(f, "{} ({ext})", self.id),
            None => write!(f, "{} (no {EXTERNAL_ID_FIELD})", self.id),
        }
    }
}
