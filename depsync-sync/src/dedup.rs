//! Deduplicated desired state per table kind.
//!
//! The same provider, account or repository is embedded in many issues.
//! Each is kept once per [`ExternalId`]; a later sighting replaces an earlier
//! one, which is harmless because every copy comes from the same snapshot.

use std::collections::BTreeMap;

use depsync_core::{model::Issue, ExternalId, TableKind};

use crate::feature::Feature;

/// Desired entities of one kind, keyed by external id.
pub type DesiredSet = BTreeMap<ExternalId, Feature>;

static EMPTY: DesiredSet = BTreeMap::new();

/// One [`DesiredSet`] per [`TableKind`], rebuilt on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    sets: BTreeMap<TableKind, DesiredSet>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every entity reachable from `issues`.
    pub fn from_issues(issues: &[Issue]) -> Self {
        let mut state = Self::new();
        for issue in issues {
            state.add_issue(issue);
        }
        tracing::debug!(
            "desired state: {}",
            TableKind::all()
                .iter()
                .map(|kind| format!("{kind}={}", state.set(*kind).len()))
                .collect::<Vec<_>>()
                .join(" ")
        );
        state
    }

    fn add_issue(&mut self, issue: &Issue) {
        let repository = &issue.repository;
        let provider = &repository.provider.id;

        self.insert(Feature::provider(&repository.provider));

        for label in &issue.labels {
            self.insert(Feature::label(label, &repository.id));
        }

        if let Some(owner) = &repository.owner {
            self.insert(Feature::account(owner, provider));
        }
        self.insert(Feature::account(&issue.author, provider));
        for assignee in &issue.assignees {
            self.insert(Feature::account(assignee, provider));
        }
        if let Some(creator) = issue.milestone.as_ref().and_then(|m| m.creator.as_ref()) {
            self.insert(Feature::account(creator, provider));
        }

        self.insert(Feature::repository(repository));

        if let Some(milestone) = &issue.milestone {
            self.insert(Feature::milestone(milestone, &repository.id));
        }

        self.insert(Feature::issue(issue));
    }

    /// Insert `feature`, replacing any earlier entry with the same kind and id.
    pub fn insert(&mut self, feature: Feature) -> Option<Feature> {
        self.sets
            .entry(feature.kind())
            .or_default()
            .insert(feature.external_id().clone(), feature)
    }

    pub fn set(&self, kind: TableKind) -> &DesiredSet {
        self.sets.get(&kind).unwrap_or(&EMPTY)
    }

    pub fn len(&self) -> usize {
        self.sets.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
