//! Desired-state entities, one struct per [`TableKind`].
//!
//! Features are flattened: wherever the graph embeds a related entity, the
//! feature keeps only that entity's [`ExternalId`]. The record builder turns
//! those ids into remote link values.

use chrono::{DateTime, Utc};

use depsync_core::{model, ExternalId, TableKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFeature {
    pub id: ExternalId,
    pub url: String,
    pub driver: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFeature {
    pub id: ExternalId,
    pub url: String,
    pub login: String,
    pub full_name: String,
    pub account_type: String,
    pub location: String,
    pub company: String,
    pub avatar_url: String,
    pub provider: ExternalId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryFeature {
    pub id: ExternalId,
    pub url: String,
    pub title: String,
    pub description: String,
    pub homepage: String,
    pub is_fork: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub provider: ExternalId,
    pub owner: Option<ExternalId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFeature {
    pub id: ExternalId,
    pub url: String,
    pub name: String,
    pub color: String,
    pub description: String,
    pub repository: ExternalId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneFeature {
    pub id: ExternalId,
    pub url: String,
    pub title: String,
    pub description: String,
    pub due_on: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub repository: ExternalId,
    pub creator: Option<ExternalId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFeature {
    pub id: ExternalId,
    pub url: String,
    pub title: String,
    pub body: String,
    pub state: String,
    pub is_pr: bool,
    pub is_locked: bool,
    pub comments: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub provider: ExternalId,
    pub repository: ExternalId,
    pub milestone: Option<ExternalId>,
    pub author: ExternalId,
    pub labels: Vec<ExternalId>,
    pub assignees: Vec<ExternalId>,
}

/// A domain entity to be projected into the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature {
    Provider(ProviderFeature),
    Account(AccountFeature),
    Repository(RepositoryFeature),
    Label(LabelFeature),
    Milestone(MilestoneFeature),
    Issue(IssueFeature),
}

impl Feature {
    pub fn kind(&self) -> TableKind {
        match self {
            Feature::Provider(_) => TableKind::Provider,
            Feature::Account(_) => TableKind::Account,
            Feature::Repository(_) => TableKind::Repository,
            Feature::Label(_) => TableKind::Label,
            Feature::Milestone(_) => TableKind::Milestone,
            Feature::Issue(_) => TableKind::Issue,
        }
    }

    pub fn external_id(&self) -> &ExternalId {
        match self {
            Feature::Provider(f) => &f.id,
            Feature::Account(f) => &f.id,
            Feature::Repository(f) => &f.id,
            Feature::Label(f) => &f.id,
            Feature::Milestone(f) => &f.id,
            Feature::Issue(f) => &f.id,
        }
    }

    pub fn provider(provider: &model::Provider) -> Self {
        Feature::Provider(ProviderFeature {
            id: provider.id.clone(),
            url: provider.url.clone(),
            driver: provider.driver.to_string(),
        })
    }

    /// Accounts carry no provider of their own; they belong to the provider
    /// of the repository they were discovered through.
    pub fn account(account: &model::Account, provider: &ExternalId) -> Self {
        Feature::Account(AccountFeature {
            id: account.id.clone(),
            url: account.url.clone(),
            login: account.login.clone(),
            full_name: account.full_name.clone(),
            account_type: account.account_type.clone(),
            location: account.location.clone(),
            company: account.company.clone(),
            avatar_url: account.avatar_url.clone(),
            provider: provider.clone(),
        })
    }

    pub fn repository(repository: &model::Repository) -> Self {
        Feature::Repository(RepositoryFeature {
            id: repository.id.clone(),
            url: repository.url.clone(),
            title: repository.title.clone(),
            description: repository.description.clone(),
            homepage: repository.homepage.clone(),
            is_fork: repository.is_fork,
            created_at: repository.created_at,
            updated_at: repository.updated_at,
            provider: repository.provider.id.clone(),
            owner: repository.owner.as_ref().map(|o| o.id.clone()),
        })
    }

    pub fn label(label: &model::Label, repository: &ExternalId) -> Self {
        Feature::Label(LabelFeature {
            id: label.id.clone(),
            url: label.url.clone(),
            name: label.name.clone(),
            color: label.color.clone(),
            description: label.description.clone(),
            repository: repository.clone(),
        })
    }

    pub fn milestone(milestone: &model::Milestone, repository: &ExternalId) -> Self {
        Feature::Milestone(MilestoneFeature {
            id: milestone.id.clone(),
            url: milestone.url.clone(),
            title: milestone.title.clone(),
            description: milestone.description.clone(),
            due_on: milestone.due_on,
            closed_at: milestone.closed_at,
            repository: repository.clone(),
            creator: milestone.creator.as_ref().map(|c| c.id.clone()),
        })
    }

    pub fn issue(issue: &model::Issue) -> Self {
        Feature::Issue(IssueFeature {
            id: issue.id.clone(),
            url: issue.url.clone(),
            title: issue.title.clone(),
            body: issue.body.clone(),
            state: issue.state.to_string(),
            is_pr: issue.is_pr,
            is_locked: issue.is_locked,
            comments: issue.comments,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
            completed_at: issue.completed_at,
            provider: issue.repository.provider.id.clone(),
            repository: issue.repository.id.clone(),
            milestone: issue.milestone.as_ref().map(|m| m.id.clone()),
            author: issue.author.id.clone(),
            labels: dedup_ids(issue.labels.iter().map(|l| &l.id)),
            assignees: dedup_ids(issue.assignees.iter().map(|a| &a.id)),
        })
    }
}

/// Keeps first occurrences, preserving order.
fn dedup_ids<'a>(ids: impl Iterator<Item = &'a ExternalId>) -> Vec<ExternalId> {
    let mut out: Vec<ExternalId> = Vec::new();
    for id in ids {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}
