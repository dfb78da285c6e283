//! Dependency-graph model handed over by the collection subsystem.
//!
//! Every issue embeds the entities it relates to, so the same provider,
//! account or repository shows up many times across a snapshot. All values
//! come from one snapshot and are expected to agree with each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ExternalId;

/// Kind of upstream provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderDriver {
    #[default]
    Github,
    Gitlab,
}

impl std::fmt::Display for ProviderDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderDriver::Github => write!(f, "github"),
            ProviderDriver::Gitlab => write!(f, "gitlab"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Provider {
    pub id: ExternalId,
    pub url: String,
    #[serde(default)]
    pub driver: ProviderDriver,
}

/// A user or organization on a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Account {
    pub id: ExternalId,
    pub url: String,
    pub login: String,
    #[serde(default)]
    pub full_name: String,
    /// `user`, `organization`, `bot`, ...
    #[serde(default, rename = "type")]
    pub account_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Repository {
    pub id: ExternalId,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub is_fork: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Account>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Label {
    pub id: ExternalId,
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Milestone {
    pub id: ExternalId,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Account>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueState::Open => write!(f, "open"),
            IssueState::Closed => write!(f, "closed"),
            IssueState::Merged => write!(f, "merged"),
        }
    }
}

/// An issue or pull request with every related entity embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Issue {
    pub id: ExternalId,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub state: IssueState,
    #[serde(default)]
    pub is_pr: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub comments: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub repository: Repository,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<Milestone>,
    pub author: Account,
    #[serde(default)]
    pub assignees: Vec<Account>,
    #[serde(default)]
    pub labels: Vec<Label>,
}
