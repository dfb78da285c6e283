//! Target selectors used to narrow a graph snapshot before syncing.
//!
//! Accepted forms:
//!
//! ```text
//! moul/depviz                          (github.com assumed)
//! gitlab.com/group/project
//! https://github.com/moul/depviz/issues/42
//! ```

use std::fmt;

use crate::error::ConfigError;
use crate::model::Issue;

const DEFAULT_HOST: &str = "github.com";

/// A normalized `https://host/path` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target(String);

impl Target {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidTarget {
            target: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty target"));
        }
        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);
        let without_suffix = without_scheme.trim_end_matches('/');
        let without_suffix = without_suffix.strip_suffix(".git").unwrap_or(without_suffix);

        let mut segments: Vec<&str> = without_suffix.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(invalid("empty target"));
        }
        let host = if segments[0].contains('.') {
            segments.remove(0).to_ascii_lowercase()
        } else {
            DEFAULT_HOST.to_string()
        };
        if segments.is_empty() {
            return Err(invalid("missing owner or project path"));
        }

        Ok(Self(format!("https://{host}/{}", segments.join("/"))))
    }

    pub fn parse_all<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Self>, ConfigError> {
        inputs.iter().map(|s| Self::parse(s.as_ref())).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` if `url` is this target or lives under it.
    pub fn matches_url(&self, url: &str) -> bool {
        let url = url.trim_end_matches('/');
        let (target, url) = (self.0.to_ascii_lowercase(), url.to_ascii_lowercase());
        url == target || url.starts_with(&format!("{target}/"))
    }

    pub fn matches_issue(&self, issue: &Issue) -> bool {
        self.matches_url(&issue.url) || self.matches_url(&issue.repository.url)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Keep the issues selected by at least one target; no targets keeps everything.
pub fn filter_by_targets(issues: Vec<Issue>, targets: &[Target]) -> Vec<Issue> {
    if targets.is_empty() {
        return issues;
    }
    issues
        .into_iter()
        .filter(|issue| targets.iter().any(|t| t.matches_issue(issue)))
        .collect()
}
