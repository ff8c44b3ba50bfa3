//! Issue identity and fetched issue content.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Kind of GitHub work item being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    #[default]
    Issue,
    #[serde(rename = "pr", alias = "pull-request")]
    PullRequest,
}

impl IssueKind {
    /// Get the string representation used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::PullRequest => "pr",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one unit of work.
///
/// Fixed for the lifetime of a run: everything produced downstream carries a
/// copy of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub kind: IssueKind,
}

impl IssueRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64, kind: IssueKind) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
            kind,
        }
    }

    /// Build a reference from an `owner/repo` slug.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the slug is not exactly two
    /// non-empty segments.
    pub fn from_slug(slug: &str, number: u64, kind: IssueKind) -> Result<Self> {
        match slug.trim().split('/').collect::<Vec<_>>().as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
                Ok(Self::new(*owner, *repo, number, kind))
            }
            _ => Err(Error::Configuration(format!(
                "Invalid repository '{slug}': expected owner/repo"
            ))),
        }
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Issue content as returned by the issue-fetching collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub reference: IssueRef,
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Head branch, pull requests only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_branch: Option<String>,
    /// Review comments on the pull request, in thread order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub review_comments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_kind_serde_accepts_alias() {
        let kind: IssueKind = serde_json::from_str("\"pull-request\"").unwrap();
        assert_eq!(kind, IssueKind::PullRequest);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"pr\"");
    }

    #[test]
    fn test_from_slug() {
        let r = IssueRef::from_slug("octo/widgets", 42, IssueKind::Issue).unwrap();
        assert_eq!(r.owner, "octo");
        assert_eq!(r.repo, "widgets");
        assert_eq!(r.to_string(), "octo/widgets#42");

        assert!(IssueRef::from_slug("widgets", 1, IssueKind::Issue).is_err());
        assert!(IssueRef::from_slug("a/b/c", 1, IssueKind::Issue).is_err());
        assert!(IssueRef::from_slug("/b", 1, IssueKind::Issue).is_err());
    }
}
