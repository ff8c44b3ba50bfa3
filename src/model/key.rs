//! Deterministic publication keys.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where a result lives, locally and remotely.
///
/// The same `(username, repo, issue_number)` always yields the same file name
/// and remote id, so re-runs land on the same ledger and the same remote
/// document instead of a fresh random key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicationKey {
    username: String,
    repo: String,
    issue_number: u64,
}

impl PublicationKey {
    /// Create a key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `username` or `repo` is empty or
    /// contains a path separator.
    pub fn new(username: &str, repo: &str, issue_number: u64) -> Result<Self> {
        for (label, value) in [("username", username), ("repo", repo)] {
            if value.trim().is_empty() {
                return Err(Error::Configuration(format!("{label} must not be empty")));
            }
            if value.contains(['/', '\\']) || value == ".." {
                return Err(Error::Configuration(format!(
                    "{label} '{value}' cannot be used in a file name"
                )));
            }
        }

        Ok(Self {
            username: username.trim().to_string(),
            repo: repo.trim().to_string(),
            issue_number,
        })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    #[must_use]
    pub const fn issue_number(&self) -> u64 {
        self.issue_number
    }

    /// Local ledger file name: `{username}-{repo}-{issue_number}.jsonl`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}-{}-{}.jsonl", self.username, self.repo, self.issue_number)
    }

    /// Remote document/collection id: the issue number alone.
    #[must_use]
    pub fn remote_id(&self) -> String {
        self.issue_number.to_string()
    }
}
