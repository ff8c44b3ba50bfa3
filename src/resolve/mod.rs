//! Resolution output building.
//!
//! Drives one resolution attempt for an (issue, model) pair and normalizes
//! the result into a [`ResolutionRecord`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  OutputBuilder  │
//! └────────┬────────┘
//!          │
//!     ┌────┴──────────────┐
//!     ▼                   ▼
//! ┌─────────────┐  ┌───────────────────┐
//! │ IssueSource │  │ ResolutionAttempt │
//! └──────┬──────┘  └─────────┬─────────┘
//!        ▼                   ▼
//!   GithubIssues       CommandAttempt
//!   (REST API)         (agent process)
//! ```
//!
//! Both collaborators are traits so the builder can be driven by fakes in
//! tests. An attempt failure never escapes [`OutputBuilder::build`] as an
//! `Err`: it becomes [`BuildOutcome::AttemptFailed`], carrying a record with
//! `error` populated, so the other model's run is never lost to it.

pub mod command;
pub mod github;

pub use command::CommandAttempt;
pub use github::GithubIssues;

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Credential;
use crate::error::{AttemptError, Error, Result};
use crate::model::{Issue, IssueKind, IssueRef, RawOutcome, ResolutionRecord};

/// Fetches the candidate issues of a repository.
pub trait IssueSource: Send + Sync {
    /// Owner and repository this source reads from.
    fn repository(&self) -> (&str, &str);

    /// Fetch all issues this source can resolve, in listing order.
    fn get_converted_issues(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<Vec<Issue>>> + Send;

    /// Fetch the issue numbered `number`, or `None` if the listing lacks it.
    fn get_issue(
        &self,
        number: u64,
        credential: &Credential,
    ) -> impl Future<Output = Result<Option<Issue>>> + Send {
        async move {
            let issues = self.get_converted_issues(credential).await?;
            Ok(issues.into_iter().find(|i| i.reference.number == number))
        }
    }
}

/// Runs one resolution attempt with a given model.
pub trait ResolutionAttempt: Send + Sync {
    fn attempt(
        &self,
        request: &AttemptRequest,
    ) -> impl Future<Output = std::result::Result<RawOutcome, AttemptError>> + Send;
}

/// Settings passed through to the agent untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptConfig {
    pub agent_class: String,
    pub max_iterations: u32,
    /// Overall deadline for the attempt. Enforcement is up to the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
    /// Extra repository-specific guidance appended to the instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_instruction: Option<String>,
}

pub const DEFAULT_AGENT_CLASS: &str = "CodeActAgent";
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;

impl Default for AttemptConfig {
    fn default() -> Self {
        Self {
            agent_class: DEFAULT_AGENT_CLASS.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            deadline_secs: None,
            repo_instruction: None,
        }
    }
}

/// What the agent receives for one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRequest {
    pub issue: Issue,
    pub model: String,
    pub instruction: String,
    pub config: AttemptConfig,
}

/// Result of [`OutputBuilder::build`].
#[derive(Debug)]
pub enum BuildOutcome {
    /// The attempt ran to completion; it may still have reported failure.
    Resolved(ResolutionRecord),
    /// The attempt itself crashed.
    AttemptFailed {
        record: ResolutionRecord,
        error: AttemptError,
    },
}

impl BuildOutcome {
    #[must_use]
    pub const fn record(&self) -> &ResolutionRecord {
        match self {
            Self::Resolved(record) | Self::AttemptFailed { record, .. } => record,
        }
    }

    #[must_use]
    pub fn into_record(self) -> ResolutionRecord {
        match self {
            Self::Resolved(record) | Self::AttemptFailed { record, .. } => record,
        }
    }

    #[must_use]
    pub const fn is_attempt_failure(&self) -> bool {
        matches!(self, Self::AttemptFailed { .. })
    }
}

/// Builds resolution records from an issue source and an attempt runner.
pub struct OutputBuilder<S, A> {
    source: S,
    attempt: A,
    config: AttemptConfig,
}

impl<S: IssueSource, A: ResolutionAttempt> OutputBuilder<S, A> {
    pub const fn new(source: S, attempt: A, config: AttemptConfig) -> Self {
        Self {
            source,
            attempt,
            config,
        }
    }

    #[must_use]
    pub const fn attempt_runner(&self) -> &A {
        &self.attempt
    }

    #[must_use]
    pub const fn config(&self) -> &AttemptConfig {
        &self.config
    }

    /// Resolve `issue_ref` with `model`.
    ///
    /// # Errors
    ///
    /// - `Configuration` if `model` is empty
    /// - `IssueNotFound` if no fetched issue has the requested number
    /// - `Fetch` if the issue source fails
    ///
    /// Attempt failures are returned as [`BuildOutcome::AttemptFailed`].
    pub async fn build(
        &self,
        issue_ref: &IssueRef,
        credential: &Credential,
        model: &str,
    ) -> Result<BuildOutcome> {
        if model.trim().is_empty() {
            return Err(Error::Configuration("model identifier must not be empty".to_string()));
        }

        info!(issue = %issue_ref, model, "Building resolver output");

        let issue = self
            .source
            .get_issue(issue_ref.number, credential)
            .await?
            .ok_or_else(|| {
                let (owner, repo) = self.source.repository();
                Error::IssueNotFound {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    number: issue_ref.number,
                }
            })?;

        info!(issue = issue_ref.number, title = %issue.title, "Limiting resolution to matched issue");

        let instruction = build_instruction(&issue, &self.config);
        let request = AttemptRequest {
            issue,
            model: model.to_string(),
            instruction,
            config: self.config.clone(),
        };

        match self.attempt.attempt(&request).await {
            Ok(mut raw) => {
                if raw.instruction.is_empty() {
                    raw.instruction.clone_from(&request.instruction);
                }
                let record = ResolutionRecord::from_raw(issue_ref.clone(), model, raw);
                info!(
                    issue = issue_ref.number,
                    model,
                    success = record.success().as_str(),
                    patch_bytes = record.git_patch().len(),
                    "Attempt finished"
                );
                Ok(BuildOutcome::Resolved(record))
            }
            Err(error) => {
                warn!(issue = issue_ref.number, model, error = %error, "Attempt crashed");
                let record = ResolutionRecord::crashed(
                    issue_ref.clone(),
                    model,
                    request.instruction,
                    error.to_string(),
                );
                Ok(BuildOutcome::AttemptFailed { record, error })
            }
        }
    }
}

/// Render the task text handed to the agent.
#[must_use]
pub fn build_instruction(issue: &Issue, config: &AttemptConfig) -> String {
    let mut text = String::from(
        "Please fix the following issue for the repository in /workspace.\n\
         Environment has been set up for you to start working. You may assume all necessary tools are installed.\n\n",
    );

    text.push_str("# Problem Statement\n");
    text.push_str(&issue.title);
    text.push_str("\n\n");
    text.push_str(issue.body.trim());
    text.push('\n');

    if issue.reference.kind == IssueKind::PullRequest && !issue.review_comments.is_empty() {
        text.push_str("\n# Review Comments\n");
        for comment in &issue.review_comments {
            text.push_str("- ");
            text.push_str(comment.trim());
            text.push('\n');
        }
    }

    if let Some(extra) = config.repo_instruction.as_deref().filter(|s| !s.trim().is_empty()) {
        text.push_str("\n# Repository Instructions\n");
        text.push_str(extra.trim());
        text.push('\n');
    }

    text.push_str("\nWhen you think you have fixed the issue through code changes, please finish the interaction.");
    text
}
