//! GitHub REST issue source.
//!
//! Lists open issues (pull requests filtered out) or open pull requests of a
//! repository, 100 per page. The listing is fetched once per source and
//! reused; review comments are fetched per pull request as it is needed.

use std::sync::{Mutex, PoisonError};

use serde::Deserialize;
use tracing::debug;

use crate::config::Credential;
use crate::error::{Error, Result};
use crate::model::{Issue, IssueKind, IssueRef};

use super::IssueSource;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const PER_PAGE: usize = 100;

/// Issue source backed by the GitHub REST API.
pub struct GithubIssues {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    kind: IssueKind,
    listing_cache: Mutex<Option<Vec<Issue>>>,
}

impl GithubIssues {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, kind: IssueKind) -> Self {
        Self::with_api_base(DEFAULT_API_BASE, owner, repo, kind)
    }

    /// Point at a GitHub Enterprise or test server.
    pub fn with_api_base(
        api_base: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        kind: IssueKind,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
            kind,
            listing_cache: Mutex::new(None),
        }
    }

    fn list_url(&self) -> String {
        let endpoint = match self.kind {
            IssueKind::Issue => "issues",
            IssueKind::PullRequest => "pulls",
        };
        format!("{}/repos/{}/{}/{endpoint}", self.api_base, self.owner, self.repo)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
        credential: &Credential,
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(credential.expose())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, concat!("resolver-arena/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("GitHub request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => format!("(failed to read response body: {e})"),
            };
            return Err(Error::Fetch(format!("GitHub returned {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to parse GitHub response: {e}")))
    }

    async fn review_comments(&self, number: u64, credential: &Credential) -> Result<Vec<String>> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{number}/comments",
            self.api_base, self.owner, self.repo
        );
        let comments: Vec<GhComment> = self
            .get_json(&url, &[("per_page", PER_PAGE.to_string())], credential)
            .await?;
        Ok(comments.into_iter().filter_map(|c| c.body).collect())
    }

    /// Open items without review comments, fetched on first use.
    async fn listing(&self, credential: &Credential) -> Result<Vec<Issue>> {
        if let Some(cached) = self.cached_listing() {
            return Ok(cached);
        }

        let url = self.list_url();
        let mut issues = Vec::new();

        for page in 1.. {
            let query = [
                ("state", "open".to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            let batch: Vec<GhItem> = self.get_json(&url, &query, credential).await?;
            let done = batch.len() < PER_PAGE;
            debug!(page, count = batch.len(), kind = %self.kind, "Fetched GitHub page");
            issues.extend(
                batch
                    .into_iter()
                    .filter(|item| self.kind == IssueKind::PullRequest || item.pull_request.is_none())
                    .map(|item| convert(&self.owner, &self.repo, self.kind, item, Vec::new())),
            );
            if done {
                break;
            }
        }

        *self.listing_cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(issues.clone());
        Ok(issues)
    }

    fn cached_listing(&self) -> Option<Vec<Issue>> {
        self.listing_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn with_review_comments(&self, mut issue: Issue, credential: &Credential) -> Result<Issue> {
        if self.kind == IssueKind::PullRequest {
            issue.review_comments = self.review_comments(issue.reference.number, credential).await?;
        }
        Ok(issue)
    }
}

#[derive(Debug, Deserialize)]
struct GhItem {
    number: u64,
    title: String,
    body: Option<String>,
    /// Present on issue listings when the item is actually a pull request.
    pull_request: Option<serde_json::Value>,
    head: Option<GhHead>,
}

#[derive(Debug, Deserialize)]
struct GhHead {
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Debug, Deserialize)]
struct GhComment {
    body: Option<String>,
}

impl IssueSource for GithubIssues {
    fn repository(&self) -> (&str, &str) {
        (&self.owner, &self.repo)
    }

    async fn get_converted_issues(&self, credential: &Credential) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        for issue in self.listing(credential).await? {
            issues.push(self.with_review_comments(issue, credential).await?);
        }
        Ok(issues)
    }

    async fn get_issue(&self, number: u64, credential: &Credential) -> Result<Option<Issue>> {
        let found = self
            .listing(credential)
            .await?
            .into_iter()
            .find(|i| i.reference.number == number);
        match found {
            Some(issue) => Ok(Some(self.with_review_comments(issue, credential).await?)),
            None => Ok(None),
        }
    }
}

fn convert(owner: &str, repo: &str, kind: IssueKind, item: GhItem, review_comments: Vec<String>) -> Issue {
    Issue {
        reference: IssueRef::new(owner, repo, item.number, kind),
        title: item.title,
        body: item.body.unwrap_or_default(),
        head_branch: item.head.map(|h| h.ref_name),
        review_comments,
    }
}
