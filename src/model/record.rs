//! Resolution and comparison records.
//!
//! A [`ResolutionRecord`] is the normalized outcome of one model's attempt at
//! one issue. Fields are private and there are no setters: once the builder
//! creates a record, the ledger and publisher only ever read it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::issue::IssueRef;

/// Tri-state outcome reported by an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuccessState {
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl SuccessState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl From<Option<bool>> for SuccessState {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Succeeded,
            Some(false) => Self::Failed,
            None => Self::Unknown,
        }
    }
}

/// One event from an attempt's execution trace.
///
/// Agents emit heterogeneous events; the common fields are typed and the rest
/// is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptEvent {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Raw result handed back by the resolution-attempt collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOutcome {
    pub instruction: String,
    pub base_commit: String,
    pub git_patch: String,
    pub history: Vec<AttemptEvent>,
    pub success: Option<bool>,
    pub success_explanation: Option<String>,
    pub comment_success: Option<Vec<bool>>,
    pub metrics: Option<Value>,
    pub error: Option<String>,
}

/// Normalized outcome of one (issue, model) attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    issue: IssueRef,
    model: String,
    instruction: String,
    base_commit: String,
    git_patch: String,
    #[serde(default)]
    history: Vec<AttemptEvent>,
    success: SuccessState,
    #[serde(default)]
    success_explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment_success: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metrics: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl ResolutionRecord {
    /// Normalize a raw attempt result.
    #[must_use]
    pub fn from_raw(issue: IssueRef, model: impl Into<String>, raw: RawOutcome) -> Self {
        Self {
            issue,
            model: model.into(),
            instruction: raw.instruction,
            base_commit: raw.base_commit,
            git_patch: raw.git_patch,
            history: raw.history,
            success: raw.success.into(),
            success_explanation: raw.success_explanation,
            comment_success: raw.comment_success,
            metrics: raw.metrics,
            error: raw.error,
        }
    }

    /// Record for an attempt that crashed before producing a result.
    #[must_use]
    pub fn crashed(
        issue: IssueRef,
        model: impl Into<String>,
        instruction: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            issue,
            model: model.into(),
            instruction: instruction.into(),
            base_commit: String::new(),
            git_patch: String::new(),
            history: Vec::new(),
            success: SuccessState::Unknown,
            success_explanation: None,
            comment_success: None,
            metrics: None,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub const fn issue(&self) -> &IssueRef {
        &self.issue
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    #[must_use]
    pub fn base_commit(&self) -> &str {
        &self.base_commit
    }

    #[must_use]
    pub fn git_patch(&self) -> &str {
        &self.git_patch
    }

    #[must_use]
    pub fn history(&self) -> &[AttemptEvent] {
        &self.history
    }

    #[must_use]
    pub const fn success(&self) -> SuccessState {
        self.success
    }

    #[must_use]
    pub fn success_explanation(&self) -> Option<&str> {
        self.success_explanation.as_deref()
    }

    #[must_use]
    pub fn comment_success(&self) -> Option<&[bool]> {
        self.comment_success.as_deref()
    }

    #[must_use]
    pub const fn metrics(&self) -> Option<&Value> {
        self.metrics.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Two models' patches for the same issue, side by side.
///
/// Only [`crate::merge::merge`] builds these, which guarantees the models
/// differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    issue_number: u64,
    model_a: String,
    patch_a: String,
    model_b: String,
    patch_b: String,
}

impl ComparisonRecord {
    pub(crate) fn new(issue_number: u64, a: &ResolutionRecord, b: &ResolutionRecord) -> Self {
        Self {
            issue_number,
            model_a: a.model.clone(),
            patch_a: a.git_patch.clone(),
            model_b: b.model.clone(),
            patch_b: b.git_patch.clone(),
        }
    }

    #[must_use]
    pub const fn issue_number(&self) -> u64 {
        self.issue_number
    }

    #[must_use]
    pub fn model_a(&self) -> &str {
        &self.model_a
    }

    #[must_use]
    pub fn patch_a(&self) -> &str {
        &self.patch_a
    }

    #[must_use]
    pub fn model_b(&self) -> &str {
        &self.model_b
    }

    #[must_use]
    pub fn patch_b(&self) -> &str {
        &self.patch_b
    }
}
