//! Error types for the arena CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=config, 3=not_found, 4=integrity, 5=publish, ...)
//! - Retryability flags (a publish is only safe to retry when it was idempotent)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for arena operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Configuration (exit 2)
    ConfigurationError,

    // Not Found (exit 3)
    NotFound,

    // Integrity (exit 4)
    IntegrityError,

    // Publish (exit 5)
    PublishError,

    // Issue fetching (exit 7)
    FetchError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::IntegrityError => "INTEGRITY_ERROR",
            Self::PublishError => "PUBLISH_ERROR",
            Self::FetchError => "FETCH_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8). 6 is unassigned.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::ConfigurationError => 2,
            Self::NotFound => 3,
            Self::IntegrityError => 4,
            Self::PublishError => 5,
            Self::FetchError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }
}

// ── Attempt Error ─────────────────────────────────────────────

/// Failure of a single resolution attempt.
///
/// Never an [`Error`]: the builder captures it into the resolution record.
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error("failed to launch agent `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("agent exited with {}: {stderr}", code.map_or_else(|| "signal".to_string(), |c| format!("status {c}")))]
    Exited { code: Option<i32>, stderr: String },

    #[error("agent produced malformed output: {0}")]
    MalformedOutput(#[from] serde_json::Error),

    #[error("agent I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in arena operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Issue #{number} not found in {owner}/{repo}")]
    IssueNotFound {
        owner: String,
        repo: String,
        number: u64,
    },

    #[error("No entry for issue #{number} in ledger {}", path.display())]
    LedgerEntryNotFound { number: u64, path: PathBuf },

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Publish to {target} failed with status {status}: {body}")]
    Publish {
        target: String,
        status: u16,
        body: String,
        /// Whether the failed call was an idempotent upsert.
        idempotent: bool,
    },

    #[error("Issue fetch failed: {0}")]
    Fetch(String),

    #[error("Ledger line {line} in {} is invalid: {message}", path.display())]
    InvalidLedgerLine {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::ConfigurationError,
            Self::IssueNotFound { .. } | Self::LedgerEntryNotFound { .. } => ErrorCode::NotFound,
            Self::Integrity(_) => ErrorCode::IntegrityError,
            Self::Publish { .. } => ErrorCode::PublishError,
            Self::Fetch(_) => ErrorCode::FetchError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) | Self::InvalidLedgerLine { .. } => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Whether the whole operation can be re-run without side effects.
    ///
    /// Only keyed-overwrite publishes and transient fetch failures qualify.
    /// A failed collection append may have landed remotely, so it is not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Publish { idempotent, .. } => *idempotent,
            Self::Fetch(_) => true,
            _ => false,
        }
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Configuration(msg) => {
                if msg.contains("token") {
                    Some("Pass --token or set GITHUB_TOKEN.".to_string())
                } else if msg.contains("model") {
                    Some(
                        "Pass --llm-models a,b,c or set LLM_MODELS with at least two distinct models."
                            .to_string(),
                    )
                } else if msg.contains("remote store") {
                    Some(
                        "Pass --remote-store '{\"mode\":\"keyed_overwrite\",\"database_url\":\"...\"}' \
                         or set REMOTE_STORE_CONFIG."
                            .to_string(),
                    )
                } else {
                    None
                }
            }

            Self::IssueNotFound { owner, repo, .. } => Some(format!(
                "Only open items of the requested --issue-type are fetched from {owner}/{repo}. \
                 Check the number and whether it is an issue or a pull request."
            )),

            Self::LedgerEntryNotFound { .. } => Some(
                "Run `arena resolve` for this issue first, or point --first/--second at the right ledgers."
                    .to_string(),
            ),

            Self::Integrity(_) => Some(
                "Both ledgers must hold results for the same issue from two different models."
                    .to_string(),
            ),

            Self::Publish {
                idempotent: true, ..
            } => Some(
                "The local ledger is intact. Re-running the publish is safe in keyed-overwrite mode."
                    .to_string(),
            ),

            Self::Publish {
                idempotent: false, ..
            } => Some(
                "The local ledger is intact. A re-run appends only entries missing from the \
                 delivery log, but an append whose response was lost may be sent twice."
                    .to_string(),
            ),

            Self::Fetch(_)
            | Self::InvalidLedgerLine { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": self.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::Configuration("x".into()).exit_code(), 2);
        assert_eq!(
            Error::IssueNotFound {
                owner: "o".into(),
                repo: "r".into(),
                number: 1
            }
            .exit_code(),
            3
        );
        assert_eq!(Error::Integrity("x".into()).exit_code(), 4);
        assert_eq!(Error::Other("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_publish_retryable_only_when_idempotent() {
        let keyed = Error::Publish {
            target: "issues/42".into(),
            status: 500,
            body: "boom".into(),
            idempotent: true,
        };
        let append = Error::Publish {
            target: "arena-42".into(),
            status: 500,
            body: "boom".into(),
            idempotent: false,
        };

        assert!(keyed.is_retryable());
        assert!(!append.is_retryable());
        assert_eq!(keyed.exit_code(), 5);
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let err = Error::Configuration("missing GitHub token".into());
        let json = err.to_structured_json();

        assert_eq!(json["error"]["code"], "CONFIGURATION_ERROR");
        assert_eq!(json["error"]["exit_code"], 2);
        assert_eq!(json["error"]["retryable"], false);
        assert!(json["error"]["hint"].as_str().unwrap().contains("GITHUB_TOKEN"));
    }

    #[test]
    fn test_attempt_error_message_without_exit_code() {
        let err = AttemptError::Exited {
            code: None,
            stderr: "killed".into(),
        };
        assert_eq!(err.to_string(), "agent exited with signal: killed");
    }
}
