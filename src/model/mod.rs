//! Data models for the arena.
//!
//! This module contains the domain models:
//! - IssueRef / Issue
//! - ResolutionRecord
//! - ComparisonRecord
//! - PublicationKey

pub mod issue;
pub mod key;
pub mod record;

pub use issue::{Issue, IssueKind, IssueRef};
pub use key::PublicationKey;
pub use record::{AttemptEvent, ComparisonRecord, RawOutcome, ResolutionRecord, SuccessState};
