//! Ledger line format.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{PublicationKey, ResolutionRecord};

use super::hash::content_hash;

/// One ledger line: the record plus denormalized identity and run metadata.
///
/// This is also the payload sent to the remote store in collection-append
/// mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(flatten)]
    pub record: ResolutionRecord,
    pub username: String,
    pub repo: String,
    pub issue_number: u64,
    /// SHA256 over the record and the identity fields above.
    pub content_hash: String,
    /// Identifies the invocation that wrote this line.
    pub run_id: String,
    /// RFC 3339 timestamp of the append.
    pub recorded_at: String,
}

#[derive(Serialize)]
struct Hashed<'a> {
    record: &'a ResolutionRecord,
    username: &'a str,
    repo: &'a str,
    issue_number: u64,
}

impl LedgerEntry {
    /// Wrap a record for the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized for hashing.
    pub fn new(record: ResolutionRecord, key: &PublicationKey, run_id: &str) -> Result<Self> {
        let content_hash = content_hash(&Hashed {
            record: &record,
            username: key.username(),
            repo: key.repo(),
            issue_number: key.issue_number(),
        })?;

        Ok(Self {
            record,
            username: key.username().to_string(),
            repo: key.repo().to_string(),
            issue_number: key.issue_number(),
            content_hash,
            run_id: run_id.to_string(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}
