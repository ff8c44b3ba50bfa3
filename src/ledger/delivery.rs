//! Delivery log for collection appends.
//!
//! Kept beside a ledger as `{stem}.published.jsonl`, one line per entry the
//! remote store acknowledged. A line is written only after the store answered
//! with success, so an entry missing here was never delivered and is sent
//! again on the next run.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// One acknowledged append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub content_hash: String,
    /// Collection the entry was appended to.
    pub target: String,
    pub status: u16,
    pub delivered_at: String,
}

impl Delivery {
    #[must_use]
    pub fn new(content_hash: &str, target: &str, status: u16) -> Self {
        Self {
            content_hash: content_hash.to_string(),
            target: target.to_string(),
            status,
            delivered_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Path of the delivery log kept beside `ledger`.
#[must_use]
pub fn delivery_path(ledger: &Path) -> PathBuf {
    ledger.with_extension("published.jsonl")
}

/// Append one delivery line and sync it.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or written.
pub fn record_delivery(path: &Path, delivery: &Delivery) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let line = serde_json::to_string(delivery)?;

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    file.flush()?;
    file.sync_all()?;

    debug!(path = %path.display(), hash = %delivery.content_hash, "Delivery recorded");
    Ok(())
}

/// Content hashes of every delivered entry. A missing log holds none.
///
/// # Errors
///
/// Returns an error if the log cannot be read or a line is invalid.
pub fn delivered_hashes(path: &Path) -> Result<HashSet<String>> {
    let mut hashes = HashSet::new();
    if !path.exists() {
        return Ok(hashes);
    }

    let reader = BufReader::new(File::open(path)?);
    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        let delivery: Delivery = serde_json::from_str(&line).map_err(|e| Error::InvalidLedgerLine {
            path: path.to_path_buf(),
            line: line_num + 1,
            message: e.to_string(),
        })?;
        hashes.insert(delivery.content_hash);
    }

    Ok(hashes)
}
