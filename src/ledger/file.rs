//! Append-only JSONL file operations.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::PublicationKey;

use super::entry::LedgerEntry;

/// Path of the ledger file for `key` under `output_dir`.
#[must_use]
pub fn ledger_path(output_dir: &Path, key: &PublicationKey) -> PathBuf {
    output_dir.join(key.file_name())
}

/// Append one entry as a single JSON line.
///
/// Creates the file and its parent directories if needed. The file is synced
/// before returning, so a crash afterwards cannot lose the line.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or written.
pub fn append_entry(path: &Path, entry: &LedgerEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let line = serde_json::to_string(entry)?;

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    file.flush()?;
    file.sync_all()?;

    debug!(path = %path.display(), model = entry.record.model(), "Ledger entry appended");
    Ok(())
}

/// Read every entry of a ledger, in append order.
///
/// Blank lines are skipped. A line that does not parse is an error naming
/// its line number.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line is invalid.
pub fn read_ledger(path: &Path) -> Result<Vec<LedgerEntry>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        let entry: LedgerEntry = serde_json::from_str(&line).map_err(|e| Error::InvalidLedgerLine {
            path: path.to_path_buf(),
            line: line_num + 1,
            message: e.to_string(),
        })?;
        entries.push(entry);
    }

    Ok(entries)
}

/// Most recent entry for `issue_number` in a ledger.
///
/// # Errors
///
/// Returns `LedgerEntryNotFound` if the file is missing or holds no entry
/// for the issue, or a parse error for an invalid line.
pub fn latest_for_issue(path: &Path, issue_number: u64) -> Result<LedgerEntry> {
    let not_found = || Error::LedgerEntryNotFound {
        number: issue_number,
        path: path.to_path_buf(),
    };

    if !path.exists() {
        return Err(not_found());
    }

    read_ledger(path)?
        .into_iter()
        .rev()
        .find(|e| e.issue_number == issue_number)
        .ok_or_else(not_found)
}

/// Count the non-blank lines in a ledger. A missing file counts as zero.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn count_lines(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }

    let reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    for line in reader.lines() {
        if !line?.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}
