//! Merge command implementation.
//!
//! Reads the latest entry for an issue from two ledgers written by separate
//! single-model runs, pairs them and publishes the comparison record.

use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::cli::MergeArgs;
use crate::config::{find_remote_store, load_config, resolve_output_dir, resolve_store_credential};
use crate::error::{Error, Result};
use crate::ledger::{LedgerEntry, latest_for_issue};
use crate::merge::merge;
use crate::model::{ComparisonRecord, PublicationKey};
use crate::publish::{MemoryStore, PublishReceipt, Publisher};

use super::{captured_payloads, dry_run_mode, missing_store, runtime};

/// Default ledger names when `--first`/`--second` are not given.
pub const FIRST_LEDGER: &str = "output1.jsonl";
pub const SECOND_LEDGER: &str = "output2.jsonl";

#[derive(Serialize)]
struct MergeOutput<'a> {
    comparison: &'a ComparisonRecord,
    receipt: &'a PublishReceipt,
    #[serde(skip_serializing_if = "Option::is_none")]
    dry_run: Option<serde_json::Value>,
}

/// Execute the merge command.
///
/// # Errors
///
/// Returns an error if a ledger has no entry for the issue, the entries do
/// not form a valid pair, or publishing fails.
pub fn execute(args: &MergeArgs, dry_run: bool, json: bool) -> Result<()> {
    let config = load_config()?;
    let output_dir = resolve_output_dir(args.output_dir.as_deref(), &config);
    let first = args.first.clone().unwrap_or_else(|| output_dir.join(FIRST_LEDGER));
    let second = args
        .second
        .clone()
        .unwrap_or_else(|| output_dir.join(SECOND_LEDGER));

    let store = find_remote_store(args.remote_store.as_deref(), &config)?;
    if store.is_none() && !dry_run {
        return Err(missing_store());
    }

    let (a, b) = load_pair(&first, &second, args.issue_number)?;
    let comparison = merge(args.issue_number, &a.record, &b.record)?;
    let key = PublicationKey::new(&a.username, &a.repo, args.issue_number)?;

    let rt = runtime()?;

    if dry_run {
        let publisher = Publisher::new(MemoryStore::new(), dry_run_mode(store.as_ref()));
        let receipt = rt.block_on(publisher.publish(&comparison, &key, None))?;
        return print_result(&comparison, &receipt, Some(publisher.store()), json);
    }

    let store = store.ok_or_else(missing_store)?;
    let credential = resolve_store_credential(&store);
    let publisher = Publisher::from_config(&store);
    let receipt = rt.block_on(publisher.publish(&comparison, &key, credential.as_ref()))?;

    print_result(&comparison, &receipt, None, json)
}

/// Latest entry for `issue_number` from each ledger.
///
/// Both entries must come from the same repository.
fn load_pair(first: &Path, second: &Path, issue_number: u64) -> Result<(LedgerEntry, LedgerEntry)> {
    let a = latest_for_issue(first, issue_number)?;
    let b = latest_for_issue(second, issue_number)?;

    if a.repo != b.repo {
        return Err(Error::Integrity(format!(
            "ledgers disagree on repository for issue #{issue_number}: '{}' vs '{}'",
            a.repo, b.repo
        )));
    }

    Ok((a, b))
}

fn print_result(
    comparison: &ComparisonRecord,
    receipt: &PublishReceipt,
    captured: Option<&MemoryStore>,
    json: bool,
) -> Result<()> {
    if json {
        let output = MergeOutput {
            comparison,
            receipt,
            dry_run: captured.map(captured_payloads),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!(
        "{} issue #{}: {} vs {}",
        "Merged".green().bold(),
        comparison.issue_number(),
        comparison.model_a().cyan(),
        comparison.model_b().cyan()
    );
    println!(
        "  Published: {} {} ({})",
        receipt.mode,
        receipt.target.bold(),
        receipt.status
    );

    if let Some(store) = captured {
        println!();
        println!("{}", "Dry run, nothing was sent. Payloads:".yellow());
        println!("{}", serde_json::to_string_pretty(&captured_payloads(store))?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::append_entry;
    use crate::model::{IssueKind, IssueRef, RawOutcome, ResolutionRecord};
    use tempfile::TempDir;

    fn write_entry(path: &Path, repo: &str, number: u64, model: &str) {
        let record = ResolutionRecord::from_raw(
            IssueRef::new("octo", repo, number, IssueKind::Issue),
            model,
            RawOutcome {
                git_patch: format!("patch from {model}"),
                ..RawOutcome::default()
            },
        );
        let key = PublicationKey::new("user", repo, number).unwrap();
        append_entry(path, &LedgerEntry::new(record, &key, "run").unwrap()).unwrap();
    }

    #[test]
    fn test_load_pair_takes_latest_entries() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join(FIRST_LEDGER);
        let second = temp_dir.path().join(SECOND_LEDGER);
        write_entry(&first, "widgets", 42, "old-model");
        write_entry(&first, "widgets", 42, "model-A");
        write_entry(&first, "widgets", 7, "model-C");
        write_entry(&second, "widgets", 42, "model-B");

        let (a, b) = load_pair(&first, &second, 42).unwrap();

        assert_eq!(a.record.model(), "model-A");
        assert_eq!(b.record.model(), "model-B");
    }

    #[test]
    fn test_load_pair_rejects_different_repositories() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join(FIRST_LEDGER);
        let second = temp_dir.path().join(SECOND_LEDGER);
        write_entry(&first, "widgets", 42, "model-A");
        write_entry(&second, "gadgets", 42, "model-B");

        let err = load_pair(&first, &second, 42).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[test]
    fn test_load_pair_missing_ledger_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join(FIRST_LEDGER);
        write_entry(&first, "widgets", 42, "model-A");

        let err = load_pair(&first, &temp_dir.path().join(SECOND_LEDGER), 42).unwrap_err();
        assert!(matches!(err, Error::LedgerEntryNotFound { number: 42, .. }));
    }
}
