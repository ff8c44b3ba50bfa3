//! Dual-candidate run for one issue.
//!
//! Builds one record per selected model, appends each to the issue's ledger
//! as soon as it exists, and only then publishes:
//!
//! - keyed overwrite: the merged comparison record, once, at the issue key
//! - collection append: each ledger entry whose content hash is not yet in
//!   the issue's delivery log; every acknowledged append is logged there
//!
//! Builds run one after the other. An attempt crash for one model is
//! recorded and the next model still runs. Anything that fails before a
//! ledger write (bad key, unknown issue) aborts without touching the store.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::Credential;
use crate::error::{Error, Result};
use crate::ledger::{
    Delivery, LedgerEntry, append_entry, delivered_hashes, delivery_path, ledger_path, record_delivery,
};
use crate::merge::merge;
use crate::model::{ComparisonRecord, IssueRef, PublicationKey, SuccessState};
use crate::publish::{DeliveryMode, PublishReceipt, Publisher, RemoteStore};
use crate::resolve::{IssueSource, OutputBuilder, ResolutionAttempt};
use crate::select::PAIR;

/// Summary of one model's build.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    pub model: String,
    pub success: SuccessState,
    pub attempt_failed: bool,
    pub patch_bytes: usize,
    pub content_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What a dual run did.
#[derive(Debug, Clone, Serialize)]
pub struct DualRunReport {
    pub issue_number: u64,
    pub run_id: String,
    pub ledger: PathBuf,
    pub candidates: Vec<CandidateSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonRecord>,
    pub published: Vec<PublishReceipt>,
    /// Entries not appended remotely because an earlier run delivered them.
    pub skipped_duplicates: usize,
}

/// Orchestrates builder, ledger and publisher for one issue at a time.
pub struct Pipeline<'a, S, A, R> {
    builder: &'a OutputBuilder<S, A>,
    publisher: &'a Publisher<R>,
    output_dir: &'a Path,
    username: &'a str,
    run_id: String,
}

impl<'a, S, A, R> Pipeline<'a, S, A, R>
where
    S: IssueSource,
    A: ResolutionAttempt,
    R: RemoteStore,
{
    pub fn new(
        builder: &'a OutputBuilder<S, A>,
        publisher: &'a Publisher<R>,
        output_dir: &'a Path,
        username: &'a str,
    ) -> Self {
        Self {
            builder,
            publisher,
            output_dir,
            username,
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run `models` against `issue_ref` and publish the results.
    ///
    /// # Errors
    ///
    /// - `Configuration` if `models` is not exactly two entries or the
    ///   publication key is invalid
    /// - `IssueNotFound` / `Fetch` from the builder
    /// - `Integrity` if both models are the same
    /// - `Io` / `Json` if the ledger cannot be written
    /// - `Publish` if the store rejects an upload (the ledger is intact and
    ///   undelivered appends are sent again on the next run)
    pub async fn run(
        &self,
        issue_ref: &IssueRef,
        credential: &Credential,
        store_credential: Option<&Credential>,
        models: &[String],
    ) -> Result<DualRunReport> {
        if models.len() != PAIR {
            return Err(Error::Configuration(format!(
                "expected {PAIR} models per run, got {}",
                models.len()
            )));
        }

        let key = PublicationKey::new(self.username, &issue_ref.repo, issue_ref.number)?;
        let ledger = ledger_path(self.output_dir, &key);

        let mut entries = Vec::with_capacity(models.len());
        let mut candidates = Vec::with_capacity(models.len());

        for model in models {
            let outcome = self.builder.build(issue_ref, credential, model).await?;
            let attempt_failed = outcome.is_attempt_failure();
            let entry = LedgerEntry::new(outcome.into_record(), &key, &self.run_id)?;

            append_entry(&ledger, &entry)?;
            info!(ledger = %ledger.display(), model = %model, "Resolver output written");

            candidates.push(CandidateSummary {
                model: model.clone(),
                success: entry.record.success(),
                attempt_failed,
                patch_bytes: entry.record.git_patch().len(),
                content_hash: entry.content_hash.clone(),
                error: entry.record.error().map(String::from),
            });
            entries.push(entry);
        }

        let mut report = DualRunReport {
            issue_number: issue_ref.number,
            run_id: self.run_id.clone(),
            ledger,
            candidates,
            comparison: None,
            published: Vec::new(),
            skipped_duplicates: 0,
        };

        match self.publisher.mode() {
            DeliveryMode::KeyedOverwrite { .. } => {
                let comparison = merge(issue_ref.number, &entries[0].record, &entries[1].record)?;
                let receipt = self
                    .publisher
                    .publish(&comparison, &key, store_credential)
                    .await?;
                report.published.push(receipt);
                report.comparison = Some(comparison);
            }
            DeliveryMode::CollectionAppend { .. } => {
                report.comparison = Some(merge(
                    issue_ref.number,
                    &entries[0].record,
                    &entries[1].record,
                )?);
                let log = delivery_path(&report.ledger);
                let mut delivered = delivered_hashes(&log)?;
                for entry in &entries {
                    if delivered.contains(&entry.content_hash) {
                        info!(hash = %entry.content_hash, "Skipping append of already delivered entry");
                        report.skipped_duplicates += 1;
                        continue;
                    }
                    let receipt = self.publisher.publish(entry, &key, store_credential).await?;
                    record_delivery(
                        &log,
                        &Delivery::new(&entry.content_hash, &receipt.target, receipt.status),
                    )?;
                    delivered.insert(entry.content_hash.clone());
                    report.published.push(receipt);
                }
            }
        }

        Ok(report)
    }
}
