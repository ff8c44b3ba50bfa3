//! Local append-only ledger of resolution records.
//!
//! Each issue identity gets one JSONL file,
//! `{output_dir}/{username}-{repo}-{issue_number}.jsonl`, and every build
//! appends one line to it:
//!
//! ```json
//! {"issue":{...},"model":"gpt-4o",...,"username":"octocat","repo":"widgets","issue_number":42,"content_hash":"ab12...","run_id":"...","recorded_at":"2025-01-20T10:00:00Z"}
//! ```
//!
//! Lines are never rewritten. The ledger is the recoverable source of truth:
//! it is written before anything is sent to the remote store.
//!
//! Collection appends are tracked in a delivery log beside the ledger
//! (`{username}-{repo}-{issue_number}.published.jsonl`); see [`delivered_hashes`].
//!
//! Appends take no lock. Callers must not append to the same path from two
//! processes at once.

mod delivery;
mod entry;
mod file;
mod hash;

pub use delivery::{Delivery, delivered_hashes, delivery_path, record_delivery};
pub use entry::LedgerEntry;
pub use file::{append_entry, count_lines, latest_for_issue, ledger_path, read_ledger};
pub use hash::content_hash;
