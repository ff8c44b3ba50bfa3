//! Pairing two models' records for one issue.

use crate::error::{Error, Result};
use crate::model::{ComparisonRecord, ResolutionRecord};

/// Merge two resolution records into a comparison record.
///
/// Fields are labelled by position: `a` becomes `model_a`/`patch_a`.
///
/// # Errors
///
/// Returns `Integrity` if either record belongs to a different issue number
/// or both come from the same model.
pub fn merge(issue_number: u64, a: &ResolutionRecord, b: &ResolutionRecord) -> Result<ComparisonRecord> {
    for (label, record) in [("first", a), ("second", b)] {
        if record.issue().number != issue_number {
            return Err(Error::Integrity(format!(
                "{label} record is for issue #{}, expected #{issue_number}",
                record.issue().number
            )));
        }
    }

    if a.model() == b.model() {
        return Err(Error::Integrity(format!(
            "both records for issue #{issue_number} come from model '{}'",
            a.model()
        )));
    }

    Ok(ComparisonRecord::new(issue_number, a, b))
}
