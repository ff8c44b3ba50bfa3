//! Content hashing for ledger entries.
//!
//! Hashing the serialized JSON of a record gives a stable fingerprint that
//! is independent of when or in which run the record was written, so two
//! appends of identical content can be recognised.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Compute a SHA256 hash of a serializable value.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized to JSON.
pub fn content_hash<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestRecord {
        model: String,
        patch: String,
    }

    #[test]
    fn test_content_hash_deterministic() {
        let record = TestRecord {
            model: "model-A".into(),
            patch: "diff".into(),
        };

        let hash1 = content_hash(&record).unwrap();
        let hash2 = content_hash(&record).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        let a = TestRecord {
            model: "model-A".into(),
            patch: "diff".into(),
        };
        let b = TestRecord {
            model: "model-A".into(),
            patch: "diff2".into(),
        };

        assert_ne!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }
}
