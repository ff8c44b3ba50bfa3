//! Command implementations.

pub mod completions;
pub mod merge;
pub mod resolve;
pub mod version;

use serde_json::json;

use crate::config::{DEFAULT_PATH_PREFIX, StoreConfig};
use crate::error::{Error, Result};
use crate::publish::{DeliveryMode, MemoryStore};

/// Create the runtime a command drives its async work on.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

fn missing_store() -> Error {
    Error::Configuration(
        "No remote store configured, set via --remote-store or REMOTE_STORE_CONFIG".to_string(),
    )
}

/// Delivery mode for `--dry-run`: the configured one, else keyed overwrite.
fn dry_run_mode(store: Option<&StoreConfig>) -> DeliveryMode {
    store.map_or_else(
        || DeliveryMode::KeyedOverwrite {
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
        },
        DeliveryMode::from_config,
    )
}

/// Everything a dry run would have sent.
fn captured_payloads(store: &MemoryStore) -> serde_json::Value {
    json!({
        "documents": store.documents(),
        "collections": store.collections(),
    })
}
