//! Remote publication of results.
//!
//! A [`Publisher`] owns a [`RemoteStore`] client and a [`DeliveryMode`]. The
//! mode is part of the publisher's type-visible configuration rather than a
//! choice each caller makes:
//!
//! - [`DeliveryMode::KeyedOverwrite`] upserts a document at a key derived from
//!   the issue number. Publishing the same payload twice leaves the same
//!   remote state as publishing it once, so the call is safe to retry.
//! - [`DeliveryMode::CollectionAppend`] adds a new entry to a collection
//!   named after the issue number. Every call adds an entry; callers dedupe
//!   before calling.
//!
//! The publisher never retries. Clients are built once by the command and
//! passed in; there is no process-wide registry.
//!
//! # Stores
//!
//! - [`HttpStore`] - Firebase Realtime Database / Firestore REST over reqwest
//! - [`MemoryStore`] - in-process store for `--dry-run` and tests

pub mod http;
pub mod memory;

pub use http::{HttpStore, to_firestore_document};
pub use memory::MemoryStore;

use std::future::Future;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Credential, StoreConfig};
use crate::error::{Error, Result};
use crate::model::PublicationKey;

/// Status and body of a store response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreResponse {
    pub status: u16,
    pub body: String,
}

impl StoreResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// A remote key-value / document store.
///
/// Implementations return `Ok` for any response the server sent, successful
/// or not; the publisher decides what counts as failure. `Err` is reserved
/// for requests that never got a response.
pub trait RemoteStore: Send + Sync {
    /// Create or replace the document at `path`.
    fn put_document(
        &self,
        path: &str,
        body: &serde_json::Value,
        credential: Option<&Credential>,
    ) -> impl Future<Output = Result<StoreResponse>> + Send;

    /// Add a new entry to `collection`.
    fn add_to_collection(
        &self,
        collection: &str,
        body: &serde_json::Value,
        credential: Option<&Credential>,
    ) -> impl Future<Output = Result<StoreResponse>> + Send;
}

/// How records are delivered to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Upsert `{path_prefix}/{issue_number}`.
    KeyedOverwrite { path_prefix: String },
    /// Append to `{collection_prefix}-{issue_number}`, or `{issue_number}`
    /// without a prefix.
    CollectionAppend { collection_prefix: Option<String> },
}

impl DeliveryMode {
    /// Delivery mode matching a store configuration.
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        match config {
            StoreConfig::KeyedOverwrite { path_prefix, .. } => Self::KeyedOverwrite {
                path_prefix: path_prefix.clone(),
            },
            StoreConfig::CollectionAppend {
                collection_prefix, ..
            } => Self::CollectionAppend {
                collection_prefix: collection_prefix.clone(),
            },
        }
    }

    /// Whether repeating a publish is free of extra side effects.
    #[must_use]
    pub const fn is_idempotent(&self) -> bool {
        matches!(self, Self::KeyedOverwrite { .. })
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KeyedOverwrite { .. } => "keyed_overwrite",
            Self::CollectionAppend { .. } => "collection_append",
        }
    }

    /// Remote document path or collection name for `key`.
    #[must_use]
    pub fn target(&self, key: &PublicationKey) -> String {
        let id = key.remote_id();
        match self {
            Self::KeyedOverwrite { path_prefix } => {
                let prefix = path_prefix.trim_matches('/');
                if prefix.is_empty() {
                    id
                } else {
                    format!("{prefix}/{id}")
                }
            }
            Self::CollectionAppend { collection_prefix } => match collection_prefix.as_deref() {
                Some(prefix) if !prefix.is_empty() => format!("{prefix}-{id}"),
                _ => id,
            },
        }
    }
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub mode: &'static str,
    pub target: String,
    pub status: u16,
}

/// Uploads records to a remote store.
pub struct Publisher<S> {
    store: S,
    mode: DeliveryMode,
}

impl<S: RemoteStore> Publisher<S> {
    pub const fn new(store: S, mode: DeliveryMode) -> Self {
        Self { store, mode }
    }

    #[must_use]
    pub const fn mode(&self) -> &DeliveryMode {
        &self.mode
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Publish `record` under `key`.
    ///
    /// # Errors
    ///
    /// Returns `Publish` with the response status and body if the store
    /// answers with a non-success status or cannot be reached, and a JSON
    /// error if the record does not serialize to an object.
    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        record: &T,
        key: &PublicationKey,
        credential: Option<&Credential>,
    ) -> Result<PublishReceipt> {
        let payload = serde_json::to_value(record)?;
        let target = self.mode.target(key);

        info!(mode = self.mode.as_str(), target = %target, "Publishing to remote store");

        let response = match &self.mode {
            DeliveryMode::KeyedOverwrite { .. } => {
                self.store.put_document(&target, &payload, credential).await
            }
            DeliveryMode::CollectionAppend { .. } => {
                self.store.add_to_collection(&target, &payload, credential).await
            }
        };

        let response = match response {
            Ok(r) => r,
            Err(Error::Publish { status, body, .. }) => {
                return Err(self.failure(target, status, body));
            }
            Err(e) => return Err(e),
        };

        if !response.is_success() {
            warn!(target = %target, status = response.status, "Remote store rejected publish");
            return Err(self.failure(target, response.status, response.body));
        }

        info!(target = %target, status = response.status, "Data successfully published");
        Ok(PublishReceipt {
            mode: self.mode.as_str(),
            target,
            status: response.status,
        })
    }

    fn failure(&self, target: String, status: u16, body: String) -> Error {
        Error::Publish {
            target,
            status,
            body,
            idempotent: self.mode.is_idempotent(),
        }
    }
}

impl Publisher<HttpStore> {
    /// Build the HTTP client and delivery mode for a store configuration.
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(HttpStore::from_config(config), DeliveryMode::from_config(config))
    }
}
