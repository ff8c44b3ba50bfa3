//! In-process remote store.
//!
//! Backs `--dry-run` (payloads are captured instead of sent) and the
//! publisher tests. Can be told to answer every call with a failure status.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde_json::{Value, json};

use crate::config::Credential;
use crate::error::Result;

use super::{RemoteStore, StoreResponse};

/// Store holding documents and collections in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<String, Value>>,
    collections: Mutex<BTreeMap<String, Vec<Value>>>,
    failure: Mutex<Option<StoreResponse>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every following call with `status` and `body`, storing nothing.
    pub fn fail_with(&self, status: u16, body: &str) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(StoreResponse {
            status,
            body: body.to_string(),
        });
    }

    /// Snapshot of all documents.
    #[must_use]
    pub fn documents(&self) -> BTreeMap<String, Value> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn document(&self, path: &str) -> Option<Value> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Entries of a collection in insertion order.
    #[must_use]
    pub fn collection(&self, name: &str) -> Vec<Value> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of all collections.
    #[must_use]
    pub fn collections(&self) -> BTreeMap<String, Vec<Value>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn scripted_failure(&self) -> Option<StoreResponse> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RemoteStore for MemoryStore {
    async fn put_document(
        &self,
        path: &str,
        body: &Value,
        _credential: Option<&Credential>,
    ) -> Result<StoreResponse> {
        if let Some(failure) = self.scripted_failure() {
            return Ok(failure);
        }

        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), body.clone());

        Ok(StoreResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    async fn add_to_collection(
        &self,
        collection: &str,
        body: &Value,
        _credential: Option<&Credential>,
    ) -> Result<StoreResponse> {
        if let Some(failure) = self.scripted_failure() {
            return Ok(failure);
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .push(body.clone());

        Ok(StoreResponse {
            status: 200,
            body: json!({ "name": format!("{collection}/{id}") }).to_string(),
        })
    }
}
