//! Remote store configuration.
//!
//! Accepts either an explicit tagged config:
//!
//! ```json
//! {"mode": "keyed_overwrite", "database_url": "https://x.firebaseio.com", "path_prefix": "issues"}
//! {"mode": "collection_append", "project_id": "p", "collection_prefix": "arena"}
//! ```
//!
//! or a Google service-account JSON, which is read as a collection-append
//! config for its `project_id`.
//!
//! Either mode runs on either backend: `database_url` selects the Realtime
//! Database, `project_id` selects Firestore (with an optional `api_base`,
//! e.g. the emulator at `http://localhost:8080/v1`).

use serde::Deserialize;

use crate::error::{Error, Result};

/// Document path prefix used when a keyed-overwrite config names none.
pub const DEFAULT_PATH_PREFIX: &str = "issues";

fn default_path_prefix() -> String {
    DEFAULT_PATH_PREFIX.to_string()
}

fn default_database() -> String {
    "(default)".to_string()
}

/// REST backend serving the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StoreBackend {
    /// Firebase Realtime Database.
    Realtime { database_url: String },
    /// Firestore. `api_base` overrides the public endpoint.
    Firestore {
        project_id: String,
        #[serde(default = "default_database")]
        database: String,
        #[serde(default)]
        api_base: Option<String>,
    },
}

impl StoreBackend {
    /// Firestore backend for `project_id` on the default database.
    #[must_use]
    pub fn firestore(project_id: impl Into<String>) -> Self {
        Self::Firestore {
            project_id: project_id.into(),
            database: default_database(),
            api_base: None,
        }
    }
}

/// Which remote store to publish to, and how.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Document upsert at `{path_prefix}/{issue_number}`.
    KeyedOverwrite {
        #[serde(flatten)]
        backend: StoreBackend,
        #[serde(default = "default_path_prefix")]
        path_prefix: String,
        #[serde(default)]
        access_token: Option<String>,
    },
    /// Collection add to `{collection_prefix}-{issue_number}`.
    CollectionAppend {
        #[serde(flatten)]
        backend: StoreBackend,
        #[serde(default)]
        collection_prefix: Option<String>,
        #[serde(default)]
        access_token: Option<String>,
    },
}

impl StoreConfig {
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        match self {
            Self::KeyedOverwrite { access_token, .. } | Self::CollectionAppend { access_token, .. } => {
                access_token.as_deref()
            }
        }
    }

    #[must_use]
    pub const fn backend(&self) -> &StoreBackend {
        match self {
            Self::KeyedOverwrite { backend, .. } | Self::CollectionAppend { backend, .. } => backend,
        }
    }
}

#[derive(Deserialize)]
struct ServiceAccount {
    #[serde(rename = "type")]
    kind: String,
    project_id: String,
}

/// Parse a remote store configuration blob.
///
/// # Errors
///
/// Returns a configuration error if the JSON is malformed or matches
/// neither accepted shape.
pub fn parse_store_config(raw: &str) -> Result<StoreConfig> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| Error::Configuration(format!("Invalid remote store configuration JSON: {e}")))?;

    if value.get("mode").is_some() {
        return serde_json::from_value(value)
            .map_err(|e| Error::Configuration(format!("Invalid remote store configuration: {e}")));
    }

    match serde_json::from_value::<ServiceAccount>(value) {
        Ok(account) if account.kind == "service_account" => {
            if account.project_id.trim().is_empty() {
                return Err(Error::Configuration(
                    "Invalid remote store configuration: service account has an empty project_id"
                        .to_string(),
                ));
            }
            Ok(StoreConfig::CollectionAppend {
                backend: StoreBackend::firestore(account.project_id),
                collection_prefix: None,
                access_token: None,
            })
        }
        _ => Err(Error::Configuration(
            "Invalid remote store configuration: expected a \"mode\" field or a service account"
                .to_string(),
        )),
    }
}
