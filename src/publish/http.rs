//! HTTP remote stores.
//!
//! Two Firebase backends, both over plain REST:
//!
//! - **Realtime Database**: `PUT {database_url}/{path}.json` replaces a
//!   document, `POST {database_url}/{collection}.json` pushes a new child.
//! - **Firestore**: `PATCH .../documents/{path}` replaces a document,
//!   `POST .../documents/{collection}` adds one. Payloads are converted to
//!   Firestore's typed `fields` representation.
//!
//! Either backend serves either delivery mode. The bearer credential, when
//! present, is sent as `Authorization: Bearer`.

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::{Credential, StoreBackend, StoreConfig};
use crate::error::{Error, Result};

use super::{RemoteStore, StoreResponse};

/// Public Firestore REST endpoint.
pub const FIRESTORE_API: &str = "https://firestore.googleapis.com/v1";

#[derive(Debug, Clone)]
enum Backend {
    Realtime {
        database_url: String,
    },
    Firestore {
        api_base: String,
        project_id: String,
        database: String,
    },
}

/// Remote store client over reqwest.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    backend: Backend,
}

impl HttpStore {
    /// Client for a Firebase Realtime Database.
    pub fn realtime(database_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            backend: Backend::Realtime {
                database_url: database_url.into().trim_end_matches('/').to_string(),
            },
        }
    }

    /// Client for a Firestore database served at `api_base`.
    pub fn firestore(
        api_base: impl Into<String>,
        project_id: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            backend: Backend::Firestore {
                api_base: api_base.into().trim_end_matches('/').to_string(),
                project_id: project_id.into(),
                database: database.into(),
            },
        }
    }

    /// Client matching a store configuration.
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        match config.backend() {
            StoreBackend::Realtime { database_url } => Self::realtime(database_url.as_str()),
            StoreBackend::Firestore {
                project_id,
                database,
                api_base,
            } => Self::firestore(
                api_base.as_deref().unwrap_or(FIRESTORE_API),
                project_id.as_str(),
                database.as_str(),
            ),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        match &self.backend {
            Backend::Realtime { database_url } => format!("{database_url}/{path}.json"),
            Backend::Firestore {
                api_base,
                project_id,
                database,
            } => format!("{api_base}/projects/{project_id}/databases/{database}/documents/{path}"),
        }
    }

    fn body(&self, payload: &Value) -> Value {
        match self.backend {
            Backend::Realtime { .. } => payload.clone(),
            Backend::Firestore { .. } => to_firestore_document(payload),
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        idempotent: bool,
        credential: Option<&Credential>,
    ) -> Result<StoreResponse> {
        let request = match credential {
            Some(c) => request.bearer_auth(c.expose()),
            None => request,
        };

        let response = request.send().await.map_err(|e| Error::Publish {
            target: url.to_string(),
            status: 0,
            body: format!("request failed: {e}"),
            idempotent,
        })?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => format!("failed to read response body: {e}"),
        };
        debug!(url, status, "Remote store responded");

        Ok(StoreResponse { status, body })
    }
}

impl RemoteStore for HttpStore {
    async fn put_document(
        &self,
        path: &str,
        body: &Value,
        credential: Option<&Credential>,
    ) -> Result<StoreResponse> {
        let url = self.url(path);
        let request = match self.backend {
            Backend::Realtime { .. } => self.client.put(&url),
            Backend::Firestore { .. } => self.client.patch(&url),
        };
        self.send(request.json(&self.body(body)), &url, true, credential)
            .await
    }

    async fn add_to_collection(
        &self,
        collection: &str,
        body: &Value,
        credential: Option<&Credential>,
    ) -> Result<StoreResponse> {
        let url = self.url(collection);
        let request = self.client.post(&url).json(&self.body(body));
        self.send(request, &url, false, credential).await
    }
}

/// Convert a JSON payload into a Firestore document body.
///
/// Objects become `{"fields": {...}}`. Any other top-level value is stored
/// under a single `value` field.
#[must_use]
pub fn to_firestore_document(payload: &Value) -> Value {
    let fields = match payload {
        Value::Object(map) => firestore_fields(map),
        other => {
            let mut fields = Map::new();
            fields.insert("value".to_string(), firestore_value(other));
            fields
        }
    };
    json!({ "fields": fields })
}

fn firestore_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), firestore_value(v)))
        .collect()
}

fn firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                // int64 values travel as strings.
                json!({ "integerValue": n.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(firestore_value).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": firestore_fields(map) } }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PublicationKey;
    use crate::publish::{DeliveryMode, Publisher};
    use crate::testing::{serve, serve_raw};

    #[test]
    fn test_realtime_urls() {
        let store = HttpStore::realtime("https://arena.firebaseio.com/");
        assert_eq!(store.url("issues/42"), "https://arena.firebaseio.com/issues/42.json");
        assert_eq!(store.url("/42/"), "https://arena.firebaseio.com/42.json");
    }

    #[test]
    fn test_firestore_urls() {
        let store = HttpStore::firestore(FIRESTORE_API, "arena-prod", "(default)");
        assert_eq!(
            store.url("arena-42"),
            "https://firestore.googleapis.com/v1/projects/arena-prod/databases/(default)/documents/arena-42"
        );
    }

    #[test]
    fn test_from_config_picks_backend() {
        let keyed = StoreConfig::KeyedOverwrite {
            backend: StoreBackend::Realtime {
                database_url: "https://db".into(),
            },
            path_prefix: "issues".into(),
            access_token: None,
        };
        assert!(matches!(HttpStore::from_config(&keyed).backend, Backend::Realtime { .. }));

        let append = StoreConfig::CollectionAppend {
            backend: StoreBackend::firestore("arena-prod"),
            collection_prefix: None,
            access_token: None,
        };
        assert_eq!(
            HttpStore::from_config(&append).url("c"),
            "https://firestore.googleapis.com/v1/projects/arena-prod/databases/(default)/documents/c"
        );
    }

    #[test]
    fn test_firestore_document_conversion() {
        let payload = json!({
            "issue_number": 42,
            "model": "gpt-4o",
            "score": 0.5,
            "error": null,
            "ok": true,
            "history": [{"action": "run"}],
        });

        let doc = to_firestore_document(&payload);
        let fields = &doc["fields"];

        assert_eq!(fields["issue_number"], json!({"integerValue": "42"}));
        assert_eq!(fields["model"], json!({"stringValue": "gpt-4o"}));
        assert_eq!(fields["score"], json!({"doubleValue": 0.5}));
        assert_eq!(fields["error"], json!({"nullValue": null}));
        assert_eq!(fields["ok"], json!({"booleanValue": true}));
        assert_eq!(
            fields["history"]["arrayValue"]["values"][0]["mapValue"]["fields"]["action"],
            json!({"stringValue": "run"})
        );
    }

    #[test]
    fn test_firestore_scalar_payload_is_wrapped() {
        let doc = to_firestore_document(&json!("just text"));
        assert_eq!(doc["fields"]["value"], json!({"stringValue": "just text"}));
    }

    #[test]
    fn test_realtime_body_is_unchanged() {
        let store = HttpStore::realtime("https://db");
        let payload = json!({"a": 1});
        assert_eq!(store.body(&payload), payload);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_publish_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let store = HttpStore::realtime("http://127.0.0.1:9");
        let err = store
            .put_document("issues/42", &json!({"a": 1}), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Publish { status: 0, idempotent: true, .. }));
    }

    #[tokio::test]
    async fn test_keyed_overwrite_puts_with_bearer_and_surfaces_error_body() {
        let (base, requests) =
            serve(|_| ("500 Internal Server Error", r#"{"error":"database unavailable"}"#.into())).await;
        let publisher = Publisher::new(
            HttpStore::realtime(base),
            DeliveryMode::KeyedOverwrite {
                path_prefix: "issues".into(),
            },
        );
        let key = PublicationKey::new("user", "repo", 42).unwrap();

        let err = publisher
            .publish(&json!({"issue_number": 42}), &key, Some(&Credential::new("secret-token")))
            .await
            .unwrap_err();

        match err {
            Error::Publish {
                target,
                status,
                body,
                idempotent,
            } => {
                assert_eq!(target, "issues/42");
                assert_eq!(status, 500);
                assert_eq!(body, r#"{"error":"database unavailable"}"#);
                assert!(idempotent);
            }
            other => panic!("unexpected error: {other}"),
        }

        let request = requests.lock().unwrap()[0].clone();
        assert!(request.starts_with("PUT /issues/42.json HTTP/1.1\r\n"), "{request}");
        assert!(
            request.to_ascii_lowercase().contains("\r\nauthorization: bearer secret-token\r\n"),
            "{request}"
        );
        assert!(request.ends_with(r#"{"issue_number":42}"#), "{request}");
    }

    #[tokio::test]
    async fn test_firestore_collection_append_posts_typed_fields() {
        let (base, requests) = serve(|_| ("200 OK", r#"{"name":"arena-42/abc"}"#.into())).await;
        let store = HttpStore::firestore(format!("{base}/v1"), "p", "(default)");

        let response = store
            .add_to_collection("arena-42", &json!({"model": "a"}), None)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"name":"arena-42/abc"}"#);
        let request = requests.lock().unwrap()[0].clone();
        assert!(
            request.starts_with("POST /v1/projects/p/databases/(default)/documents/arena-42 HTTP/1.1\r\n"),
            "{request}"
        );
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
        assert!(request.contains(r#"{"fields":{"model":{"stringValue":"a"}}}"#), "{request}");
    }

    #[tokio::test]
    async fn test_keyed_overwrite_on_firestore_patches() {
        let (base, requests) = serve(|_| ("200 OK", "{}".into())).await;
        let config = StoreConfig::KeyedOverwrite {
            backend: StoreBackend::Firestore {
                project_id: "p".into(),
                database: "(default)".into(),
                api_base: Some(base),
            },
            path_prefix: "issues".into(),
            access_token: None,
        };

        let response = HttpStore::from_config(&config)
            .put_document("issues/42", &json!({"a": 1}), None)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        let request = requests.lock().unwrap()[0].clone();
        assert!(
            request.starts_with("PATCH /projects/p/databases/(default)/documents/issues/42 HTTP/1.1\r\n"),
            "{request}"
        );
    }

    #[tokio::test]
    async fn test_collection_append_on_realtime_posts() {
        let (base, requests) = serve(|_| ("200 OK", r#"{"name":"-Nabc"}"#.into())).await;
        let config = StoreConfig::CollectionAppend {
            backend: StoreBackend::Realtime { database_url: base },
            collection_prefix: Some("arena".into()),
            access_token: None,
        };

        let response = HttpStore::from_config(&config)
            .add_to_collection("arena-42", &json!({"a": 1}), None)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        let request = requests.lock().unwrap()[0].clone();
        assert!(request.starts_with("POST /arena-42.json HTTP/1.1\r\n"), "{request}");
        assert!(request.ends_with(r#"{"a":1}"#), "{request}");
    }

    #[tokio::test]
    async fn test_truncated_body_is_reported_in_place_of_body() {
        let (base, _requests) = serve_raw(|_| {
            "HTTP/1.1 502 Bad Gateway\r\nContent-Length: 100\r\nConnection: close\r\n\r\npartial".to_string()
        })
        .await;

        let response = HttpStore::realtime(base)
            .put_document("issues/42", &json!({"a": 1}), None)
            .await
            .unwrap();

        assert_eq!(response.status, 502);
        assert!(response.body.starts_with("failed to read response body:"), "{}", response.body);
    }
}
