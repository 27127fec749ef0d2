//! Document store client for feedback records.
//!
//! [`HttpDocumentStore`] speaks a small JSON REST dialect:
//!
//! | Operation   | Request                                                         |
//! |-------------|-----------------------------------------------------------------|
//! | insert      | `POST {base}/collections/{name}/documents` -> `{"id": "..."}`   |
//! | query_all   | `GET {base}/collections/{name}/documents?orderBy=f&direction=desc` -> `[{"id": "...", ...}]` |
//!
//! Every request carries `Authorization: Bearer <token>`.

use std::time::Duration;

use async_trait::async_trait;
use lumiere_core::failure::{classify_http_status, classify_remote_failure, FailureKind};
use lumiere_core::types::DocumentId;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors from a [`DocumentStore`].
#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    /// The store rejected our credentials for this operation.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// The store (or its backing project) is temporarily unavailable.
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store returned some other non-2xx status.
    #[error("Document store API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A store-specific failure with an optional numeric status code.
    #[error("Document store error: {message}")]
    Other { code: Option<i32>, message: String },
}

impl DocumentStoreError {
    /// Map this error onto the user-facing taxonomy.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Permission(_) => FailureKind::Permission,
            Self::Unavailable(_) => FailureKind::Unavailable,
            Self::Request(_) => FailureKind::Unknown,
            Self::Api { status, body } => classify_http_status(*status)
                .unwrap_or_else(|| classify_remote_failure(None, body)),
            Self::Other { code, message } => classify_remote_failure(*code, message),
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Document store collaborator.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert `record` into `collection`, returning the new document id.
    async fn insert(
        &self,
        collection: &str,
        record: &serde_json::Value,
    ) -> Result<DocumentId, DocumentStoreError>;

    /// Every document in `collection`, ordered by `order_by` descending.
    /// Each returned object carries its document id under `"id"`.
    async fn query_all(
        &self,
        collection: &str,
        order_by: &str,
    ) -> Result<Vec<serde_json::Value>, DocumentStoreError>;
}

// ---------------------------------------------------------------------------
// HttpDocumentStore
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct InsertResponse {
    id: DocumentId,
}

/// [`DocumentStore`] over HTTP/JSON.
pub struct HttpDocumentStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpDocumentStore {
    /// Build a client for `base_url` authenticating with `token`.
    pub fn new(base_url: String, token: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, token))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn documents_url(&self, collection: &str) -> String {
        format!("{}/collections/{}/documents", self.base_url, collection)
    }

    /// Turn a non-2xx response into the matching error variant.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, DocumentStoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(match status.as_u16() {
            401 | 403 => DocumentStoreError::Permission(body),
            503 => DocumentStoreError::Unavailable(body),
            status => DocumentStoreError::Api { status, body },
        })
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn insert(
        &self,
        collection: &str,
        record: &serde_json::Value,
    ) -> Result<DocumentId, DocumentStoreError> {
        let response = self
            .client
            .post(self.documents_url(collection))
            .bearer_auth(&self.token)
            .json(record)
            .send()
            .await?;

        let created: InsertResponse = Self::ensure_success(response).await?.json().await?;
        tracing::debug!(collection, id = %created.id, "Document inserted");
        Ok(created.id)
    }

    async fn query_all(
        &self,
        collection: &str,
        order_by: &str,
    ) -> Result<Vec<serde_json::Value>, DocumentStoreError> {
        let response = self
            .client
            .get(self.documents_url(collection))
            .bearer_auth(&self.token)
            .query(&[("orderBy", order_by), ("direction", "desc")])
            .send()
            .await?;

        Ok(Self::ensure_success(response).await?.json().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_failure_kinds() {
        assert_eq!(
            DocumentStoreError::Permission("no".into()).failure_kind(),
            FailureKind::Permission
        );
        assert_eq!(
            DocumentStoreError::Unavailable("down".into()).failure_kind(),
            FailureKind::Unavailable
        );
        assert_eq!(
            DocumentStoreError::Api { status: 500, body: "boom".into() }.failure_kind(),
            FailureKind::Unknown
        );
    }

    #[test]
    fn api_error_body_is_inspected_for_markers() {
        let err = DocumentStoreError::Api {
            status: 400,
            body: "Missing or insufficient permissions.".into(),
        };
        assert_eq!(err.failure_kind(), FailureKind::Permission);

        let err = DocumentStoreError::Other {
            code: None,
            message: "The project is unavailable".into(),
        };
        assert_eq!(err.failure_kind(), FailureKind::Unavailable);
    }

    #[test]
    fn documents_url_trims_trailing_slash() {
        let store = HttpDocumentStore::with_client(
            reqwest::Client::new(),
            "https://docs.example.com/v1/".into(),
            "token".into(),
        );
        assert_eq!(
            store.documents_url("imageFeedback"),
            "https://docs.example.com/v1/collections/imageFeedback/documents"
        );
    }

    #[test]
    fn request_error_display() {
        let req_err = reqwest::Client::new().get("://bad").build().unwrap_err();
        let err = DocumentStoreError::Request(req_err);
        assert!(err.to_string().contains("HTTP request failed"));
        assert_eq!(err.failure_kind(), FailureKind::Unknown);
    }
}
