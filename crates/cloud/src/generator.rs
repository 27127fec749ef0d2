//! Client for the external image-generation service.
//!
//! Sends `POST {base}/generate` with `{"prompt": <payload>}` where the
//! payload is either the prompt text or the multi-part sequence built by
//! [`lumiere_core::generation::build_generation_payload`]. The service
//! answers `{"imageReference": "<data URI or URL>"}`.

use std::time::Duration;

use async_trait::async_trait;
use lumiere_core::generation::GenerationPayload;
use serde::{Deserialize, Serialize};

/// Errors from an [`ImageGenerator`].
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Generation API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The service answered 2xx without an image reference.
    #[error("Generation API returned no image")]
    EmptyResponse,
}

/// Image-generation collaborator. Opaque to the core.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image and return its reference.
    async fn generate(&self, payload: &GenerationPayload) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    prompt: &'a GenerationPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    image_reference: Option<String>,
}

/// [`ImageGenerator`] over HTTP/JSON.
pub struct HttpImageGenerator {
    client: reqwest::Client,
    api_url: String,
}

impl HttpImageGenerator {
    /// Create a client for the service at `api_url`, e.g. `http://host:8080`.
    pub fn new(api_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(&self, payload: &GenerationPayload) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(format!("{}/generate", self.api_url))
            .json(&GenerateBody { prompt: payload })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed
            .image_reference
            .filter(|reference| !reference.is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}
