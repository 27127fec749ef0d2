//! Injectable collaborator handles.
//!
//! [`CloudClients`] is constructed once at process startup and cloned into
//! whatever needs it. Initialisation never fails: a collaborator that is
//! not configured, or whose client cannot be built, is left as `None` and
//! a warning is logged. Callers turn a `None` handle into a configuration
//! error at the point of use.

use std::sync::Arc;
use std::time::Duration;

use crate::blob::{BlobStore, S3BlobStore};
use crate::config::CloudConfig;
use crate::documents::{DocumentStore, HttpDocumentStore};
use crate::generator::{HttpImageGenerator, ImageGenerator};

/// Shared handles to the external collaborators.
#[derive(Clone, Default)]
pub struct CloudClients {
    documents: Option<Arc<dyn DocumentStore>>,
    blobs: Option<Arc<dyn BlobStore>>,
    generator: Option<Arc<dyn ImageGenerator>>,
}

impl std::fmt::Debug for CloudClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudClients")
            .field("documents", &self.documents.is_some())
            .field("blobs", &self.blobs.is_some())
            .field("generator", &self.generator.is_some())
            .finish()
    }
}

impl CloudClients {
    /// A handle with no collaborators configured.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Build every collaborator `config` has settings for.
    pub async fn from_config(config: &CloudConfig) -> Self {
        let timeout = Duration::from_secs(config.http_timeout_secs);

        let documents: Option<Arc<dyn DocumentStore>> =
            match (&config.document_store_url, &config.document_store_token) {
                (Some(url), Some(token)) => {
                    match HttpDocumentStore::new(url.clone(), token.clone(), timeout) {
                        Ok(store) => {
                            tracing::info!(url = %url, "Document store client initialized");
                            Some(Arc::new(store))
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Document store client initialization failed");
                            None
                        }
                    }
                }
                _ => {
                    tracing::warn!(
                        "DOCUMENT_STORE_URL or DOCUMENT_STORE_TOKEN is not set; feedback will not be saved"
                    );
                    None
                }
            };

        let blobs: Option<Arc<dyn BlobStore>> =
            match (&config.feedback_bucket, config.public_base_url()) {
                (Some(bucket), Some(public_base_url)) => {
                    let store = S3BlobStore::from_env(bucket.clone(), public_base_url).await;
                    tracing::info!(bucket = %store.bucket(), "Blob store client initialized");
                    Some(Arc::new(store))
                }
                _ => {
                    tracing::warn!("FEEDBACK_BUCKET is not set; inline feedback images cannot be uploaded");
                    None
                }
            };

        let generator: Option<Arc<dyn ImageGenerator>> = match &config.generation_api_url {
            Some(url) => match HttpImageGenerator::new(url.clone(), timeout) {
                Ok(generator) => Some(Arc::new(generator)),
                Err(e) => {
                    tracing::error!(error = %e, "Generation client initialization failed");
                    None
                }
            },
            None => {
                tracing::warn!("GENERATION_API_URL is not set; image generation is unavailable");
                None
            }
        };

        Self {
            documents,
            blobs,
            generator,
        }
    }

    /// Replace the document store handle.
    pub fn with_documents(mut self, documents: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Replace the blob store handle.
    pub fn with_blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Replace the image generator handle.
    pub fn with_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn documents(&self) -> Option<&Arc<dyn DocumentStore>> {
        self.documents.as_ref()
    }

    pub fn blobs(&self) -> Option<&Arc<dyn BlobStore>> {
        self.blobs.as_ref()
    }

    pub fn generator(&self) -> Option<&Arc<dyn ImageGenerator>> {
        self.generator.as_ref()
    }
}
