//! Feedback submission pipeline.
//!
//! Each submission moves through `Resolve -> Persist` and ends either
//! persisted or rejected:
//!
//! 1. **Resolve**: an inline image data URI is decoded and uploaded as a
//!    public blob; a durable URL is used as is. Inline data that is not an
//!    image is rejected without uploading.
//! 2. **Persist**: a [`FeedbackRecord`] pointing at the resolved URL is
//!    inserted into the feedback collection.
//! 3. **Classify**: any rejection is mapped to one [`FailureKind`] and its
//!    fixed message. The raw error is logged, never returned.
//!
//! A submission performs at most one upload and one insert and never
//! retries. Re-submitting creates a new record.

use std::sync::Arc;

use lumiere_cloud::blob::{generate_blob_key, BlobObject};
use lumiere_cloud::{BlobError, CloudClients, DocumentStoreError};
use lumiere_core::error::CoreError;
use lumiere_core::failure::FailureKind;
use lumiere_core::feedback::{
    validate_feedback_input, FeedbackInput, FeedbackRecord, StoredFeedback,
    DEFAULT_FEEDBACK_COLLECTION, FEEDBACK_ORDER_FIELD,
};
use lumiere_core::image_ref::{is_inline, sniff_format, ImageReference, InlineImage};
use lumiere_core::types::DocumentId;

/// Message returned for a persisted submission.
pub const SUBMIT_SUCCESS_MESSAGE: &str = "Feedback submitted successfully and saved!";

/// Message returned when an inline image arrives but no blob store is set up.
pub const IMAGE_STORAGE_NOT_CONFIGURED_MESSAGE: &str =
    "Server configuration error: Image storage is not configured, so this image cannot be uploaded. Please submit feedback for a hosted image or contact support.";

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What the caller learns about a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackOutcome {
    pub success: bool,
    /// User-facing text; never contains raw collaborator errors.
    pub message: String,
    /// Failure category when `success` is false.
    pub failure: Option<FailureKind>,
    /// Id of the new document when `success` is true.
    pub document_id: Option<DocumentId>,
    /// Durable URL the record points at when `success` is true.
    pub image_url: Option<String>,
}

impl FeedbackOutcome {
    fn persisted(document_id: DocumentId, image_url: String) -> Self {
        Self {
            success: true,
            message: SUBMIT_SUCCESS_MESSAGE.to_string(),
            failure: None,
            document_id: Some(document_id),
            image_url: Some(image_url),
        }
    }

    fn rejected(kind: FailureKind, message: String) -> Self {
        Self {
            success: false,
            message,
            failure: Some(kind),
            document_id: None,
            image_url: None,
        }
    }
}

/// Errors from [`FeedbackPipeline::list`].
#[derive(Debug, thiserror::Error)]
pub enum FeedbackListError {
    /// The document store was never configured.
    #[error("Server configuration error: Unable to connect to the feedback database.")]
    NotConfigured,

    /// The query failed; details are logged.
    #[error("Failed to fetch feedback")]
    Fetch,
}

impl FeedbackListError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::NotConfigured => FailureKind::Configuration,
            Self::Fetch => FailureKind::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// Rejections (internal)
// ---------------------------------------------------------------------------

/// Why a submission was rejected, before classification.
#[derive(Debug, thiserror::Error)]
enum Rejection {
    #[error(transparent)]
    Validation(CoreError),

    #[error("Document store is not configured")]
    DocumentsNotConfigured,

    #[error("Blob store is not configured")]
    BlobsNotConfigured,

    #[error("Inline data is not an image: {0}")]
    NotImage(String),

    #[error("Inline image could not be decoded: {0}")]
    Decode(CoreError),

    #[error(transparent)]
    Upload(#[from] BlobError),

    #[error("Feedback record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Persist(#[from] DocumentStoreError),
}

impl Rejection {
    fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Validation,
            Self::DocumentsNotConfigured | Self::BlobsNotConfigured => FailureKind::Configuration,
            Self::NotImage(_) | Self::Decode(_) | Self::Upload(_) => FailureKind::Upload,
            Self::Serialize(_) => FailureKind::Unknown,
            Self::Persist(e) => e.failure_kind(),
        }
    }

    fn user_message(&self, kind: FailureKind) -> String {
        match self {
            Self::Validation(CoreError::Validation(detail)) => detail.clone(),
            Self::BlobsNotConfigured => IMAGE_STORAGE_NOT_CONFIGURED_MESSAGE.to_string(),
            _ => kind.user_message().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// FeedbackPipeline
// ---------------------------------------------------------------------------

/// Persists reviewer feedback about generated images.
///
/// Holds no mutable state; concurrent submissions are independent.
#[derive(Debug, Clone)]
pub struct FeedbackPipeline {
    clients: CloudClients,
    collection: Arc<str>,
}

impl FeedbackPipeline {
    /// Pipeline writing to the default feedback collection.
    pub fn new(clients: CloudClients) -> Self {
        Self::with_collection(clients, DEFAULT_FEEDBACK_COLLECTION)
    }

    /// Pipeline writing to `collection`.
    pub fn with_collection(clients: CloudClients, collection: &str) -> Self {
        Self {
            clients,
            collection: Arc::from(collection),
        }
    }

    /// Submit one piece of feedback. Never fails; see [`FeedbackOutcome`].
    pub async fn submit(&self, input: &FeedbackInput) -> FeedbackOutcome {
        match self.run(input).await {
            Ok((document_id, image_url)) => {
                tracing::info!(
                    collection = %self.collection,
                    document_id = %document_id,
                    "Feedback persisted"
                );
                FeedbackOutcome::persisted(document_id, image_url)
            }
            Err(rejection) => {
                let kind = rejection.failure_kind();
                tracing::error!(
                    collection = %self.collection,
                    kind = %kind,
                    error = %rejection,
                    "Feedback submission rejected"
                );
                FeedbackOutcome::rejected(kind, rejection.user_message(kind))
            }
        }
    }

    async fn run(&self, input: &FeedbackInput) -> Result<(DocumentId, String), Rejection> {
        validate_feedback_input(input).map_err(Rejection::Validation)?;

        // Checked before uploading so an unconfigured store never leaves an
        // orphaned blob behind.
        let documents = self
            .clients
            .documents()
            .ok_or(Rejection::DocumentsNotConfigured)?;

        let image_url = self.resolve(input.image_reference.trim()).await?;

        let record = FeedbackRecord::new(input, image_url.clone(), chrono::Utc::now());
        let value = serde_json::to_value(&record)?;
        let document_id = documents.insert(&self.collection, &value).await?;

        Ok((document_id, image_url))
    }

    /// Turn a reference into a durable URL, uploading inline data.
    async fn resolve(&self, raw: &str) -> Result<String, Rejection> {
        match ImageReference::parse(raw) {
            Ok(ImageReference::Durable(url)) => Ok(url),
            Ok(ImageReference::Inline(inline)) => self.upload(&inline).await,
            Err(e) if is_inline(raw) => Err(Rejection::Decode(e)),
            Err(e) => Err(Rejection::Validation(e)),
        }
    }

    /// Upload inline image data as a public blob.
    ///
    /// Only `image/*` payloads whose bytes carry a known image signature are
    /// written; anything else is rejected before the blob store is touched.
    async fn upload(&self, inline: &InlineImage) -> Result<String, Rejection> {
        if !inline.is_image() {
            return Err(Rejection::NotImage(inline.mime_type().to_string()));
        }
        let bytes = inline.decode().map_err(Rejection::Decode)?;
        if sniff_format(&bytes).is_none() {
            return Err(Rejection::NotImage(format!(
                "{} payload has no image signature",
                inline.mime_type()
            )));
        }

        let blobs = self
            .clients
            .blobs()
            .ok_or(Rejection::BlobsNotConfigured)?;

        let object = BlobObject {
            key: generate_blob_key(inline.extension()),
            content_type: inline.mime_type().to_string(),
            bytes,
            public: true,
        };
        tracing::debug!(key = %object.key, size = object.bytes.len(), "Uploading inline feedback image");

        Ok(blobs.upload(object).await?)
    }

    /// All feedback, newest first.
    ///
    /// Documents that do not parse as feedback records are skipped.
    pub async fn list(&self) -> Result<Vec<StoredFeedback>, FeedbackListError> {
        let documents = self
            .clients
            .documents()
            .ok_or(FeedbackListError::NotConfigured)?;

        let rows = documents
            .query_all(&self.collection, FEEDBACK_ORDER_FIELD)
            .await
            .map_err(|e| {
                tracing::error!(collection = %self.collection, error = %e, "Error fetching feedback");
                FeedbackListError::Fetch
            })?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<StoredFeedback>(row) {
                Ok(stored) => Some(stored),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed feedback document");
                    None
                }
            })
            .collect())
    }
}
