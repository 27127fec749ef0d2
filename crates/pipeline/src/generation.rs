//! Generation flow: input -> payload -> generator -> history.

use std::sync::Arc;

use lumiere_cloud::ImageGenerator;
use lumiere_core::error::CoreError;
use lumiere_core::failure::FailureKind;
use lumiere_core::generation::{build_generation_payload, validate_generation_input};
use lumiere_core::image_ref::{is_durable_url, InlineImage};
use lumiere_history::{HistoryCache, PersistOutcome};

/// A successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Reference returned by the generator (data URI or durable URL).
    pub image_reference: String,
    /// How recording it in history went.
    pub history: PersistOutcome,
}

/// Why a generation produced no image.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The prompt or reference images are invalid.
    #[error("{0}")]
    Validation(String),

    /// No generator was configured at startup.
    #[error("Image generation is not configured. Please contact support.")]
    NotConfigured,

    /// The generator call failed; details are logged.
    #[error("Photo generation failed. Please try again.")]
    Failed,

    /// The generator answered with something that is not an image.
    #[error("Failed to generate photo: Invalid data returned from AI.")]
    InvalidResult,
}

impl GenerateError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Validation,
            Self::NotConfigured => FailureKind::Configuration,
            Self::Failed | Self::InvalidResult => FailureKind::Unknown,
        }
    }
}

impl From<CoreError> for GenerateError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error while building generation request");
                Self::Failed
            }
        }
    }
}

/// Runs one generation at a time against a shared history.
#[derive(Clone)]
pub struct GenerationFlow {
    generator: Option<Arc<dyn ImageGenerator>>,
}

impl GenerationFlow {
    pub fn new(generator: Option<Arc<dyn ImageGenerator>>) -> Self {
        Self { generator }
    }

    /// Generate an image from `prompt` and `references`, then add it to
    /// `history`.
    ///
    /// Taking `history` by `&mut` keeps history mutations serialised: only
    /// one generation can record into a cache at a time.
    pub async fn generate(
        &self,
        prompt: &str,
        references: &[String],
        history: &mut HistoryCache,
    ) -> Result<GeneratedImage, GenerateError> {
        validate_generation_input(prompt, references)?;
        let payload = build_generation_payload(prompt, references)?;

        let generator = self.generator.as_ref().ok_or(GenerateError::NotConfigured)?;

        tracing::info!(
            prompt_chars = prompt.chars().count(),
            references = payload.reference_count(),
            "Requesting image generation"
        );

        let image_reference = generator.generate(&payload).await.map_err(|e| {
            tracing::error!(error = %e, "Image generation failed");
            GenerateError::Failed
        })?;

        if !is_renderable(&image_reference) {
            tracing::error!(
                prefix = %image_reference.chars().take(32).collect::<String>(),
                "Generator returned something that is not an image reference"
            );
            return Err(GenerateError::InvalidResult);
        }

        let outcome = history.add(image_reference.clone()).await;
        if let Some(notice) = outcome.notice() {
            tracing::warn!(notice = %notice, "History was not saved in full");
        }

        Ok(GeneratedImage {
            image_reference,
            history: outcome,
        })
    }
}

/// An inline `image/*` data URI or a durable URL.
fn is_renderable(reference: &str) -> bool {
    if is_durable_url(reference) {
        return true;
    }
    InlineImage::parse(reference)
        .map(|inline| inline.is_image())
        .unwrap_or(false)
}
