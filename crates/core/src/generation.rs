//! Generation request constants, validation, and payload assembly.
//!
//! [`build_generation_payload`] turns a prompt plus raw reference images
//! into the single payload handed to the image-generation collaborator.
//! It performs no network I/O.

use serde::Serialize;

use crate::error::CoreError;
use crate::image_ref::{sniff_format, InlineImage};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum prompt length in characters.
pub const MIN_PROMPT_CHARS: usize = 10;

/// Maximum prompt length in characters.
pub const MAX_PROMPT_CHARS: usize = 1000;

/// Maximum number of reference images per request.
pub const MAX_REFERENCE_IMAGES: usize = 5;

/// Maximum decoded size of a single reference image (5 MiB).
pub const MAX_REFERENCE_IMAGE_BYTES: usize = 5 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// One element of a multi-part prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptPart {
    /// A reference image, serialized as `{"media": {"url": "data:..."}}`.
    Media { url: String },
    /// The prompt text, serialized as `{"text": "..."}`.
    Text(String),
}

/// The prompt as understood by the generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GenerationPayload {
    /// No usable references: the prompt text alone.
    Text(String),
    /// References in caller order, followed by the prompt text.
    Parts(Vec<PromptPart>),
}

impl GenerationPayload {
    /// Number of reference images carried by this payload.
    pub fn reference_count(&self) -> usize {
        match self {
            Self::Text(_) => 0,
            Self::Parts(parts) => parts
                .iter()
                .filter(|part| matches!(part, PromptPart::Media { .. }))
                .count(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate user input before a generation is attempted.
///
/// - prompt: [`MIN_PROMPT_CHARS`]..=[`MAX_PROMPT_CHARS`] characters
/// - at most [`MAX_REFERENCE_IMAGES`] references
/// - each inline reference at most [`MAX_REFERENCE_IMAGE_BYTES`] decoded
pub fn validate_generation_input(prompt: &str, references: &[String]) -> Result<(), CoreError> {
    let chars = prompt.trim().chars().count();
    if chars < MIN_PROMPT_CHARS {
        return Err(CoreError::Validation(format!(
            "Prompt must be at least {MIN_PROMPT_CHARS} characters long"
        )));
    }
    if chars > MAX_PROMPT_CHARS {
        return Err(CoreError::Validation(format!(
            "Prompt must be at most {MAX_PROMPT_CHARS} characters long"
        )));
    }

    if references.len() > MAX_REFERENCE_IMAGES {
        return Err(CoreError::Validation(format!(
            "At most {MAX_REFERENCE_IMAGES} reference images are allowed, got {}",
            references.len()
        )));
    }

    for (index, raw) in references.iter().enumerate() {
        let Ok(inline) = InlineImage::parse(raw) else {
            continue;
        };
        if inline.estimated_decoded_len() > MAX_REFERENCE_IMAGE_BYTES + 3 {
            return Err(CoreError::Validation(format!(
                "Reference image {} exceeds the 5MB size limit",
                index + 1
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Payload assembly
// ---------------------------------------------------------------------------

/// Build the generation payload from a prompt and raw reference images.
///
/// Entries that are not decodable image data are dropped (and logged);
/// the order of the remaining references is preserved and the prompt text
/// always comes last. Fails only when the prompt is empty.
pub fn build_generation_payload(
    prompt: &str,
    references: &[String],
) -> Result<GenerationPayload, CoreError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".to_string()));
    }

    let mut parts: Vec<PromptPart> = references
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| match decode_reference(raw) {
            Ok(inline) => Some(PromptPart::Media {
                url: inline.to_data_uri(),
            }),
            Err(e) => {
                tracing::warn!(index, error = %e, "Dropping malformed reference image");
                None
            }
        })
        .collect();

    if parts.is_empty() {
        return Ok(GenerationPayload::Text(prompt.to_string()));
    }

    parts.push(PromptPart::Text(prompt.to_string()));
    Ok(GenerationPayload::Parts(parts))
}

/// Accept a reference only if it is an `image/*` data URI whose payload
/// decodes to bytes with a recognizable image signature within the size limit.
fn decode_reference(raw: &str) -> Result<InlineImage, CoreError> {
    let inline = InlineImage::parse(raw.trim())?;
    if !inline.is_image() {
        return Err(CoreError::Validation(format!(
            "Reference has non-image MIME type '{}'",
            inline.mime_type()
        )));
    }

    let bytes = inline.decode()?;
    if bytes.len() > MAX_REFERENCE_IMAGE_BYTES {
        return Err(CoreError::Validation(format!(
            "Reference image is {} bytes, limit is {MAX_REFERENCE_IMAGE_BYTES}",
            bytes.len()
        )));
    }
    if sniff_format(&bytes).is_none() {
        return Err(CoreError::Validation(
            "Reference payload is not a recognizable image".to_string(),
        ));
    }

    Ok(inline)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const PNG_A: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
    /// Only the PNG signature plus padding; enough for format sniffing.
    const PNG_B: &str = "data:image/png;base64,iVBORw0KGgoAAAAA";

    fn refs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_references_yields_text_payload() {
        let payload = build_generation_payload("a red fox in snow", &[]).unwrap();
        assert_eq!(payload, GenerationPayload::Text("a red fox in snow".to_string()));
        assert_eq!(payload.reference_count(), 0);
    }

    #[test]
    fn references_precede_prompt_in_order() {
        let payload =
            build_generation_payload("a red fox in snow", &refs(&[PNG_A, PNG_B])).unwrap();
        let GenerationPayload::Parts(parts) = payload else {
            panic!("expected multi-part payload");
        };
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], PromptPart::Media { url: PNG_A.to_string() });
        assert_eq!(parts[1], PromptPart::Media { url: PNG_B.to_string() });
        assert_eq!(parts[2], PromptPart::Text("a red fox in snow".to_string()));
    }

    #[test]
    fn malformed_references_are_filtered() {
        let payload = build_generation_payload(
            "a red fox in snow",
            &refs(&["not-a-data-uri", "data:text/plain;base64,aGVsbG8=", PNG_A, "data:image/png;base64,aGVsbG8="]),
        )
        .unwrap();
        assert_eq!(payload.reference_count(), 1);
    }

    #[test]
    fn all_references_malformed_falls_back_to_text() {
        let payload = build_generation_payload("a red fox in snow", &refs(&["junk"])).unwrap();
        assert_matches!(payload, GenerationPayload::Text(_));
    }

    #[test]
    fn empty_prompt_is_rejected() {
        assert_matches!(
            build_generation_payload("   ", &refs(&[PNG_A])),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn payload_serializes_like_the_generation_api_expects() {
        let payload = build_generation_payload("a red fox in snow", &refs(&[PNG_A])).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json[0]["media"]["url"], PNG_A);
        assert_eq!(json[1]["text"], "a red fox in snow");

        let text = serde_json::to_value(GenerationPayload::Text("hello".into())).unwrap();
        assert_eq!(text, serde_json::json!("hello"));
    }

    #[test]
    fn validate_prompt_length_bounds() {
        assert!(validate_generation_input("too short", &[]).is_err());
        assert!(validate_generation_input("long enough prompt", &[]).is_ok());
        assert!(validate_generation_input(&"x".repeat(MAX_PROMPT_CHARS + 1), &[]).is_err());
    }

    #[test]
    fn validate_reference_count() {
        let six = refs(&[PNG_A; 6]);
        assert!(validate_generation_input("long enough prompt", &six).is_err());
        let five = refs(&[PNG_A; 5]);
        assert!(validate_generation_input("long enough prompt", &five).is_ok());
    }

    #[test]
    fn validate_reference_size() {
        let huge = format!("data:image/png;base64,{}", "A".repeat(8 * 1024 * 1024));
        assert!(validate_generation_input("long enough prompt", &[huge]).is_err());
    }
}
