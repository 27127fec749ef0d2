//! Image reference parsing and inline payload decoding.
//!
//! An image reference is either an inline data URI
//! (`data:<mime>;base64,<payload>`) that carries the image itself, or a
//! durable `http(s)://` URL pointing at an image already in blob storage.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Prefix shared by every inline image reference.
pub const DATA_URI_PREFIX: &str = "data:";

/// Only base64-encoded inline payloads are supported.
const BASE64_MARKER: &str = ";base64";

/// Extension used when the MIME subtype cannot be determined.
pub const DEFAULT_IMAGE_EXTENSION: &str = "png";

/// File stem used by [`download_file_name`].
const DOWNLOAD_FILE_STEM: &str = "lumiere-art";

// ---------------------------------------------------------------------------
// ImageReference
// ---------------------------------------------------------------------------

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// Self-contained encoding, not yet uploaded anywhere.
    Inline(InlineImage),
    /// Publicly fetchable URL of an image already in blob storage.
    Durable(String),
}

impl ImageReference {
    /// Parse a raw reference string.
    ///
    /// `data:` references must be well-formed base64 data URIs; anything
    /// else must be an `http://` or `https://` URL.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if is_inline(trimmed) {
            return InlineImage::parse(trimmed).map(Self::Inline);
        }
        if is_durable_url(trimmed) {
            return Ok(Self::Durable(trimmed.to_string()));
        }
        Err(CoreError::Validation(
            "Image reference must be a data URI or an http(s) URL".to_string(),
        ))
    }

    /// Whether this reference still needs uploading before it is durable.
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }
}

/// Cheap prefix check for inline references, without decoding.
pub fn is_inline(raw: &str) -> bool {
    raw.starts_with(DATA_URI_PREFIX)
}

/// Cheap scheme check for durable URLs.
pub fn is_durable_url(raw: &str) -> bool {
    (raw.starts_with("https://") && raw.len() > "https://".len())
        || (raw.starts_with("http://") && raw.len() > "http://".len())
}

// ---------------------------------------------------------------------------
// InlineImage
// ---------------------------------------------------------------------------

/// A data URI split into its MIME type and base64 payload.
///
/// The payload is kept encoded; call [`InlineImage::decode`] to get bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    mime_type: String,
    payload: String,
}

impl InlineImage {
    /// Parse `data:<mime>;base64,<payload>`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let rest = raw.strip_prefix(DATA_URI_PREFIX).ok_or_else(|| {
            CoreError::Validation("Inline image must start with 'data:'".to_string())
        })?;

        let (header, payload) = rest.split_once(',').ok_or_else(|| {
            CoreError::Validation("Inline image is missing the ',' payload separator".to_string())
        })?;

        let mime_type = header.strip_suffix(BASE64_MARKER).ok_or_else(|| {
            CoreError::Validation("Inline image must be base64-encoded".to_string())
        })?;

        if mime_type.is_empty() || !mime_type.contains('/') {
            return Err(CoreError::Validation(format!(
                "Inline image has an invalid MIME type '{mime_type}'"
            )));
        }

        if payload.is_empty() {
            return Err(CoreError::Validation(
                "Inline image payload is empty".to_string(),
            ));
        }

        Ok(Self {
            mime_type: mime_type.to_ascii_lowercase(),
            payload: payload.to_string(),
        })
    }

    /// The declared MIME type, lowercased (e.g. `image/png`).
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Whether the declared MIME type is an `image/*` type.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// File extension derived from the MIME subtype.
    ///
    /// `image/jpeg` -> `jpeg`, `image/svg+xml` -> `svg`. Falls back to
    /// [`DEFAULT_IMAGE_EXTENSION`].
    pub fn extension(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, subtype)| subtype.split('+').next().unwrap_or(subtype))
            .filter(|ext| !ext.is_empty())
            .unwrap_or(DEFAULT_IMAGE_EXTENSION)
    }

    /// Decode the base64 payload.
    pub fn decode(&self) -> Result<Vec<u8>, CoreError> {
        STANDARD
            .decode(self.payload.as_bytes())
            .map_err(|e| CoreError::Validation(format!("Inline image payload is not valid base64: {e}")))
    }

    /// Upper bound on the decoded size, computed without decoding.
    pub fn estimated_decoded_len(&self) -> usize {
        self.payload.len() / 4 * 3 + 3
    }

    /// Re-encode as a data URI.
    pub fn to_data_uri(&self) -> String {
        format!("{DATA_URI_PREFIX}{}{BASE64_MARKER},{}", self.mime_type, self.payload)
    }
}

/// Detect the image container format from magic bytes.
///
/// Returns `None` when the bytes do not start with a known image signature.
pub fn sniff_format(bytes: &[u8]) -> Option<image::ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Suggested download file name for a reference, e.g. `lumiere-art.jpeg`.
pub fn download_file_name(raw: &str) -> String {
    let extension = InlineImage::parse(raw)
        .ok()
        .filter(InlineImage::is_image)
        .map(|inline| inline.extension().to_string())
        .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string());
    format!("{DOWNLOAD_FILE_STEM}.{extension}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    /// 1x1 transparent PNG.
    const TINY_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn parse_inline_png() {
        let parsed = ImageReference::parse(TINY_PNG).unwrap();
        assert_matches!(&parsed, ImageReference::Inline(inline) if inline.mime_type() == "image/png");
        assert!(parsed.is_inline());
    }

    #[test]
    fn parse_durable_url() {
        let parsed = ImageReference::parse("https://cdn.example.com/a.png").unwrap();
        assert_eq!(
            parsed,
            ImageReference::Durable("https://cdn.example.com/a.png".to_string())
        );
    }

    #[test]
    fn parse_rejects_bare_string() {
        assert_matches!(ImageReference::parse("imgA"), Err(CoreError::Validation(_)));
        assert_matches!(ImageReference::parse("https://"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn inline_requires_base64_marker() {
        assert!(InlineImage::parse("data:image/png,abcd").is_err());
        assert!(InlineImage::parse("data:image/png;base64,").is_err());
        assert!(InlineImage::parse("data:;base64,abcd").is_err());
        assert!(InlineImage::parse("data:image/png;base64abcd").is_err());
    }

    #[test]
    fn decode_tiny_png_has_png_signature() {
        let inline = InlineImage::parse(TINY_PNG).unwrap();
        let bytes = inline.decode().unwrap();
        assert_eq!(sniff_format(&bytes), Some(image::ImageFormat::Png));
        assert!(bytes.len() <= inline.estimated_decoded_len());
    }

    #[test]
    fn decode_invalid_base64_fails() {
        let inline = InlineImage::parse("data:image/png;base64,@@@@").unwrap();
        assert!(inline.decode().is_err());
    }

    #[test]
    fn extension_from_subtype() {
        let jpeg = InlineImage::parse("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(jpeg.extension(), "jpeg");
        let svg = InlineImage::parse("data:image/svg+xml;base64,AAAA").unwrap();
        assert_eq!(svg.extension(), "svg");
    }

    #[test]
    fn mime_type_is_lowercased_and_round_trips() {
        let inline = InlineImage::parse("data:IMAGE/PNG;base64,AAAA").unwrap();
        assert_eq!(inline.mime_type(), "image/png");
        assert_eq!(inline.to_data_uri(), "data:image/png;base64,AAAA");
    }

    #[test]
    fn non_image_mime_is_not_image() {
        let inline = InlineImage::parse("data:text/plain;base64,aGVsbG8=").unwrap();
        assert!(!inline.is_image());
    }

    #[test]
    fn download_name_uses_extension_or_default() {
        assert_eq!(download_file_name("data:image/webp;base64,AAAA"), "lumiere-art.webp");
        assert_eq!(download_file_name("https://cdn.example.com/x"), "lumiere-art.png");
    }
}
