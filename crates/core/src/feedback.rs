//! Feedback input validation and the persisted feedback record.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DocumentId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Reviewer name stored when none is given.
pub const ANONYMOUS_REVIEWER: &str = "Anonymous";

/// Maximum comment length in characters.
pub const MAX_COMMENT_CHARS: usize = 500;

/// Highest star rating.
pub const MAX_RATING: i32 = 5;

/// Document collection feedback records are written to.
pub const DEFAULT_FEEDBACK_COLLECTION: &str = "imageFeedback";

/// Field the feedback listing is ordered by (newest first).
pub const FEEDBACK_ORDER_FIELD: &str = "timestamp";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// What a reviewer submits about one generated image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackInput {
    /// Optional reviewer name.
    pub name: Option<String>,
    /// Star rating; `None` or `<= 0` means "no rating".
    pub rating: Option<i32>,
    /// Free-text comment.
    pub comment: String,
    /// Inline data URI or durable URL of the reviewed image.
    pub image_reference: String,
}

/// Validate a feedback submission before anything is uploaded or written.
pub fn validate_feedback_input(input: &FeedbackInput) -> Result<(), CoreError> {
    let comment_chars = input.comment.trim().chars().count();
    if comment_chars == 0 {
        return Err(CoreError::Validation(
            "Feedback text cannot be empty".to_string(),
        ));
    }
    if comment_chars > MAX_COMMENT_CHARS {
        return Err(CoreError::Validation(format!(
            "Feedback text must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }

    if let Some(rating) = input.rating {
        if rating > MAX_RATING {
            return Err(CoreError::Validation(format!(
                "Rating must be between 0 and {MAX_RATING}, got {rating}"
            )));
        }
    }

    if input.image_reference.trim().is_empty() {
        return Err(CoreError::Validation(
            "An image reference is required".to_string(),
        ));
    }

    Ok(())
}

/// Normalise a rating: absent or non-positive ratings are dropped.
pub fn effective_rating(rating: Option<i32>) -> Option<u8> {
    rating
        .filter(|r| *r > 0)
        .and_then(|r| u8::try_from(r.min(MAX_RATING)).ok())
}

/// Normalise a reviewer name, defaulting to [`ANONYMOUS_REVIEWER`].
pub fn reviewer_name(name: Option<&str>) -> String {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(ANONYMOUS_REVIEWER)
        .to_string()
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A feedback record as written to the document store.
///
/// Immutable once persisted. `rating` is omitted from the serialized form
/// when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub feedback_text: String,
    pub image_url: String,
    pub timestamp: Timestamp,
}

impl FeedbackRecord {
    /// Build a record for `input` pointing at the resolved durable URL.
    pub fn new(input: &FeedbackInput, image_url: String, timestamp: Timestamp) -> Self {
        Self {
            name: reviewer_name(input.name.as_deref()),
            rating: effective_rating(input.rating),
            feedback_text: input.comment.trim().to_string(),
            image_url,
            timestamp,
        }
    }
}

/// A feedback record read back from the store, with its document id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFeedback {
    pub id: DocumentId,
    #[serde(flatten)]
    pub record: FeedbackRecord,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    use super::*;

    fn input(rating: Option<i32>) -> FeedbackInput {
        FeedbackInput {
            name: None,
            rating,
            comment: "Lovely colours".to_string(),
            image_reference: "https://cdn.example.com/a.png".to_string(),
        }
    }

    fn fixed_time() -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn rating_zero_is_omitted_from_record() {
        let record = FeedbackRecord::new(&input(Some(0)), "https://x/y.png".into(), fixed_time());
        assert_eq!(record.rating, None);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("rating").is_none());
    }

    #[test]
    fn rating_four_is_persisted() {
        let record = FeedbackRecord::new(&input(Some(4)), "https://x/y.png".into(), fixed_time());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["rating"], 4);
    }

    #[test]
    fn negative_rating_is_treated_as_absent() {
        assert_eq!(effective_rating(Some(-2)), None);
        assert_eq!(effective_rating(None), None);
        assert_eq!(effective_rating(Some(5)), Some(5));
    }

    #[test]
    fn record_uses_camel_case_and_iso_timestamp() {
        let record = FeedbackRecord::new(&input(None), "https://x/y.png".into(), fixed_time());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "Anonymous");
        assert_eq!(json["feedbackText"], "Lovely colours");
        assert_eq!(json["imageUrl"], "https://x/y.png");
        assert_eq!(json["timestamp"], "2026-10-19T12:00:00Z");
    }

    #[test]
    fn blank_name_defaults_to_anonymous() {
        assert_eq!(reviewer_name(Some("   ")), "Anonymous");
        assert_eq!(reviewer_name(Some(" Ada ")), "Ada");
    }

    #[test]
    fn validation_rejects_empty_and_long_comments() {
        let mut bad = input(None);
        bad.comment = "  ".to_string();
        assert_matches!(validate_feedback_input(&bad), Err(CoreError::Validation(_)));

        bad.comment = "x".repeat(MAX_COMMENT_CHARS + 1);
        assert!(validate_feedback_input(&bad).is_err());

        bad.comment = "x".repeat(MAX_COMMENT_CHARS);
        assert!(validate_feedback_input(&bad).is_ok());
    }

    #[test]
    fn validation_rejects_rating_above_five() {
        assert!(validate_feedback_input(&input(Some(6))).is_err());
        assert!(validate_feedback_input(&input(Some(5))).is_ok());
    }

    #[test]
    fn validation_requires_image_reference() {
        let mut bad = input(None);
        bad.image_reference = String::new();
        assert!(validate_feedback_input(&bad).is_err());
    }

    #[test]
    fn stored_feedback_flattens_record() {
        let raw = serde_json::json!({
            "id": "doc-1",
            "name": "Ada",
            "rating": 3,
            "feedbackText": "nice",
            "imageUrl": "https://x/y.png",
            "timestamp": "2026-10-19T12:00:00Z"
        });
        let stored: StoredFeedback = serde_json::from_value(raw).unwrap();
        assert_eq!(stored.id, "doc-1");
        assert_eq!(stored.record.rating, Some(3));
        assert_eq!(stored.record.timestamp, fixed_time());
    }
}
