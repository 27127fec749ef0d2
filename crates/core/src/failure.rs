//! User-facing failure taxonomy.
//!
//! Low-level store and pipeline errors are mapped onto [`FailureKind`]
//! exactly once, at the boundary that reports to the user. Only the
//! classified message leaves that boundary; the raw error is logged.

use std::fmt;

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// Substring the document store uses for permission-denied failures.
pub const PERMISSION_DENIED_MARKER: &str = "Missing or insufficient permissions";

/// Status name some document stores put in error bodies.
pub const PERMISSION_DENIED_STATUS: &str = "PERMISSION_DENIED";

/// gRPC status code for permission-denied.
pub const PERMISSION_DENIED_CODE: i32 = 7;

/// Substring the document store uses when the backing project is down.
pub const PROJECT_UNAVAILABLE_MARKER: &str = "The project is unavailable";

// ---------------------------------------------------------------------------
// FailureKind
// ---------------------------------------------------------------------------

/// The small set of failure categories a user can be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Malformed input the caller can correct.
    Validation,
    /// The local store ran out of space even after pruning.
    Capacity,
    /// A non-capacity local store failure.
    Persistence,
    /// Decoding or uploading an inline image failed.
    Upload,
    /// A collaborator was never initialised (e.g. missing credentials).
    Configuration,
    /// The remote store rejected our credentials.
    Permission,
    /// The remote store is temporarily unavailable.
    Unavailable,
    /// Anything else.
    Unknown,
}

impl FailureKind {
    /// Fixed user-facing text for this category.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::Validation => "Some of the submitted information is invalid. Please check it and try again.",
            Self::Capacity => "Failed to save to history. New image may be too large or storage is critically full.",
            Self::Persistence => "An unexpected error occurred while saving image history.",
            Self::Upload => "Failed to upload the image for feedback. Please try again later.",
            Self::Configuration => "Server configuration error: Unable to connect to the feedback database. Please contact support if this issue persists.",
            Self::Permission => "Server permission error: Unable to save feedback. Please contact support.",
            Self::Unavailable => "The feedback service is temporarily unavailable. Please try again later.",
            Self::Unknown => "Failed to submit feedback due to a server error. Please try again later.",
        }
    }

    /// Stable machine-readable code, e.g. for structured logs.
    pub fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Capacity => "CAPACITY_ERROR",
            Self::Persistence => "PERSISTENCE_ERROR",
            Self::Upload => "UPLOAD_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Permission => "PERMISSION_ERROR",
            Self::Unavailable => "UNAVAILABLE_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Message inspection
// ---------------------------------------------------------------------------

/// Classify an opaque remote-store failure from its status code and text.
///
/// Permission wins over unavailability when both markers are present.
pub fn classify_remote_failure(code: Option<i32>, message: &str) -> FailureKind {
    if code == Some(PERMISSION_DENIED_CODE)
        || message.contains(PERMISSION_DENIED_MARKER)
        || message.contains(PERMISSION_DENIED_STATUS)
    {
        FailureKind::Permission
    } else if message.contains(PROJECT_UNAVAILABLE_MARKER) {
        FailureKind::Unavailable
    } else {
        FailureKind::Unknown
    }
}

/// Map an HTTP status from a remote store onto a failure category.
///
/// Returns `None` for statuses that say nothing specific; callers then fall
/// back to [`classify_remote_failure`] on the body.
pub fn classify_http_status(status: u16) -> Option<FailureKind> {
    match status {
        401 | 403 => Some(FailureKind::Permission),
        503 => Some(FailureKind::Unavailable),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_marker_in_message() {
        let kind = classify_remote_failure(
            None,
            "7 PERMISSION_DENIED: Missing or insufficient permissions.",
        );
        assert_eq!(kind, FailureKind::Permission);
        assert_eq!(
            kind.user_message(),
            "Server permission error: Unable to save feedback. Please contact support."
        );
    }

    #[test]
    fn permission_code_without_marker() {
        assert_eq!(classify_remote_failure(Some(7), "denied"), FailureKind::Permission);
    }

    #[test]
    fn project_unavailable() {
        assert_eq!(
            classify_remote_failure(None, "The project is unavailable right now"),
            FailureKind::Unavailable
        );
    }

    #[test]
    fn anything_else_is_unknown() {
        let kind = classify_remote_failure(Some(13), "internal");
        assert_eq!(kind, FailureKind::Unknown);
        assert!(kind.user_message().contains("try again later"));
    }

    #[test]
    fn http_statuses() {
        assert_eq!(classify_http_status(403), Some(FailureKind::Permission));
        assert_eq!(classify_http_status(401), Some(FailureKind::Permission));
        assert_eq!(classify_http_status(503), Some(FailureKind::Unavailable));
        assert_eq!(classify_http_status(500), None);
    }

    #[test]
    fn configuration_message_is_distinct() {
        let config = FailureKind::Configuration.user_message();
        assert_ne!(config, FailureKind::Unknown.user_message());
        assert!(config.contains("configuration"));
        assert_eq!(FailureKind::Configuration.to_string(), "CONFIGURATION_ERROR");
    }
}
