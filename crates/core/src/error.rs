/// Domain-level error shared by every lumiere crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed input; the caller can correct it and retry.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An invariant was violated inside the domain logic.
    #[error("Internal error: {0}")]
    Internal(String),
}
