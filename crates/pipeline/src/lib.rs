//! Orchestration of the studio's two flows.
//!
//! - [`feedback`]: resolve an image reference to a durable URL (uploading
//!   inline data first), persist a feedback record, and classify failures
//!   into user-safe messages. Also the read-only feedback listing.
//! - [`generation`]: validate input, build the request payload, call the
//!   generator, and record the result in the history cache.

pub mod feedback;
pub mod generation;

pub use feedback::{
    FeedbackListError, FeedbackOutcome, FeedbackPipeline, IMAGE_STORAGE_NOT_CONFIGURED_MESSAGE,
    SUBMIT_SUCCESS_MESSAGE,
};
pub use generation::{GenerateError, GeneratedImage, GenerationFlow};
