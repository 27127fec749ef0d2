//! External collaborators of the lumiere studio.
//!
//! Each collaborator is an async trait with one production implementation:
//!
//! - [`BlobStore`] / [`S3BlobStore`]: public image uploads.
//! - [`DocumentStore`] / [`HttpDocumentStore`]: feedback records.
//! - [`ImageGenerator`] / [`HttpImageGenerator`]: the image model call.
//!
//! [`CloudClients`] bundles the handles. It is built once at startup from
//! [`CloudConfig`] and passed into the pipelines; a collaborator that
//! cannot be initialised is left as `None` rather than aborting startup.

pub mod blob;
pub mod clients;
pub mod config;
pub mod documents;
pub mod generator;

pub use blob::{BlobError, BlobObject, BlobStore, S3BlobStore};
pub use clients::CloudClients;
pub use config::CloudConfig;
pub use documents::{DocumentStore, DocumentStoreError, HttpDocumentStore};
pub use generator::{GenerationError, HttpImageGenerator, ImageGenerator};
