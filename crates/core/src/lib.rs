//! Domain types and pure logic for the lumiere image studio.
//!
//! Nothing in this crate performs I/O. Collaborator adapters live in
//! `lumiere-cloud` and `lumiere-history`; orchestration lives in
//! `lumiere-pipeline`.

pub mod error;
pub mod failure;
pub mod feedback;
pub mod generation;
pub mod image_ref;
pub mod types;
