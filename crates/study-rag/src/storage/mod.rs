//! Storage for raw uploaded documents
//!
//! The vector index persists itself; this module only keeps the original
//! files so they can be re-read or cleared.

mod uploads;

pub use uploads::{sanitize_filename, StagedUpload, UploadStore};
