//! Retrieval over embedded chunks

pub mod index;

pub use index::{cosine_similarity, VectorIndex};
