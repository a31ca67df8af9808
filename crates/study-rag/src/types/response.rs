//! Response types for ingestion, answers and index status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{Chunk, FileType};

/// Message returned when nothing has been indexed yet
pub const NO_DOCUMENTS_ANSWER: &str =
    "No documents uploaded yet. Please upload study materials first.";

/// Grounded answer with the documents it drew from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerResult {
    /// Generated answer text
    pub answer: String,
    /// Distinct source documents, in order of first appearance
    pub sources: Vec<String>,
}

impl AnswerResult {
    /// The fixed "nothing indexed" answer
    pub fn no_documents() -> Self {
        Self {
            answer: NO_DOCUMENTS_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }

    /// Build an answer, deriving distinct sources from the retrieved chunks
    pub fn from_chunks<'a>(answer: String, chunks: impl IntoIterator<Item = &'a Chunk>) -> Self {
        let mut sources: Vec<String> = Vec::new();
        for chunk in chunks {
            if !sources.iter().any(|s| s == &chunk.source) {
                sources.push(chunk.source.clone());
            }
        }
        Self { answer, sources }
    }
}

/// Chunk returned from a similarity search
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity to the query
    pub similarity: f32,
}

/// Outcome of a single ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Document identifier
    pub source: String,
    /// Detected type
    pub file_type: FileType,
    /// Pages in the document, when known
    pub page_count: Option<u32>,
    /// Number of chunks indexed
    pub chunk_count: usize,
    /// When the chunks became searchable
    pub ingested_at: DateTime<Utc>,
    /// Wall-clock time spent
    pub processing_time_ms: u64,
}

/// Snapshot of the index for status endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatus {
    /// Whether anything is indexed
    pub empty: bool,
    /// Total chunks
    pub chunk_count: usize,
    /// Indexed documents, insertion order
    pub documents: Vec<String>,
    /// Embedding model the index is bound to
    pub embedding_model: String,
}
