//! Document ingestion: loading, chunking and indexing

mod chunker;
mod parser;
mod processor;

pub use chunker::TextChunker;
pub use parser::{document_id, DocumentLoader};
pub use processor::IngestPipeline;
