//! study-rag: retrieval-augmented study assistant
//!
//! Upload PDF, text or Markdown study material, ask questions answered
//! strictly from that material, and generate multiple-choice quizzes from
//! it. Documents are chunked, embedded with a local ONNX sentence
//! transformer (or Ollama), and kept in a persistent cosine-similarity
//! index; answers and quizzes come from Groq (or Ollama).

pub mod assistant;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use assistant::StudyAssistant;
pub use config::RagConfig;
pub use error::{Error, Result};
pub use providers::{EmbeddingProvider, GenerationProvider, Prompt};
pub use retrieval::VectorIndex;
pub use types::{
    AnswerResult, Chunk, FileType, IndexStatus, IngestReport, OptionLabel, Quiz, QuizOptions,
    QuizOutcome, QuizQuestion,
};
