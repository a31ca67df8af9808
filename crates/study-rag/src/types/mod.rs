//! Core types for the study assistant

pub mod document;
pub mod quiz;
pub mod response;

pub use document::{Chunk, FileType, LoadedDocument};
pub use quiz::{OptionLabel, Quiz, QuizOptions, QuizOutcome, QuizQuestion};
pub use response::{AnswerResult, IndexStatus, IngestReport, SearchHit, NO_DOCUMENTS_ANSWER};
