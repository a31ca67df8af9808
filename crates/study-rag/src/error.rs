//! Error types for the study assistant

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for study assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Study assistant errors
///
/// "Nothing indexed yet" is deliberately absent: it is reported through
/// [`crate::types::QuizOutcome::NoContent`] and the fixed no-documents answer.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document type the loader cannot handle
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Supported type, but the content could not be read
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Embedding provider unavailable or failed
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Generation provider unreachable, misconfigured or timed out
    #[error("Generation provider unavailable: {0}")]
    GenerationUnavailable(String),

    /// Model output did not match the quiz schema
    #[error("Quiz reply could not be parsed: {0}")]
    QuizParse(String),

    /// Index persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Caller supplied an invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::GenerationUnavailable(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable machine-readable name of the failing stage
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::FileParse { .. } => "parse_error",
            Error::Embedding(_) => "embedding_error",
            Error::GenerationUnavailable(_) => "generation_unavailable",
            Error::QuizParse(_) => "quiz_parse_error",
            Error::Storage(_) => "storage_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::UnsupportedFormat(_)
            | Error::FileParse { .. }
            | Error::InvalidInput(_)
            | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::GenerationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::QuizParse(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_)
            | Error::Embedding(_)
            | Error::Storage(_)
            | Error::Io(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{} ({})", self, self.kind());
        }

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::UnsupportedFormat("docx".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::generation("timed out").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(Error::QuizParse("eof".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            Error::storage("disk full").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_kind_names_stage() {
        assert_eq!(Error::embedding("down").kind(), "embedding_error");
        assert_eq!(Error::file_parse("a.pdf", "bad xref").kind(), "parse_error");
    }
}
