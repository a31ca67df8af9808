//! Provider abstractions for embeddings and generation
//!
//! The backend for each capability is chosen once, at startup, from
//! configuration. Construction errors are returned to the caller instead of
//! being probed for at request time.

pub mod embedding;
pub mod groq;
pub mod llm;
pub mod ollama;
pub mod onnx;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::sleep;

use crate::config::{EmbeddingBackend, GenerationBackend, RagConfig};
use crate::error::Result;

pub use embedding::EmbeddingProvider;
pub use llm::{GenerationProvider, Prompt};

/// Build the embedding provider selected in configuration
pub async fn embedding_provider(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.embeddings.provider {
        EmbeddingBackend::Onnx => Arc::new(onnx::OnnxEmbedder::new(&config.embeddings).await?),
        EmbeddingBackend::Ollama => Arc::new(ollama::OllamaEmbedder::connect(&config.embeddings).await?),
    };

    tracing::info!(
        "Embedding provider: {} ({}, {} dims)",
        provider.name(),
        provider.model(),
        provider.dimensions()
    );
    Ok(provider)
}

/// Build the generation provider selected in configuration
pub fn generation_provider(config: &RagConfig) -> Result<Arc<dyn GenerationProvider>> {
    let provider: Arc<dyn GenerationProvider> = match config.llm.provider {
        GenerationBackend::Groq => Arc::new(groq::GroqClient::new(&config.llm)?),
        GenerationBackend::Ollama => Arc::new(ollama::OllamaGenerator::new(&config.llm)?),
    };

    tracing::info!("Generation provider: {} ({})", provider.name(), provider.model());
    Ok(provider)
}

/// A failed HTTP attempt
#[derive(Debug)]
pub(crate) struct Failure {
    message: String,
    transient: bool,
}

impl Failure {
    pub(crate) fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }

    pub(crate) fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }

    /// Rate limiting and server errors are worth retrying; client errors are not
    pub(crate) fn from_status(status: StatusCode, context: &str) -> Self {
        let message = format!("{} (HTTP {})", context, status);
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Self::transient(message)
        } else {
            Self::permanent(message)
        }
    }
}

/// Retry an operation with exponential backoff (1s, 2s, 4s, ...)
pub(crate) async fn retry_with_backoff<F, Fut, T>(
    max_retries: u32,
    label: &str,
    operation: F,
) -> std::result::Result<T, String>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, Failure>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(failure) if failure.transient && attempt < max_retries => {
                let delay = Duration::from_secs(2u64.pow(attempt));
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    label,
                    attempt + 1,
                    max_retries + 1,
                    failure.message,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(failure) => return Err(failure.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(2, "test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Failure::transient("busy"))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), String> = retry_with_backoff(3, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Failure::from_status(StatusCode::UNAUTHORIZED, "Completion failed"))
        })
        .await;

        assert!(result.unwrap_err().contains("401"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
