//! Generation provider trait for prompt completion

use async_trait::async_trait;
use crate::error::Result;

/// Prompt sent to a generation provider
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// Instruction placed in the system role, when the backend has one
    pub system: Option<String>,
    /// User message
    pub user: String,
}

impl Prompt {
    /// Prompt with only a user message
    pub fn user(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
        }
    }

    /// Prompt with a system instruction and a user message
    pub fn with_system(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            user: user.into(),
        }
    }
}

/// Trait for LLM completion
///
/// Implementations:
/// - `GroqClient`: Groq chat completions (llama-3.3-70b-versatile)
/// - `OllamaGenerator`: local Ollama server
///
/// Unreachable, misconfigured or failing backends report
/// [`crate::Error::GenerationUnavailable`].
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Complete a prompt at the given temperature
    async fn complete(&self, prompt: &Prompt, temperature: f32) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
