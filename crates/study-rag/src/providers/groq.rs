//! Groq chat-completions client (OpenAI-compatible API)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::llm::{GenerationProvider, Prompt};
use super::{retry_with_backoff, Failure};

/// Groq generation provider
///
/// Constructed even without a credential so the service can still ingest
/// and report status; every completion then fails with
/// [`Error::GenerationUnavailable`].
pub struct GroqClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl GroqClient {
    /// Create a new Groq client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            tracing::warn!("GROQ_API_KEY not set; answers and quizzes will be unavailable");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }

    fn messages<'a>(prompt: &'a Prompt) -> Vec<ChatMessage<'a>> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &prompt.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &prompt.user,
        });
        messages
    }
}

#[async_trait]
impl GenerationProvider for GroqClient {
    async fn complete(&self, prompt: &Prompt, temperature: f32) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Error::GenerationUnavailable("GROQ_API_KEY not found; set it in the environment or .env".into())
        })?;
        let url = format!("{}/chat/completions", self.base_url);

        tracing::debug!("Requesting completion from {} (temperature {})", self.model, temperature);

        retry_with_backoff(self.max_retries, "groq completion", || async {
            let request = ChatRequest {
                model: &self.model,
                messages: Self::messages(prompt),
                temperature,
            };

            let response = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| Failure::transient(format!("Completion request failed: {}", e.without_url())))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Failure::from_status(status, &format!("Completion failed: {}", body)));
            }

            let body: ChatResponse = response
                .json()
                .await
                .map_err(|e| Failure::permanent(format!("Failed to parse completion response: {}", e)))?;

            body.choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| Failure::permanent("Completion response had no content"))
        })
        .await
        .map_err(Error::GenerationUnavailable)
    }

    async fn health_check(&self) -> Result<bool> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(false);
        };
        let url = format!("{}/models", self.base_url);
        match self.client.get(&url).bearer_auth(api_key).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
