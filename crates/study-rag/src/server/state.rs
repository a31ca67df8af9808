//! Application state for the study assistant server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::assistant::StudyAssistant;
use crate::config::RagConfig;
use crate::error::Result;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Assistant shared by every handler
    assistant: StudyAssistant,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create new application state, constructing providers from config
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing study assistant state...");
        let assistant = StudyAssistant::from_config(config).await?;
        Ok(Self::from_assistant(assistant))
    }

    /// Wrap an already-built assistant
    pub fn from_assistant(assistant: StudyAssistant) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                assistant,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get the assistant
    pub fn assistant(&self) -> &StudyAssistant {
        &self.inner.assistant
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        self.inner.assistant.config()
    }

    /// Check if ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
