//! Configuration for the study assistant

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Generation (LLM) configuration
    pub llm: LlmConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Quiz generation configuration
    pub quiz: QuizConfig,
    /// Index and upload locations
    pub storage: StorageConfig,
}

impl RagConfig {
    /// Load configuration: optional TOML file, then environment overrides.
    ///
    /// A missing file is not an error when `path` is `None`; an explicitly
    /// requested file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Apply environment overrides using the supplied lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GROQ_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(provider) = lookup("STUDY_RAG_EMBEDDING_PROVIDER") {
            self.embeddings.provider = match provider.to_lowercase().as_str() {
                "onnx" => EmbeddingBackend::Onnx,
                "ollama" => EmbeddingBackend::Ollama,
                other => {
                    return Err(Error::Config(format!("Unknown embedding provider: {}", other)))
                }
            };
        }
        if let Some(model) = lookup("STUDY_RAG_EMBEDDING_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(provider) = lookup("STUDY_RAG_GENERATION_PROVIDER") {
            self.llm.provider = match provider.to_lowercase().as_str() {
                "groq" => GenerationBackend::Groq,
                "ollama" => GenerationBackend::Ollama,
                other => {
                    return Err(Error::Config(format!("Unknown generation provider: {}", other)))
                }
            };
        }
        if let Some(model) = lookup("STUDY_RAG_GENERATION_MODEL") {
            self.llm.model = model;
        }
        if let Some(v) = lookup("STUDY_RAG_CHUNK_SIZE") {
            self.chunking.chunk_size = parse_env("STUDY_RAG_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = lookup("STUDY_RAG_CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_env("STUDY_RAG_CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = lookup("STUDY_RAG_RETRIEVAL_K") {
            self.retrieval.top_k = parse_env("STUDY_RAG_RETRIEVAL_K", &v)?;
        }
        if let Some(v) = lookup("STUDY_RAG_INDEX_PATH") {
            self.storage.index_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("STUDY_RAG_UPLOADS_DIR") {
            self.storage.uploads_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("STUDY_RAG_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("STUDY_RAG_PORT") {
            self.server.port = parse_env("STUDY_RAG_PORT", &v)?;
        }
        Ok(())
    }

    /// Reject configurations the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval top_k must be greater than zero".into()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embedding dimensions must be greater than zero".into()));
        }
        if self.quiz.seeds.is_empty() {
            return Err(Error::Config("quiz seeds must not be empty".into()));
        }
        if self.quiz.sample_size == 0 || self.quiz.sample_size > self.quiz.candidate_pool {
            return Err(Error::Config(format!(
                "quiz sample_size ({}) must be between 1 and candidate_pool ({})",
                self.quiz.sample_size, self.quiz.candidate_pool
            )));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", key, value)))
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local sentence-transformers model through ONNX Runtime
    #[default]
    Onnx,
    /// Ollama embeddings endpoint
    Ollama,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend chosen at startup
    pub provider: EmbeddingBackend,
    /// Model to use (default: all-MiniLM-L6-v2)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM, 768 for nomic-embed-text)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Maximum sequence length
    pub max_length: usize,
    /// Cache directory for ONNX models
    pub cache_dir: PathBuf,
    /// Ollama base URL (ollama backend only)
    pub base_url: String,
    /// Per-batch timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Onnx,
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("study-rag")
                .join("models"),
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

/// Generation backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    /// Groq chat completions (OpenAI-compatible)
    #[default]
    Groq,
    /// Local Ollama server
    Ollama,
}

/// Generation (LLM) configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend chosen at startup
    pub provider: GenerationBackend,
    /// API base URL
    pub base_url: String,
    /// Credential (Groq); never serialized back out
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Generation model name
    pub model: String,
    /// Temperature for grounded answers
    pub answer_temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: GenerationBackend::Groq,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            model: "llama-3.3-70b-versatile".to_string(),
            answer_temperature: 0.0,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("answer_temperature", &self.answer_temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks retrieved per question
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Quiz generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// Questions generated when the caller does not say
    pub default_questions: usize,
    /// Upper bound accepted from callers
    pub max_questions: usize,
    /// Temperature for quiz generation
    pub temperature: f32,
    /// Candidate chunks retrieved per quiz
    pub candidate_pool: usize,
    /// Chunks kept after shuffling
    pub sample_size: usize,
    /// Thematic query seeds, one picked at random per quiz
    pub seeds: Vec<String>,
    /// Fixed RNG seed (deterministic quizzes)
    pub rng_seed: Option<u64>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            default_questions: 5,
            max_questions: 20,
            temperature: 0.7,
            candidate_pool: 15,
            sample_size: 6,
            seeds: [
                "key concepts",
                "important definitions",
                "summary",
                "main topics",
                "details",
                "core principles",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rng_seed: None,
        }
    }
}

/// Index and upload locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Persisted vector index file
    pub index_path: PathBuf,
    /// Directory holding uploaded documents
    pub uploads_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("study-rag");

        Self {
            index_path: base.join("index.bin"),
            uploads_dir: base.join("uploads"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.quiz.candidate_pool, 15);
        assert_eq!(config.quiz.sample_size, 6);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GROQ_API_KEY", "gsk_test"),
            ("STUDY_RAG_CHUNK_SIZE", "500"),
            ("STUDY_RAG_CHUNK_OVERLAP", "50"),
            ("STUDY_RAG_RETRIEVAL_K", "6"),
            ("STUDY_RAG_GENERATION_PROVIDER", "ollama"),
            ("STUDY_RAG_GENERATION_MODEL", "llama3.2"),
        ]
        .into_iter()
        .collect();

        let mut config = RagConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.llm.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.retrieval.top_k, 6);
        assert_eq!(config.llm.provider, GenerationBackend::Ollama);
        assert_eq!(config.llm.model, "llama3.2");
    }

    #[test]
    fn test_bad_env_value_is_config_error() {
        let mut config = RagConfig::default();
        let err = config
            .apply_env_overrides(|k| (k == "STUDY_RAG_CHUNK_SIZE").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = 1000;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_sample_cannot_exceed_pool() {
        let mut config = RagConfig::default();
        config.quiz.sample_size = 20;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_toml() {
        let config = RagConfig::from_toml_str(
            r#"
            [chunking]
            chunk_size = 800

            [embeddings]
            provider = "ollama"
            model = "nomic-embed-text"
            dimensions = 768
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.embeddings.provider, EmbeddingBackend::Ollama);
        assert_eq!(config.embeddings.dimensions, 768);
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_debug_redacts_credential() {
        let mut llm = LlmConfig::default();
        llm.api_key = Some("gsk_secret".to_string());
        let printed = format!("{:?}", llm);
        assert!(!printed.contains("gsk_secret"));
        assert!(printed.contains("<redacted>"));
    }
}
