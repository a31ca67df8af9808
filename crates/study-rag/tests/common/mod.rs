//! Deterministic in-process providers and fixtures shared by integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use study_rag::config::RagConfig;
use study_rag::{EmbeddingProvider, Error, GenerationProvider, Prompt, Result, StudyAssistant};

pub const DIMS: usize = 64;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "by", "for", "from", "how", "in", "into", "is", "it", "of",
    "on", "the", "to", "what", "which", "with",
];

/// Hashed bag of words: texts sharing content words land close together
pub struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(keyword_vector(text))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn model(&self) -> &str {
        "keyword-hash"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.len() > 1 && !STOP_WORDS.contains(&w.as_str()))
    {
        v[fnv1a(&word) % DIMS] += 1.0;
    }
    v
}

fn fnv1a(word: &str) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash as usize
}

/// Embedder whose backend is down
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding("connection refused"))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn model(&self) -> &str {
        "keyword-hash"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Replays canned replies and records every call
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    fallback: String,
    calls: Mutex<Vec<(Prompt, f32)>>,
}

impl ScriptedGenerator {
    pub fn new(fallback: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: fallback.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_replies<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let generator = Self::new("");
        generator
            .replies
            .lock()
            .extend(replies.into_iter().map(Into::into));
        generator
    }

    pub fn calls(&self) -> Vec<(Prompt, f32)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    async fn complete(&self, prompt: &Prompt, temperature: f32) -> Result<String> {
        self.calls.lock().push((prompt.clone(), temperature));
        let reply = self.replies.lock().pop_front();
        Ok(reply.unwrap_or_else(|| self.fallback.clone()))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

/// Generation backend without a credential
pub struct FailingGenerator;

#[async_trait]
impl GenerationProvider for FailingGenerator {
    async fn complete(&self, _prompt: &Prompt, _temperature: f32) -> Result<String> {
        Err(Error::generation("GROQ_API_KEY not found"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "none"
    }
}

/// Generation backend that never answers in time
pub struct StalledGenerator;

#[async_trait]
impl GenerationProvider for StalledGenerator {
    async fn complete(&self, _prompt: &Prompt, _temperature: f32) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "stalled"
    }

    fn model(&self) -> &str {
        "stalled-1"
    }
}

/// Configuration with all state inside `dir`
pub fn test_config(dir: &TempDir) -> RagConfig {
    let mut config = RagConfig::default();
    config.embeddings.dimensions = DIMS;
    config.embeddings.timeout_secs = 5;
    config.llm.timeout_secs = 5;
    config.storage.index_path = dir.path().join("db").join("index.bin");
    config.storage.uploads_dir = dir.path().join("uploads");
    config.quiz.rng_seed = Some(7);
    config
}

pub async fn assistant(dir: &TempDir, generator: Arc<dyn GenerationProvider>) -> StudyAssistant {
    StudyAssistant::with_providers(test_config(dir), Arc::new(KeywordEmbedder), generator)
        .await
        .expect("assistant")
}

/// Write a document into `dir/docs`
pub fn write_doc(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let docs = dir.path().join("docs");
    std::fs::create_dir_all(&docs).expect("create docs dir");
    let path = docs.join(name);
    std::fs::write(&path, text).expect("write doc");
    path
}

/// Study notes on one topic, several paragraphs long
pub fn notes(topic: &[&str], paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|p| {
            (0..5)
                .map(|s| {
                    format!(
                        "Paragraph {p} sentence {s} explains {} together with {} and {}.",
                        topic[(p + s) % topic.len()],
                        topic[(p + s + 1) % topic.len()],
                        topic[(p + s + 2) % topic.len()]
                    )
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub const BIOLOGY: &[&str] = &["photosynthesis", "chlorophyll", "glucose", "stomata", "sunlight"];
pub const GEOLOGY: &[&str] = &["volcano", "magma", "eruption", "tectonic", "basalt"];

/// JSON quiz reply with `n` questions
pub fn quiz_json(n: usize) -> String {
    let items: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"question": "Question {i}?", "options": {{"A": "first", "B": "second", "C": "third", "D": "fourth"}}, "answer": "C", "explanation": "Stated in the notes."}}"#
            )
        })
        .collect();
    format!("[{}]", items.join(",\n"))
}
