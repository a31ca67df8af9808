//! Persistent flat vector index for chunk storage and search

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, SearchHit};

/// Bumped whenever the on-disk layout changes
const FORMAT_VERSION: u32 = 1;

/// Embedded chunk as stored in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    id: u128,
    source: String,
    sequence: u32,
    content: String,
    offset: usize,
    overlap: usize,
    embedding: Vec<f32>,
}

impl Entry {
    fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.id.as_u128(),
            source: chunk.source,
            sequence: chunk.sequence,
            content: chunk.content,
            offset: chunk.offset,
            overlap: chunk.overlap,
            embedding,
        }
    }

    fn chunk(&self) -> Chunk {
        Chunk {
            id: Uuid::from_u128(self.id),
            source: self.source.clone(),
            sequence: self.sequence,
            content: self.content.clone(),
            offset: self.offset,
            overlap: self.overlap,
        }
    }
}

/// Immutable view of the index; replaced wholesale on every mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    model: String,
    dimensions: usize,
    entries: Vec<Entry>,
}

impl Snapshot {
    fn empty(model: &str, dimensions: usize) -> Self {
        Self {
            version: FORMAT_VERSION,
            model: model.to_string(),
            dimensions,
            entries: Vec::new(),
        }
    }
}

struct Inner {
    path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    embed_timeout: Duration,
    snapshot: RwLock<Arc<Snapshot>>,
    /// Serializes add/reset, held across persistence
    write_gate: Mutex<()>,
}

/// Exact cosine-similarity index bound to a single embedding provider
///
/// Cheap to clone; clones share the same state. Searches read an immutable
/// snapshot and never wait on a mutation in progress.
#[derive(Clone)]
pub struct VectorIndex {
    inner: Arc<Inner>,
}

impl VectorIndex {
    /// Open the index persisted at `path`, or start empty.
    ///
    /// A missing, unreadable, corrupt or foreign-model file is logged and
    /// treated as an empty index; the next mutation overwrites it.
    pub async fn open(
        path: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
        embed_timeout: Duration,
    ) -> Self {
        let path = path.into();
        let model = embedder.model().to_string();
        let dimensions = embedder.dimensions();

        let load_path = path.clone();
        let loaded = tokio::task::spawn_blocking(move || load(&load_path))
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))
            .and_then(|r| r);

        let snapshot = match loaded {
            Ok(Some(snapshot)) if snapshot.version != FORMAT_VERSION => {
                tracing::warn!(
                    "Index at {} has format version {} (expected {}); starting empty",
                    path.display(),
                    snapshot.version,
                    FORMAT_VERSION
                );
                Snapshot::empty(&model, dimensions)
            }
            Ok(Some(snapshot)) if snapshot.model != model || snapshot.dimensions != dimensions => {
                tracing::warn!(
                    "Index at {} was built with {} ({} dims), not {} ({} dims); starting empty",
                    path.display(),
                    snapshot.model,
                    snapshot.dimensions,
                    model,
                    dimensions
                );
                Snapshot::empty(&model, dimensions)
            }
            Ok(Some(snapshot)) => {
                tracing::info!(
                    "Loaded index from {} ({} chunks)",
                    path.display(),
                    snapshot.entries.len()
                );
                snapshot
            }
            Ok(None) => {
                tracing::info!("No index at {}; starting empty", path.display());
                Snapshot::empty(&model, dimensions)
            }
            Err(e) => {
                tracing::warn!("Failed to load index from {}: {}; starting empty", path.display(), e);
                Snapshot::empty(&model, dimensions)
            }
        };

        Self {
            inner: Arc::new(Inner {
                path,
                embedder,
                embed_timeout,
                snapshot: RwLock::new(Arc::new(snapshot)),
                write_gate: Mutex::new(()),
            }),
        }
    }

    /// Append embedded chunks and persist.
    ///
    /// Either both memory and disk reflect the new chunks, or neither does.
    pub async fn add(&self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(Error::embedding(format!(
                "Got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }
        let dimensions = self.inner.embedder.dimensions();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
            return Err(Error::embedding(format!(
                "Embedding has {} dimensions, index expects {}",
                bad.len(),
                dimensions
            )));
        }
        if chunks.is_empty() {
            return Ok(());
        }

        // Runs to completion even if the caller goes away
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.add(chunks, embeddings).await })
            .await
            .map_err(|e| Error::internal(format!("Index update task failed: {}", e)))?
    }

    /// Chunks most similar to `query`, best first.
    ///
    /// Equal scores keep insertion order. An empty index returns no hits
    /// without calling the embedding provider.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let snapshot = self.snapshot();
        if snapshot.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = tokio::time::timeout(self.inner.embed_timeout, self.inner.embedder.embed(query))
            .await
            .map_err(|_| {
                Error::embedding(format!(
                    "Query embedding timed out after {:?}",
                    self.inner.embed_timeout
                ))
            })??;

        if query_embedding.len() != snapshot.dimensions {
            return Err(Error::embedding(format!(
                "Query embedding has {} dimensions, index expects {}",
                query_embedding.len(),
                snapshot.dimensions
            )));
        }

        let mut hits: Vec<(usize, f32)> = snapshot
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&query_embedding, &entry.embedding)))
            .collect();

        // Stable sort: ties stay in insertion order
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits.truncate(k);

        tracing::debug!("Search returned {} of {} chunks", hits.len(), snapshot.entries.len());

        Ok(hits
            .into_iter()
            .map(|(i, similarity)| SearchHit {
                chunk: snapshot.entries[i].chunk(),
                similarity,
            })
            .collect())
    }

    /// Discard all chunks and the persisted file
    pub async fn reset(&self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.reset().await })
            .await
            .map_err(|e| Error::internal(format!("Index reset task failed: {}", e)))?
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.snapshot().entries.is_empty()
    }

    /// Get chunk count
    pub fn len(&self) -> usize {
        self.snapshot().entries.len()
    }

    /// Distinct document identifiers, in insertion order
    pub fn sources(&self) -> Vec<String> {
        let snapshot = self.snapshot();
        let mut sources: Vec<String> = Vec::new();
        for entry in &snapshot.entries {
            if !sources.iter().any(|s| s == &entry.source) {
                sources.push(entry.source.clone());
            }
        }
        sources
    }

    /// Provider every embedding in this index came from
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedder
    }

    /// Location of the persisted index
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.snapshot.read())
    }
}

impl Inner {
    async fn add(&self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<()> {
        let _gate = self.write_gate.lock().await;

        let current = Arc::clone(&self.snapshot.read());
        let mut next = Snapshot::clone(&current);
        let added = chunks.len();
        next.entries.extend(
            chunks
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| Entry::new(chunk, embedding)),
        );

        let next = Arc::new(next);
        self.persist(Arc::clone(&next)).await?;
        *self.snapshot.write() = next;

        tracing::info!(
            "Indexed {} chunks ({} total)",
            added,
            current.entries.len() + added
        );
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let _gate = self.write_gate.lock().await;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || remove_if_exists(&path))
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))??;

        let (model, dimensions) = {
            let current = self.snapshot.read();
            (current.model.clone(), current.dimensions)
        };
        *self.snapshot.write() = Arc::new(Snapshot::empty(&model, dimensions));

        tracing::info!("Index reset ({})", self.path.display());
        Ok(())
    }

    async fn persist(&self, snapshot: Arc<Snapshot>) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || save(&path, &snapshot))
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
    }
}

fn load(path: &Path) -> Result<Option<Snapshot>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::storage(format!("Failed to read index: {}", e))),
    };

    let (snapshot, _): (Snapshot, usize) =
        bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
            .map_err(|e| Error::storage(format!("Corrupt index file: {}", e)))?;
    Ok(Some(snapshot))
}

/// Write to a temporary file, then rename over the previous index
fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::storage(format!("Failed to create index directory: {}", e)))?;
    }

    let bytes = bincode::serde::encode_to_vec(snapshot, bincode::config::standard())
        .map_err(|e| Error::storage(format!("Failed to encode index: {}", e)))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, &bytes)
        .map_err(|e| Error::storage(format!("Failed to write index: {}", e)))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        Error::storage(format!("Failed to replace index: {}", e))
    })?;

    tracing::debug!("Persisted {} chunks to {}", snapshot.entries.len(), path.display());
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::storage(format!("Failed to delete index: {}", e))),
    }
}

/// Cosine similarity; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Maps a few keywords onto fixed axes
    struct AxisEmbedder {
        model: String,
        calls: AtomicUsize,
    }

    impl AxisEmbedder {
        fn new(model: &str) -> Arc<Self> {
            Arc::new(Self {
                model: model.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(axis(text))
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model(&self) -> &str {
            &self.model
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "axis"
        }
    }

    fn axis(text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        vec![
            if text.contains("cell") { 1.0 } else { 0.0 },
            if text.contains("atom") { 1.0 } else { 0.0 },
            if text.contains("war") { 1.0 } else { 0.0 },
        ]
    }

    fn chunk(source: &str, seq: u32, content: &str) -> Chunk {
        Chunk::new(source, seq, content.to_string(), 0, 0)
    }

    async fn add_texts(index: &VectorIndex, source: &str, texts: &[&str]) {
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| chunk(source, i as u32, t))
            .collect();
        let embeddings = texts.iter().map(|t| axis(t)).collect();
        index.add(chunks, embeddings).await.unwrap();
    }

    async fn open(dir: &TempDir, embedder: Arc<AxisEmbedder>) -> VectorIndex {
        VectorIndex::open(dir.path().join("index.bin"), embedder, Duration::from_secs(5)).await
    }

    /// Every batch must appear whole, contiguous and in sequence order
    fn assert_whole_batches(hits: &[SearchHit], batch: usize) {
        assert_eq!(hits.len() % batch, 0, "partial batch visible: {} hits", hits.len());
        for group in hits.chunks(batch) {
            let source = &group[0].chunk.source;
            for (seq, hit) in group.iter().enumerate() {
                assert_eq!(&hit.chunk.source, source);
                assert_eq!(hit.chunk.sequence, seq as u32);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_and_searches_see_whole_batches() {
        const WRITERS: usize = 6;
        const BATCH: usize = 4;

        let dir = TempDir::new().unwrap();
        let index = open(&dir, AxisEmbedder::new("axis-v1")).await;
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let reader = {
            let index = index.clone();
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let mut observed = 0;
                loop {
                    let finished = done.load(Ordering::SeqCst);
                    let len = index.len();
                    assert_eq!(len % BATCH, 0, "partial batch visible: len {}", len);
                    let hits = index.search("cell", WRITERS * BATCH).await.unwrap();
                    assert_whole_batches(&hits, BATCH);
                    observed += 1;
                    if finished {
                        break observed;
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let index = index.clone();
                tokio::spawn(async move {
                    let source = format!("doc-{}.txt", w);
                    let texts: Vec<String> = (0..BATCH).map(|i| format!("cell note {} of {}", i, w)).collect();
                    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                    add_texts(&index, &source, &refs).await;
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }
        done.store(true, Ordering::SeqCst);
        assert!(reader.await.unwrap() > 0);

        assert_eq!(index.len(), WRITERS * BATCH);
        assert_eq!(index.sources().len(), WRITERS);

        let reopened = open(&dir, AxisEmbedder::new("axis-v1")).await;
        assert_eq!(reopened.len(), WRITERS * BATCH);
        let hits = reopened.search("cell", WRITERS * BATCH).await.unwrap();
        assert_eq!(hits.len(), WRITERS * BATCH);
        assert_whole_batches(&hits, BATCH);
    }

    #[tokio::test]
    async fn test_empty_search_skips_embedding() {
        let dir = TempDir::new().unwrap();
        let embedder = AxisEmbedder::new("axis-v1");
        let index = open(&dir, embedder.clone()).await;

        assert!(index.is_empty());
        assert!(index.search("cells", 4).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ranked_by_similarity_not_insertion() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir, AxisEmbedder::new("axis-v1")).await;

        add_texts(&index, "history.pdf", &["The war ended"]).await;
        add_texts(&index, "biology.pdf", &["A cell divides", "Atoms in a cell"]).await;

        let hits = index.search("cell biology", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].chunk.content, "A cell divides");
        assert_eq!(hits[1].chunk.content, "Atoms in a cell");
        assert_eq!(hits[2].chunk.source, "history.pdf");
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir, AxisEmbedder::new("axis-v1")).await;

        add_texts(&index, "a.pdf", &["cell one", "cell two"]).await;
        add_texts(&index, "b.pdf", &["cell three"]).await;

        let hits = index.search("cell", 3).await.unwrap();
        let order: Vec<&str> = hits.iter().map(|h| h.chunk.content.as_str()).collect();
        assert_eq!(order, vec!["cell one", "cell two", "cell three"]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let index = open(&dir, AxisEmbedder::new("axis-v1")).await;
            add_texts(&index, "a.pdf", &["cell", "atom"]).await;
            add_texts(&index, "b.pdf", &["war"]).await;
        }

        let index = open(&dir, AxisEmbedder::new("axis-v1")).await;
        assert_eq!(index.len(), 3);
        assert_eq!(index.sources(), vec!["a.pdf".to_string(), "b.pdf".to_string()]);
        let hits = index.search("atom", 1).await.unwrap();
        assert_eq!(hits[0].chunk.content, "atom");
    }

    #[tokio::test]
    async fn test_reset_removes_file() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir, AxisEmbedder::new("axis-v1")).await;
        add_texts(&index, "a.pdf", &["cell"]).await;
        assert!(index.path().exists());

        index.reset().await.unwrap();
        assert!(index.is_empty());
        assert!(!index.path().exists());
        assert!(index.search("cell", 4).await.unwrap().is_empty());

        // Resetting an already-empty index is fine
        index.reset().await.unwrap();

        let reopened = open(&dir, AxisEmbedder::new("axis-v1")).await;
        assert!(reopened.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.bin"), b"not an index").unwrap();

        let index = open(&dir, AxisEmbedder::new("axis-v1")).await;
        assert!(index.is_empty());

        // Next mutation overwrites the bad file
        add_texts(&index, "a.pdf", &["cell"]).await;
        let reopened = open(&dir, AxisEmbedder::new("axis-v1")).await;
        assert_eq!(reopened.len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_model_file_ignored() {
        let dir = TempDir::new().unwrap();
        {
            let index = open(&dir, AxisEmbedder::new("axis-v1")).await;
            add_texts(&index, "a.pdf", &["cell"]).await;
        }

        let index = open(&dir, AxisEmbedder::new("axis-v2")).await;
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir, AxisEmbedder::new("axis-v1")).await;

        let err = index
            .add(vec![chunk("a.pdf", 0, "cell")], vec![vec![1.0, 0.0]])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_state_unchanged() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let index = VectorIndex::open(
            blocker.join("index.bin"),
            AxisEmbedder::new("axis-v1"),
            Duration::from_secs(5),
        )
        .await;

        let err = index
            .add(vec![chunk("a.pdf", 0, "cell")], vec![axis("cell")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(index.is_empty());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
