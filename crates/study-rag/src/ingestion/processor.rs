//! Ingestion pipeline orchestration

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::error::{Error, Result};
use crate::retrieval::VectorIndex;
use crate::types::{IngestReport, LoadedDocument};

use super::chunker::TextChunker;
use super::parser::DocumentLoader;

/// Turns documents on disk into searchable chunks
///
/// load → split → embed (in batches, time-boxed) → add to the index, which
/// persists before the chunks become visible.
#[derive(Clone)]
pub struct IngestPipeline {
    /// Text chunker
    chunker: TextChunker,
    /// Destination index; also supplies the embedding provider
    index: VectorIndex,
    /// Texts per embedding call
    batch_size: usize,
    /// Limit for each embedding call
    embed_timeout: Duration,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(chunker: TextChunker, index: VectorIndex, batch_size: usize, embed_timeout: Duration) -> Self {
        Self {
            chunker,
            index,
            batch_size: batch_size.max(1),
            embed_timeout,
        }
    }

    /// Ingest the document at `path`
    pub async fn ingest(&self, path: &Path) -> Result<IngestReport> {
        let started = Instant::now();
        tracing::info!("Ingesting {}", path.display());

        let document = DocumentLoader::load(path).await?;
        self.ingest_document(document, started).await
    }

    /// Ingest the file at `path` as the document named `source`
    pub async fn ingest_as(&self, path: &Path, source: &str) -> Result<IngestReport> {
        let started = Instant::now();
        tracing::info!("Ingesting {} as {}", path.display(), source);

        let document = DocumentLoader::load_as(path, source.to_string()).await?;
        self.ingest_document(document, started).await
    }

    /// Chunk, embed and index an already-loaded document
    pub async fn ingest_loaded(&self, document: LoadedDocument) -> Result<IngestReport> {
        self.ingest_document(document, Instant::now()).await
    }

    async fn ingest_document(&self, document: LoadedDocument, started: Instant) -> Result<IngestReport> {
        let chunks = self.chunker.split(&document.source, &document.text);

        if chunks.is_empty() {
            tracing::warn!(
                "{} has no extractable text; nothing indexed (scanned PDF?)",
                document.source
            );
        } else {
            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embed_all(&texts).await?;
            self.index.add(chunks.clone(), embeddings).await?;
        }

        let report = IngestReport {
            source: document.source,
            file_type: document.file_type,
            page_count: document.page_count,
            chunk_count: chunks.len(),
            ingested_at: Utc::now(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Ingested {}: {} chunks in {}ms",
            report.source,
            report.chunk_count,
            report.processing_time_ms
        );
        Ok(report)
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embedder = self.index.embedder();
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let batch_embeddings = tokio::time::timeout(self.embed_timeout, embedder.embed_batch(batch))
                .await
                .map_err(|_| {
                    Error::embedding(format!(
                        "{} timed out after {:?}",
                        embedder.name(),
                        self.embed_timeout
                    ))
                })??;

            if batch_embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "{} returned {} embeddings for {} texts",
                    embedder.name(),
                    batch_embeddings.len(),
                    batch.len()
                )));
            }
            embeddings.extend(batch_embeddings);
        }

        tracing::debug!("Embedded {} chunks", embeddings.len());
        Ok(embeddings)
    }

    /// Chunker used for splitting
    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }
}
