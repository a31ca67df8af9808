//! Study assistant facade composing ingestion, retrieval and synthesis

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{AnswerSynthesizer, QuizSynthesizer};
use crate::ingestion::{IngestPipeline, TextChunker};
use crate::providers::{self, EmbeddingProvider, GenerationProvider};
use crate::retrieval::VectorIndex;
use crate::storage::{sanitize_filename, UploadStore};
use crate::types::{AnswerResult, FileType, IndexStatus, IngestReport, QuizOutcome};

/// One index, one embedding provider and one generation provider per
/// process; handlers share it behind an `Arc`.
pub struct StudyAssistant {
    config: RagConfig,
    index: VectorIndex,
    pipeline: IngestPipeline,
    answers: AnswerSynthesizer,
    quizzes: QuizSynthesizer,
    uploads: UploadStore,
    generator: Arc<dyn GenerationProvider>,
}

impl StudyAssistant {
    /// Build providers from configuration and open the persisted index.
    ///
    /// Provider construction errors are returned here, at startup.
    pub async fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;
        let embedder = providers::embedding_provider(&config).await?;
        let generator = providers::generation_provider(&config)?;
        Self::with_providers(config, embedder, generator).await
    }

    /// Assemble the assistant around already-constructed providers
    pub async fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self> {
        Self::build(config, embedder, generator, None).await
    }

    /// Like [`Self::with_providers`], with a fixed quiz random source
    pub async fn with_rng(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        rng: StdRng,
    ) -> Result<Self> {
        Self::build(config, embedder, generator, Some(rng)).await
    }

    async fn build(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        rng: Option<StdRng>,
    ) -> Result<Self> {
        config.validate()?;
        if embedder.dimensions() != config.embeddings.dimensions {
            tracing::warn!(
                "Configured {} embedding dimensions but {} reports {}; using the provider's",
                config.embeddings.dimensions,
                embedder.name(),
                embedder.dimensions()
            );
        }

        let embed_timeout = Duration::from_secs(config.embeddings.timeout_secs);
        let llm_timeout = Duration::from_secs(config.llm.timeout_secs);

        let index = VectorIndex::open(&config.storage.index_path, embedder, embed_timeout).await;
        let pipeline = IngestPipeline::new(
            TextChunker::from_config(&config.chunking),
            index.clone(),
            config.embeddings.batch_size,
            embed_timeout,
        );
        let answers = AnswerSynthesizer::new(
            index.clone(),
            Arc::clone(&generator),
            config.retrieval.top_k,
            config.llm.answer_temperature,
            llm_timeout,
        );
        let quizzes = match rng {
            Some(rng) => QuizSynthesizer::with_rng(
                index.clone(),
                Arc::clone(&generator),
                config.quiz.clone(),
                llm_timeout,
                rng,
            ),
            None => QuizSynthesizer::new(
                index.clone(),
                Arc::clone(&generator),
                config.quiz.clone(),
                llm_timeout,
            ),
        };
        let uploads = UploadStore::new(&config.storage.uploads_dir);

        tracing::info!(
            "Study assistant ready ({} chunks indexed, generation via {})",
            index.len(),
            generator.name()
        );

        Ok(Self {
            config,
            index,
            pipeline,
            answers,
            quizzes,
            uploads,
            generator,
        })
    }

    /// Index the document at `path`
    pub async fn ingest(&self, path: &Path) -> Result<IngestReport> {
        self.pipeline.ingest(path).await
    }

    /// Index an uploaded document, keeping the file once it is indexed.
    ///
    /// Unsupported types are rejected before anything is written. The bytes
    /// are staged and only replace an earlier upload of the same name after
    /// indexing succeeds; on failure the earlier file is left as it was.
    pub async fn ingest_upload(&self, filename: &str, bytes: &[u8]) -> Result<IngestReport> {
        let name = sanitize_filename(filename)?;
        if !FileType::from_filename(name).is_supported() {
            return Err(Error::UnsupportedFormat(format!(
                "'{}' - supported types are PDF, TXT and MD",
                name
            )));
        }

        let staged = self.uploads.stage(name, bytes).await?;
        let indexed = self.pipeline.ingest_as(staged.path(), staged.name()).await;
        match indexed {
            Ok(report) => {
                staged.commit().await?;
                Ok(report)
            }
            Err(e) => {
                staged.discard().await;
                Err(e)
            }
        }
    }

    /// Answer a question from indexed documents
    pub async fn answer(&self, question: &str) -> Result<AnswerResult> {
        self.answers.answer(question).await
    }

    /// Generate a quiz of `num_questions` questions
    pub async fn generate_quiz(&self, num_questions: usize) -> Result<QuizOutcome> {
        self.quizzes.generate(num_questions).await
    }

    /// Quiz size used when the caller does not specify one
    pub fn default_quiz_size(&self) -> usize {
        self.quizzes.default_questions()
    }

    /// Discard the searchable index; uploaded files are kept
    pub async fn reset_index(&self) -> Result<()> {
        self.index.reset().await
    }

    /// Delete uploaded files; the index is kept
    pub async fn reset_uploads(&self) -> Result<()> {
        self.uploads.clear().await
    }

    /// Factory reset: index and uploaded files
    pub async fn reset_all(&self) -> Result<()> {
        self.reset_index().await?;
        self.reset_uploads().await?;
        tracing::info!("Study assistant reset");
        Ok(())
    }

    /// Current index status
    pub fn status(&self) -> IndexStatus {
        IndexStatus {
            empty: self.index.is_empty(),
            chunk_count: self.index.len(),
            documents: self.index.sources(),
            embedding_model: self.index.embedder().model().to_string(),
        }
    }

    /// Whether the generation provider currently answers
    pub async fn generation_healthy(&self) -> bool {
        self.generator.health_check().await.unwrap_or(false)
    }

    /// Active configuration
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Shared index
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Upload store
    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Generation provider
    pub fn generator(&self) -> &Arc<dyn GenerationProvider> {
        &self.generator
    }
}
