//! Multiple-choice quiz generation from sampled index content

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::QuizConfig;
use crate::error::{Error, Result};
use crate::providers::GenerationProvider;
use crate::retrieval::VectorIndex;
use crate::types::{QuizOutcome, SearchHit};

use super::output::parse_quiz;
use super::prompt::PromptBuilder;

/// Generates quizzes from a randomized slice of the index
///
/// Each quiz starts from a random thematic seed query, retrieves a candidate
/// pool, shuffles it and keeps a smaller sample, so repeated requests do not
/// always draw on the most central chunks. The random source is injectable.
pub struct QuizSynthesizer {
    index: VectorIndex,
    generator: Arc<dyn GenerationProvider>,
    config: QuizConfig,
    timeout: Duration,
    rng: Mutex<StdRng>,
}

impl QuizSynthesizer {
    /// Create a synthesizer seeded from `config.rng_seed`, or from entropy
    pub fn new(
        index: VectorIndex,
        generator: Arc<dyn GenerationProvider>,
        config: QuizConfig,
        timeout: Duration,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(index, generator, config, timeout, rng)
    }

    /// Create a synthesizer with an explicit random source
    pub fn with_rng(
        index: VectorIndex,
        generator: Arc<dyn GenerationProvider>,
        config: QuizConfig,
        timeout: Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            index,
            generator,
            config,
            timeout,
            rng: Mutex::new(rng),
        }
    }

    /// Generate `num_questions` questions, or report that nothing is indexed
    pub async fn generate(&self, num_questions: usize) -> Result<QuizOutcome> {
        if num_questions == 0 || num_questions > self.config.max_questions {
            return Err(Error::InvalidInput(format!(
                "num_questions must be between 1 and {}",
                self.config.max_questions
            )));
        }
        if self.index.is_empty() {
            tracing::info!("Quiz requested with nothing indexed");
            return Ok(QuizOutcome::NoContent);
        }

        let seed = self.pick_seed()?;
        let pool = self.index.search(&seed, self.config.candidate_pool).await?;
        if pool.is_empty() {
            return Ok(QuizOutcome::NoContent);
        }
        let pool_size = pool.len();
        let selected = self.sample(pool);

        let context = PromptBuilder::build_context(selected.iter().map(|h| &h.chunk));
        let prompt = PromptBuilder::quiz_prompt(num_questions, &context);

        tracing::info!(
            "Generating {} questions from seed '{}' ({} of {} candidate chunks)",
            num_questions,
            seed,
            selected.len(),
            pool_size
        );

        let reply = tokio::time::timeout(
            self.timeout,
            self.generator.complete(&prompt, self.config.temperature),
        )
        .await
        .map_err(|_| {
            Error::generation(format!(
                "{} did not produce a quiz within {:?}",
                self.generator.name(),
                self.timeout
            ))
        })??;

        let quiz = parse_quiz(&reply, num_questions).map_err(|e| {
            tracing::warn!("Discarding unparseable quiz reply: {}", e);
            e
        })?;

        tracing::info!("Parsed {} quiz questions", quiz.len());
        Ok(QuizOutcome::Generated(quiz))
    }

    fn pick_seed(&self) -> Result<String> {
        let mut rng = self.rng.lock();
        self.config
            .seeds
            .choose(&mut *rng)
            .cloned()
            .ok_or_else(|| Error::Config("quiz seeds must not be empty".to_string()))
    }

    fn sample(&self, mut pool: Vec<SearchHit>) -> Vec<SearchHit> {
        pool.shuffle(&mut *self.rng.lock());
        pool.truncate(self.config.sample_size);
        pool
    }

    /// Default question count
    pub fn default_questions(&self) -> usize {
        self.config.default_questions
    }

    /// Largest accepted question count
    pub fn max_questions(&self) -> usize {
        self.config.max_questions
    }
}
