//! Grounded question answering over the index

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::GenerationProvider;
use crate::retrieval::VectorIndex;
use crate::types::AnswerResult;

use super::prompt::PromptBuilder;

/// Answers questions from retrieved context only
#[derive(Clone)]
pub struct AnswerSynthesizer {
    index: VectorIndex,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
    temperature: f32,
    timeout: Duration,
}

impl AnswerSynthesizer {
    /// Create a new answer synthesizer
    pub fn new(
        index: VectorIndex,
        generator: Arc<dyn GenerationProvider>,
        top_k: usize,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            index,
            generator,
            top_k: top_k.max(1),
            temperature,
            timeout,
        }
    }

    /// Answer `question` from the indexed documents.
    ///
    /// An empty index yields the fixed no-documents answer for any question,
    /// blank included, without calling either provider.
    pub async fn answer(&self, question: &str) -> Result<AnswerResult> {
        if self.index.is_empty() {
            tracing::info!("Question received with nothing indexed");
            return Ok(AnswerResult::no_documents());
        }
        if question.trim().is_empty() {
            return Err(Error::InvalidInput("question must not be empty".to_string()));
        }

        let hits = self.index.search(question, self.top_k).await?;
        if hits.is_empty() {
            // Index was reset between the check and the search
            return Ok(AnswerResult::no_documents());
        }

        let context = PromptBuilder::build_context(hits.iter().map(|h| &h.chunk));
        let prompt = PromptBuilder::answer_prompt(question, &context);

        tracing::debug!(
            "Answering with {} chunks ({} chars of context)",
            hits.len(),
            context.len()
        );

        let answer = tokio::time::timeout(self.timeout, self.generator.complete(&prompt, self.temperature))
            .await
            .map_err(|_| {
                Error::generation(format!(
                    "{} did not answer within {:?}",
                    self.generator.name(),
                    self.timeout
                ))
            })??;

        let result = AnswerResult::from_chunks(answer.trim().to_string(), hits.iter().map(|h| &h.chunk));
        tracing::info!(
            "Answered from {} chunks across {} sources",
            hits.len(),
            result.sources.len()
        );
        Ok(result)
    }
}
