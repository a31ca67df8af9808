//! Prompt templates for grounded answers and quiz generation

use crate::providers::Prompt;
use crate::types::Chunk;

/// Separator between chunks in the assembled context
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Prompt builder for study-assistant requests
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join chunk texts into one context block, in the given order
    pub fn build_context<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> String {
        chunks
            .into_iter()
            .map(|chunk| chunk.content.trim())
            .filter(|content| !content.is_empty())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// Grounded answer prompt: instructions and context in the system role,
    /// the student's question as the user message
    pub fn answer_prompt(question: &str, context: &str) -> Prompt {
        let system = format!(
            "You are an AI Study Assistant. Use the following pieces of context to answer the student's question. \
If you don't know the answer, just say that you don't know, don't try to make up an answer. \
Stay grounded in the provided context. If the question is not related to the context, \
politely inform the student that you can only answer questions based on their study materials.\n\n\
{context}"
        );
        Prompt::with_system(system, question.trim())
    }

    /// Multiple-choice quiz prompt requesting a bare JSON array
    pub fn quiz_prompt(num_questions: usize, context: &str) -> Prompt {
        Prompt::user(format!(
            r#"Based on the following context from study materials, generate {n} Multiple Choice Questions (MCQs).

IMPORTANT: Ensure the questions are diverse and cover different parts of the context provided. Do not repeat the same questions.

Each question should:
- Have 4 options labeled A, B, C, D
- Have exactly one correct answer
- Include a brief explanation

Format your response as a valid JSON array like this:
[
  {{
    "question": "What is...",
    "options": {{"A": "...", "B": "...", "C": "...", "D": "..."}},
    "answer": "A",
    "explanation": "..."
  }}
]

Context:
{context}

Generate exactly {n} questions BASED ON THE CONTEXT. Return ONLY the JSON array, no other text."#,
            n = num_questions,
            context = context
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_order() {
        let chunks = vec![
            Chunk::new("a.pdf", 0, "Second law.".into(), 0, 0),
            Chunk::new("a.pdf", 1, "  ".into(), 0, 0),
            Chunk::new("b.pdf", 0, "First law.\n".into(), 0, 0),
        ];
        assert_eq!(PromptBuilder::build_context(&chunks), "Second law.\n\nFirst law.");
    }

    #[test]
    fn test_answer_prompt_is_grounded() {
        let prompt = PromptBuilder::answer_prompt("  What is entropy? ", "Entropy measures disorder.");
        let system = prompt.system.unwrap();
        assert!(system.contains("don't know"));
        assert!(system.contains("only answer questions based on their study materials"));
        assert!(system.ends_with("Entropy measures disorder."));
        assert_eq!(prompt.user, "What is entropy?");
    }

    #[test]
    fn test_quiz_prompt_states_count_and_schema() {
        let prompt = PromptBuilder::quiz_prompt(7, "Mitochondria produce ATP.");
        assert!(prompt.system.is_none());
        assert!(prompt.user.contains("generate 7 Multiple Choice Questions"));
        assert!(prompt.user.contains("Generate exactly 7 questions"));
        assert!(prompt.user.contains(r#""options": {"A": "...", "B": "...", "C": "...", "D": "..."}"#));
        assert!(prompt.user.contains("Return ONLY the JSON array"));
        assert!(prompt.user.contains("Mitochondria produce ATP."));
    }
}
