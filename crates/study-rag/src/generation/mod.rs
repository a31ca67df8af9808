//! Answer and quiz synthesis on top of retrieval

mod answer;
pub mod output;
mod prompt;
mod quiz;

pub use answer::AnswerSynthesizer;
pub use output::{parse_quiz, strip_code_fences};
pub use prompt::PromptBuilder;
pub use quiz::QuizSynthesizer;
