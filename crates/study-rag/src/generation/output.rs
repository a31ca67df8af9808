//! Unwrapping and validating untrusted model output

use crate::error::{Error, Result};
use crate::types::{Quiz, QuizQuestion};

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Strip markdown code fencing from a model reply.
///
/// With a ```` ```json ```` fence, the first such block wins; otherwise the
/// first untagged block. A missing closing fence keeps everything after
/// the opening one. Text without fences is returned trimmed, so applying
/// this twice gives the same result as applying it once.
pub fn strip_code_fences(raw: &str) -> &str {
    let body = if let Some(start) = raw.find(JSON_FENCE) {
        &raw[start + JSON_FENCE.len()..]
    } else if let Some(start) = raw.find(FENCE) {
        let after = &raw[start + FENCE.len()..];
        // Drop any other language tag on the opening line
        match after.find('\n') {
            Some(nl) if is_language_tag(&after[..nl]) => &after[nl + 1..],
            _ => after,
        }
    } else {
        return raw.trim();
    };

    match body.find(FENCE) {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

fn is_language_tag(line: &str) -> bool {
    let tag = line.trim();
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Parse a quiz reply into exactly `expected` questions.
///
/// Extra questions are dropped. Fewer questions, blank question or option
/// text, or anything that is not a JSON array of well-formed questions is
/// [`Error::QuizParse`].
pub fn parse_quiz(raw: &str, expected: usize) -> Result<Quiz> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(Error::QuizParse("reply was empty".to_string()));
    }

    let mut quiz: Vec<QuizQuestion> = serde_json::from_str(cleaned)
        .map_err(|e| Error::QuizParse(format!("reply is not a valid question array: {}", e)))?;

    if quiz.len() < expected {
        return Err(Error::QuizParse(format!(
            "expected {} questions, reply had {}",
            expected,
            quiz.len()
        )));
    }
    if quiz.len() > expected {
        tracing::debug!("Reply had {} questions; keeping the first {}", quiz.len(), expected);
        quiz.truncate(expected);
    }

    for (i, question) in quiz.iter().enumerate() {
        if question.question.trim().is_empty() {
            return Err(Error::QuizParse(format!("question {} has no text", i + 1)));
        }
        if let Some((label, _)) = question.options.iter().find(|(_, text)| text.trim().is_empty()) {
            return Err(Error::QuizParse(format!(
                "question {} has an empty option {}",
                i + 1,
                label
            )));
        }
    }

    Ok(quiz)
}
