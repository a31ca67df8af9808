//! Multiple-choice quiz types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Option label of a multiple-choice question
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    /// All labels in display order
    pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        };
        f.write_str(label)
    }
}

/// Exactly four labelled options; any other key set fails to deserialize
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct QuizOptions {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D")]
    pub d: String,
}

impl QuizOptions {
    /// Text of the option with the given label
    pub fn get(&self, label: OptionLabel) -> &str {
        match label {
            OptionLabel::A => &self.a,
            OptionLabel::B => &self.b,
            OptionLabel::C => &self.c,
            OptionLabel::D => &self.d,
        }
    }

    /// Options in label order
    pub fn iter(&self) -> impl Iterator<Item = (OptionLabel, &str)> {
        OptionLabel::ALL.into_iter().map(move |label| (label, self.get(label)))
    }
}

/// A single multiple-choice question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizQuestion {
    /// Question text
    pub question: String,
    /// Options A-D
    pub options: QuizOptions,
    /// Correct option
    pub answer: OptionLabel,
    /// Why the answer is correct
    pub explanation: String,
}

/// Ordered list of questions
pub type Quiz = Vec<QuizQuestion>;

/// Result of a quiz request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizOutcome {
    /// Questions generated from indexed content
    Generated(Quiz),
    /// Nothing is indexed yet; not a failure
    NoContent,
}

impl QuizOutcome {
    /// Generated questions, if any
    pub fn into_quiz(self) -> Option<Quiz> {
        match self {
            QuizOutcome::Generated(quiz) => Some(quiz),
            QuizOutcome::NoContent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_json_shape() {
        let json = r#"{
            "question": "What is ATP?",
            "options": {"A": "Energy carrier", "B": "Enzyme", "C": "Lipid", "D": "Ion"},
            "answer": "A",
            "explanation": "ATP stores chemical energy."
        }"#;
        let q: QuizQuestion = serde_json::from_str(json).unwrap();
        assert_eq!(q.answer, OptionLabel::A);
        assert_eq!(q.options.get(OptionLabel::C), "Lipid");

        let labels: Vec<String> = q.options.iter().map(|(l, _)| l.to_string()).collect();
        assert_eq!(labels, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_fifth_option_rejected() {
        let json = r#"{"A": "1", "B": "2", "C": "3", "D": "4", "E": "5"}"#;
        assert!(serde_json::from_str::<QuizOptions>(json).is_err());
    }

    #[test]
    fn test_missing_option_rejected() {
        let json = r#"{"A": "1", "B": "2", "C": "3"}"#;
        assert!(serde_json::from_str::<QuizOptions>(json).is_err());
    }
}
