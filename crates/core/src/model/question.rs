use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("correct index {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One immutable quiz item.
///
/// Construction goes through [`Question::new`], and deserialization routes
/// through the same validation, so a `Question` always has a non-empty prompt,
/// two or more options and a `correct_index` inside `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord", into = "QuestionRecord")]
pub struct Question {
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: Option<String>,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt is blank, there are fewer than two
    /// options, or `correct_index` does not point into `options`.
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        explanation: Option<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into().trim().to_string();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions(options.len()));
        }
        if correct_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_index,
                len: options.len(),
            });
        }
        let explanation = explanation
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        Ok(Self {
            prompt,
            options,
            correct_index,
            explanation,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Returns true if `option` is a valid index into this question's options.
    #[must_use]
    pub fn has_option(&self, option: usize) -> bool {
        option < self.options.len()
    }

    #[must_use]
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_index
    }

    /// Letter label for an option index (`0 -> 'A'`).
    #[must_use]
    pub fn option_label(index: usize) -> char {
        u8::try_from(index)
            .ok()
            .filter(|i| *i < 26)
            .map_or('?', |i| char::from(b'A' + i))
    }
}

/// Serialized shape of a question, validated on the way back in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionRecord {
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = QuestionError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        Question::new(
            record.prompt,
            record.options,
            record.correct_index,
            record.explanation,
        )
    }
}

impl From<Question> for QuestionRecord {
    fn from(question: Question) -> Self {
        Self {
            prompt: question.prompt,
            options: question.options,
            correct_index: question.correct_index,
            explanation: question.explanation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Option {i}")).collect()
    }

    #[test]
    fn rejects_invalid_questions() {
        assert_eq!(
            Question::new("  ", options(3), 0, None).unwrap_err(),
            QuestionError::EmptyPrompt
        );
        assert_eq!(
            Question::new("Q", options(1), 0, None).unwrap_err(),
            QuestionError::TooFewOptions(1)
        );
        assert_eq!(
            Question::new("Q", options(2), 2, None).unwrap_err(),
            QuestionError::CorrectIndexOutOfRange { index: 2, len: 2 }
        );
    }

    #[test]
    fn blank_explanation_is_dropped() {
        let q = Question::new("Q", options(2), 1, Some("   ".into())).unwrap();
        assert_eq!(q.explanation(), None);
        assert!(q.is_correct(1));
        assert!(!q.has_option(2));
    }

    #[test]
    fn deserialization_is_validated() {
        let bad = r#"{"prompt":"Q","options":["a","b"],"correctIndex":5}"#;
        assert!(serde_json::from_str::<Question>(bad).is_err());

        let good = r#"{"prompt":"Q","options":["a","b"],"correctIndex":1}"#;
        let q: Question = serde_json::from_str(good).unwrap();
        assert_eq!(q.correct_index(), 1);
    }

    #[test]
    fn option_labels() {
        assert_eq!(Question::option_label(0), 'A');
        assert_eq!(Question::option_label(3), 'D');
        assert_eq!(Question::option_label(30), '?');
    }
}
