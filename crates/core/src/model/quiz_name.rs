use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuizNameError {
    #[error("quiz name cannot be empty")]
    Empty,
}

/// Name of a loaded quiz, used to key persisted progress.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuizName(String);

impl QuizName {
    /// Creates a trimmed, non-empty quiz name.
    ///
    /// # Errors
    ///
    /// Returns `QuizNameError::Empty` if the name is blank.
    pub fn new(name: impl Into<String>) -> Result<Self, QuizNameError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(QuizNameError::Empty);
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name with every character outside `[A-Za-z0-9_-]` replaced by `_`,
    /// safe for file names.
    #[must_use]
    pub fn sanitized(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl TryFrom<String> for QuizName {
    type Error = QuizNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QuizName> for String {
    fn from(name: QuizName) -> Self {
        name.0
    }
}

impl fmt::Debug for QuizName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuizName({:?})", self.0)
    }
}

impl fmt::Display for QuizName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_rejects_blank() {
        assert_eq!(QuizName::new("  Cardiology ").unwrap().as_str(), "Cardiology");
        assert_eq!(QuizName::new(" ").unwrap_err(), QuizNameError::Empty);
    }

    #[test]
    fn sanitized_replaces_unsafe_chars() {
        let name = QuizName::new("Renal & Uro/2024").unwrap();
        assert_eq!(name.sanitized(), "Renal___Uro_2024");
    }
}
