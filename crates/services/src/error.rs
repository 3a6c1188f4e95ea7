//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::QuizNameError;
use storage::StorageError;

/// Errors emitted by `QuizEngine`.
///
/// Every variant is recoverable: the rejected call leaves the engine exactly
/// as it was.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no questions to start a quiz with")]
    EmptySource,
    #[error("index {index} is out of range (len {len})")]
    InvalidIndex { index: usize, len: usize },
    #[error("question {index} has already been submitted")]
    AlreadySubmitted { index: usize },
    #[error("no quiz in progress")]
    NoActiveQuiz,
    #[error("quiz length must be at least 1, got {0}")]
    InvalidLength(usize),
    #[error("quiz storage unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Errors emitted by question sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("quiz not found: {0}")]
    NotFound(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("could not parse quiz: {0}")]
    Parse(String),
    #[error("quiz file too large ({bytes} bytes, max {limit})")]
    TooLarge { bytes: u64, limit: u64 },
    #[error("quiz source unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

/// Errors emitted by `QuizLibrary`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LibraryError {
    #[error("no valid questions found in {0}")]
    NoQuestions(String),
    #[error("quiz file too large ({bytes} bytes, max {limit})")]
    TooLarge { bytes: u64, limit: u64 },
    #[error(transparent)]
    Name(#[from] QuizNameError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
