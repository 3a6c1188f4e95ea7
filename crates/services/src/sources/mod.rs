//! Where quiz questions come from.

use async_trait::async_trait;

use quiz_core::model::Question;

use crate::error::SourceError;

mod directory;
mod http;

pub use directory::DirectoryQuestionSource;
pub use http::HttpQuestionSource;

/// Supplies fully materialized question lists by identifier.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch every question of the quiz named `identifier`.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::NotFound` for unknown quizzes, or another
    /// `SourceError` when the backend cannot be reached or parsed.
    async fn fetch_questions(&self, identifier: &str) -> Result<Vec<Question>, SourceError>;

    /// Names of the quizzes this source can serve, sorted.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` when the listing cannot be produced.
    async fn list_quizzes(&self) -> Result<Vec<String>, SourceError>;
}
