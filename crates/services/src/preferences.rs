use std::sync::Arc;

use quiz_core::model::QuizLength;
use storage::KeyValueStore;
use storage::keys::QUIZ_LENGTH;
use storage::repository::{load_json, save_json};

use crate::error::QuizError;

/// Persists the user's preferred quiz length.
#[derive(Clone)]
pub struct QuizPreferencesService {
    store: Arc<dyn KeyValueStore>,
    fallback: QuizLength,
}

impl QuizPreferencesService {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, fallback: QuizLength) -> Self {
        Self { store, fallback }
    }

    /// Load the stored length, or the fallback if missing or out of range.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::StoreUnavailable` on storage failures.
    pub async fn load_length(&self) -> Result<QuizLength, QuizError> {
        let stored: Option<QuizLength> = load_json(self.store.as_ref(), QUIZ_LENGTH).await?;
        Ok(match stored.map(QuizLength::validated) {
            Some(Ok(length)) => length,
            Some(Err(err)) => {
                log::warn!("stored quiz length rejected: {err}");
                self.fallback
            }
            None => self.fallback,
        })
    }

    /// Validate and persist a new length.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidLength` for an out-of-range count, or
    /// `QuizError::StoreUnavailable` if persistence fails.
    pub async fn save_length(&self, length: QuizLength) -> Result<QuizLength, QuizError> {
        let length = length
            .validated()
            .map_err(|_| QuizError::InvalidLength(length.limit().unwrap_or(0)))?;
        save_json(self.store.as_ref(), QUIZ_LENGTH, &length).await?;
        Ok(length)
    }
}
