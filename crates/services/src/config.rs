use std::env;

use chrono::Duration;

use quiz_core::model::QuizLength;

/// Largest accepted quiz upload.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizConfig {
    /// Used when neither the caller nor stored preferences pick a length.
    pub default_length: QuizLength,
    /// Saved progress older than this is ignored on resume. `None` keeps it forever.
    pub progress_max_age: Option<Duration>,
    pub max_upload_bytes: u64,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            default_length: QuizLength::default(),
            progress_max_age: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl QuizConfig {
    /// Reads `QUIZ_LENGTH` and `QUIZ_PROGRESS_MAX_AGE_DAYS`, falling back to
    /// defaults for anything missing or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var("QUIZ_LENGTH") {
            match raw.parse::<QuizLength>() {
                Ok(length) => config.default_length = length,
                Err(err) => log::warn!("ignoring QUIZ_LENGTH: {err}"),
            }
        }

        if let Ok(raw) = env::var("QUIZ_PROGRESS_MAX_AGE_DAYS") {
            match raw.trim().parse::<i64>() {
                Ok(days) if days > 0 => config.progress_max_age = Some(Duration::days(days)),
                _ => log::warn!("ignoring QUIZ_PROGRESS_MAX_AGE_DAYS={raw:?}"),
            }
        }

        config
    }

    #[must_use]
    pub fn with_default_length(mut self, length: QuizLength) -> Self {
        self.default_length = length;
        self
    }

    #[must_use]
    pub fn with_progress_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.progress_max_age = max_age;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_never_expire_progress() {
        let config = QuizConfig::default();
        assert_eq!(config.default_length, QuizLength::Questions(20));
        assert_eq!(config.progress_max_age, None);
        assert_eq!(config.max_upload_bytes, 5_242_880);
    }

    #[test]
    fn builders_override_fields() {
        let config = QuizConfig::default()
            .with_default_length(QuizLength::All)
            .with_progress_max_age(Some(Duration::days(7)));
        assert_eq!(config.default_length, QuizLength::All);
        assert_eq!(config.progress_max_age, Some(Duration::days(7)));
    }
}
