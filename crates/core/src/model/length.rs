use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Smallest limited quiz a user may pick.
pub const MIN_QUIZ_LENGTH: u16 = 5;
/// Largest limited quiz a user may pick.
pub const MAX_QUIZ_LENGTH: u16 = 100;
/// Length used when no preference has been stored.
pub const DEFAULT_QUIZ_LENGTH: u16 = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizLengthError {
    #[error("quiz length must be between {MIN_QUIZ_LENGTH} and {MAX_QUIZ_LENGTH}, got {0}")]
    OutOfRange(u64),

    #[error("invalid quiz length: {0:?}")]
    Unparseable(String),
}

/// How many questions a quiz attempt should draw from the loaded pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuizLength {
    All,
    Questions(u16),
}

impl QuizLength {
    /// Creates a limited length.
    ///
    /// # Errors
    ///
    /// Returns `QuizLengthError::OutOfRange` outside `5..=100`.
    pub fn questions(n: u16) -> Result<Self, QuizLengthError> {
        if !(MIN_QUIZ_LENGTH..=MAX_QUIZ_LENGTH).contains(&n) {
            return Err(QuizLengthError::OutOfRange(u64::from(n)));
        }
        Ok(Self::Questions(n))
    }

    /// The cap to pass to `start_quiz`, or `None` for the full pool.
    #[must_use]
    pub fn limit(self) -> Option<usize> {
        match self {
            QuizLength::All => None,
            QuizLength::Questions(n) => Some(usize::from(n)),
        }
    }

    /// Re-checks bounds on a value that came from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizLengthError::OutOfRange` if a persisted count is out of bounds.
    pub fn validated(self) -> Result<Self, QuizLengthError> {
        match self {
            QuizLength::All => Ok(self),
            QuizLength::Questions(n) => Self::questions(n),
        }
    }
}

impl Default for QuizLength {
    fn default() -> Self {
        Self::Questions(DEFAULT_QUIZ_LENGTH)
    }
}

impl FromStr for QuizLength {
    type Err = QuizLengthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let n: u64 = trimmed
            .parse()
            .map_err(|_| QuizLengthError::Unparseable(trimmed.to_string()))?;
        let n = u16::try_from(n).map_err(|_| QuizLengthError::OutOfRange(n))?;
        Self::questions(n)
    }
}

impl fmt::Display for QuizLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizLength::All => f.write_str("all"),
            QuizLength::Questions(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_and_counts() {
        assert_eq!("all".parse::<QuizLength>().unwrap(), QuizLength::All);
        assert_eq!(" 50 ".parse::<QuizLength>().unwrap(), QuizLength::Questions(50));
        assert_eq!(
            "4".parse::<QuizLength>().unwrap_err(),
            QuizLengthError::OutOfRange(4)
        );
        assert_eq!(
            "70000".parse::<QuizLength>().unwrap_err(),
            QuizLengthError::OutOfRange(70_000)
        );
        assert!(matches!(
            "ten".parse::<QuizLength>(),
            Err(QuizLengthError::Unparseable(_))
        ));
    }

    #[test]
    fn default_is_twenty_questions() {
        assert_eq!(QuizLength::default().limit(), Some(20));
        assert_eq!(QuizLength::All.limit(), None);
    }
}
