//! Key names used in the key-value store.

use quiz_core::model::QuizName;

/// Prefix of per-quiz saved progress entries.
pub const QUIZ_PROGRESS: &str = "quizProgress";
/// Most recently finished quiz result.
pub const LAST_QUIZ: &str = "lastQuiz";
/// Lifetime totals across finished quizzes.
pub const SESSION_STATS: &str = "sessionStats";
/// Preferred number of questions per attempt.
pub const QUIZ_LENGTH: &str = "quizLength";
/// Library of quizzes imported from files.
pub const UPLOADED_QUIZZES: &str = "uploadedQuizzes";

/// Key of the saved progress for `name`.
#[must_use]
pub fn progress_key(name: &QuizName) -> String {
    format!("{QUIZ_PROGRESS}_{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_key_uses_raw_name() {
        let name = QuizName::new("Renal Medicine").unwrap();
        assert_eq!(progress_key(&name), "quizProgress_Renal Medicine");
    }
}
