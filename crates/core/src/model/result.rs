use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{QuizName, ScoreSummary};

/// Outcome of a finished quiz attempt, persisted as the "last result".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub name: QuizName,
    pub score: ScoreSummary,
    /// Wall-clock seconds between quiz start and finish.
    pub total_time_secs: u64,
    /// Seconds spent on each submitted question, keyed by question index.
    pub question_times: BTreeMap<usize, u64>,
    pub flagged: Vec<usize>,
    pub completed_at: DateTime<Utc>,
}

/// Running totals across every finished quiz.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifetimeStats {
    pub total_quizzes: u64,
    pub total_questions: u64,
    pub total_correct: u64,
    pub total_time_secs: u64,
}

impl LifetimeStats {
    /// Folds one finished quiz into the totals.
    pub fn record(&mut self, result: &QuizResult) {
        self.total_quizzes = self.total_quizzes.saturating_add(1);
        self.total_questions = self
            .total_questions
            .saturating_add(result.score.answered as u64);
        self.total_correct = self
            .total_correct
            .saturating_add(result.score.correct as u64);
        self.total_time_secs = self.total_time_secs.saturating_add(result.total_time_secs);
    }

    /// Lifetime accuracy in percent, one decimal, `0.0` before any answers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        (self.total_correct as f64 / self.total_questions as f64 * 1000.0).round() / 10.0
    }
}
