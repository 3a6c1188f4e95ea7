use serde::{Deserialize, Serialize};

/// Derived score of a quiz session. Recomputed on demand, never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub correct: usize,
    pub answered: usize,
    pub total: usize,
    /// Share of answered questions that were correct, 0-100 with one decimal.
    pub percentage: f64,
    pub unanswered: usize,
}

impl ScoreSummary {
    /// Builds a summary from raw counts.
    ///
    /// `percentage` is `0.0` when nothing has been answered.
    #[must_use]
    pub fn from_counts(correct: usize, answered: usize, total: usize) -> Self {
        Self {
            correct,
            answered,
            total,
            percentage: percentage_one_decimal(correct, answered),
            unanswered: total.saturating_sub(answered),
        }
    }

    /// Summary of a quiz with no questions answered.
    #[must_use]
    pub fn empty(total: usize) -> Self {
        Self::from_counts(0, 0, total)
    }

    #[must_use]
    pub fn incorrect(&self) -> usize {
        self.answered.saturating_sub(self.correct)
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage_one_decimal(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}
