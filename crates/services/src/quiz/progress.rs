use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quiz_core::model::{QuizName, ScoreSummary};
use quiz_core::time::elapsed_secs;

use super::session::QuizSession;

/// Aggregated view of quiz progress, useful for a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    /// 1-based position of the current question.
    pub current: usize,
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    /// Whole percent of submitted questions.
    pub percentage: u8,
}

impl QuizProgress {
    #[must_use]
    pub(crate) fn of(session: &QuizSession) -> Self {
        let total = session.len();
        let answered = session.submitted().len();
        let percentage = if total == 0 {
            0
        } else {
            u8::try_from((answered * 100 + total / 2) / total).unwrap_or(100)
        };
        Self {
            current: session.current_index() + 1,
            total,
            answered,
            unanswered: total.saturating_sub(answered),
            percentage,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.answered == self.total
    }
}

/// Detailed statistics for the live attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuizStatistics {
    pub score: ScoreSummary,
    /// Wall-clock seconds since the attempt started.
    pub total_time_secs: u64,
    /// Sum of recorded per-question times.
    pub question_time_secs: u64,
    /// `total_time_secs` over submitted questions, rounded; `0` before any submission.
    pub average_time_per_question: u64,
    pub flagged_count: usize,
    pub ruled_out_count: usize,
}

impl QuizStatistics {
    #[must_use]
    pub(crate) fn of(session: &QuizSession, now: DateTime<Utc>) -> Self {
        let score = session.score();
        let total_time_secs = elapsed_secs(session.started_at(), now);
        let answered = score.answered as u64;
        let average_time_per_question = if answered == 0 {
            0
        } else {
            (total_time_secs + answered / 2) / answered
        };
        Self {
            score,
            total_time_secs,
            question_time_secs: session.question_times().values().sum(),
            average_time_per_question,
            flagged_count: session.flagged().len(),
            ruled_out_count: session.ruled_out_count(),
        }
    }
}

/// Persisted snapshot of an in-progress attempt.
///
/// Questions travel by value so the attempt survives its source going away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedProgress {
    pub quiz_name: QuizName,
    pub session: QuizSession,
    pub saved_at: DateTime<Utc>,
}

impl SavedProgress {
    /// Whether the snapshot is older than `max_age` at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Option<chrono::Duration>) -> bool {
        max_age.is_some_and(|max_age| now - self.saved_at > max_age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::Question;
    use quiz_core::time::fixed_now;

    fn session(n: usize) -> QuizSession {
        let questions = (0..n)
            .map(|_| Question::new("Q", vec!["a".into(), "b".into()], 1, None).unwrap())
            .collect();
        QuizSession::new(questions, fixed_now()).unwrap()
    }

    #[test]
    fn progress_counts_submitted_questions() {
        let mut s = session(3);
        s.submit(1, fixed_now()).unwrap();
        s.move_to(1, fixed_now());

        let progress = QuizProgress::of(&s);
        assert_eq!(progress.current, 2);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.unanswered, 2);
        assert_eq!(progress.percentage, 33);
        assert!(!progress.is_complete());
    }

    #[test]
    fn statistics_average_over_submitted() {
        let mut s = session(3);
        s.submit(1, fixed_now() + Duration::seconds(10)).unwrap();
        s.move_to(1, fixed_now() + Duration::seconds(10));
        s.submit(0, fixed_now() + Duration::seconds(15)).unwrap();
        s.toggle_flag();
        s.toggle_rule_out(0).unwrap();

        let stats = QuizStatistics::of(&s, fixed_now() + Duration::seconds(15));
        assert_eq!(stats.total_time_secs, 15);
        assert_eq!(stats.question_time_secs, 15);
        assert_eq!(stats.average_time_per_question, 8);
        assert_eq!(stats.flagged_count, 1);
        assert_eq!(stats.ruled_out_count, 1);
        assert_eq!(stats.score.correct, 1);
    }

    #[test]
    fn total_time_counts_browsing_between_submissions() {
        let start = fixed_now();
        let mut s = session(2);
        s.move_to(1, start + Duration::seconds(40));
        s.move_to(0, start + Duration::seconds(47));
        s.submit(1, start + Duration::seconds(52)).unwrap();

        let stats = QuizStatistics::of(&s, start + Duration::seconds(52));
        assert_eq!(stats.total_time_secs, 52);
        assert_eq!(stats.question_time_secs, 5);
        assert_eq!(stats.average_time_per_question, 52);
    }

    #[test]
    fn expiry_only_applies_with_max_age() {
        let saved = SavedProgress {
            quiz_name: QuizName::new("Cardiology").unwrap(),
            session: session(1),
            saved_at: fixed_now(),
        };
        let later = fixed_now() + Duration::days(30);

        assert!(!saved.is_expired(later, None));
        assert!(saved.is_expired(later, Some(Duration::days(7))));
        assert!(!saved.is_expired(later, Some(Duration::days(31))));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut s = session(2);
        s.select(0).unwrap();
        s.toggle_flag();
        let saved = SavedProgress {
            quiz_name: QuizName::new("Renal").unwrap(),
            session: s,
            saved_at: fixed_now(),
        };

        let value = serde_json::to_value(&saved).unwrap();
        assert!(value.get("savedAt").is_some());
        let back: SavedProgress = serde_json::from_value(value).unwrap();
        assert_eq!(back, saved);
    }
}
