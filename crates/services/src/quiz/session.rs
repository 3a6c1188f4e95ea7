use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quiz_core::events::QuestionView;
use quiz_core::model::{Question, ScoreSummary};
use quiz_core::time::elapsed_secs;

use crate::error::QuizError;

//
// ─── QUESTION STATE ────────────────────────────────────────────────────────────
//

/// Answer state of a single question.
///
/// `Unanswered -> Selected -> Submitted`, with reselecting and submitting
/// straight from `Unanswered` both allowed. `Submitted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionState {
    Unanswered,
    Selected(usize),
    Submitted(usize),
}

/// Immediate feedback for a submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub is_correct: bool,
    pub correct_index: usize,
    pub time_spent_secs: u64,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Mutable state of one attempt at a fixed list of questions.
///
/// Every mutator validates before writing, so an `Err` leaves the session
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSession {
    questions: Vec<Question>,
    current_index: usize,
    answers: BTreeMap<usize, usize>,
    submitted: BTreeSet<usize>,
    ruled_out: BTreeMap<usize, BTreeSet<usize>>,
    flagged: BTreeSet<usize>,
    question_times: BTreeMap<usize, u64>,
    started_at: DateTime<Utc>,
    /// When the current question was displayed; `None` once it is submitted.
    #[serde(skip)]
    question_started_at: Option<DateTime<Utc>>,
}

// The running timer is transient and not part of a session's identity.
impl PartialEq for QuizSession {
    fn eq(&self, other: &Self) -> bool {
        self.questions == other.questions
            && self.current_index == other.current_index
            && self.answers == other.answers
            && self.submitted == other.submitted
            && self.ruled_out == other.ruled_out
            && self.flagged == other.flagged
            && self.question_times == other.question_times
            && self.started_at == other.started_at
    }
}

impl QuizSession {
    /// Start a session on question 0 with its timer running from `started_at`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptySource` if `questions` is empty.
    pub fn new(questions: Vec<Question>, started_at: DateTime<Utc>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::EmptySource);
        }
        Ok(Self {
            questions,
            current_index: 0,
            answers: BTreeMap::new(),
            submitted: BTreeSet::new(),
            ruled_out: BTreeMap::new(),
            flagged: BTreeSet::new(),
            question_times: BTreeMap::new(),
            started_at,
            question_started_at: Some(started_at),
        })
    }

    /// Checks the invariants a deserialized session must satisfy before use.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let len = self.questions.len();
        let option_ok = |index: usize, option: usize| {
            self.questions
                .get(index)
                .is_some_and(|q| q.has_option(option))
        };

        len > 0
            && self.current_index < len
            && self.answers.iter().all(|(&i, &opt)| option_ok(i, opt))
            && self.submitted.iter().all(|i| self.answers.contains_key(i))
            && self
                .ruled_out
                .iter()
                .all(|(&i, opts)| opts.iter().all(|&opt| option_ok(i, opt)))
            && self.flagged.iter().all(|&i| i < len)
            && self.question_times.keys().all(|&i| i < len)
    }

    /// Restart the current question's timer, used after restoring a snapshot.
    pub(crate) fn resume_timer(&mut self, now: DateTime<Utc>) {
        self.question_started_at = Some(now);
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<usize> {
        self.answers.get(&index).copied()
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    #[must_use]
    pub fn is_submitted(&self, index: usize) -> bool {
        self.submitted.contains(&index)
    }

    #[must_use]
    pub fn submitted(&self) -> &BTreeSet<usize> {
        &self.submitted
    }

    #[must_use]
    pub fn is_flagged(&self, index: usize) -> bool {
        self.flagged.contains(&index)
    }

    #[must_use]
    pub fn flagged(&self) -> &BTreeSet<usize> {
        &self.flagged
    }

    #[must_use]
    pub fn ruled_out(&self, index: usize) -> Vec<usize> {
        self.ruled_out
            .get(&index)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn ruled_out_count(&self) -> usize {
        self.ruled_out.values().map(BTreeSet::len).sum()
    }

    #[must_use]
    pub fn question_time(&self, index: usize) -> u64 {
        self.question_times.get(&index).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn question_times(&self) -> &BTreeMap<usize, u64> {
        &self.question_times
    }

    #[must_use]
    pub fn question_state(&self, index: usize) -> Option<QuestionState> {
        if index >= self.questions.len() {
            return None;
        }
        Some(match (self.answer(index), self.is_submitted(index)) {
            (Some(option), true) => QuestionState::Submitted(option),
            (Some(option), false) => QuestionState::Selected(option),
            (None, _) => QuestionState::Unanswered,
        })
    }

    /// Render-ready snapshot of the current question.
    #[must_use]
    pub fn view(&self) -> QuestionView {
        let index = self.current_index;
        QuestionView {
            index,
            total: self.questions.len(),
            selected: self.answer(index),
            submitted: self.is_submitted(index),
            flagged: self.is_flagged(index),
            ruled_out: self.ruled_out(index),
        }
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    fn check_option(&self, option: usize) -> Result<&Question, QuizError> {
        let question = self
            .current_question()
            .ok_or(QuizError::InvalidIndex {
                index: self.current_index,
                len: self.questions.len(),
            })?;
        if !question.has_option(option) {
            return Err(QuizError::InvalidIndex {
                index: option,
                len: question.option_count(),
            });
        }
        Ok(question)
    }

    fn check_unlocked(&self) -> Result<(), QuizError> {
        if self.is_submitted(self.current_index) {
            return Err(QuizError::AlreadySubmitted {
                index: self.current_index,
            });
        }
        Ok(())
    }

    /// Record a tentative answer on the current question.
    ///
    /// # Errors
    ///
    /// `AlreadySubmitted` if the question is locked, `InvalidIndex` if `option`
    /// is out of range.
    pub fn select(&mut self, option: usize) -> Result<(), QuizError> {
        self.check_unlocked()?;
        self.check_option(option)?;
        self.answers.insert(self.current_index, option);
        Ok(())
    }

    /// Lock in `option` for the current question and stop its timer.
    ///
    /// # Errors
    ///
    /// `AlreadySubmitted` if the question is locked, `InvalidIndex` if `option`
    /// is out of range.
    pub fn submit(&mut self, option: usize, now: DateTime<Utc>) -> Result<SubmitOutcome, QuizError> {
        self.check_unlocked()?;
        let question = self.check_option(option)?;
        let is_correct = question.is_correct(option);
        let correct_index = question.correct_index();

        let time_spent_secs = self
            .question_started_at
            .map_or(0, |start| elapsed_secs(start, now));

        let index = self.current_index;
        self.answers.insert(index, option);
        self.submitted.insert(index);
        self.question_times.insert(index, time_spent_secs);
        self.question_started_at = None;

        Ok(SubmitOutcome {
            is_correct,
            correct_index,
            time_spent_secs,
        })
    }

    /// Move to `index` and restart the per-visit timer.
    ///
    /// Returns `false` without side effects when `index` is out of bounds.
    pub fn move_to(&mut self, index: usize, now: DateTime<Utc>) -> bool {
        if index >= self.questions.len() {
            return false;
        }
        self.current_index = index;
        self.question_started_at = Some(now);
        true
    }

    /// Returns the new flag state of the current question.
    pub fn toggle_flag(&mut self) -> bool {
        let index = self.current_index;
        if self.flagged.remove(&index) {
            false
        } else {
            self.flagged.insert(index);
            true
        }
    }

    /// Returns whether `option` is now ruled out on the current question.
    ///
    /// # Errors
    ///
    /// `InvalidIndex` if `option` is out of range.
    pub fn toggle_rule_out(&mut self, option: usize) -> Result<bool, QuizError> {
        self.check_option(option)?;
        let index = self.current_index;
        let set = self.ruled_out.entry(index).or_default();
        let ruled_out = if set.remove(&option) {
            false
        } else {
            set.insert(option);
            true
        };
        if set.is_empty() {
            self.ruled_out.remove(&index);
        }
        Ok(ruled_out)
    }

    /// Score over submitted questions only.
    #[must_use]
    pub fn score(&self) -> ScoreSummary {
        let correct = self
            .submitted
            .iter()
            .filter(|&&i| {
                matches!(
                    (self.questions.get(i), self.answer(i)),
                    (Some(q), Some(a)) if q.is_correct(a)
                )
            })
            .count();
        ScoreSummary::from_counts(correct, self.submitted.len(), self.questions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::time::fixed_now;

    fn question(correct: usize) -> Question {
        Question::new(
            "Q",
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct,
            None,
        )
        .unwrap()
    }

    fn session(n: usize) -> QuizSession {
        QuizSession::new((0..n).map(|i| question(i % 4)).collect(), fixed_now()).unwrap()
    }

    #[test]
    fn empty_question_list_is_rejected() {
        let err = QuizSession::new(Vec::new(), fixed_now()).unwrap_err();
        assert!(matches!(err, QuizError::EmptySource));
    }

    #[test]
    fn question_state_machine() {
        let mut s = session(2);
        assert_eq!(s.question_state(0), Some(QuestionState::Unanswered));

        s.select(1).unwrap();
        s.select(2).unwrap();
        assert_eq!(s.question_state(0), Some(QuestionState::Selected(2)));

        s.submit(3, fixed_now()).unwrap();
        assert_eq!(s.question_state(0), Some(QuestionState::Submitted(3)));
        assert_eq!(s.question_state(2), None);
    }

    #[test]
    fn failed_calls_leave_state_untouched() {
        let mut s = session(2);
        s.select(1).unwrap();
        let before = s.clone();

        assert!(matches!(s.select(9), Err(QuizError::InvalidIndex { index: 9, len: 4 })));
        assert!(matches!(s.submit(4, fixed_now()), Err(QuizError::InvalidIndex { .. })));
        assert!(matches!(s.toggle_rule_out(7), Err(QuizError::InvalidIndex { .. })));
        assert!(!s.move_to(2, fixed_now()));
        assert_eq!(s, before);
    }

    #[test]
    fn submit_records_elapsed_time_per_visit() {
        let mut s = session(2);
        s.move_to(1, fixed_now() + Duration::seconds(100));

        let outcome = s.submit(1, fixed_now() + Duration::seconds(112)).unwrap();

        assert_eq!(outcome.time_spent_secs, 12);
        assert!(outcome.is_correct);
        assert_eq!(s.question_time(1), 12);
        assert_eq!(s.question_time(0), 0);
    }

    #[test]
    fn revisiting_submitted_question_keeps_its_time() {
        let mut s = session(2);
        s.submit(0, fixed_now() + Duration::seconds(5)).unwrap();
        s.move_to(1, fixed_now() + Duration::seconds(6));
        s.move_to(0, fixed_now() + Duration::seconds(60));

        let err = s.submit(1, fixed_now() + Duration::seconds(90)).unwrap_err();

        assert!(matches!(err, QuizError::AlreadySubmitted { index: 0 }));
        assert_eq!(s.question_time(0), 5);
        assert_eq!(s.answer(0), Some(0));
    }

    #[test]
    fn rule_out_toggles_and_cleans_up() {
        let mut s = session(1);
        assert!(s.toggle_rule_out(2).unwrap());
        assert_eq!(s.ruled_out(0), vec![2]);
        assert!(!s.toggle_rule_out(2).unwrap());
        assert!(s.ruled_out(0).is_empty());
        assert_eq!(s.ruled_out_count(), 0);
    }

    #[test]
    fn rule_out_still_allowed_after_submit() {
        let mut s = session(1);
        s.submit(0, fixed_now()).unwrap();
        assert!(s.toggle_rule_out(3).unwrap());
        assert!(s.toggle_flag());
    }

    #[test]
    fn score_ignores_unsubmitted_selections() {
        let mut s = session(3);
        s.submit(0, fixed_now()).unwrap();
        s.move_to(1, fixed_now());
        s.submit(3, fixed_now()).unwrap();
        s.move_to(2, fixed_now());
        s.select(2).unwrap();

        let score = s.score();
        assert_eq!(score.correct, 1);
        assert_eq!(score.answered, 2);
        assert_eq!(score.total, 3);
        assert_eq!(score.percentage, 50.0);
        assert_eq!(score.unanswered, 1);
    }

    #[test]
    fn consistency_check_catches_bad_snapshots() {
        let mut s = session(2);
        assert!(s.is_consistent());
        s.current_index = 5;
        assert!(!s.is_consistent());

        let mut s = session(2);
        s.submitted.insert(1);
        assert!(!s.is_consistent());
    }
}
