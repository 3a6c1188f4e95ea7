use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use quiz_core::Clock;
use quiz_core::events::{EventSink, QuizEvent, QuizListener};
use quiz_core::model::{LifetimeStats, Question, QuizLength, QuizName, QuizResult, ScoreSummary};
use quiz_core::time::elapsed_secs;
use storage::KeyValueStore;
use storage::keys::{LAST_QUIZ, QUIZ_PROGRESS, SESSION_STATS, progress_key};
use storage::repository::{load_json, save_json};

use super::export::ResultsExport;
use super::progress::{QuizProgress, QuizStatistics, SavedProgress};
use super::sampler::sample_questions;
use super::session::{QuestionState, QuizSession, SubmitOutcome};
use crate::config::QuizConfig;
use crate::error::{QuizError, SourceError};
use crate::sources::QuestionSource;

/// Drives one quiz attempt at a time.
///
/// Holds the loaded question pool, the live [`QuizSession`] and the
/// collaborators it persists to and notifies. All mutators are synchronous;
/// only persistence and source fetches await.
pub struct QuizEngine {
    clock: Clock,
    store: Arc<dyn KeyValueStore>,
    events: EventSink,
    config: QuizConfig,
    rng: StdRng,
    quiz_name: Option<QuizName>,
    pool: Vec<Question>,
    session: Option<QuizSession>,
}

impl QuizEngine {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            clock,
            store,
            events: EventSink::new(),
            config: QuizConfig::default(),
            rng: StdRng::from_os_rng(),
            quiz_name: None,
            pool: Vec::new(),
            session: None,
        }
    }

    /// Use a deterministic sampler.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: QuizConfig) -> Self {
        self.config = config;
        self
    }

    pub fn subscribe(&mut self, listener: Arc<dyn QuizListener>) {
        self.events.subscribe(listener);
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    fn emit(&self, event: QuizEvent) {
        self.events.emit(&event);
    }

    fn session_mut(&mut self) -> Result<&mut QuizSession, QuizError> {
        self.session.as_mut().ok_or(QuizError::NoActiveQuiz)
    }

    fn active(&self) -> Result<(&QuizName, &QuizSession), QuizError> {
        match (&self.quiz_name, &self.session) {
            (Some(name), Some(session)) => Ok((name, session)),
            _ => Err(QuizError::NoActiveQuiz),
        }
    }

    //
    // ─── LOADING ───────────────────────────────────────────────────────────────
    //

    /// Replace the question pool and discard any live session.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptySource` if `questions` is empty; the previous
    /// pool and session are kept.
    pub fn load_questions(
        &mut self,
        name: QuizName,
        questions: Vec<Question>,
    ) -> Result<&[Question], QuizError> {
        if questions.is_empty() {
            return Err(QuizError::EmptySource);
        }
        log::info!("loaded quiz {name} ({} questions)", questions.len());
        self.emit(QuizEvent::QuizLoaded {
            name: name.clone(),
            question_count: questions.len(),
        });
        self.quiz_name = Some(name);
        self.pool = questions;
        self.session = None;
        Ok(&self.pool)
    }

    /// Fetch `identifier` from `source` and load it.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Source` when the fetch fails and
    /// `QuizError::EmptySource` when it yields nothing. Either way the engine
    /// keeps its previous state.
    pub async fn load_from_source(
        &mut self,
        source: &dyn QuestionSource,
        identifier: &str,
    ) -> Result<&[Question], QuizError> {
        let name = QuizName::new(identifier)
            .map_err(|_| SourceError::NotFound(identifier.to_string()))?;
        let questions = source.fetch_questions(identifier).await?;
        self.load_questions(name, questions)
    }

    //
    // ─── STARTING ──────────────────────────────────────────────────────────────
    //

    /// Start a fresh attempt on the loaded pool.
    ///
    /// A `length` below the pool size draws a random sample; otherwise the
    /// full pool is used in its loaded order.
    ///
    /// # Errors
    ///
    /// - `QuizError::NoActiveQuiz` if nothing is loaded.
    /// - `QuizError::InvalidLength(0)` for `Some(0)`.
    pub fn start_quiz(&mut self, length: Option<usize>) -> Result<(), QuizError> {
        let Some(name) = self.quiz_name.clone() else {
            return Err(QuizError::NoActiveQuiz);
        };
        if length == Some(0) {
            return Err(QuizError::InvalidLength(0));
        }

        let plan = sample_questions(&self.pool, length, &mut self.rng);
        let question_count = plan.total();
        let session = QuizSession::new(plan.questions, self.clock.now())?;
        let view = session.view();
        self.session = Some(session);

        log::info!(
            "started quiz {name}: {question_count} of {} questions{}",
            plan.pool_size,
            if plan.sampled { " (sampled)" } else { "" }
        );
        self.emit(QuizEvent::QuizStarted {
            name,
            question_count,
            pool_size: plan.pool_size,
        });
        self.emit(QuizEvent::QuestionChanged(view));
        Ok(())
    }

    /// [`start_quiz`](Self::start_quiz) with a user-facing length setting.
    ///
    /// # Errors
    ///
    /// See [`start_quiz`](Self::start_quiz).
    pub fn start_quiz_with(&mut self, length: QuizLength) -> Result<(), QuizError> {
        self.start_quiz(length.limit())
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Tentatively pick `option` for the current question.
    ///
    /// # Errors
    ///
    /// `NoActiveQuiz`, `AlreadySubmitted` or `InvalidIndex`; state is unchanged.
    pub fn select_answer(&mut self, option: usize) -> Result<(), QuizError> {
        let session = self.session_mut()?;
        session.select(option)?;
        let index = session.current_index();
        log::debug!("selected option {option} on question {index}");
        self.emit(QuizEvent::AnswerSelected { index, option });
        Ok(())
    }

    /// Lock in `option` for the current question.
    ///
    /// # Errors
    ///
    /// `NoActiveQuiz`, `AlreadySubmitted` or `InvalidIndex`; state is unchanged.
    pub fn submit_answer(&mut self, option: usize) -> Result<SubmitOutcome, QuizError> {
        let now = self.clock.now();
        let session = self.session_mut()?;
        let outcome = session.submit(option, now)?;
        let index = session.current_index();
        let answered = session.submitted().len();
        let total = session.len();

        log::debug!(
            "submitted option {option} on question {index}: {}",
            if outcome.is_correct { "correct" } else { "incorrect" }
        );
        self.emit(QuizEvent::AnswerSubmitted {
            index,
            option,
            is_correct: outcome.is_correct,
            correct_index: outcome.correct_index,
            time_spent_secs: outcome.time_spent_secs,
            answered,
            total,
        });
        Ok(outcome)
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Returns `false` at the last question or without a live quiz.
    pub fn next_question(&mut self) -> bool {
        match self.session.as_ref() {
            Some(session) => self.go_to_question(session.current_index() + 1),
            None => false,
        }
    }

    /// Returns `false` at the first question or without a live quiz.
    pub fn previous_question(&mut self) -> bool {
        match self
            .session
            .as_ref()
            .and_then(|s| s.current_index().checked_sub(1))
        {
            Some(index) => self.go_to_question(index),
            None => false,
        }
    }

    /// Jump to `index`, restarting the per-question timer.
    ///
    /// Returns `false` without side effects when out of bounds.
    pub fn go_to_question(&mut self, index: usize) -> bool {
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.move_to(index, now) {
            return false;
        }
        let view = session.view();
        self.emit(QuizEvent::QuestionChanged(view));
        true
    }

    //
    // ─── ANNOTATIONS ───────────────────────────────────────────────────────────
    //

    /// Returns the new flag state of the current question.
    ///
    /// # Errors
    ///
    /// `QuizError::NoActiveQuiz` without a live quiz.
    pub fn toggle_flag(&mut self) -> Result<bool, QuizError> {
        let session = self.session_mut()?;
        let flagged = session.toggle_flag();
        let index = session.current_index();
        self.emit(QuizEvent::FlagToggled { index, flagged });
        Ok(flagged)
    }

    /// Returns whether `option` is now ruled out on the current question.
    ///
    /// # Errors
    ///
    /// `NoActiveQuiz` or `InvalidIndex`; state is unchanged.
    pub fn toggle_rule_out(&mut self, option: usize) -> Result<bool, QuizError> {
        let session = self.session_mut()?;
        let ruled_out = session.toggle_rule_out(option)?;
        let index = session.current_index();
        self.emit(QuizEvent::RuleOutToggled {
            index,
            option,
            ruled_out,
        });
        Ok(ruled_out)
    }

    //
    // ─── SCORING & RESULTS ─────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn calculate_score(&self) -> ScoreSummary {
        self.session
            .as_ref()
            .map_or_else(|| ScoreSummary::empty(0), QuizSession::score)
    }

    /// Snapshot the live attempt as a result without persisting it.
    ///
    /// # Errors
    ///
    /// `QuizError::NoActiveQuiz` without a live quiz.
    pub fn build_result(&self) -> Result<QuizResult, QuizError> {
        let (name, session) = self.active()?;
        let now = self.clock.now();
        Ok(QuizResult {
            name: name.clone(),
            score: session.score(),
            total_time_secs: elapsed_secs(session.started_at(), now),
            question_times: session.question_times().clone(),
            flagged: session.flagged().iter().copied().collect(),
            completed_at: now,
        })
    }

    /// Persist the result as the last quiz and fold it into lifetime stats.
    ///
    /// The live session stays available for review.
    ///
    /// # Errors
    ///
    /// `NoActiveQuiz`, or `StoreUnavailable` if either write fails.
    pub async fn finish_quiz(&self) -> Result<QuizResult, QuizError> {
        let result = self.build_result()?;
        let store = self.store.as_ref();

        save_json(store, LAST_QUIZ, &result).await?;
        let mut stats: LifetimeStats = load_json(store, SESSION_STATS).await?.unwrap_or_default();
        stats.record(&result);
        save_json(store, SESSION_STATS, &stats).await?;

        log::info!(
            "finished quiz {}: {}/{} correct ({}%) in {}s",
            result.name,
            result.score.correct,
            result.score.answered,
            result.score.percentage,
            result.total_time_secs
        );
        self.emit(QuizEvent::QuizFinished(Box::new(result.clone())));
        Ok(result)
    }

    /// # Errors
    ///
    /// `QuizError::StoreUnavailable` if the store cannot be read.
    pub async fn lifetime_stats(&self) -> Result<LifetimeStats, QuizError> {
        let stats = load_json(self.store.as_ref(), SESSION_STATS).await?;
        Ok(stats.unwrap_or_default())
    }

    /// # Errors
    ///
    /// `QuizError::StoreUnavailable` if the store cannot be read.
    pub async fn last_result(&self) -> Result<Option<QuizResult>, QuizError> {
        Ok(load_json(self.store.as_ref(), LAST_QUIZ).await?)
    }

    /// # Errors
    ///
    /// `QuizError::NoActiveQuiz` without a live quiz.
    pub fn export_results(&self) -> Result<ResultsExport, QuizError> {
        let (name, session) = self.active()?;
        Ok(ResultsExport::build(name, session, self.clock.now()))
    }

    //
    // ─── PERSISTENCE ───────────────────────────────────────────────────────────
    //

    /// Write the live session under its quiz's progress key.
    ///
    /// # Errors
    ///
    /// `NoActiveQuiz`, or `StoreUnavailable` if the write fails.
    pub async fn save_progress(&self) -> Result<(), QuizError> {
        let (name, session) = self.active()?;
        let saved = SavedProgress {
            quiz_name: name.clone(),
            session: session.clone(),
            saved_at: self.clock.now(),
        };
        save_json(self.store.as_ref(), &progress_key(name), &saved).await?;

        log::debug!("saved progress for {name}");
        self.emit(QuizEvent::ProgressSaved {
            name: saved.quiz_name,
            saved_at: saved.saved_at,
        });
        Ok(())
    }

    /// Resume a saved attempt of `name`.
    ///
    /// Returns `false` and leaves state untouched when nothing usable is
    /// stored: missing, malformed, expired per
    /// [`QuizConfig::progress_max_age`], or internally inconsistent.
    ///
    /// # Errors
    ///
    /// `QuizError::StoreUnavailable` if the store cannot be read.
    pub async fn load_progress(&mut self, name: &QuizName) -> Result<bool, QuizError> {
        let key = progress_key(name);
        let Some(saved) = load_json::<SavedProgress>(self.store.as_ref(), &key).await? else {
            return Ok(false);
        };

        let now = self.clock.now();
        if saved.is_expired(now, self.config.progress_max_age) {
            log::warn!("ignoring expired progress for {name} (saved {})", saved.saved_at);
            return Ok(false);
        }
        if &saved.quiz_name != name || !saved.session.is_consistent() {
            log::warn!("ignoring inconsistent progress under {key:?}");
            return Ok(false);
        }

        let mut session = saved.session;
        session.resume_timer(now);
        if self.quiz_name.as_ref() != Some(name) {
            self.pool = session.questions().to_vec();
        }
        let view = session.view();
        self.quiz_name = Some(name.clone());
        self.session = Some(session);

        log::info!("restored progress for {name}");
        self.emit(QuizEvent::ProgressRestored {
            name: name.clone(),
            view,
        });
        Ok(true)
    }

    /// Delete saved progress for `name`. Idempotent.
    ///
    /// # Errors
    ///
    /// `QuizError::StoreUnavailable` if the store cannot be written.
    pub async fn clear_progress(&self, name: &QuizName) -> Result<(), QuizError> {
        self.store.remove(&progress_key(name)).await?;
        log::debug!("cleared progress for {name}");
        Ok(())
    }

    /// Names of quizzes with saved progress, sorted.
    ///
    /// # Errors
    ///
    /// `QuizError::StoreUnavailable` if the store cannot be read.
    pub async fn saved_progress(&self) -> Result<Vec<QuizName>, QuizError> {
        let prefix = format!("{QUIZ_PROGRESS}_");
        let keys = self.store.keys_with_prefix(&prefix).await?;
        Ok(keys
            .iter()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|raw| QuizName::new(raw).ok())
            .collect())
    }

    /// Drop the live session, keeping the loaded pool.
    pub fn reset(&mut self) {
        if self.session.take().is_some() {
            log::debug!("quiz reset");
        }
        self.emit(QuizEvent::QuizReset);
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn quiz_name(&self) -> Option<&QuizName> {
        self.quiz_name.as_ref()
    }

    /// Loaded pool, before sampling.
    #[must_use]
    pub fn pool(&self) -> &[Question] {
        &self.pool
    }

    /// Questions of the live attempt.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        self.session
            .as_ref()
            .map(QuizSession::questions)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.session.as_ref()?.current_question()
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.session.as_ref().map(QuizSession::current_index)
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<usize> {
        self.session.as_ref()?.answer(index)
    }

    #[must_use]
    pub fn is_submitted(&self, index: usize) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_submitted(index))
    }

    #[must_use]
    pub fn is_flagged(&self, index: usize) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_flagged(index))
    }

    #[must_use]
    pub fn ruled_out(&self, index: usize) -> Vec<usize> {
        self.session
            .as_ref()
            .map(|s| s.ruled_out(index))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn question_time(&self, index: usize) -> u64 {
        self.session.as_ref().map_or(0, |s| s.question_time(index))
    }

    /// Seconds since the attempt started.
    #[must_use]
    pub fn total_time(&self) -> u64 {
        self.session
            .as_ref()
            .map_or(0, |s| elapsed_secs(s.started_at(), self.clock.now()))
    }

    #[must_use]
    pub fn question_state(&self, index: usize) -> Option<QuestionState> {
        self.session.as_ref()?.question_state(index)
    }

    #[must_use]
    pub fn progress(&self) -> Option<QuizProgress> {
        self.session.as_ref().map(QuizProgress::of)
    }

    #[must_use]
    pub fn statistics(&self) -> Option<QuizStatistics> {
        let now = self.clock.now();
        self.session
            .as_ref()
            .map(|session| QuizStatistics::of(session, now))
    }

    /// Some, but not all, questions have been submitted.
    #[must_use]
    pub fn has_unsaved_progress(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.submitted().is_empty() && s.submitted().len() < s.len())
    }
}
