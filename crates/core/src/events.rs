//! Typed notifications emitted by the quiz engine.
//!
//! Each variant carries enough state for a listener to redraw without calling
//! back into the engine.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::model::{QuizName, QuizResult};

/// Snapshot of one question as a presentation layer would render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub index: usize,
    pub total: usize,
    pub selected: Option<usize>,
    pub submitted: bool,
    pub flagged: bool,
    pub ruled_out: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum QuizEvent {
    QuizLoaded {
        name: QuizName,
        question_count: usize,
    },
    QuizStarted {
        name: QuizName,
        question_count: usize,
        pool_size: usize,
    },
    QuestionChanged(QuestionView),
    AnswerSelected {
        index: usize,
        option: usize,
    },
    AnswerSubmitted {
        index: usize,
        option: usize,
        is_correct: bool,
        correct_index: usize,
        time_spent_secs: u64,
        answered: usize,
        total: usize,
    },
    FlagToggled {
        index: usize,
        flagged: bool,
    },
    RuleOutToggled {
        index: usize,
        option: usize,
        ruled_out: bool,
    },
    QuizFinished(Box<QuizResult>),
    ProgressSaved {
        name: QuizName,
        saved_at: DateTime<Utc>,
    },
    ProgressRestored {
        name: QuizName,
        view: QuestionView,
    },
    QuizReset,
}

impl QuizEvent {
    /// Short stable label, handy for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            QuizEvent::QuizLoaded { .. } => "quiz_loaded",
            QuizEvent::QuizStarted { .. } => "quiz_started",
            QuizEvent::QuestionChanged(_) => "question_changed",
            QuizEvent::AnswerSelected { .. } => "answer_selected",
            QuizEvent::AnswerSubmitted { .. } => "answer_submitted",
            QuizEvent::FlagToggled { .. } => "flag_toggled",
            QuizEvent::RuleOutToggled { .. } => "rule_out_toggled",
            QuizEvent::QuizFinished(_) => "quiz_finished",
            QuizEvent::ProgressSaved { .. } => "progress_saved",
            QuizEvent::ProgressRestored { .. } => "progress_restored",
            QuizEvent::QuizReset => "quiz_reset",
        }
    }
}

/// Consumer of quiz notifications.
pub trait QuizListener: Send + Sync {
    fn on_event(&self, event: &QuizEvent);
}

impl<F> QuizListener for F
where
    F: Fn(&QuizEvent) + Send + Sync,
{
    fn on_event(&self, event: &QuizEvent) {
        self(event);
    }
}

/// Fan-out of events to every subscribed listener, in subscription order.
#[derive(Clone, Default)]
pub struct EventSink {
    listeners: Vec<Arc<dyn QuizListener>>,
}

impl EventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn QuizListener>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &QuizEvent) {
        log::trace!("quiz event: {}", event.kind());
        for listener in &self.listeners {
            listener.on_event(event);
        }
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
