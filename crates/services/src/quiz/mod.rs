//! The quiz engine and the state it manages.

mod engine;
mod export;
mod progress;
mod sampler;
mod session;

pub use engine::QuizEngine;
pub use export::{AnswerRow, ExportFormat, ResultsExport};
pub use progress::{QuizProgress, QuizStatistics, SavedProgress};
pub use sampler::{QuizPlan, sample_questions};
pub use session::{QuestionState, QuizSession, SubmitOutcome};
