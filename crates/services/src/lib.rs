#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod library;
pub mod preferences;
pub mod quiz;
pub mod sources;

pub use quiz_core::Clock;

pub use config::QuizConfig;
pub use error::{LibraryError, QuizError, SourceError};
pub use library::{ImportReport, QuizLibrary, UploadedQuiz, UploadedQuizSummary};
pub use preferences::QuizPreferencesService;
pub use quiz::{
    AnswerRow, ExportFormat, QuestionState, QuizEngine, QuizProgress, QuizSession,
    QuizStatistics, ResultsExport, SavedProgress, SubmitOutcome,
};
pub use sources::{DirectoryQuestionSource, HttpQuestionSource, QuestionSource};
