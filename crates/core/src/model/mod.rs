mod length;
mod question;
mod quiz_name;
mod result;
mod score;

pub use length::{
    DEFAULT_QUIZ_LENGTH, MAX_QUIZ_LENGTH, MIN_QUIZ_LENGTH, QuizLength, QuizLengthError,
};
pub use question::{Question, QuestionError};
pub use quiz_name::{QuizName, QuizNameError};
pub use result::{LifetimeStats, QuizResult};
pub use score::ScoreSummary;
