#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod history;
pub mod questions;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, HistoryError, QuestionLoadError, SessionError, WorkflowError};
pub use history::HistoryService;
pub use questions::QuestionService;
pub use sessions::{
    CompletedQuiz, EXAM_DURATION_SECS, EXAM_QUESTION_COUNT, ExamTimer, QuizSession, QuizWorkflow,
    RestoredProgress, SessionProgress, TickOutcome,
};
