//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use quiz_core::ContentError;
use quiz_core::model::{AnswerOption, QuestionId, SessionState};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `QuestionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionLoadError {
    #[error("cannot load questions: {0}")]
    Content(#[from] ContentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizSession` transitions.
///
/// A failed transition leaves the session unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("cannot {action} while the session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },
    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),
    #[error("question {question} has no option {option}")]
    NoSuchOption {
        question: QuestionId,
        option: AnswerOption,
    },
    #[error("the countdown only runs in exam mode")]
    Untimed,
}

/// Errors emitted by `HistoryService` writes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizWorkflow`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorkflowError {
    #[error(transparent)]
    Questions(#[from] QuestionLoadError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error("content directory {} not found", .0.display())]
    ContentDirMissing(PathBuf),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
