mod progress;
mod service;
mod timer;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::{EXAM_DURATION_SECS, QuizSession, RestoredProgress, TickOutcome};
pub use timer::{ExamTimer, SharedSession};
pub use workflow::{CompletedQuiz, EXAM_QUESTION_COUNT, QuizWorkflow};
