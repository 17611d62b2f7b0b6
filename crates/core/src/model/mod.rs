mod history;
mod ids;
mod question;
mod result;
mod session;

pub use ids::{ChapterId, ParseIdError, QuestionId};

pub use history::{
    ChapterProgress, HistoryAnswer, HistoryEntry, HistoryStore, MAX_HISTORY_ENTRIES,
    ReviewedAnswer,
};
pub use question::{AnswerOption, Question, QuestionError};
pub use result::{AnswerReview, QuizResult};
pub use session::{AnswerMap, QuizMode, SessionState};
