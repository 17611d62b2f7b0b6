use std::sync::Arc;

use crate::model::question::{AnswerOption, Question};

/// Outcome of one question inside a scored attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerReview {
    pub question: Arc<Question>,
    pub user_answer: Option<AnswerOption>,
    pub correct_answer: AnswerOption,
    pub is_correct: bool,
}

impl AnswerReview {
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.user_answer.is_some()
    }
}

/// Score of a completed attempt.
///
/// Unanswered questions count as incorrect, so `correct + incorrect == total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub correct: u32,
    pub incorrect: u32,
    pub total: u32,
    /// Rounded half-up, 0 for an empty attempt.
    pub percentage: u8,
    pub time_spent_secs: u64,
    pub answers: Vec<AnswerReview>,
}

impl QuizResult {
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.answers.iter().filter(|a| !a.is_answered()).count()
    }
}
