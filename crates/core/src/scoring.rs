use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::model::{AnswerMap, AnswerReview, Question, QuizResult};

/// Score an attempt against the questions' answer keys.
///
/// Questions are visited in list order. A question with no entry in `answers` is
/// unanswered and counts as incorrect; it is never excluded from the total.
/// Pure: identical inputs always yield an identical result.
#[must_use]
pub fn score(
    questions: &[Arc<Question>],
    answers: &AnswerMap,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
) -> QuizResult {
    let mut correct = 0_u32;
    let reviews: Vec<AnswerReview> = questions
        .iter()
        .map(|question| {
            let user_answer = answers.get(question.id()).copied();
            let is_correct = user_answer.is_some_and(|answer| question.is_correct(answer));
            if is_correct {
                correct = correct.saturating_add(1);
            }
            AnswerReview {
                question: Arc::clone(question),
                user_answer,
                correct_answer: question.correct_answer(),
                is_correct,
            }
        })
        .collect();

    let total = u32::try_from(reviews.len()).unwrap_or(u32::MAX);

    QuizResult {
        correct,
        incorrect: total - correct,
        total,
        percentage: percentage(correct, total),
        time_spent_secs: elapsed_secs(started_at, ended_at),
        answers: reviews,
    }
}

/// `round(part / total * 100)` rounding half up, 0 when `total` is 0.
#[must_use]
pub fn percentage(part: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let part = u64::from(part.min(total));
    let total = u64::from(total);
    let rounded = (part * 200 + total) / (total * 2);
    u8::try_from(rounded).unwrap_or(100)
}

/// Whole seconds between two instants, rounding half up. A backwards clock yields 0.
#[must_use]
pub fn elapsed_secs(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> u64 {
    let millis = (ended_at - started_at).num_milliseconds();
    u64::try_from(millis).map_or(0, |ms| (ms + 500) / 1000)
}

/// Formats a second count as zero-padded `MM:SS`; minutes are not wrapped into hours.
#[must_use]
pub fn format_time(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, ChapterId, QuestionId};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn question(ordinal: u32, key: AnswerOption) -> Arc<Question> {
        Arc::new(
            Question::new(
                ChapterId::new(1),
                ordinal,
                format!("Q{ordinal}"),
                ["a", "b", "c"],
                Some("d"),
                key,
            )
            .unwrap(),
        )
    }

    fn three_questions() -> Vec<Arc<Question>> {
        vec![
            question(1, AnswerOption::A),
            question(2, AnswerOption::B),
            question(3, AnswerOption::C),
        ]
    }

    #[test]
    fn partial_attempt_counts_unanswered_as_incorrect() {
        let questions = three_questions();
        let mut answers = AnswerMap::new();
        answers.insert(QuestionId::new(ChapterId::new(1), 1), AnswerOption::A);
        answers.insert(QuestionId::new(ChapterId::new(1), 2), AnswerOption::C);

        let now = fixed_now();
        let result = score(&questions, &answers, now, now);

        assert_eq!(result.correct, 1);
        assert_eq!(result.incorrect, 2);
        assert_eq!(result.total, 3);
        assert_eq!(result.percentage, 33);
        assert_eq!(result.unanswered(), 1);
        assert_eq!(result.answers[2].user_answer, None);
        assert!(!result.answers[2].is_correct);
        assert_eq!(result.answers[1].correct_answer, AnswerOption::B);
    }

    #[test]
    fn totals_always_add_up() {
        let questions = three_questions();
        let answers: AnswerMap = questions
            .iter()
            .map(|q| (q.id().clone(), q.correct_answer()))
            .collect();
        let now = fixed_now();
        let result = score(&questions, &answers, now, now);

        assert_eq!(result.correct + result.incorrect, result.total);
        assert_eq!(result.total as usize, questions.len());
        assert_eq!(result.percentage, 100);
    }

    #[test]
    fn empty_attempt_scores_zero_percent() {
        let now = fixed_now();
        let result = score(&[], &AnswerMap::new(), now, now);
        assert_eq!(result.total, 0);
        assert_eq!(result.percentage, 0);
    }

    #[test]
    fn answers_for_foreign_questions_are_ignored() {
        let questions = three_questions();
        let mut answers = AnswerMap::new();
        answers.insert(QuestionId::from_raw("9-9"), AnswerOption::A);
        let now = fixed_now();
        let result = score(&questions, &answers, now, now);
        assert_eq!(result.correct, 0);
        assert_eq!(result.total, 3);
    }

    #[test]
    fn scoring_is_idempotent() {
        let questions = three_questions();
        let mut answers = AnswerMap::new();
        answers.insert(QuestionId::new(ChapterId::new(1), 3), AnswerOption::C);
        let now = fixed_now();
        let end = now + Duration::seconds(42);

        assert_eq!(
            score(&questions, &answers, now, end),
            score(&questions, &answers, now, end)
        );
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(0, 5), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn elapsed_time_rounds_to_nearest_second() {
        let start = fixed_now();
        assert_eq!(elapsed_secs(start, start + Duration::milliseconds(1_499)), 1);
        assert_eq!(elapsed_secs(start, start + Duration::milliseconds(1_500)), 2);
        assert_eq!(elapsed_secs(start, start - Duration::seconds(5)), 0);
    }

    #[test]
    fn format_time_pads_minutes_and_seconds() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(65), "01:05");
        assert_eq!(format_time(3_600), "60:00");
    }
}
