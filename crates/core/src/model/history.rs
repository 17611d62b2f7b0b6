//! Persisted summaries of finished attempts and in-progress chapter snapshots.
//!
//! These types define the JSON shape of the history document. Every field that was
//! added after the first release carries a serde default so older documents still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::bank::QuestionBank;
use crate::model::ids::{ChapterId, QuestionId};
use crate::model::question::{AnswerOption, Question};
use crate::model::result::QuizResult;
use crate::model::session::{AnswerMap, QuizMode};
use crate::scoring::format_time;

/// Upper bound on `HistoryStore::all_results`.
pub const MAX_HISTORY_ENTRIES: usize = 50;

//
// ─── HISTORY ENTRY ────────────────────────────────────────────────────────────
//

/// Compact per-question record: no option text, to keep the document small.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAnswer {
    pub question_id: QuestionId,
    #[serde(rename = "question", default)]
    pub question_text: String,
    #[serde(default, deserialize_with = "lenient_option")]
    pub user_answer: Option<AnswerOption>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub correct_answer: Option<AnswerOption>,
    pub is_correct: bool,
}

/// Summary of one completed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// `"<mode>_<unix millis>"`.
    pub id: String,
    pub date: DateTime<Utc>,
    pub mode: QuizMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<ChapterId>,
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub percentage: u8,
    #[serde(rename = "timeSpent")]
    pub time_spent_secs: u64,
    #[serde(default)]
    pub time_spent_formatted: String,
    #[serde(default)]
    pub answers: Vec<HistoryAnswer>,
}

/// A stored answer joined with its full question, when the bank still has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewedAnswer<'a> {
    pub answer: &'a HistoryAnswer,
    pub question: Option<&'a Arc<Question>>,
}

impl HistoryEntry {
    #[must_use]
    pub fn from_result(
        result: &QuizResult,
        mode: QuizMode,
        chapter: Option<ChapterId>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let answers = result
            .answers
            .iter()
            .map(|review| HistoryAnswer {
                question_id: review.question.id().clone(),
                question_text: review.question.text().to_owned(),
                user_answer: review.user_answer,
                correct_answer: Some(review.correct_answer),
                is_correct: review.is_correct,
            })
            .collect();

        Self {
            id: format!("{mode}_{}", recorded_at.timestamp_millis()),
            date: recorded_at,
            mode,
            chapter,
            total: result.total,
            correct: result.correct,
            incorrect: result.incorrect,
            percentage: result.percentage,
            time_spent_secs: result.time_spent_secs,
            time_spent_formatted: format_time(result.time_spent_secs),
            answers,
        }
    }

    /// Join stored answers with the bank so a detail view can show option text.
    ///
    /// Questions that no longer exist in the bank come back with `question: None`;
    /// the stored text and letters are still available on `answer`.
    #[must_use]
    pub fn review<'a>(&'a self, bank: &'a QuestionBank) -> Vec<ReviewedAnswer<'a>> {
        self.answers
            .iter()
            .map(|answer| ReviewedAnswer {
                answer,
                question: bank.question(&answer.question_id),
            })
            .collect()
    }
}

//
// ─── CHAPTER PROGRESS ─────────────────────────────────────────────────────────
//

/// Resumable practice state for one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterProgress {
    pub chapter: ChapterId,
    #[serde(rename = "userAnswers", default)]
    pub answers: AnswerMap,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub total_answered: usize,
    #[serde(default)]
    pub total_questions: usize,
    #[serde(rename = "correctAnswers", default)]
    pub correct_count: u32,
    #[serde(rename = "incorrectAnswers", default)]
    pub incorrect_count: u32,
    pub last_updated: DateTime<Utc>,
}

impl ChapterProgress {
    /// Build a snapshot, deriving the counts from `answers` against `answer_key`.
    ///
    /// An answer whose key cannot be resolved counts as incorrect.
    #[must_use]
    pub fn compute(
        chapter: ChapterId,
        answers: AnswerMap,
        current_index: usize,
        total_questions: usize,
        answer_key: impl Fn(&QuestionId) -> Option<AnswerOption>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut correct = 0_u32;
        let mut incorrect = 0_u32;
        for (id, answer) in &answers {
            if answer_key(id) == Some(*answer) {
                correct = correct.saturating_add(1);
            } else {
                incorrect = incorrect.saturating_add(1);
            }
        }

        Self {
            chapter,
            total_answered: answers.len(),
            answers,
            current_index,
            total_questions,
            correct_count: correct,
            incorrect_count: incorrect,
            last_updated: now,
        }
    }
}

//
// ─── HISTORY STORE ────────────────────────────────────────────────────────────
//

/// Root of the persisted history document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryStore {
    pub latest_practice: Option<HistoryEntry>,
    pub latest_exam: Option<HistoryEntry>,
    /// Newest first, at most [`MAX_HISTORY_ENTRIES`].
    pub all_results: Vec<HistoryEntry>,
    pub chapter_progress: BTreeMap<ChapterId, ChapterProgress>,
}

impl HistoryStore {
    /// Record a finished attempt: update the latest slot for its mode, prepend it
    /// and drop anything beyond [`MAX_HISTORY_ENTRIES`].
    pub fn record(&mut self, entry: HistoryEntry) {
        match entry.mode {
            QuizMode::Practice => self.latest_practice = Some(entry.clone()),
            QuizMode::Exam => self.latest_exam = Some(entry.clone()),
        }
        self.all_results.insert(0, entry);
        self.all_results.truncate(MAX_HISTORY_ENTRIES);
    }

    #[must_use]
    pub fn latest(&self, mode: QuizMode) -> Option<&HistoryEntry> {
        match mode {
            QuizMode::Practice => self.latest_practice.as_ref(),
            QuizMode::Exam => self.latest_exam.as_ref(),
        }
    }

    /// Find an entry by id among the retained results or the latest slots.
    #[must_use]
    pub fn find_entry(&self, id: &str) -> Option<&HistoryEntry> {
        self.all_results
            .iter()
            .chain(self.latest_practice.iter())
            .chain(self.latest_exam.iter())
            .find(|entry| entry.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.latest_practice.is_none()
            && self.latest_exam.is_none()
            && self.all_results.is_empty()
            && self.chapter_progress.is_empty()
    }
}

/// Reads an optional answer letter, treating `null`, a missing field and `""` as unanswered.
fn lenient_option<'de, D>(deserializer: D) -> Result<Option<AnswerOption>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(letter) => letter
            .parse::<AnswerOption>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
