use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::{
    AnswerMap, AnswerOption, ChapterId, ChapterProgress, Question, QuestionId, QuizMode,
    QuizResult, SessionState,
};
use quiz_core::scoring;

use super::progress::SessionProgress;
use crate::error::SessionError;

/// Countdown length of an exam, in seconds.
pub const EXAM_DURATION_SECS: u32 = 60 * 60;

//
// ─── RESTORED PROGRESS ─────────────────────────────────────────────────────────
//

/// Answers and position carried over from an earlier practice run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoredProgress {
    pub answers: AnswerMap,
    pub current_index: usize,
}

impl From<ChapterProgress> for RestoredProgress {
    fn from(progress: ChapterProgress) -> Self {
        Self {
            answers: progress.answers,
            current_index: progress.current_index,
        }
    }
}

/// What a countdown step did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running { remaining: u32 },
    Expired,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Quiz session state machine: `NotStarted → InProgress → Completed`, with
/// `reset` returning to `NotStarted` from anywhere.
///
/// Every transition either applies fully or returns an error and leaves the
/// session untouched. Answers are only ever recorded for questions of the
/// current session, and the question list never changes while in progress.
#[derive(Debug, Clone)]
pub struct QuizSession {
    state: SessionState,
    mode: QuizMode,
    chapter: Option<ChapterId>,
    questions: Vec<Arc<Question>>,
    current: usize,
    answers: AnswerMap,
    time_remaining: Option<u32>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self {
            state: SessionState::NotStarted,
            mode: QuizMode::Practice,
            chapter: None,
            questions: Vec::new(),
            current: 0,
            answers: AnswerMap::new(),
            time_remaining: None,
            started_at: None,
            ended_at: None,
        }
    }
}

impl QuizSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin an attempt over `questions`.
    ///
    /// Exams get a countdown of [`EXAM_DURATION_SECS`]. A `restored` snapshot seeds
    /// the answers and position; answers to questions not in this list are dropped
    /// and the index is clamped to the last question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is `NotStarted`,
    /// and `SessionError::Empty` if `questions` is empty.
    pub fn start(
        &mut self,
        questions: Vec<Arc<Question>>,
        mode: QuizMode,
        chapter: Option<ChapterId>,
        restored: Option<RestoredProgress>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.require(SessionState::NotStarted, "start")?;
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        let (answers, current) = match restored {
            Some(restored) => {
                let answers: AnswerMap = restored
                    .answers
                    .into_iter()
                    .filter(|(id, _)| questions.iter().any(|q| q.id() == id))
                    .collect();
                (answers, restored.current_index.min(questions.len() - 1))
            }
            None => (AnswerMap::new(), 0),
        };

        *self = Self {
            state: SessionState::InProgress,
            mode,
            chapter,
            questions,
            current,
            answers,
            time_remaining: mode.is_exam().then_some(EXAM_DURATION_SECS),
            started_at: Some(now),
            ended_at: None,
        };
        Ok(())
    }

    /// Select (or change) the answer for a question. Returns the previous selection.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless in progress,
    /// `SessionError::UnknownQuestion` if the id is not part of this session and
    /// `SessionError::NoSuchOption` for option D on a three-choice question.
    pub fn answer(
        &mut self,
        question_id: &QuestionId,
        option: AnswerOption,
    ) -> Result<Option<AnswerOption>, SessionError> {
        self.require(SessionState::InProgress, "answer")?;
        let Some(question) = self.questions.iter().find(|q| q.id() == question_id) else {
            return Err(SessionError::UnknownQuestion(question_id.clone()));
        };
        if question.option(option).is_none() {
            return Err(SessionError::NoSuchOption {
                question: question_id.clone(),
                option,
            });
        }
        Ok(self.answers.insert(question_id.clone(), option))
    }

    /// Jump to `index`, clamped into the question list. Returns the new index.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless in progress.
    pub fn go_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.require(SessionState::InProgress, "navigate")?;
        self.current = index.min(self.questions.len().saturating_sub(1));
        Ok(self.current)
    }

    /// Advance one question; stays put on the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless in progress.
    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.go_to(self.current.saturating_add(1))
    }

    /// Go back one question; stays put on the first one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless in progress.
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.go_to(self.current.saturating_sub(1))
    }

    /// One second of exam countdown. Reaching zero completes the session at `now`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless in progress and
    /// `SessionError::Untimed` for practice sessions.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, SessionError> {
        let remaining = self.countdown("tick")?;
        self.set_time_remaining(remaining.saturating_sub(1), now)
    }

    /// Overwrite the countdown. The value can only go down; a larger value is ignored.
    ///
    /// # Errors
    ///
    /// Same as [`QuizSession::tick`].
    pub fn set_time_remaining(
        &mut self,
        seconds: u32,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome, SessionError> {
        let remaining = self.countdown("set the timer")?.min(seconds);
        self.time_remaining = Some(remaining);
        if remaining == 0 {
            self.finish(now);
            Ok(TickOutcome::Expired)
        } else {
            Ok(TickOutcome::Running { remaining })
        }
    }

    /// Finish the attempt at `now`. The answers are frozen from here on.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless in progress.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.require(SessionState::InProgress, "complete")?;
        self.finish(now);
        Ok(())
    }

    /// Discard everything and return to `NotStarted`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    #[must_use]
    pub fn chapter(&self) -> Option<ChapterId> {
        self.chapter
    }

    #[must_use]
    pub fn questions(&self) -> &[Arc<Question>] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Arc<Question>> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    #[must_use]
    pub fn answer_for(&self, question_id: &QuestionId) -> Option<AnswerOption> {
        self.answers.get(question_id).copied()
    }

    /// Seconds left on an exam countdown, `None` for practice.
    #[must_use]
    pub fn time_remaining(&self) -> Option<u32> {
        self.time_remaining
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let answered = self.answers.len();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            percentage: scoring::percentage(
                u32::try_from(answered).unwrap_or(u32::MAX),
                u32::try_from(total).unwrap_or(u32::MAX),
            ),
            is_complete: self.is_complete(),
        }
    }

    /// Score of a completed attempt, `None` before completion.
    ///
    /// Recomputed on every call from the frozen answers, so repeated calls agree.
    #[must_use]
    pub fn result(&self) -> Option<QuizResult> {
        match (self.state, self.started_at, self.ended_at) {
            (SessionState::Completed, Some(started), Some(ended)) => Some(scoring::score(
                &self.questions,
                &self.answers,
                started,
                ended,
            )),
            _ => None,
        }
    }

    fn require(&self, expected: SessionState, action: &'static str) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    fn countdown(&self, action: &'static str) -> Result<u32, SessionError> {
        self.require(SessionState::InProgress, action)?;
        self.time_remaining.ok_or(SessionError::Untimed)
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        self.state = SessionState::Completed;
        self.ended_at = Some(now);
    }
}
