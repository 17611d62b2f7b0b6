use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use quiz_core::Clock;
use quiz_core::model::{
    AnswerOption, ChapterId, HistoryEntry, QuestionId, QuizMode, QuizResult, SessionState,
};

use super::service::{QuizSession, RestoredProgress};
use super::timer::{ExamTimer, SharedSession, lock};
use crate::error::{SessionError, WorkflowError};
use crate::history::HistoryService;
use crate::questions::QuestionService;

/// Number of questions drawn for an exam.
pub const EXAM_QUESTION_COUNT: usize = 60;

/// Outcome of finishing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedQuiz {
    pub result: QuizResult,
    /// The stored history entry, `None` if saving failed.
    pub entry: Option<HistoryEntry>,
}

/// Orchestrates a session together with question loading, the exam countdown
/// and persistence.
///
/// Persistence side effects never fail a user action: a practice snapshot or
/// history write that cannot be stored is logged and the session carries on.
pub struct QuizWorkflow {
    clock: Clock,
    questions: Arc<QuestionService>,
    history: Arc<HistoryService>,
    session: SharedSession,
    timer: Option<ExamTimer>,
    saved: Option<HistoryEntry>,
}

impl QuizWorkflow {
    #[must_use]
    pub fn new(clock: Clock, questions: Arc<QuestionService>, history: Arc<HistoryService>) -> Self {
        Self {
            clock,
            questions,
            history,
            session: Arc::new(Mutex::new(QuizSession::new())),
            timer: None,
            saved: None,
        }
    }

    /// Read the session under its lock.
    pub fn with_session<R>(&self, f: impl FnOnce(&QuizSession) -> R) -> R {
        f(&lock(&self.session))
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        lock(&self.session).state()
    }

    /// Countdown updates of the running exam, if any.
    #[must_use]
    pub fn time_remaining(&self) -> Option<watch::Receiver<Option<u32>>> {
        self.timer.as_ref().map(ExamTimer::remaining)
    }

    /// Start (or resume) practice on a chapter in its cached shuffle order.
    ///
    /// Any current session is discarded first.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError` if the chapter cannot be loaded or has no questions.
    pub async fn start_practice(&mut self, chapter: ChapterId) -> Result<(), WorkflowError> {
        self.reset();
        let questions = self.questions.load_chapter_questions(chapter, true).await?;
        let restored = self
            .history
            .chapter_progress(chapter)
            .await
            .map(RestoredProgress::from);
        if let Some(restored) = &restored {
            debug!(%chapter, answered = restored.answers.len(), "resuming practice");
        }
        lock(&self.session).start(
            questions,
            QuizMode::Practice,
            Some(chapter),
            restored,
            self.clock.now(),
        )?;
        info!(%chapter, "practice started");
        Ok(())
    }

    /// Start a chapter over: forget its saved progress and cached order, then start practice.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError` if the chapter cannot be loaded or has no questions.
    /// Failing to clear the saved state is only logged.
    pub async fn restart_chapter(&mut self, chapter: ChapterId) -> Result<(), WorkflowError> {
        self.reset();
        if let Err(err) = self.history.clear_chapter_progress(chapter).await {
            warn!(%chapter, error = %err, "failed to clear chapter progress");
        }
        if let Err(err) = self.questions.reset_chapter_order(chapter).await {
            warn!(%chapter, error = %err, "failed to reset chapter order");
        }
        self.start_practice(chapter).await
    }

    /// Start a timed exam over [`EXAM_QUESTION_COUNT`] random questions.
    ///
    /// Must be called inside a Tokio runtime; the countdown runs as a task.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Session` if no chapter has questions.
    pub fn start_exam(&mut self) -> Result<(), WorkflowError> {
        self.reset();
        let questions = self.questions.load_random_questions(EXAM_QUESTION_COUNT);
        let count = questions.len();
        lock(&self.session).start(questions, QuizMode::Exam, None, None, self.clock.now())?;
        self.timer = Some(ExamTimer::spawn(Arc::clone(&self.session), self.clock));
        info!(questions = count, "exam started");
        Ok(())
    }

    /// Answer a question and, in practice, snapshot progress.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Session` if the session rejects the answer.
    pub async fn answer(
        &mut self,
        question_id: &QuestionId,
        option: AnswerOption,
    ) -> Result<(), WorkflowError> {
        lock(&self.session).answer(question_id, option)?;
        self.snapshot_progress().await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `WorkflowError::Session` unless a session is in progress.
    pub async fn go_to(&mut self, index: usize) -> Result<usize, WorkflowError> {
        let index = lock(&self.session).go_to(index)?;
        self.snapshot_progress().await;
        Ok(index)
    }

    /// # Errors
    ///
    /// Returns `WorkflowError::Session` unless a session is in progress.
    pub async fn next(&mut self) -> Result<usize, WorkflowError> {
        let index = lock(&self.session).next()?;
        self.snapshot_progress().await;
        Ok(index)
    }

    /// # Errors
    ///
    /// Returns `WorkflowError::Session` unless a session is in progress.
    pub async fn previous(&mut self) -> Result<usize, WorkflowError> {
        let index = lock(&self.session).previous()?;
        self.snapshot_progress().await;
        Ok(index)
    }

    /// Finish the session, score it and record it in history.
    ///
    /// Also finalizes an exam that already expired. Calling this again returns the
    /// same outcome without writing a second history entry.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Session` if no session was started.
    pub async fn complete(&mut self) -> Result<CompletedQuiz, WorkflowError> {
        let (result, mode, chapter) = {
            let mut session = lock(&self.session);
            if session.state() == SessionState::InProgress {
                session.complete(self.clock.now())?;
            }
            let result = session.result().ok_or(SessionError::InvalidTransition {
                action: "score",
                state: session.state(),
            })?;
            (result, session.mode(), session.chapter())
        };
        self.timer = None;

        if self.saved.is_none() {
            match self.history.save_result(&result, mode, chapter).await {
                Ok(entry) => {
                    info!(id = %entry.id, percentage = entry.percentage, "result saved");
                    self.saved = Some(entry);
                }
                Err(err) => warn!(error = %err, "failed to save quiz result"),
            }
        }

        Ok(CompletedQuiz {
            result,
            entry: self.saved.clone(),
        })
    }

    /// Drop the session and stop any countdown. Saved progress is kept.
    pub fn reset(&mut self) {
        self.timer = None;
        self.saved = None;
        lock(&self.session).reset();
    }

    async fn snapshot_progress(&self) {
        let snapshot = {
            let session = lock(&self.session);
            match (session.mode(), session.state(), session.chapter()) {
                (QuizMode::Practice, SessionState::InProgress, Some(chapter)) => Some((
                    chapter,
                    session.answers().clone(),
                    session.current_index(),
                    session.questions().len(),
                )),
                _ => None,
            }
        };
        let Some((chapter, answers, index, total)) = snapshot else {
            return;
        };
        if let Err(err) = self
            .history
            .save_chapter_progress(chapter, &answers, index, total)
            .await
        {
            warn!(%chapter, error = %err, "failed to save practice progress");
        }
    }
}
