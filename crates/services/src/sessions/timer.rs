//! Background countdown for exam sessions.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use quiz_core::Clock;

use super::service::{QuizSession, TickOutcome};

/// Session shared between the workflow and its countdown task.
pub type SharedSession = Arc<Mutex<QuizSession>>;

/// Ticks an exam session once per period until it expires or stops being in progress.
///
/// The task is aborted when the timer is dropped, so a reset or a new session never
/// leaves a stale countdown behind.
pub struct ExamTimer {
    handle: JoinHandle<()>,
    remaining: watch::Receiver<Option<u32>>,
    expired: watch::Receiver<bool>,
}

impl ExamTimer {
    /// Start a one-second countdown. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn spawn(session: SharedSession, clock: Clock) -> Self {
        Self::spawn_with_period(session, clock, Duration::from_secs(1))
    }

    #[must_use]
    pub fn spawn_with_period(session: SharedSession, clock: Clock, period: Duration) -> Self {
        let initial = lock(&session).time_remaining();
        let (remaining_tx, remaining) = watch::channel(initial);
        let (expired_tx, expired) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                let outcome = lock(&session).tick(clock.now());
                match outcome {
                    Ok(TickOutcome::Running { remaining }) => {
                        remaining_tx.send_replace(Some(remaining));
                    }
                    Ok(TickOutcome::Expired) => {
                        remaining_tx.send_replace(Some(0));
                        expired_tx.send_replace(true);
                        info!("exam time is up");
                        break;
                    }
                    Err(err) => {
                        debug!(error = %err, "countdown stopped");
                        break;
                    }
                }
            }
        });

        Self {
            handle,
            remaining,
            expired,
        }
    }

    /// Seconds left as last published by the countdown task.
    #[must_use]
    pub fn remaining(&self) -> watch::Receiver<Option<u32>> {
        self.remaining.clone()
    }

    /// Wait until the countdown ends. `true` if the exam ran out of time, `false`
    /// if the countdown stopped for any other reason.
    pub async fn expired(&mut self) -> bool {
        self.expired.wait_for(|expired| *expired).await.is_ok()
    }
}

impl Drop for ExamTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub(crate) fn lock(session: &SharedSession) -> std::sync::MutexGuard<'_, QuizSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerOption, ChapterId, Question, QuizMode, SessionState};
    use quiz_core::time::fixed_now;

    use crate::sessions::EXAM_DURATION_SECS;

    fn exam_session() -> SharedSession {
        let question = Arc::new(
            Question::new(ChapterId::new(1), 1, "Q", ["a", "b", "c"], None, AnswerOption::A)
                .unwrap(),
        );
        let mut session = QuizSession::new();
        session
            .start(vec![question], QuizMode::Exam, None, None, fixed_now())
            .unwrap();
        Arc::new(Mutex::new(session))
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_decrements_once_per_second() {
        let session = exam_session();
        let timer = ExamTimer::spawn(Arc::clone(&session), Clock::fixed(fixed_now()));
        let mut remaining = timer.remaining();

        remaining.changed().await.unwrap();
        assert_eq!(*remaining.borrow(), Some(EXAM_DURATION_SECS - 1));
        remaining.changed().await.unwrap();
        assert_eq!(*remaining.borrow(), Some(EXAM_DURATION_SECS - 2));
        assert_eq!(lock(&session).time_remaining(), Some(EXAM_DURATION_SECS - 2));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_completes_the_session() {
        let session = exam_session();
        lock(&session).set_time_remaining(3, fixed_now()).unwrap();
        let mut timer = ExamTimer::spawn(Arc::clone(&session), Clock::fixed(fixed_now()));

        assert!(timer.expired().await);
        assert_eq!(lock(&session).state(), SessionState::Completed);
        assert_eq!(*timer.remaining().borrow(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_stops_when_session_completes_early() {
        let session = exam_session();
        let mut timer = ExamTimer::spawn(Arc::clone(&session), Clock::fixed(fixed_now()));
        lock(&session).complete(fixed_now()).unwrap();

        assert!(!timer.expired().await);
        assert!(lock(&session).result().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_stops_ticking() {
        let session = exam_session();
        let timer = ExamTimer::spawn(Arc::clone(&session), Clock::fixed(fixed_now()));
        drop(timer);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(lock(&session).time_remaining(), Some(EXAM_DURATION_SECS));
    }
}
