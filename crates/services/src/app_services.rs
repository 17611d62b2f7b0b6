use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use quiz_core::QuestionBank;
use storage::content::load_question_bank;
use storage::repository::{Storage, StorageError};

use crate::Clock;
use crate::error::AppServicesError;
use crate::history::HistoryService;
use crate::questions::QuestionService;
use crate::sessions::QuizWorkflow;

/// Assembles app-facing services over one storage backend and question bank.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    questions: Arc<QuestionService>,
    history: Arc<HistoryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and a content directory.
    ///
    /// Chapters that fail to load are logged and stay unavailable; the rest of the
    /// bank is usable.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the content directory is missing or storage
    /// initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        content_dir: &Path,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let bank = match load_question_bank(content_dir) {
            Ok(bank) => bank,
            Err(StorageError::NotFound) => {
                return Err(AppServicesError::ContentDirMissing(content_dir.to_path_buf()));
            }
            Err(err) => return Err(err.into()),
        };
        for chapter in bank.chapters() {
            match bank.chapter_questions(chapter) {
                Ok(questions) => info!(%chapter, questions = questions.len(), "chapter loaded"),
                Err(err) => warn!(%chapter, error = %err, "chapter unavailable"),
            }
        }

        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_parts(storage, bank, clock))
    }

    /// Build services over an in-memory store.
    #[must_use]
    pub fn in_memory(bank: QuestionBank, clock: Clock) -> Self {
        Self::from_parts(Storage::in_memory(), bank, clock)
    }

    #[must_use]
    pub fn from_parts(storage: Storage, bank: QuestionBank, clock: Clock) -> Self {
        let bank = Arc::new(bank);
        let questions = Arc::new(QuestionService::new(
            Arc::clone(&bank),
            storage.shuffle_orders.clone(),
        ));
        let history = Arc::new(HistoryService::new(clock, storage.history.clone(), bank));
        Self {
            clock,
            questions,
            history,
        }
    }

    /// A fresh workflow with no session.
    #[must_use]
    pub fn workflow(&self) -> QuizWorkflow {
        QuizWorkflow::new(self.clock, Arc::clone(&self.questions), Arc::clone(&self.history))
    }

    #[must_use]
    pub fn questions(&self) -> Arc<QuestionService> {
        Arc::clone(&self.questions)
    }

    #[must_use]
    pub fn history(&self) -> Arc<HistoryService> {
        Arc::clone(&self.history)
    }
}
