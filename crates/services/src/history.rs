//! Completed-attempt history and resumable chapter progress.
//!
//! Every operation reads the whole document, changes it and writes it back.
//! There is no locking between writers: the last write wins.

use std::sync::Arc;
use tracing::warn;

use quiz_core::model::{
    AnswerMap, ChapterId, ChapterProgress, HistoryEntry, HistoryStore, QuizMode, QuizResult,
};
use quiz_core::{Clock, QuestionBank};
use storage::repository::{HistoryRepository, StorageError};

use crate::error::HistoryError;

#[derive(Clone)]
pub struct HistoryService {
    clock: Clock,
    repo: HistoryRepository,
    bank: Arc<QuestionBank>,
}

impl HistoryService {
    #[must_use]
    pub fn new(clock: Clock, repo: HistoryRepository, bank: Arc<QuestionBank>) -> Self {
        Self { clock, repo, bank }
    }

    /// Current history document. Never fails: unreadable storage yields an empty store.
    pub async fn load(&self) -> HistoryStore {
        match self.repo.load().await {
            Ok(store) => store.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "history unavailable, starting from an empty store");
                HistoryStore::default()
            }
        }
    }

    /// Record a finished attempt and return the stored entry.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` if the document cannot be read for update or written.
    pub async fn save_result(
        &self,
        result: &QuizResult,
        mode: QuizMode,
        chapter: Option<ChapterId>,
    ) -> Result<HistoryEntry, HistoryError> {
        let mut store = self.read_for_update().await?;
        let entry = HistoryEntry::from_result(result, mode, chapter, self.clock.now());
        store.record(entry.clone());
        self.repo.save(&store).await?;
        Ok(entry)
    }

    /// Snapshot a practice run so it can be resumed later.
    ///
    /// Correct and incorrect counts are recomputed against the bank; an answer to a
    /// question the bank does not know counts as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` if the document cannot be read for update or written.
    pub async fn save_chapter_progress(
        &self,
        chapter: ChapterId,
        answers: &AnswerMap,
        current_index: usize,
        total_questions: usize,
    ) -> Result<ChapterProgress, HistoryError> {
        let mut store = self.read_for_update().await?;
        let progress = ChapterProgress::compute(
            chapter,
            answers.clone(),
            current_index,
            total_questions,
            |id| self.bank.correct_answer(id),
            self.clock.now(),
        );
        store.chapter_progress.insert(chapter, progress.clone());
        self.repo.save(&store).await?;
        Ok(progress)
    }

    pub async fn chapter_progress(&self, chapter: ChapterId) -> Option<ChapterProgress> {
        self.load().await.chapter_progress.remove(&chapter)
    }

    /// Drop a chapter's snapshot. Clearing an absent snapshot is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` if the document cannot be read for update or written.
    pub async fn clear_chapter_progress(&self, chapter: ChapterId) -> Result<(), HistoryError> {
        let mut store = self.read_for_update().await?;
        if store.chapter_progress.remove(&chapter).is_some() {
            self.repo.save(&store).await?;
        }
        Ok(())
    }

    /// Remove the whole document: results and progress alike.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` if the backend fails.
    pub async fn clear_all(&self) -> Result<(), HistoryError> {
        self.repo.clear().await?;
        Ok(())
    }

    pub async fn find_entry(&self, id: &str) -> Option<HistoryEntry> {
        self.load().await.find_entry(id).cloned()
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    // A corrupt document is replaced; anything else (backend down, newer schema)
    // must not be overwritten.
    async fn read_for_update(&self) -> Result<HistoryStore, HistoryError> {
        match self.repo.load().await {
            Ok(store) => Ok(store.unwrap_or_default()),
            Err(StorageError::Serialization(err)) => {
                warn!(error = %err, "replacing unreadable history document");
                Ok(HistoryStore::default())
            }
            Err(err) => Err(err.into()),
        }
    }
}
