//! Question retrieval on top of the static bank.
//!
//! Chapter order is shuffled once and the permutation cached per chapter, so a
//! resumed practice run sees the same order until the chapter is restarted.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use quiz_core::QuestionBank;
use quiz_core::model::{ChapterId, Question};
use storage::repository::ShuffleOrderRepository;

use crate::error::QuestionLoadError;

pub struct QuestionService {
    bank: Arc<QuestionBank>,
    orders: ShuffleOrderRepository,
    rng: Mutex<StdRng>,
}

impl QuestionService {
    #[must_use]
    pub fn new(bank: Arc<QuestionBank>, orders: ShuffleOrderRepository) -> Self {
        Self {
            bank,
            orders,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Use a deterministic generator, for tests.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    #[must_use]
    pub fn bank(&self) -> &Arc<QuestionBank> {
        &self.bank
    }

    #[must_use]
    pub fn chapter_question_count(&self, chapter: ChapterId) -> usize {
        self.bank.question_count(chapter)
    }

    /// Questions of one chapter, in content order or in the chapter's cached shuffle order.
    ///
    /// A cached order that no longer matches the chapter size, or that cannot be read,
    /// is replaced by a fresh one. Failing to store the fresh order is only logged.
    ///
    /// # Errors
    ///
    /// Returns `QuestionLoadError::Content` if the chapter failed to load.
    pub async fn load_chapter_questions(
        &self,
        chapter: ChapterId,
        shuffle: bool,
    ) -> Result<Vec<Arc<Question>>, QuestionLoadError> {
        let questions = self.bank.chapter_questions(chapter)?;
        if !shuffle {
            return Ok(questions.to_vec());
        }

        let order = match self.orders.load(chapter).await {
            Ok(Some(order)) if is_permutation(&order, questions.len()) => order,
            Ok(Some(_)) => {
                debug!(%chapter, "cached shuffle order does not match chapter size");
                self.fresh_order(chapter, questions.len()).await
            }
            Ok(None) => self.fresh_order(chapter, questions.len()).await,
            Err(err) => {
                warn!(%chapter, error = %err, "cannot read cached shuffle order");
                self.fresh_order(chapter, questions.len()).await
            }
        };

        Ok(order
            .into_iter()
            .map(|index| Arc::clone(&questions[index]))
            .collect())
    }

    /// Forget a chapter's cached order; the next shuffled load draws a new one.
    ///
    /// # Errors
    ///
    /// Returns `QuestionLoadError::Storage` if the cache entry cannot be removed.
    pub async fn reset_chapter_order(&self, chapter: ChapterId) -> Result<(), QuestionLoadError> {
        self.orders.clear(chapter).await?;
        Ok(())
    }

    /// Up to `count` distinct questions drawn uniformly from every loaded chapter.
    ///
    /// Chapters that failed to load are skipped. Nothing is cached.
    #[must_use]
    pub fn load_random_questions(&self, count: usize) -> Vec<Arc<Question>> {
        let mut pool = Vec::new();
        for chapter in self.bank.chapters() {
            match self.bank.chapter_questions(chapter) {
                Ok(questions) => pool.extend(questions.iter().cloned()),
                Err(err) => warn!(%chapter, error = %err, "leaving chapter out of the exam pool"),
            }
        }
        self.with_rng(|rng| pool.shuffle(rng));
        pool.truncate(count);
        pool
    }

    async fn fresh_order(&self, chapter: ChapterId, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        self.with_rng(|rng| order.shuffle(rng));
        if let Err(err) = self.orders.save(chapter, &order).await {
            warn!(%chapter, error = %err, "cannot cache shuffle order");
        }
        order
    }

    fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    order.iter().all(|&index| {
        index < len && !std::mem::replace(&mut seen[index], true)
    })
}
