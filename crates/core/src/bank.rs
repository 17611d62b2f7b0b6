//! Static question content for the fixed chapters.
//!
//! Content and answer keys ship as separate records keyed by ordinal. The bank pairs
//! them once at startup; a chapter with a missing or malformed source is kept as a
//! per-chapter error so the remaining chapters stay usable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::model::{AnswerOption, ChapterId, Question, QuestionError, QuestionId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("chapter {0} not found")]
    ChapterNotFound(ChapterId),

    #[error("question content for chapter {0} not found")]
    MissingContent(ChapterId),

    #[error("answer data for chapter {0} not found")]
    MissingAnswers(ChapterId),

    #[error("chapter {chapter} question {ordinal} has no answer key")]
    MissingKey { chapter: ChapterId, ordinal: u32 },

    #[error("chapter {chapter} question {ordinal}: {source}")]
    InvalidQuestion {
        chapter: ChapterId,
        ordinal: u32,
        #[source]
        source: QuestionError,
    },

    #[error("chapter {0} has no questions")]
    EmptyChapter(ChapterId),
}

//
// ─── RAW RECORDS ──────────────────────────────────────────────────────────────
//

/// One question as written in a chapter content file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D", default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

/// Question records of one chapter, keyed by ordinal.
pub type ChapterContent = BTreeMap<u32, QuestionRecord>;

/// Answer letters of one chapter, keyed by ordinal. Kept raw so that a bad
/// letter is reported against its ordinal instead of failing the whole file.
pub type AnswerKey = BTreeMap<u32, String>;

/// Both halves of a chapter as found on disk; either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterSource {
    pub content: Option<ChapterContent>,
    pub answers: Option<AnswerKey>,
}

//
// ─── BANK ─────────────────────────────────────────────────────────────────────
//

type ChapterQuestions = Arc<[Arc<Question>]>;

/// All loaded chapters, built once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    chapters: BTreeMap<ChapterId, Result<ChapterQuestions, ContentError>>,
}

impl QuestionBank {
    /// Pair every chapter's content with its answer key.
    ///
    /// Chapters listed in [`ChapterId::ALL`] but absent from `sources` are recorded as
    /// [`ContentError::ChapterNotFound`].
    #[must_use]
    pub fn from_sources(sources: BTreeMap<ChapterId, ChapterSource>) -> Self {
        let mut chapters = BTreeMap::new();
        for chapter in ChapterId::ALL {
            chapters.insert(chapter, Err(ContentError::ChapterNotFound(chapter)));
        }
        for (chapter, source) in sources {
            chapters.insert(chapter, build_chapter(chapter, source));
        }
        Self { chapters }
    }

    /// Ordered questions of a chapter, in content (ordinal) order.
    ///
    /// # Errors
    ///
    /// Returns the `ContentError` recorded when the chapter was built, or
    /// `ContentError::ChapterNotFound` for a chapter the bank never saw.
    pub fn chapter_questions(&self, chapter: ChapterId) -> Result<&[Arc<Question>], ContentError> {
        match self.chapters.get(&chapter) {
            Some(Ok(questions)) => Ok(&questions[..]),
            Some(Err(err)) => Err(err.clone()),
            None => Err(ContentError::ChapterNotFound(chapter)),
        }
    }

    /// Chapters that loaded successfully.
    pub fn available_chapters(&self) -> impl Iterator<Item = ChapterId> + '_ {
        self.chapters
            .iter()
            .filter(|(_, built)| built.is_ok())
            .map(|(chapter, _)| *chapter)
    }

    /// Every chapter the bank knows about, loaded or not.
    pub fn chapters(&self) -> impl Iterator<Item = ChapterId> + '_ {
        self.chapters.keys().copied()
    }

    #[must_use]
    pub fn question_count(&self, chapter: ChapterId) -> usize {
        self.chapter_questions(chapter).map_or(0, <[_]>::len)
    }

    /// Look a question up by id across all loaded chapters.
    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Arc<Question>> {
        let chapter = id.chapter()?;
        self.chapter_questions(chapter)
            .ok()?
            .iter()
            .find(|q| q.id() == id)
    }

    /// Answer key for a question id, `None` if the id is malformed or unknown.
    #[must_use]
    pub fn correct_answer(&self, id: &QuestionId) -> Option<AnswerOption> {
        self.question(id).map(|q| q.correct_answer())
    }
}

fn build_chapter(
    chapter: ChapterId,
    source: ChapterSource,
) -> Result<ChapterQuestions, ContentError> {
    let content = source
        .content
        .ok_or(ContentError::MissingContent(chapter))?;
    let answers = source
        .answers
        .ok_or(ContentError::MissingAnswers(chapter))?;

    if content.is_empty() {
        return Err(ContentError::EmptyChapter(chapter));
    }

    let mut questions = Vec::with_capacity(content.len());
    for (ordinal, record) in content {
        let raw_key = answers
            .get(&ordinal)
            .ok_or(ContentError::MissingKey { chapter, ordinal })?;
        let invalid = |source| ContentError::InvalidQuestion {
            chapter,
            ordinal,
            source,
        };
        let key = raw_key.trim().parse::<AnswerOption>().map_err(invalid)?;
        let question = Question::new(
            chapter,
            ordinal,
            record.question,
            [record.a.as_str(), record.b.as_str(), record.c.as_str()],
            record.d.as_deref(),
            key,
        )
        .map_err(invalid)?;
        questions.push(Arc::new(question));
    }

    Ok(questions.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> QuestionRecord {
        QuestionRecord {
            question: text.to_owned(),
            a: "a".into(),
            b: "b".into(),
            c: "c".into(),
            d: Some("d".into()),
        }
    }

    fn source(keys: &[(u32, &str)]) -> ChapterSource {
        let content = keys
            .iter()
            .map(|(ordinal, _)| (*ordinal, record(&format!("Q{ordinal}"))))
            .collect();
        let answers = keys
            .iter()
            .map(|(ordinal, key)| (*ordinal, (*key).to_owned()))
            .collect();
        ChapterSource {
            content: Some(content),
            answers: Some(answers),
        }
    }

    #[test]
    fn pairs_content_with_keys_in_ordinal_order() {
        let mut sources = BTreeMap::new();
        sources.insert(ChapterId::new(1), source(&[(10, "B"), (2, "A"), (1, "C")]));
        let bank = QuestionBank::from_sources(sources);

        let questions = bank.chapter_questions(ChapterId::new(1)).unwrap();
        let ids: Vec<_> = questions.iter().map(|q| q.id().as_str()).collect();
        assert_eq!(ids, vec!["1-1", "1-2", "1-10"]);
        assert_eq!(questions[0].correct_answer(), AnswerOption::C);
    }

    #[test]
    fn missing_answer_file_fails_only_that_chapter() {
        let mut sources = BTreeMap::new();
        sources.insert(ChapterId::new(1), source(&[(1, "A")]));
        sources.insert(
            ChapterId::new(2),
            ChapterSource {
                content: source(&[(1, "A")]).content,
                answers: None,
            },
        );
        let bank = QuestionBank::from_sources(sources);

        assert!(bank.chapter_questions(ChapterId::new(1)).is_ok());
        assert_eq!(
            bank.chapter_questions(ChapterId::new(2)).unwrap_err(),
            ContentError::MissingAnswers(ChapterId::new(2))
        );
        assert_eq!(
            bank.chapter_questions(ChapterId::new(3)).unwrap_err(),
            ContentError::ChapterNotFound(ChapterId::new(3))
        );
        assert_eq!(
            bank.available_chapters().collect::<Vec<_>>(),
            vec![ChapterId::new(1)]
        );
    }

    #[test]
    fn lowercase_key_is_malformed() {
        let mut sources = BTreeMap::new();
        sources.insert(ChapterId::new(1), source(&[(1, "a")]));
        let bank = QuestionBank::from_sources(sources);

        let err = bank.chapter_questions(ChapterId::new(1)).unwrap_err();
        assert!(matches!(
            err,
            ContentError::InvalidQuestion { ordinal: 1, .. }
        ));
    }

    #[test]
    fn question_without_key_is_malformed() {
        let mut src = source(&[(1, "A")]);
        src.content
            .as_mut()
            .unwrap()
            .insert(2, record("orphan"));
        let mut sources = BTreeMap::new();
        sources.insert(ChapterId::new(3), src);
        let bank = QuestionBank::from_sources(sources);

        assert_eq!(
            bank.chapter_questions(ChapterId::new(3)).unwrap_err(),
            ContentError::MissingKey {
                chapter: ChapterId::new(3),
                ordinal: 2
            }
        );
    }

    #[test]
    fn correct_answer_resolves_by_id() {
        let mut sources = BTreeMap::new();
        sources.insert(ChapterId::new(2), source(&[(1, "D"), (2, "B")]));
        let bank = QuestionBank::from_sources(sources);

        let id = QuestionId::new(ChapterId::new(2), 2);
        assert_eq!(bank.correct_answer(&id), Some(AnswerOption::B));
        assert_eq!(bank.correct_answer(&QuestionId::from_raw("2-99")), None);
        assert_eq!(bank.correct_answer(&QuestionId::from_raw("nope")), None);
        assert_eq!(bank.question_count(ChapterId::new(2)), 2);
    }
}
