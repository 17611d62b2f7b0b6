//! Reads chapter content files from a directory.
//!
//! Layout: `chapter{N}.json` holds question records keyed by ordinal and
//! `answers{N}.json` holds the answer letters keyed by the same ordinals.

use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use quiz_core::QuestionBank;
use quiz_core::bank::{AnswerKey, ChapterContent, ChapterSource};
use quiz_core::model::ChapterId;

use crate::repository::StorageError;

#[must_use]
pub fn content_file(dir: &Path, chapter: ChapterId) -> PathBuf {
    dir.join(format!("chapter{chapter}.json"))
}

#[must_use]
pub fn answers_file(dir: &Path, chapter: ChapterId) -> PathBuf {
    dir.join(format!("answers{chapter}.json"))
}

/// Collect whatever halves of each known chapter exist under `dir`.
///
/// A missing or unparsable file leaves that half empty; the bank turns it into a
/// per-chapter content error.
///
/// # Errors
///
/// Returns `StorageError::NotFound` if `dir` does not exist and
/// `StorageError::Connection` for other I/O failures.
pub fn load_content_dir(dir: &Path) -> Result<BTreeMap<ChapterId, ChapterSource>, StorageError> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(StorageError::Connection(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound),
        Err(err) => return Err(StorageError::Connection(err.to_string())),
    }

    let mut sources = BTreeMap::new();
    for chapter in ChapterId::ALL {
        let content = read_json::<ChapterContent>(&content_file(dir, chapter))?;
        let answers = read_json::<AnswerKey>(&answers_file(dir, chapter))?;
        if content.is_none() && answers.is_none() {
            debug!(%chapter, "no content files for chapter");
            continue;
        }
        sources.insert(chapter, ChapterSource { content, answers });
    }
    Ok(sources)
}

/// Load the content directory and build the bank in one step.
///
/// # Errors
///
/// See [`load_content_dir`].
pub fn load_question_bank(dir: &Path) -> Result<QuestionBank, StorageError> {
    load_content_dir(dir).map(QuestionBank::from_sources)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StorageError::Connection(err.to_string())),
    };
    match serde_json::from_str(&raw) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unparsable content file");
            Ok(None)
        }
    }
}
