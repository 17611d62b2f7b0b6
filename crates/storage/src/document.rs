//! Versioned JSON encoding of the history document.
//!
//! Version 0 is the unversioned layout written before the `version` field existed;
//! it may lack `chapterProgress` and may hold more than the capped number of results.
//! Decoding is lenient per item: a malformed entry or progress record is dropped
//! with a warning instead of discarding the whole document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use quiz_core::model::{
    ChapterId, ChapterProgress, HistoryEntry, HistoryStore, MAX_HISTORY_ENTRIES,
};

use crate::repository::StorageError;

/// Version written by [`encode_history`].
pub const HISTORY_SCHEMA_VERSION: u64 = 1;

#[derive(Serialize)]
struct Envelope<'a> {
    version: u64,
    #[serde(flatten)]
    store: &'a HistoryStore,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawDocument {
    version: Option<u64>,
    latest_practice: Option<Value>,
    latest_exam: Option<Value>,
    all_results: Option<Vec<Value>>,
    chapter_progress: Option<BTreeMap<String, Value>>,
}

/// Serialize the store at the current schema version.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_history(store: &HistoryStore) -> Result<String, StorageError> {
    serde_json::to_string(&Envelope {
        version: HISTORY_SCHEMA_VERSION,
        store,
    })
    .map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Parse a stored document, filling defaults for anything missing.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if `raw` is not a JSON object and
/// `StorageError::UnsupportedVersion` for documents newer than this build.
pub fn decode_history(raw: &str) -> Result<HistoryStore, StorageError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
    if !value.is_object() {
        return Err(StorageError::Serialization("history document is not a JSON object".into()));
    }
    let doc: RawDocument =
        serde_json::from_value(value).map_err(|e| StorageError::Serialization(e.to_string()))?;

    let version = doc.version.unwrap_or(0);
    if version > HISTORY_SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: version,
            supported: HISTORY_SCHEMA_VERSION,
        });
    }

    let mut all_results: Vec<HistoryEntry> = doc
        .all_results
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| decode_item("history entry", value))
        .collect();
    all_results.truncate(MAX_HISTORY_ENTRIES);

    let mut chapter_progress = BTreeMap::new();
    for (key, value) in doc.chapter_progress.unwrap_or_default() {
        let Ok(chapter) = key.parse::<ChapterId>() else {
            warn!(key = %key, "dropping chapter progress under a non-numeric key");
            continue;
        };
        if let Some(progress) = decode_item::<ChapterProgress>("chapter progress", value) {
            chapter_progress.insert(chapter, progress);
        }
    }

    Ok(HistoryStore {
        latest_practice: doc
            .latest_practice
            .and_then(|value| decode_item("latest practice", value)),
        latest_exam: doc
            .latest_exam
            .and_then(|value| decode_item("latest exam", value)),
        all_results,
        chapter_progress,
    })
}

fn decode_item<T: serde::de::DeserializeOwned>(what: &'static str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(item) => Some(item),
        Err(err) => {
            warn!(error = %err, "dropping malformed {what}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerMap, AnswerOption, QuestionId, QuizMode, QuizResult};
    use quiz_core::time::fixed_now;

    fn sample_entry(mode: QuizMode) -> HistoryEntry {
        let result = QuizResult {
            correct: 2,
            incorrect: 1,
            total: 3,
            percentage: 67,
            time_spent_secs: 30,
            answers: Vec::new(),
        };
        HistoryEntry::from_result(&result, mode, Some(ChapterId::new(1)), fixed_now())
    }

    #[test]
    fn encoded_document_carries_version_and_camel_case_fields() {
        let mut store = HistoryStore::default();
        store.record(sample_entry(QuizMode::Exam));
        let raw = encode_history(&store).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["version"], HISTORY_SCHEMA_VERSION);
        assert!(value["latestPractice"].is_null());
        assert_eq!(value["latestExam"]["mode"], "exam");
        assert_eq!(value["allResults"].as_array().unwrap().len(), 1);
        assert!(value["chapterProgress"].as_object().unwrap().is_empty());
    }

    #[test]
    fn decode_inverts_encode() {
        let mut store = HistoryStore::default();
        store.record(sample_entry(QuizMode::Practice));
        let chapter = ChapterId::new(3);
        let mut answers = AnswerMap::new();
        answers.insert(QuestionId::new(chapter, 1), AnswerOption::D);
        store.chapter_progress.insert(
            chapter,
            ChapterProgress::compute(chapter, answers, 4, 20, |_| None, fixed_now()),
        );

        let decoded = decode_history(&encode_history(&store).unwrap()).unwrap();
        assert_eq!(decoded, store);
    }

    #[test]
    fn legacy_document_without_progress_gets_defaults() {
        let raw = r#"{"latestPractice":null,"latestExam":null,"allResults":[]}"#;
        let store = decode_history(raw).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn null_collections_decode_as_empty() {
        let entry = serde_json::to_value(sample_entry(QuizMode::Practice)).unwrap();
        let raw = serde_json::json!({
            "latestPractice": entry.clone(),
            "latestExam": null,
            "allResults": [entry],
            "chapterProgress": null
        })
        .to_string();

        let store = decode_history(&raw).unwrap();
        assert_eq!(store.all_results.len(), 1);
        assert!(store.latest_practice.is_some());
        assert!(store.chapter_progress.is_empty());

        let store = decode_history(r#"{"allResults":null}"#).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_entries_are_dropped_individually() {
        let good = serde_json::to_value(sample_entry(QuizMode::Exam)).unwrap();
        let raw = serde_json::json!({
            "version": 1,
            "allResults": [good, {"id": "broken"}],
            "chapterProgress": { "x": {}, "2": {"chapter": 2} }
        })
        .to_string();

        let store = decode_history(&raw).unwrap();
        assert_eq!(store.all_results.len(), 1);
        assert!(store.chapter_progress.is_empty());
    }

    #[test]
    fn oversized_legacy_history_is_capped() {
        let entry = serde_json::to_value(sample_entry(QuizMode::Practice)).unwrap();
        let raw = serde_json::json!({ "allResults": vec![entry; MAX_HISTORY_ENTRIES + 7] })
            .to_string();
        let store = decode_history(&raw).unwrap();
        assert_eq!(store.all_results.len(), MAX_HISTORY_ENTRIES);
    }

    #[test]
    fn newer_version_is_rejected() {
        let err = decode_history(r#"{"version": 99}"#).unwrap_err();
        assert!(matches!(
            err,
            StorageError::UnsupportedVersion { found: 99, .. }
        ));
    }

    #[test]
    fn non_object_is_a_serialization_error() {
        assert!(matches!(
            decode_history("[1,2,3]").unwrap_err(),
            StorageError::Serialization(_)
        ));
        assert!(matches!(
            decode_history("[2]").unwrap_err(),
            StorageError::Serialization(_)
        ));
        assert!(matches!(
            decode_history("{").unwrap_err(),
            StorageError::Serialization(_)
        ));
    }
}
