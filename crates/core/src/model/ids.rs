use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chapter number within the question bank.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterId(u8);

impl ChapterId {
    /// Every chapter the bundled content ships with.
    pub const ALL: [ChapterId; 3] = [ChapterId(1), ChapterId(2), ChapterId(3)];

    /// Creates a new `ChapterId`
    #[must_use]
    pub fn new(id: u8) -> Self {
        Self(id)
    }

    /// Returns the underlying u8 value
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Returns true if the chapter is one of [`ChapterId::ALL`].
    #[must_use]
    pub fn is_known(&self) -> bool {
        Self::ALL.contains(self)
    }
}

/// Identifier of a question, composed as `"<chapter>-<ordinal>"`.
///
/// Ids read back from persisted answer maps are kept verbatim, so a `QuestionId`
/// is not guaranteed to be well formed. Use [`QuestionId::parts`] to decompose it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Builds the composite id for a chapter ordinal.
    #[must_use]
    pub fn new(chapter: ChapterId, ordinal: u32) -> Self {
        Self(format!("{chapter}-{ordinal}"))
    }

    /// Wraps a raw id without validating it.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the id into chapter and ordinal, or `None` when malformed.
    #[must_use]
    pub fn parts(&self) -> Option<(ChapterId, u32)> {
        let (chapter, ordinal) = self.0.split_once('-')?;
        let chapter = chapter.parse::<u8>().ok()?;
        let ordinal = ordinal.parse::<u32>().ok()?;
        Some((ChapterId::new(chapter), ordinal))
    }

    /// Chapter component of the id, if well formed.
    #[must_use]
    pub fn chapter(&self) -> Option<ChapterId> {
        self.parts().map(|(chapter, _)| chapter)
    }
}

impl fmt::Debug for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChapterId({})", self.0)
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for ChapterId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map(ChapterId::new)
            .map_err(|_| ParseIdError {
                kind: "ChapterId".to_string(),
            })
    }
}

impl FromStr for QuestionId {
    type Err = ParseIdError;

    /// Parses a well-formed `"<chapter>-<ordinal>"` id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = QuestionId::from_raw(s.trim());
        match id.parts() {
            Some((chapter, ordinal)) => Ok(QuestionId::new(chapter, ordinal)),
            None => Err(ParseIdError {
                kind: "QuestionId".to_string(),
            }),
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_id_composes_chapter_and_ordinal() {
        let id = QuestionId::new(ChapterId::new(2), 14);
        assert_eq!(id.as_str(), "2-14");
        assert_eq!(id.parts(), Some((ChapterId::new(2), 14)));
    }

    #[test]
    fn malformed_question_id_has_no_parts() {
        assert_eq!(QuestionId::from_raw("garbage").parts(), None);
        assert_eq!(QuestionId::from_raw("1-x").parts(), None);
        assert!("x-1".parse::<QuestionId>().is_err());
    }

    #[test]
    fn chapter_id_from_str() {
        let id: ChapterId = "3".parse().unwrap();
        assert_eq!(id, ChapterId::new(3));
        assert!(id.is_known());
        assert!(!ChapterId::new(9).is_known());
    }

    #[test]
    fn chapter_id_from_str_invalid() {
        assert!("chapter".parse::<ChapterId>().is_err());
    }

    #[test]
    fn question_id_serializes_as_plain_string() {
        let id = QuestionId::new(ChapterId::new(1), 7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"1-7\"");
    }
}
