use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ChapterId, QuestionId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestionError {
    #[error("invalid answer option: {0:?}")]
    InvalidOption(String),

    #[error("question text is empty")]
    EmptyText,

    #[error("answer key {key} points at a missing option")]
    MissingOption { key: AnswerOption },
}

//
// ─── ANSWER OPTION ────────────────────────────────────────────────────────────
//

/// One of the four lettered choices of a multiple-choice question.
///
/// Parsing is case-sensitive: only `"A"`..`"D"` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    pub const ALL: [AnswerOption; 4] = [
        AnswerOption::A,
        AnswerOption::B,
        AnswerOption::C,
        AnswerOption::D,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerOption {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(AnswerOption::A),
            "B" => Ok(AnswerOption::B),
            "C" => Ok(AnswerOption::C),
            "D" => Ok(AnswerOption::D),
            other => Err(QuestionError::InvalidOption(other.to_owned())),
        }
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A multiple-choice question paired with its answer key.
///
/// Option D is optional because some content ships three-choice questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: Option<String>,
    correct_answer: AnswerOption,
}

impl Question {
    /// Builds a question for `chapter` at `ordinal`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` for blank question text and
    /// `QuestionError::MissingOption` when the key points at an absent option D.
    pub fn new(
        chapter: ChapterId,
        ordinal: u32,
        text: impl Into<String>,
        options: [&str; 3],
        option_d: Option<&str>,
        correct_answer: AnswerOption,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if correct_answer == AnswerOption::D && option_d.is_none() {
            return Err(QuestionError::MissingOption {
                key: correct_answer,
            });
        }
        let [a, b, c] = options;
        Ok(Self {
            id: QuestionId::new(chapter, ordinal),
            text,
            option_a: a.to_owned(),
            option_b: b.to_owned(),
            option_c: c.to_owned(),
            option_d: option_d.map(str::to_owned),
            correct_answer,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text of the given option, `None` for an absent option D.
    #[must_use]
    pub fn option(&self, option: AnswerOption) -> Option<&str> {
        match option {
            AnswerOption::A => Some(&self.option_a),
            AnswerOption::B => Some(&self.option_b),
            AnswerOption::C => Some(&self.option_c),
            AnswerOption::D => self.option_d.as_deref(),
        }
    }

    /// Options present on this question, in letter order.
    pub fn options(&self) -> impl Iterator<Item = (AnswerOption, &str)> {
        AnswerOption::ALL
            .into_iter()
            .filter_map(|opt| self.option(opt).map(|text| (opt, text)))
    }

    #[must_use]
    pub fn correct_answer(&self) -> AnswerOption {
        self.correct_answer
    }

    #[must_use]
    pub fn is_correct(&self, answer: AnswerOption) -> bool {
        self.correct_answer == answer
    }
}
