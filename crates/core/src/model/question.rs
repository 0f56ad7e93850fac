use thiserror::Error;

use crate::model::ids::QuestionId;

/// Maximum number of choices a multiple-choice question may carry.
pub const MAX_CHOICES: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question ordinal must be >= 1")]
    InvalidOrdinal,

    #[error("unknown question type code: {0}")]
    UnknownKind(String),

    #[error("multiple-choice question needs 1..={MAX_CHOICES} choices, got {count}")]
    InvalidChoices { count: usize },

    #[error("free-text question must not carry choices")]
    UnexpectedChoices,
}

//
// ─── QUESTION KIND ─────────────────────────────────────────────────────────────
//

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    /// Pick one of up to four listed choices (`TES001`).
    MultipleChoice,
    /// Free text answer (`TES002`).
    FreeText,
}

impl QuestionKind {
    /// Parses the backend type code.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownKind` for any code other than `TES001`/`TES002`.
    pub fn from_code(code: &str) -> Result<Self, QuestionError> {
        match code.trim() {
            "TES001" => Ok(Self::MultipleChoice),
            "TES002" => Ok(Self::FreeText),
            other => Err(QuestionError::UnknownKind(other.to_owned())),
        }
    }

    /// Backend type code for this kind.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "TES001",
            QuestionKind::FreeText => "TES002",
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single test question, fixed once the test is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    ordinal: u32,
    prompt: String,
    kind: QuestionKind,
    choices: Vec<String>,
    submitted_answer: Option<String>,
}

impl Question {
    /// Builds a validated question.
    ///
    /// Blank choices are dropped before validation, since the backend sends
    /// all four choice slots and leaves unused ones empty.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the ordinal is zero or the choices do not match the kind.
    pub fn new(
        id: QuestionId,
        ordinal: u32,
        prompt: impl Into<String>,
        kind: QuestionKind,
        choices: Vec<String>,
    ) -> Result<Self, QuestionError> {
        if ordinal == 0 {
            return Err(QuestionError::InvalidOrdinal);
        }

        let choices: Vec<String> = choices
            .into_iter()
            .filter(|choice| !choice.trim().is_empty())
            .collect();

        match kind {
            QuestionKind::MultipleChoice => {
                if choices.is_empty() || choices.len() > MAX_CHOICES {
                    return Err(QuestionError::InvalidChoices {
                        count: choices.len(),
                    });
                }
            }
            QuestionKind::FreeText => {
                if !choices.is_empty() {
                    return Err(QuestionError::UnexpectedChoices);
                }
            }
        }

        Ok(Self {
            id,
            ordinal,
            prompt: prompt.into(),
            kind,
            choices,
            submitted_answer: None,
        })
    }

    /// Attach the answer recorded by a previous attempt.
    #[must_use]
    pub fn with_submitted_answer(mut self, answer: Option<String>) -> Self {
        self.submitted_answer = answer;
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    /// 1-based display number.
    #[must_use]
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    /// Choices in display order; empty for free-text questions.
    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn submitted_answer(&self) -> Option<&str> {
        self.submitted_answer.as_deref()
    }
}
