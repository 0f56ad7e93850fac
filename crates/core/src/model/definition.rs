use thiserror::Error;

use crate::model::ids::MaterialId;
use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DefinitionError {
    #[error("test title cannot be empty")]
    EmptyTitle,

    #[error("test has no questions")]
    NoQuestions,

    #[error("test duration must be at least one minute, got {minutes}")]
    InvalidDuration { minutes: i64 },
}

impl DefinitionError {
    /// True when the error means "there is no usable test", as opposed to a malformed one.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::EmptyTitle | Self::NoQuestions)
    }
}

//
// ─── DEFINITION ────────────────────────────────────────────────────────────────
//

/// A test as loaded from the server, before any attempt state is layered on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDefinition {
    material_id: MaterialId,
    title: String,
    description: String,
    duration_secs: u32,
    questions: Vec<Question>,
    already_submitted: bool,
}

impl TestDefinition {
    /// Build a validated test definition.
    ///
    /// `duration_minutes` is the server value; it is stored in seconds.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::EmptyTitle` / `NoQuestions` when the server has no usable
    /// test, and `InvalidDuration` when the time limit is not a positive number of minutes.
    pub fn new(
        material_id: MaterialId,
        title: impl Into<String>,
        description: impl Into<String>,
        duration_minutes: i64,
        questions: Vec<Question>,
        already_submitted: bool,
    ) -> Result<Self, DefinitionError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DefinitionError::EmptyTitle);
        }
        if questions.is_empty() {
            return Err(DefinitionError::NoQuestions);
        }

        let duration_secs = u32::try_from(duration_minutes)
            .ok()
            .filter(|minutes| *minutes > 0)
            .and_then(|minutes| minutes.checked_mul(60))
            .ok_or(DefinitionError::InvalidDuration {
                minutes: duration_minutes,
            })?;

        Ok(Self {
            material_id,
            title,
            description: description.into(),
            duration_secs,
            questions,
            already_submitted,
        })
    }

    #[must_use]
    pub fn material_id(&self) -> &MaterialId {
        &self.material_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Whether the server reports a completed attempt for this student.
    #[must_use]
    pub fn already_submitted(&self) -> bool {
        self.already_submitted
    }
}

//
// ─── RESULTS VIEW ──────────────────────────────────────────────────────────────
//

/// One row of the read-only results view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub ordinal: u32,
    pub prompt: String,
    pub choices: Vec<String>,
    pub submitted_answer: Option<String>,
}

/// Read-only view of a previously completed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReview {
    pub title: String,
    pub items: Vec<ReviewItem>,
}

impl AttemptReview {
    #[must_use]
    pub fn from_definition(definition: &TestDefinition) -> Self {
        let items = definition
            .questions()
            .iter()
            .map(|q| ReviewItem {
                ordinal: q.ordinal(),
                prompt: q.prompt().to_owned(),
                choices: q.choices().to_vec(),
                submitted_answer: q.submitted_answer().map(str::to_owned),
            })
            .collect();

        Self {
            title: definition.title().to_owned(),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionId, QuestionKind};

    fn free_text(id: i64, ordinal: u32) -> Question {
        Question::new(
            QuestionId::new(id),
            ordinal,
            format!("Q{ordinal}"),
            QuestionKind::FreeText,
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn minutes_become_seconds() {
        let def = TestDefinition::new(
            MaterialId::new("m"),
            "Quiz",
            "",
            2,
            vec![free_text(1, 1)],
            false,
        )
        .unwrap();
        assert_eq!(def.duration_secs(), 120);
    }

    #[test]
    fn rejects_missing_title_and_questions() {
        let err =
            TestDefinition::new(MaterialId::new("m"), "  ", "", 5, vec![free_text(1, 1)], false)
                .unwrap_err();
        assert_eq!(err, DefinitionError::EmptyTitle);
        assert!(err.is_missing());

        let err = TestDefinition::new(MaterialId::new("m"), "Quiz", "", 5, Vec::new(), false)
            .unwrap_err();
        assert_eq!(err, DefinitionError::NoQuestions);
    }

    #[test]
    fn rejects_non_positive_duration() {
        for minutes in [0, -3] {
            let err = TestDefinition::new(
                MaterialId::new("m"),
                "Quiz",
                "",
                minutes,
                vec![free_text(1, 1)],
                false,
            )
            .unwrap_err();
            assert_eq!(err, DefinitionError::InvalidDuration { minutes });
            assert!(!err.is_missing());
        }
    }

    #[test]
    fn review_carries_previous_answers() {
        let q = free_text(7, 1).with_submitted_answer(Some("photosynthesis".into()));
        let def = TestDefinition::new(MaterialId::new("m"), "Bio", "", 10, vec![q], true).unwrap();

        let review = AttemptReview::from_definition(&def);
        assert_eq!(review.title, "Bio");
        assert_eq!(review.items.len(), 1);
        assert_eq!(
            review.items[0].submitted_answer.as_deref(),
            Some("photosynthesis")
        );
    }
}
