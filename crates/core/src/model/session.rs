use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::model::definition::{AttemptReview, TestDefinition};
use crate::model::ids::{MaterialId, QuestionId};
use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot {operation} while the attempt is {phase}")]
    InvalidState {
        operation: &'static str,
        phase: Phase,
    },

    #[error("this test was already submitted")]
    AlreadySubmitted,

    #[error("question index {index} is out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },
}

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle stage of one attempt.
///
/// `NotStarted -> InProgress -> Submitting -> Submitted`, with
/// `Submitting -> InProgress` when the submission request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    NotStarted,
    InProgress,
    Submitting,
    Submitted,
}

impl Phase {
    /// True once a submission is in flight or done.
    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, Phase::Submitting | Phase::Submitted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::NotStarted => "not started",
            Phase::InProgress => "in progress",
            Phase::Submitting => "submitting",
            Phase::Submitted => "submitted",
        };
        f.write_str(label)
    }
}

//
// ─── SUBMISSION PAYLOAD ────────────────────────────────────────────────────────
//

/// What caused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    /// The student confirmed a manual submit.
    Manual,
    /// The countdown reached zero.
    Automatic,
}

impl SubmitTrigger {
    #[must_use]
    pub fn is_automatic(self) -> bool {
        matches!(self, SubmitTrigger::Automatic)
    }
}

/// One submitted answer; unanswered questions carry an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerEntry {
    pub question_id: QuestionId,
    pub answer: String,
}

/// Ordered submission payload, one entry per question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSheet {
    pub trigger: SubmitTrigger,
    pub entries: Vec<AnswerEntry>,
}

impl AnswerSheet {
    /// Number of entries with a non-blank answer.
    #[must_use]
    pub fn answered(&self) -> usize {
        self.entries.iter().filter(|e| is_answered(&e.answer)).count()
    }
}

/// Whitespace-only answers count as unanswered.
#[must_use]
pub fn is_answered(answer: &str) -> bool {
    !answer.trim().is_empty()
}

//
// ─── TICK / PROGRESS ───────────────────────────────────────────────────────────
//

/// Outcome of advancing the countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Time was deducted and some remains.
    Running { remaining_secs: u32 },
    /// This tick took the countdown from 1 to 0. Reported exactly once per attempt.
    Expired,
    /// Nothing changed: not in progress, or the countdown is already at zero.
    Idle,
}

/// Aggregated answer progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of one timed attempt.
///
/// Every phase change goes through `start`, `begin_submission`,
/// `finish_submission` or `abort_submission`; answers and the countdown are
/// frozen once a submission has begun.
#[derive(Debug, Clone)]
pub struct TestSession {
    definition: TestDefinition,
    answers: BTreeMap<usize, String>,
    current_index: usize,
    remaining_secs: u32,
    phase: Phase,
    started_at: Option<DateTime<Utc>>,
    submitted_at: Option<DateTime<Utc>>,
}

impl TestSession {
    #[must_use]
    pub fn new(definition: TestDefinition) -> Self {
        Self {
            definition,
            answers: BTreeMap::new(),
            current_index: 0,
            remaining_secs: 0,
            phase: Phase::NotStarted,
            started_at: None,
            submitted_at: None,
        }
    }

    #[must_use]
    pub fn definition(&self) -> &TestDefinition {
        &self.definition
    }

    #[must_use]
    pub fn material_id(&self) -> &MaterialId {
        self.definition.material_id()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        self.definition.questions()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        // current_index is kept inside bounds and questions are never empty
        &self.questions()[self.current_index]
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    /// Whether this student already completed the test before this load.
    #[must_use]
    pub fn already_submitted(&self) -> bool {
        self.definition.already_submitted()
    }

    /// Read-only results for a previously completed attempt.
    #[must_use]
    pub fn review(&self) -> Option<AttemptReview> {
        self.already_submitted()
            .then(|| AttemptReview::from_definition(&self.definition))
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions().len();
        let answered = self
            .answers
            .values()
            .filter(|answer| is_answered(answer))
            .count();
        SessionProgress {
            total,
            answered,
            unanswered: total.saturating_sub(answered),
        }
    }

    /// Begin the attempt and arm the countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` for a previously completed test and
    /// `SessionError::InvalidState` if the attempt was already started.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.already_submitted() {
            return Err(SessionError::AlreadySubmitted);
        }
        if self.phase != Phase::NotStarted {
            return Err(SessionError::InvalidState {
                operation: "start",
                phase: self.phase,
            });
        }

        self.remaining_secs = self.definition.duration_secs();
        self.phase = Phase::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    /// Deduct one second from the countdown.
    pub fn tick(&mut self) -> Tick {
        if self.phase != Phase::InProgress || self.remaining_secs == 0 {
            return Tick::Idle;
        }

        self.remaining_secs -= 1;
        if self.remaining_secs == 0 {
            Tick::Expired
        } else {
            Tick::Running {
                remaining_secs: self.remaining_secs,
            }
        }
    }

    /// Record (or overwrite) the answer for a question.
    ///
    /// Content is not checked against the question kind.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `InProgress` and
    /// `SessionError::IndexOutOfRange` for an unknown question index.
    pub fn set_answer(&mut self, index: usize, value: impl Into<String>) -> Result<(), SessionError> {
        if self.phase != Phase::InProgress {
            return Err(SessionError::InvalidState {
                operation: "answer",
                phase: self.phase,
            });
        }
        let len = self.questions().len();
        if index >= len {
            return Err(SessionError::IndexOutOfRange { index, len });
        }

        self.answers.insert(index, value.into());
        Ok(())
    }

    /// Move the question pointer, clamping into range.
    ///
    /// Returns the index actually selected.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` once the attempt is submitted.
    pub fn set_current_index(&mut self, index: i64) -> Result<usize, SessionError> {
        if self.phase == Phase::Submitted {
            return Err(SessionError::InvalidState {
                operation: "navigate",
                phase: self.phase,
            });
        }

        let last = self.questions().len().saturating_sub(1);
        let clamped = if index <= 0 {
            0
        } else {
            usize::try_from(index).map_or(last, |i| i.min(last))
        };
        self.current_index = clamped;
        Ok(clamped)
    }

    /// Build the ordered payload for the current answers.
    #[must_use]
    pub fn answer_sheet(&self, trigger: SubmitTrigger) -> AnswerSheet {
        let entries = self
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| AnswerEntry {
                question_id: question.id(),
                answer: self.answers.get(&index).cloned().unwrap_or_default(),
            })
            .collect();

        AnswerSheet { trigger, entries }
    }

    /// Lock the attempt for submission and return the payload to send.
    ///
    /// Returns `Ok(None)` when a submission is already in flight or done; the
    /// caller must then do nothing.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the attempt was never started.
    pub fn begin_submission(
        &mut self,
        trigger: SubmitTrigger,
    ) -> Result<Option<AnswerSheet>, SessionError> {
        if self.phase.is_locked() {
            return Ok(None);
        }
        if self.phase == Phase::NotStarted {
            return Err(SessionError::InvalidState {
                operation: "submit",
                phase: self.phase,
            });
        }

        self.phase = Phase::Submitting;
        Ok(Some(self.answer_sheet(trigger)))
    }

    /// Mark the in-flight submission as accepted by the server.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless a submission is in flight.
    pub fn finish_submission(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.expect_submitting("finish submission")?;
        self.phase = Phase::Submitted;
        self.submitted_at = Some(now);
        Ok(())
    }

    /// Reopen the attempt after a failed submission. Answers are kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless a submission is in flight.
    pub fn abort_submission(&mut self) -> Result<(), SessionError> {
        self.expect_submitting("abort submission")?;
        self.phase = Phase::InProgress;
        Ok(())
    }

    fn expect_submitting(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.phase == Phase::Submitting {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                phase: self.phase,
            })
        }
    }
}
