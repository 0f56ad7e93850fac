mod controller;
mod ticker;
mod workflow;

// Public API of the attempt subsystem.
pub use crate::error::ControllerError;
pub use controller::{AutoSubmission, EntryView, SubmitOutcome, TestSessionController, TickOutcome};
pub use workflow::{ExamService, SessionConfig, TickSource};
