#![forbid(unsafe_code)]

pub mod attempt;
pub mod backend;
pub mod error;
pub mod notifier;

pub use exam_core::Clock;

pub use attempt::{
    AutoSubmission, EntryView, ExamService, SessionConfig, SubmitOutcome, TestSessionController,
    TickOutcome, TickSource,
};
pub use backend::{ApiConfig, HttpExamApi, InMemoryExamBackend, SubmissionSink, TestDataSource};
pub use error::{ApiError, ControllerError};
pub use notifier::{LogNotifier, SessionNotifier};
