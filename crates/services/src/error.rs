//! Shared error types for the services crate.

use reqwest::StatusCode;
use thiserror::Error;

use exam_core::model::{DefinitionError, SessionError};

/// Errors emitted by the backend collaborators (HTTP or in-memory).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("request was not authorized")]
    Unauthorized,
    #[error("test data not found")]
    NotFound,
    #[error("request failed with status {0}")]
    HttpStatus(StatusCode),
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid test data: {0}")]
    InvalidData(#[from] exam_core::Error),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    /// Map a non-success HTTP status onto the error taxonomy.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized,
            StatusCode::NOT_FOUND => Self::NotFound,
            other => Self::HttpStatus(other),
        }
    }

    fn means_missing_test(&self) -> bool {
        match self {
            Self::NotFound => true,
            Self::InvalidData(exam_core::Error::Definition(err)) => err.is_missing(),
            _ => false,
        }
    }
}

impl From<DefinitionError> for ApiError {
    fn from(err: DefinitionError) -> Self {
        Self::InvalidData(err.into())
    }
}

/// Errors surfaced by `ExamService` and `TestSessionController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControllerError {
    #[error("test not found")]
    NotFound,
    #[error("not authorized to take this test")]
    Unauthorized,
    #[error("could not load test: {0}")]
    LoadFailed(#[source] ApiError),
    #[error(transparent)]
    InvalidState(SessionError),
    #[error(transparent)]
    InvalidArgument(SessionError),
    #[error("submission failed: {0}")]
    SubmissionFailed(#[source] ApiError),
}

impl ControllerError {
    /// Classify a failure of the test-data fetch.
    #[must_use]
    pub fn from_load(err: ApiError) -> Self {
        if err.means_missing_test() {
            return Self::NotFound;
        }
        match err {
            ApiError::Unauthorized => Self::Unauthorized,
            other => Self::LoadFailed(other),
        }
    }

    /// Plain-language message suitable for showing to the student.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound => "This test could not be found. Reload the page to try again.",
            Self::Unauthorized => "Your login has expired. Please sign in again.",
            Self::LoadFailed(_) => "The test could not be loaded. Please try again in a moment.",
            Self::InvalidState(SessionError::AlreadySubmitted) => {
                "You have already completed this test."
            }
            Self::InvalidState(_) => "That action is not available right now.",
            Self::InvalidArgument(_) => "That question does not exist.",
            Self::SubmissionFailed(_) => {
                "Your answers could not be submitted. Check your connection and submit again."
            }
        }
    }

    /// Whether the student can recover by retrying the same action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SubmissionFailed(_) | Self::LoadFailed(_))
    }
}

impl From<SessionError> for ControllerError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::IndexOutOfRange { .. } => Self::InvalidArgument(err),
            other => Self::InvalidState(other),
        }
    }
}
