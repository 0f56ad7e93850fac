//! Contracts for the two backend endpoints a test attempt depends on.

mod config;
mod dto;
mod http;
mod memory;

use async_trait::async_trait;

use exam_core::model::{AnswerSheet, MaterialId, TestDefinition};

use crate::error::ApiError;

pub use config::ApiConfig;
pub use dto::{QuestionDto, SubmissionEntryDto, TestDataResponse};
pub use http::HttpExamApi;
pub use memory::InMemoryExamBackend;

/// Source of test definitions.
#[async_trait]
pub trait TestDataSource: Send + Sync {
    /// Fetch the test and the prior-submission flag for one material.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for rejected credentials, `ApiError::NotFound`
    /// (or an empty definition) when there is no test, and transport errors otherwise.
    async fn fetch_test(&self, material_id: &MaterialId) -> Result<TestDefinition, ApiError>;
}

/// Receiver of completed answer sheets.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Send the ordered answers for grading.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for any non-success response or transport failure.
    async fn submit_answers(
        &self,
        material_id: &MaterialId,
        sheet: &AnswerSheet,
    ) -> Result<(), ApiError>;
}
