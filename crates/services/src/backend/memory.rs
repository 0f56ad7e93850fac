use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use exam_core::model::{AnswerSheet, MaterialId, TestDefinition};

use super::{SubmissionSink, TestDataSource};
use crate::error::ApiError;

/// In-process backend for tests, demos and offline use.
///
/// Every submission request is recorded before it is answered, so callers can
/// count requests even while they are held open by a gate.
#[derive(Clone, Default)]
pub struct InMemoryExamBackend {
    tests: Arc<Mutex<HashMap<MaterialId, TestDefinition>>>,
    denied: Arc<Mutex<HashSet<MaterialId>>>,
    requests: Arc<Mutex<Vec<(MaterialId, AnswerSheet)>>>,
    accepted: Arc<Mutex<Vec<(MaterialId, AnswerSheet)>>>,
    failures_left: Arc<Mutex<u32>>,
    latency: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
}

impl InMemoryExamBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every submission by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Hold every submission until a permit is added to `gate`.
    #[must_use]
    pub fn with_submit_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Register a test definition under its material id.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unavailable` if the backend state is poisoned.
    pub fn insert_test(&self, definition: TestDefinition) -> Result<(), ApiError> {
        let mut guard = lock(&self.tests)?;
        guard.insert(definition.material_id().clone(), definition);
        Ok(())
    }

    /// Make fetches of `material_id` fail as unauthorized.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unavailable` if the backend state is poisoned.
    pub fn deny(&self, material_id: MaterialId) -> Result<(), ApiError> {
        lock(&self.denied)?.insert(material_id);
        Ok(())
    }

    /// Fail the next `count` submissions with a 503.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unavailable` if the backend state is poisoned.
    pub fn fail_next_submissions(&self, count: u32) -> Result<(), ApiError> {
        *lock(&self.failures_left)? = count;
        Ok(())
    }

    /// Every submission request received, including failed and pending ones.
    #[must_use]
    pub fn requests(&self) -> Vec<(MaterialId, AnswerSheet)> {
        lock(&self.requests).map(|g| g.clone()).unwrap_or_default()
    }

    /// Submissions that were accepted.
    #[must_use]
    pub fn accepted(&self) -> Vec<(MaterialId, AnswerSheet)> {
        lock(&self.accepted).map(|g| g.clone()).unwrap_or_default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, ApiError> {
    mutex
        .lock()
        .map_err(|e| ApiError::Unavailable(e.to_string()))
}

#[async_trait]
impl TestDataSource for InMemoryExamBackend {
    async fn fetch_test(&self, material_id: &MaterialId) -> Result<TestDefinition, ApiError> {
        if lock(&self.denied)?.contains(material_id) {
            return Err(ApiError::Unauthorized);
        }
        lock(&self.tests)?
            .get(material_id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }
}

#[async_trait]
impl SubmissionSink for InMemoryExamBackend {
    async fn submit_answers(
        &self,
        material_id: &MaterialId,
        sheet: &AnswerSheet,
    ) -> Result<(), ApiError> {
        lock(&self.requests)?.push((material_id.clone(), sheet.clone()));

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| ApiError::Unavailable(e.to_string()))?;
            permit.forget();
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        {
            let mut failures = lock(&self.failures_left)?;
            if *failures > 0 {
                *failures -= 1;
                return Err(ApiError::HttpStatus(StatusCode::SERVICE_UNAVAILABLE));
            }
        }

        lock(&self.accepted)?.push((material_id.clone(), sheet.clone()));
        Ok(())
    }
}
