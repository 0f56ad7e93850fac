use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use exam_core::model::{MaterialId, TestSession};
use exam_core::Clock;

use super::controller::TestSessionController;
use crate::backend::{ApiConfig, HttpExamApi, SubmissionSink, TestDataSource};
use crate::error::ControllerError;
use crate::notifier::{LogNotifier, SessionNotifier};

/// Where countdown ticks come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSource {
    /// The controller runs its own ticker with this period.
    Interval(Duration),
    /// The caller invokes `TestSessionController::tick` itself.
    Manual,
}

/// Per-attempt runtime settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub tick_source: TickSource,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_source: TickSource::Interval(Duration::from_secs(1)),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn with_tick_interval(mut self, period: Duration) -> Self {
        self.tick_source = TickSource::Interval(period);
        self
    }

    #[must_use]
    pub fn manual_ticks(mut self) -> Self {
        self.tick_source = TickSource::Manual;
        self
    }
}

/// Loads tests and hands out one controller per attempt.
#[derive(Clone)]
pub struct ExamService {
    source: Arc<dyn TestDataSource>,
    submissions: Arc<dyn SubmissionSink>,
    notifier: Arc<dyn SessionNotifier>,
    clock: Clock,
    config: SessionConfig,
}

impl ExamService {
    #[must_use]
    pub fn new(source: Arc<dyn TestDataSource>, submissions: Arc<dyn SubmissionSink>) -> Self {
        Self {
            source,
            submissions,
            notifier: Arc::new(LogNotifier),
            clock: Clock::default(),
            config: SessionConfig::default(),
        }
    }

    /// Service talking to the REST backend described by `config`.
    #[must_use]
    pub fn http(config: ApiConfig) -> Self {
        let api = Arc::new(HttpExamApi::new(config));
        Self::new(api.clone(), api)
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn SessionNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Fetch the test and create a controller in the not-started phase.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::NotFound` when there is no usable test,
    /// `ControllerError::Unauthorized` on 401/403, and `ControllerError::LoadFailed`
    /// for transport or data errors.
    pub async fn load(&self, material_id: MaterialId) -> Result<TestSessionController, ControllerError> {
        let definition = self.source.fetch_test(&material_id).await.map_err(|err| {
            warn!("loading test {material_id} failed: {err}");
            ControllerError::from_load(err)
        })?;

        info!(
            "test {material_id} ready: {:?}, {} questions, already submitted: {}",
            definition.title(),
            definition.questions().len(),
            definition.already_submitted()
        );

        Ok(TestSessionController::new(
            TestSession::new(definition),
            Arc::clone(&self.submissions),
            Arc::clone(&self.notifier),
            self.clock,
            self.config.tick_source,
        ))
    }
}
