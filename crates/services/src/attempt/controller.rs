use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;

use exam_core::model::{
    AttemptReview, MaterialId, Phase, Question, SessionError, SessionProgress, SubmitTrigger,
    TestSession, Tick,
};
use exam_core::time::{format_countdown, is_low_time};
use exam_core::Clock;

use super::ticker::{self, TickerHandle};
use super::workflow::TickSource;
use crate::backend::SubmissionSink;
use crate::error::{ApiError, ControllerError};
use crate::notifier::SessionNotifier;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of a `submit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// This call sent the answers and the server accepted them.
    Submitted,
    /// A submission was already in flight or done; nothing was sent.
    Ignored,
}

/// Handle to the automatic submission scheduled by an expiring tick.
#[derive(Debug)]
pub struct AutoSubmission(JoinHandle<Result<SubmitOutcome, ControllerError>>);

impl AutoSubmission {
    /// Wait for the automatic submission to finish.
    ///
    /// # Errors
    ///
    /// Returns the submission's `ControllerError`, or `SubmissionFailed` if the task was
    /// cancelled.
    pub async fn outcome(self) -> Result<SubmitOutcome, ControllerError> {
        match self.0.await {
            Ok(result) => result,
            Err(join_err) => Err(ControllerError::SubmissionFailed(ApiError::Unavailable(
                join_err.to_string(),
            ))),
        }
    }
}

/// Result of a `tick` call.
#[derive(Debug)]
pub enum TickOutcome {
    Running { remaining_secs: u32 },
    /// Time ran out on this tick and an automatic submission was scheduled.
    Expired(AutoSubmission),
    Idle,
}

/// What the view should offer right after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryView {
    /// A fresh attempt: show the start prompt.
    StartPrompt,
    /// The student already completed this test: read-only results only.
    Results(AttemptReview),
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

pub(crate) struct Inner {
    session: Mutex<TestSession>,
    ticker: Mutex<Option<TickerHandle>>,
    ticker_generation: AtomicU64,
    submissions: Arc<dyn SubmissionSink>,
    notifier: Arc<dyn SessionNotifier>,
    clock: Clock,
    tick_source: TickSource,
}

/// Owns one attempt: countdown, answers, navigation and the submission lifecycle.
///
/// Cloning yields another handle to the same attempt. Every callback (ticker,
/// automatic submission) reads the live session through the handle, never a
/// snapshot.
#[derive(Clone)]
pub struct TestSessionController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TestSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSessionController").finish_non_exhaustive()
    }
}

/// Non-owning handle held by the ticker so it never keeps an attempt alive.
#[derive(Clone)]
pub(crate) struct WeakController(Weak<Inner>);

impl WeakController {
    pub(crate) fn upgrade(&self) -> Option<TestSessionController> {
        self.0.upgrade().map(|inner| TestSessionController { inner })
    }
}

impl TestSessionController {
    pub(crate) fn new(
        session: TestSession,
        submissions: Arc<dyn SubmissionSink>,
        notifier: Arc<dyn SessionNotifier>,
        clock: Clock,
        tick_source: TickSource,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                ticker: Mutex::new(None),
                ticker_generation: AtomicU64::new(0),
                submissions,
                notifier,
                clock,
                tick_source,
            }),
        }
    }

    fn session(&self) -> MutexGuard<'_, TestSession> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ticker_slot(&self) -> MutexGuard<'_, Option<TickerHandle>> {
        self.inner
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn downgrade(&self) -> WeakController {
        WeakController(Arc::downgrade(&self.inner))
    }

    /// Log a refused transition and classify it.
    fn rejected(operation: &str, material_id: &MaterialId, err: SessionError) -> ControllerError {
        warn!("{operation} rejected for {material_id}: {err}");
        ControllerError::from(err)
    }

    // ─── Read side ────────────────────────────────────────────────────────────

    /// Run `f` against the live session.
    pub fn with_session<R>(&self, f: impl FnOnce(&TestSession) -> R) -> R {
        f(&self.session())
    }

    #[must_use]
    pub fn material_id(&self) -> MaterialId {
        self.session().material_id().clone()
    }

    #[must_use]
    pub fn title(&self) -> String {
        self.session().definition().title().to_owned()
    }

    #[must_use]
    pub fn description(&self) -> String {
        self.session().definition().description().to_owned()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.session().phase()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.session().remaining_secs()
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn remaining_display(&self) -> String {
        format_countdown(self.remaining_secs())
    }

    /// Whether the countdown should be shown as a warning. Only meaningful in progress.
    #[must_use]
    pub fn is_low_time(&self) -> bool {
        let session = self.session();
        session.phase() == Phase::InProgress && is_low_time(session.remaining_secs())
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.session().current_index()
    }

    #[must_use]
    pub fn current_question(&self) -> Question {
        self.session().current_question().clone()
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.session().questions().len()
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<String> {
        self.session().answer(index).map(str::to_owned)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        self.session().progress()
    }

    #[must_use]
    pub fn entry(&self) -> EntryView {
        match self.session().review() {
            Some(review) => EntryView::Results(review),
            None => EntryView::StartPrompt,
        }
    }

    // ─── Transitions ──────────────────────────────────────────────────────────

    /// Start the attempt and, unless ticks are driven externally, the countdown ticker.
    ///
    /// With an interval tick source this spawns a task, so it must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::InvalidState` if already started or previously submitted.
    pub fn start(&self) -> Result<(), ControllerError> {
        let now = self.inner.clock.now();
        let (material_id, duration) = {
            let mut session = self.session();
            if let Err(err) = session.start(now) {
                return Err(Self::rejected("start", session.material_id(), err));
            }
            (session.material_id().clone(), session.remaining_secs())
        };

        info!("attempt on {material_id} started with {duration} seconds");
        self.spawn_ticker();
        Ok(())
    }

    /// Deduct one second. When this takes the countdown to zero the student is
    /// notified and exactly one automatic submission is scheduled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn tick(&self) -> TickOutcome {
        let tick = self.session().tick();
        match tick {
            Tick::Running { remaining_secs } => TickOutcome::Running { remaining_secs },
            Tick::Idle => TickOutcome::Idle,
            Tick::Expired => {
                let material_id = self.material_id();
                info!("time is up for {material_id}");
                self.inner.notifier.auto_submit_notice(&material_id);

                let controller = self.clone();
                let task =
                    tokio::spawn(async move { controller.submit(SubmitTrigger::Automatic).await });
                TickOutcome::Expired(AutoSubmission(task))
            }
        }
    }

    /// Record the answer for question `index`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::InvalidState` outside an active attempt and
    /// `ControllerError::InvalidArgument` for an unknown index.
    pub fn set_answer(&self, index: usize, value: impl Into<String>) -> Result<(), ControllerError> {
        let mut session = self.session();
        session
            .set_answer(index, value)
            .map_err(|err| Self::rejected("answer", session.material_id(), err))
    }

    /// Answer the question currently shown.
    ///
    /// # Errors
    ///
    /// Same as `set_answer`.
    pub fn answer_current(&self, value: impl Into<String>) -> Result<(), ControllerError> {
        let mut session = self.session();
        let index = session.current_index();
        session
            .set_answer(index, value)
            .map_err(|err| Self::rejected("answer", session.material_id(), err))
    }

    /// Jump to question `index`, clamped into range. Returns the selected index.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::InvalidState` once the attempt is submitted.
    pub fn set_current_index(&self, index: i64) -> Result<usize, ControllerError> {
        let mut session = self.session();
        session
            .set_current_index(index)
            .map_err(|err| Self::rejected("navigation", session.material_id(), err))
    }

    /// Move the question pointer by `delta`, clamped into range.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::InvalidState` once the attempt is submitted.
    pub fn step(&self, delta: i64) -> Result<usize, ControllerError> {
        let mut session = self.session();
        let current = i64::try_from(session.current_index()).unwrap_or(i64::MAX);
        session
            .set_current_index(current.saturating_add(delta))
            .map_err(|err| Self::rejected("navigation", session.material_id(), err))
    }

    /// Submit the answers. At most one request is in flight per attempt; calls made
    /// while one is pending, or after success, return `SubmitOutcome::Ignored`.
    ///
    /// Manual callers must have confirmed with the student beforehand.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::InvalidState` before `start`, and
    /// `ControllerError::SubmissionFailed` when the server rejects the answers; the
    /// attempt is then back in progress and can be submitted again.
    pub async fn submit(&self, trigger: SubmitTrigger) -> Result<SubmitOutcome, ControllerError> {
        let (material_id, sheet) = {
            let mut session = self.session();
            let sheet = session
                .begin_submission(trigger)
                .map_err(|err| Self::rejected("submit", session.material_id(), err))?;
            (session.material_id().clone(), sheet)
        };
        let Some(sheet) = sheet else {
            debug!("submission for {material_id} already in flight or done; ignoring {trigger:?}");
            return Ok(SubmitOutcome::Ignored);
        };

        self.stop_ticker();
        info!(
            "submitting {material_id}: {}/{} answered ({trigger:?})",
            sheet.answered(),
            sheet.entries.len()
        );

        match self
            .inner
            .submissions
            .submit_answers(&material_id, &sheet)
            .await
        {
            Ok(()) => {
                self.session().finish_submission(self.inner.clock.now())?;
                self.inner.notifier.submitted(&material_id, trigger);
                Ok(SubmitOutcome::Submitted)
            }
            Err(err) => {
                error!("submission for {material_id} failed: {err}");
                let remaining = {
                    let mut session = self.session();
                    session.abort_submission()?;
                    session.remaining_secs()
                };
                if remaining > 0 {
                    self.spawn_ticker();
                }

                let err = ControllerError::SubmissionFailed(err);
                self.inner
                    .notifier
                    .submission_failed(&material_id, err.user_message());
                Err(err)
            }
        }
    }

    /// Whether the internal ticker is currently armed.
    #[must_use]
    pub fn ticker_running(&self) -> bool {
        self.ticker_slot().is_some()
    }

    fn spawn_ticker(&self) {
        let TickSource::Interval(period) = self.inner.tick_source else {
            return;
        };
        let generation = self.inner.ticker_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let handle = ticker::spawn(self.downgrade(), period, generation);
        if let Some(previous) = self.ticker_slot().replace(handle) {
            previous.shutdown();
        }
    }

    /// Called by a ticker task on exit. Clears the slot only if it still holds
    /// that task, so a newer ticker is left alone.
    pub(crate) fn ticker_finished(&self, generation: u64) {
        let mut slot = self.ticker_slot();
        if slot.as_ref().is_some_and(|h| h.generation() == generation) {
            debug!("countdown ticker {generation} exited");
            *slot = None;
        }
    }

    fn stop_ticker(&self) {
        let handle = self.ticker_slot().take();
        if let Some(handle) = handle {
            handle.shutdown();
        }
    }
}
