use chrono::{DateTime, Duration, Utc};

/// Remaining time at or below which the countdown is shown as a warning.
pub const LOW_TIME_THRESHOLD_SECS: u32 = 300;

/// Clock used to stamp attempt start/submission times.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Moves a fixed clock forward. No effect on `Clock::System`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Formats remaining seconds as zero-padded `MM:SS`.
///
/// Minutes are not wrapped into hours, so a 90 minute test starts at `90:00`.
#[must_use]
pub fn format_countdown(remaining_secs: u32) -> String {
    format!("{:02}:{:02}", remaining_secs / 60, remaining_secs % 60)
}

/// Whether the countdown should be rendered as a low-time warning.
#[must_use]
pub fn is_low_time(remaining_secs: u32) -> bool {
    remaining_secs <= LOW_TIME_THRESHOLD_SECS
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}
