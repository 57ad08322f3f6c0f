use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

/// Clock used to stamp completion records; fixed in tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Offset of the fixed display timezone (Asia/Kolkata, UTC+05:30, no DST).
pub const DISPLAY_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Timestamps are stored in UTC and only shifted when rendered.
#[must_use]
pub fn to_display_time(value: DateTime<Utc>) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(DISPLAY_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    value.with_timezone(&offset)
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}
