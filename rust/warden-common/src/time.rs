//! Time utilities.
//!
//! Key expiries are computed relative to a [`Clock`] so that callers (and
//! tests) can pin "now" to a known instant.

pub use chrono::{DateTime, Duration, Utc};

/// Returns the current system time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// A source of the current time.
pub trait Clock: crate::ConditionalSync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        now()
    }
}

/// A [`Clock`] that only moves when told to.
#[cfg(any(test, feature = "helpers"))]
#[derive(Debug)]
pub struct FixedClock(crate::SharedCell<DateTime<Utc>>);

#[cfg(any(test, feature = "helpers"))]
impl FixedClock {
    /// Create a clock frozen at `instant`.
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(crate::SharedCell::new(instant))
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut instant = self.0.write();
        *instant += duration;
    }

    /// Set the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.0.write() = instant;
    }
}

#[cfg(any(test, feature = "helpers"))]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.read()
    }
}
