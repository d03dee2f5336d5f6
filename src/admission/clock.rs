//! Wall-clock sources for the admission check

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::AdmissionError;

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> Result<DateTime<Utc>, AdmissionError>;
}

/// The system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<DateTime<Utc>, AdmissionError> {
        Ok(Utc::now())
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        if let Some(next) = chrono::Duration::from_std(by)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
        {
            *now = next;
        }
    }

    /// Jump to an absolute instant (may move backwards)
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<DateTime<Utc>, AdmissionError> {
        Ok(*self.now.lock())
    }
}
