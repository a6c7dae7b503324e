//! Time utilities for Pick N Brain
//!
//! Session expiry and quota windows are computed against a [`Clock`] so that
//! tests can drive time explicitly with a [`ManualClock`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Duration;

use crate::error::ConfigError;

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    /// Current time in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Create a clock frozen at the current system time
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        let mut now = self.now.lock();
        *now += delta;
    }

    /// Jump the clock to an absolute time
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Convert a configured duration into a chrono duration.
///
/// Fails for durations too large to add to the current time.
pub fn to_chrono(duration: Duration) -> Result<chrono::Duration, ConfigError> {
    let out_of_range = || ConfigError::Invalid(format!("duration {:?} is out of range", duration));
    let delta = chrono::Duration::from_std(duration).map_err(|_| out_of_range())?;
    Utc::now().checked_add_signed(delta).ok_or_else(out_of_range)?;
    Ok(delta)
}

/// Format a timestamp the way API responses carry it
pub fn format_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
