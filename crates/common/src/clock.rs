//! Wall-clock timing for recording sessions.
//!
//! `std::time::Instant` is unavailable on `wasm32-unknown-unknown`, so the
//! recording clock is anchored to a `chrono` UTC timestamp instead. The
//! browser build reads it through `Date.now()` via chrono's `wasmbind`.

use chrono::{DateTime, Duration, Utc};

/// A clock anchored to the moment a recording started.
#[derive(Debug, Clone)]
pub struct RecordingClock {
    epoch: DateTime<Utc>,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self { epoch: Utc::now() }
    }

    /// Create a clock from a known epoch.
    pub fn from_epoch(epoch: DateTime<Utc>) -> Self {
        Self { epoch }
    }

    /// Wall-clock time at recording start.
    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Time elapsed between the epoch and `now`, clamped at zero.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.epoch).max(Duration::zero())
    }

    /// Time elapsed since recording start.
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Utc::now())
    }

    /// Seconds elapsed since recording start.
    pub fn elapsed_secs(&self) -> f64 {
        duration_secs(self.elapsed())
    }
}

/// Convert a chrono duration to fractional seconds.
pub fn duration_secs(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

/// Format a duration as `mm:ss` for recording indicators.
pub fn format_elapsed(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!("{:02}:{:02}", total / 60, total % 60)
}
