// SPDX-License-Identifier: MPL-2.0
//! Session clock shared by every recorder.

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Start of the current collection session.
///
/// Records carry a wall-clock timestamp plus a monotonic offset from this
/// point, so ordering survives system clock adjustments.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    started_at: Instant,
    started_at_utc: DateTime<Utc>,
}

impl SessionClock {
    #[must_use]
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
        }
    }

    /// Wall-clock time at session start.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at_utc
    }

    /// Milliseconds elapsed since session start.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Current wall-clock time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}
