use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use dca_db::Clock;

/// Test clock. Every read advances by one millisecond so records created in
/// sequence have distinct, ordered timestamps.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, t: DateTime<Utc>) {
        *self.guard() = t;
    }

    pub fn advance(&self, by: Duration) {
        *self.guard() += by;
    }

    /// Current reading without ticking.
    pub fn peek(&self) -> DateTime<Utc> {
        *self.guard()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A panicking test thread must not wedge the others.
        self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut t = self.guard();
        *t += Duration::milliseconds(1);
        *t
    }
}
