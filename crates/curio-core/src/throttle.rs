//! Client-side login throttling.
//!
//! Counts consecutive failed sign-ins per identifier in tab storage. Once
//! `max_attempts` failures are recorded, further attempts are refused until
//! `lockout_window` has passed since the last failure. Each tab keeps its
//! own counters; nothing is coordinated across tabs.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use curio_types::AuthError;

use crate::clock::Clock;
use crate::storage::TabStorage;

fn attempts_key(identifier: &str) -> String {
    format!("login_attempts:{identifier}")
}

fn last_attempt_key(identifier: &str) -> String {
    format!("last_login_attempt:{identifier}")
}

pub struct LoginThrottle {
    storage: Arc<dyn TabStorage>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    lockout_window: Duration,
}

impl LoginThrottle {
    pub fn new(
        storage: Arc<dyn TabStorage>,
        clock: Arc<dyn Clock>,
        max_attempts: u32,
        lockout_window: Duration,
    ) -> Self {
        Self {
            storage,
            clock,
            max_attempts,
            lockout_window,
        }
    }

    /// Consecutive failures currently recorded for `identifier`.
    pub fn attempts(&self, identifier: &str) -> u32 {
        self.storage
            .get(&attempts_key(identifier))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Admits or refuses a sign-in attempt.
    ///
    /// A counter that reached the limit but whose window has elapsed is reset
    /// before the attempt is admitted.
    pub fn check(&self, identifier: &str) -> Result<(), AuthError> {
        if self.attempts(identifier) < self.max_attempts {
            return Ok(());
        }

        if let Some(retry_after) = self.remaining_lockout(identifier) {
            tracing::info!(
                retry_after_secs = retry_after.as_secs(),
                "sign-in refused: too many failed attempts"
            );
            return Err(AuthError::RateLimited { retry_after });
        }

        tracing::debug!("lockout window elapsed, resetting attempt counter");
        self.storage.set(&attempts_key(identifier), "0".to_string());
        Ok(())
    }

    pub fn record_failure(&self, identifier: &str) {
        let attempts = self.attempts(identifier).saturating_add(1);
        let now_ms = self.clock.now().timestamp_millis();
        self.storage.set(&attempts_key(identifier), attempts.to_string());
        self.storage.set(&last_attempt_key(identifier), now_ms.to_string());
        tracing::debug!(attempts, "recorded failed sign-in");
    }

    pub fn reset(&self, identifier: &str) {
        self.storage.remove(&attempts_key(identifier));
        self.storage.remove(&last_attempt_key(identifier));
    }

    /// Time left in the lockout window, or `None` if it has elapsed (or no
    /// failure timestamp is recorded).
    fn remaining_lockout(&self, identifier: &str) -> Option<Duration> {
        let last_ms: i64 = self
            .storage
            .get(&last_attempt_key(identifier))?
            .trim()
            .parse()
            .ok()?;
        let last = DateTime::from_timestamp_millis(last_ms)?;
        let elapsed = (self.clock.now() - last).to_std().unwrap_or(Duration::ZERO);
        self.lockout_window.checked_sub(elapsed).filter(|d| !d.is_zero())
    }
}
