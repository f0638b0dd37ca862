//! Session-expiry monitor.
//!
//! Each tick fetches the provider's current session and compares its expiry
//! with the wall clock:
//! - already expired: forced sign-out plus a "session expired" notice
//! - expiring within the refresh window: silent refresh, "extended" notice
//!   on success, nothing on failure (a later tick catches the hard expiry)
//!
//! Failures are swallowed; the next tick tries again.

use curio_types::{AuthError, Notice};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::AuthController;
use crate::provider::IdentityProvider;
use crate::store::SessionEnd;

const SESSION_EXTENDED_MESSAGE: &str = "Your session has been extended";

/// Outcome of one expiry check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCheck {
    /// No session to watch.
    NoSession,
    /// Session valid and outside the refresh window.
    Healthy,
    /// Session was close to expiry and has been refreshed.
    Refreshed,
    /// Refresh attempted and failed; nothing else was done.
    RefreshFailed,
    /// Session had expired; the user was signed out.
    Expired,
    /// The provider could not be asked for the session.
    Unavailable,
}

impl<P: IdentityProvider> AuthController<P> {
    /// Runs one expiry check.
    pub async fn check_session_expiry(&self) -> ExpiryCheck {
        let session = match self.provider.get_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return ExpiryCheck::NoSession,
            Err(err) => {
                tracing::debug!(error = %err, "expiry check skipped: session unavailable");
                return ExpiryCheck::Unavailable;
            }
        };

        let now = self.clock.now();
        if session.is_expired(now) {
            tracing::info!(user_id = %session.identity.id, "session expired; signing out");
            self.notifier.notify(AuthError::SessionExpired.notice());
            self.end_session(SessionEnd::Expired).await;
            return ExpiryCheck::Expired;
        }

        let window = chrono::Duration::from_std(self.settings.refresh_window)
            .unwrap_or(chrono::Duration::MAX);
        if !session.expires_within(now, window) {
            return ExpiryCheck::Healthy;
        }

        match self.provider.refresh_session().await {
            Ok(fresh) => {
                tracing::info!(expires_at = fresh.expires_at, "session refreshed ahead of expiry");
                self.store.replace_session(Some(fresh));
                self.notifier.notify(Notice::info(SESSION_EXTENDED_MESSAGE));
                ExpiryCheck::Refreshed
            }
            Err(err) => {
                tracing::debug!(error = %err, "silent refresh failed");
                ExpiryCheck::RefreshFailed
            }
        }
    }

    /// Ticks every `monitor_interval` (first tick one interval after start)
    /// until cancelled.
    pub(super) async fn run_monitor(&self, cancel: CancellationToken) {
        let period = self.settings.monitor_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                () = cancel.cancelled() => break,
                outcome = self.check_session_expiry() => {
                    tracing::trace!(?outcome, "expiry check");
                }
            }
        }
        tracing::debug!("expiry monitor stopped");
    }
}
