//! Identity provider contract.
//!
//! The provider is the external service that checks credentials and issues
//! sessions. The core never looks inside tokens; it only asks the provider
//! for sessions and listens to its change feed.

use std::future::Future;

use curio_types::{AuthChange, ProviderError, Session};
use tokio::sync::broadcast;

/// Capacity of the change feed; a subscriber that falls this far behind
/// skips ahead.
const CHANGE_FEED_CAPACITY: usize = 32;

pub trait IdentityProvider: Send + Sync + 'static {
    fn sign_in_with_password(
        &self,
        identifier: &str,
        secret: &str,
    ) -> impl Future<Output = Result<Session, ProviderError>> + Send;

    /// Invalidates the current session remotely and forgets it locally.
    fn sign_out(&self) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// The provider's current session, if any (restored at startup when the
    /// provider persists sessions).
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, ProviderError>> + Send;

    fn refresh_session(&self) -> impl Future<Output = Result<Session, ProviderError>> + Send;

    fn reset_password_for_email(
        &self,
        identifier: &str,
        redirect_to: &str,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Subscribes to session-change notifications. Dropping the returned
    /// subscription unsubscribes.
    fn on_auth_state_change(&self) -> AuthSubscription;
}

/// Sending half of a provider's change feed.
#[derive(Debug, Clone)]
pub struct AuthChannel {
    tx: broadcast::Sender<AuthChange>,
}

impl Default for AuthChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthChannel {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { tx }
    }

    /// Delivers `change` to every live subscription. No subscribers is fine.
    pub fn emit(&self, change: AuthChange) {
        let _ = self.tx.send(change);
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiving half of a change feed subscription.
#[derive(Debug)]
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthChange>,
}

impl AuthSubscription {
    /// Next change, or `None` once the provider is gone.
    ///
    /// Changes are delivered in order, including ones emitted before the
    /// caller started waiting.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "auth change feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
