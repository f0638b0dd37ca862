//! Auth controller.
//!
//! Mediates every authentication state change: sign-in (behind the login
//! throttle), sign-out, password-reset requests, the provider's change feed,
//! and the periodic expiry monitor. It is the only writer of the
//! [`SessionStore`].
//!
//! ## Lifecycle
//!
//! ```text
//! start()
//!   ├── subscribe to provider change feed   (first, so nothing is missed)
//!   ├── spawn listener: get_session -> finish_loading, then apply changes
//!   └── spawn monitor:  every interval -> check_session_expiry
//! AuthScope dropped / shutdown()
//!   └── cancel both tasks, drop the subscription
//! ```

mod monitor;

use std::sync::Arc;
use std::time::Duration;

use curio_types::{
    AuthChange, AuthChangeKind, AuthError, Identity, Notice, ProviderErrorKind, Route, Session,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use monitor::ExpiryCheck;

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::provider::{AuthSubscription, IdentityProvider};
use crate::storage::TabStorage;
use crate::store::{SessionEnd, SessionStore};
use crate::surface::{Navigator, Notifier};
use crate::throttle::LoginThrottle;

const RESET_SENT_MESSAGE: &str =
    "If an account exists for this address, a password reset link has been sent.";

/// Tunables for the controller, usually derived from [`AuthConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub max_login_attempts: u32,
    pub lockout_window: Duration,
    pub monitor_interval: Duration,
    pub refresh_window: Duration,
    /// Where password-reset emails send the user back to.
    pub reset_redirect: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for AuthSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            max_login_attempts: config.max_login_attempts,
            lockout_window: config.lockout_window(),
            monitor_interval: config.monitor_interval(),
            refresh_window: config.refresh_window(),
            reset_redirect: config.reset_redirect(),
        }
    }
}

/// Capabilities injected into the controller.
pub struct AuthDeps {
    pub storage: Arc<dyn TabStorage>,
    pub clock: Arc<dyn Clock>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct AuthController<P: IdentityProvider> {
    provider: Arc<P>,
    store: Arc<SessionStore>,
    throttle: LoginThrottle,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    settings: AuthSettings,
}

impl<P: IdentityProvider> AuthController<P> {
    pub fn new(provider: Arc<P>, deps: AuthDeps, settings: AuthSettings) -> Self {
        let throttle = LoginThrottle::new(
            deps.storage,
            Arc::clone(&deps.clock),
            settings.max_login_attempts,
            settings.lockout_window,
        );
        Self {
            provider,
            store: Arc::new(SessionStore::new()),
            throttle,
            clock: deps.clock,
            navigator: deps.navigator,
            notifier: deps.notifier,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn throttle(&self) -> &LoginThrottle {
        &self.throttle
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.store.current_identity()
    }

    pub fn is_session_loading(&self) -> bool {
        self.store.is_loading()
    }

    /// Starts the change listener and the expiry monitor.
    ///
    /// Must be called inside a tokio runtime. The subscription is taken
    /// before the initial session query is issued.
    pub fn start(self: &Arc<Self>) -> AuthScope {
        let cancel = CancellationToken::new();
        let subscription = self.provider.on_auth_state_change();

        let listener = tokio::spawn({
            let this = Arc::clone(self);
            let cancel = cancel.clone();
            async move { this.run_listener(subscription, cancel).await }
        });
        let monitor = tokio::spawn({
            let this = Arc::clone(self);
            let cancel = cancel.clone();
            async move { this.run_monitor(cancel).await }
        });

        AuthScope {
            cancel,
            tasks: vec![listener, monitor],
        }
    }

    /// Signs in with the provider, subject to the login throttle.
    ///
    /// Emits exactly one notice on failure. On success the attempt counter
    /// for `identifier` is cleared and the user is sent to the admin area.
    pub async fn sign_in(&self, identifier: &str, secret: &str) -> Result<Session, AuthError> {
        let result = self.try_sign_in(identifier, secret).await;
        if let Err(err) = &result {
            self.notifier.notify(err.notice());
        }
        result
    }

    async fn try_sign_in(&self, identifier: &str, secret: &str) -> Result<Session, AuthError> {
        self.throttle.check(identifier)?;

        match self.provider.sign_in_with_password(identifier, secret).await {
            Ok(session) => {
                self.throttle.reset(identifier);
                self.store.replace_session(Some(session.clone()));
                tracing::info!(user_id = %session.identity.id, "signed in");
                self.navigator.navigate(Route::Admin);
                Ok(session)
            }
            Err(err) => match err.kind {
                ProviderErrorKind::Unavailable | ProviderErrorKind::Parse => {
                    tracing::warn!(error = %err, "sign-in failed: provider unavailable");
                    Err(AuthError::ProviderUnavailable(err.message))
                }
                ProviderErrorKind::InvalidCredentials | ProviderErrorKind::Rejected => {
                    self.throttle.record_failure(identifier);
                    tracing::info!(kind = %err.kind, "sign-in rejected");
                    Err(AuthError::InvalidCredentials)
                }
            },
        }
    }

    /// Signs out. Local state is always cleared, even when the remote
    /// invalidation fails.
    pub async fn sign_out(&self) {
        self.end_session(SessionEnd::SignedOut).await;
    }

    /// The store is cleared before the provider is told, so its change
    /// notification finds nothing left to remove.
    async fn end_session(&self, reason: SessionEnd) {
        self.store.end(reason);
        if let Err(err) = self.provider.sign_out().await {
            tracing::warn!(error = %err, "remote sign-out failed; local session already cleared");
        }
        self.navigator.navigate(Route::Home);
    }

    /// Asks the provider to email a reset link. Does not touch the throttle.
    pub async fn reset_password_request(&self, identifier: &str) -> Result<(), AuthError> {
        let result = self
            .provider
            .reset_password_for_email(identifier, &self.settings.reset_redirect)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "password reset request failed");
                match err.kind {
                    ProviderErrorKind::Unavailable | ProviderErrorKind::Parse => {
                        AuthError::ProviderUnavailable(err.message)
                    }
                    ProviderErrorKind::InvalidCredentials | ProviderErrorKind::Rejected => {
                        AuthError::ResetRequestFailed
                    }
                }
            });

        match &result {
            Ok(()) => self.notifier.notify(Notice::success(RESET_SENT_MESSAGE)),
            Err(err) => self.notifier.notify(err.notice()),
        }
        result
    }

    /// Sign-in view helper: an already signed-in user goes straight to the
    /// admin area. Returns whether a redirect happened.
    pub fn redirect_if_signed_in(&self) -> bool {
        if self.store.current_session().is_some() {
            self.navigator.navigate(Route::Admin);
            true
        } else {
            false
        }
    }

    async fn run_listener(&self, mut subscription: AuthSubscription, cancel: CancellationToken) {
        let initial = tokio::select! {
            () = cancel.cancelled() => return,
            result = self.provider.get_session() => result,
        };
        let session = initial.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "initial session check failed; treating as signed out");
            None
        });
        tracing::debug!(restored = session.is_some(), "initial session check resolved");
        self.store.finish_loading(session);

        loop {
            let change = tokio::select! {
                () = cancel.cancelled() => break,
                change = subscription.recv() => change,
            };
            let Some(change) = change else {
                tracing::debug!("provider change feed closed");
                break;
            };
            self.apply_change(change);
        }
    }

    fn apply_change(&self, change: AuthChange) {
        if change.kind == AuthChangeKind::TokenRefreshed {
            tracing::info!("token has been refreshed");
        } else {
            tracing::debug!(kind = ?change.kind, "auth state changed");
        }
        self.store.replace_session(change.session);
    }
}

/// Owns the controller's background tasks. Dropping it cancels them.
#[derive(Debug)]
pub struct AuthScope {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl AuthScope {
    /// Cancels the background tasks and waits for them to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "auth task ended abnormally");
            }
        }
    }
}

impl Drop for AuthScope {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
