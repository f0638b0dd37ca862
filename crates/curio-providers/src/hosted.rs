//! Hosted identity provider (GoTrue-style REST auth API).
//!
//! Endpoints, relative to the configured base URL:
//! - `POST /auth/v1/token?grant_type=password`       `{email, password}`
//! - `POST /auth/v1/token?grant_type=refresh_token`  `{refresh_token}`
//! - `POST /auth/v1/logout`                          bearer access token
//! - `POST /auth/v1/recover?redirect_to=...`         `{email}`
//!
//! Every request carries the public `apikey` header. The current session is
//! mirrored to a [`SessionFile`] so the next process starts signed in.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use curio_core::clock::{Clock, SystemClock};
use curio_core::config::AuthConfig;
use curio_core::{AuthChannel, AuthSubscription, IdentityProvider};
use curio_types::{
    AuthChange, AuthChangeKind, Identity, ProviderError, ProviderErrorKind, Session,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::session_file::SessionFile;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Used when the token response carries neither `expires_at` nor `expires_in`.
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> Session {
        let expires_at = self.expires_at.unwrap_or_else(|| {
            now.saturating_add(self.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS))
        });
        Session {
            identity: Identity {
                id: self.user.id,
                email: self.user.email,
            },
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

pub struct HostedAuthProvider {
    client: reqwest::Client,
    base_url: Url,
    anon_key: String,
    file: SessionFile,
    current: Mutex<Option<Session>>,
    changes: AuthChannel,
    clock: Arc<dyn Clock>,
}

impl HostedAuthProvider {
    /// Builds a provider for `config`, restoring any session persisted at
    /// `session_path`.
    pub fn new(config: &AuthConfig, session_path: impl Into<PathBuf>) -> Result<Self> {
        let base_url = Url::parse(config.url.trim())
            .with_context(|| format!("Invalid auth URL '{}'", config.url))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        let file = SessionFile::new(session_path);
        let restored = file.load().unwrap_or_else(|err| {
            tracing::warn!(error = %format!("{err:#}"), "ignoring unreadable persisted session");
            None
        });
        if let Some(session) = &restored {
            tracing::debug!(user_id = %session.identity.id, "restored persisted session");
        }

        Ok(Self {
            client,
            base_url,
            anon_key: config.anon_key.clone(),
            file,
            current: Mutex::new(restored),
            changes: AuthChannel::new(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the clock used to turn `expires_in` into an expiry instant.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/auth/v1/{path}",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    fn current(&self) -> Option<Session> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stores the session in memory and on disk. Disk failures are logged,
    /// not returned.
    fn store(&self, session: Option<Session>) {
        let persisted = match &session {
            Some(session) => self.file.save(session),
            None => self.file.clear().map(|_| ()),
        };
        if let Err(err) = persisted {
            tracing::warn!(error = %format!("{err:#}"), "failed to persist session");
        }
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = session;
    }

    async fn send(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut request = self
            .client
            .post(self.endpoint(path))
            .query(query)
            .header("apikey", &self.anon_key)
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        request.send().await.map_err(|err| {
            ProviderError::unavailable(format!("Request to auth service failed: {err}"))
        })
    }

    /// Sends and fails on any non-2xx status.
    async fn post(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self.send(path, query, body, bearer).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(ProviderError::http_status(status.as_u16(), &text))
    }

    async fn decode_session(&self, response: reqwest::Response) -> Result<Session, ProviderError> {
        let token: TokenResponse = response.json().await.map_err(|err| {
            ProviderError::parse(format!("Failed to parse token response: {err}"))
        })?;
        Ok(token.into_session(self.clock.now().timestamp()))
    }
}

/// Statuses the auth API uses to refuse a password grant.
fn is_credential_refusal(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY
    )
}

impl IdentityProvider for HostedAuthProvider {
    async fn sign_in_with_password(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<Session, ProviderError> {
        let body = json!({ "email": identifier, "password": secret });
        let response = self
            .send("token", &[("grant_type", "password")], &body, None)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let mut err = ProviderError::http_status(status.as_u16(), &text);
            if is_credential_refusal(status) {
                err.kind = ProviderErrorKind::InvalidCredentials;
            }
            return Err(err);
        }
        let session = self.decode_session(response).await?;

        self.store(Some(session.clone()));
        self.changes
            .emit(AuthChange::new(AuthChangeKind::SignedIn, Some(session.clone())));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let Some(session) = self.current() else {
            // Still wipe the file in case another process left one behind.
            self.store(None);
            return Ok(());
        };

        let remote = self
            .post("logout", &[], &json!({}), Some(&session.access_token))
            .await
            .map(|_| ());

        self.store(None);
        self.changes
            .emit(AuthChange::new(AuthChangeKind::SignedOut, None));
        remote
    }

    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        Ok(self.current())
    }

    async fn refresh_session(&self) -> Result<Session, ProviderError> {
        let Some(current) = self.current() else {
            return Err(ProviderError::new(
                ProviderErrorKind::Rejected,
                "No session to refresh",
            ));
        };

        let body = json!({ "refresh_token": current.refresh_token });
        let response = self
            .post("token", &[("grant_type", "refresh_token")], &body, None)
            .await?;
        let fresh = self.decode_session(response).await?;

        self.store(Some(fresh.clone()));
        self.changes.emit(AuthChange::new(
            AuthChangeKind::TokenRefreshed,
            Some(fresh.clone()),
        ));
        Ok(fresh)
    }

    async fn reset_password_for_email(
        &self,
        identifier: &str,
        redirect_to: &str,
    ) -> Result<(), ProviderError> {
        self.post(
            "recover",
            &[("redirect_to", redirect_to)],
            &json!({ "email": identifier }),
            None,
        )
        .await
        .map(|_| ())
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.changes.subscribe()
    }
}
