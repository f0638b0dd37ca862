use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A signed-in principal as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned unique id.
    pub id: String,
    /// Email address used to sign in.
    #[serde(default)]
    pub email: Option<String>,
}

/// One authenticated session.
///
/// Tokens are opaque to the core; only `expires_at` is interpreted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity: Identity,
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry timestamp in seconds since epoch.
    pub expires_at: i64,
}

impl Session {
    /// Time left until expiry; negative once expired. Saturates at
    /// [`Duration::MAX`] / [`Duration::MIN`] for out-of-range timestamps.
    pub fn expires_in(&self, now: DateTime<Utc>) -> Duration {
        let secs = self.expires_at.saturating_sub(now.timestamp());
        Duration::try_seconds(secs).unwrap_or(if secs > 0 {
            Duration::MAX
        } else {
            Duration::MIN
        })
    }

    /// Returns true once `now` has reached the expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_in(now) <= Duration::zero()
    }

    /// Returns true if the session expires within `window` of `now`
    /// (and has not already expired).
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let left = self.expires_in(now);
        left > Duration::zero() && left < window
    }
}

// Hand-written so tokens never reach logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Kind of push notification emitted by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// Session-change notification: the event kind plus the session after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub kind: AuthChangeKind,
    pub session: Option<Session>,
}

impl AuthChange {
    pub fn new(kind: AuthChangeKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_expiring_at(expires_at: i64) -> Session {
        Session {
            identity: Identity {
                id: "u1".to_string(),
                email: Some("a@example.com".to_string()),
            },
            access_token: "access-secret".to_string(),
            refresh_token: "refresh-secret".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_expiry_predicates() {
        let now = DateTime::from_timestamp(1_000_000, 0).unwrap();
        let window = Duration::minutes(5);

        let healthy = session_expiring_at(now.timestamp() + 3600);
        assert!(!healthy.is_expired(now));
        assert!(!healthy.expires_within(now, window));

        let soon = session_expiring_at(now.timestamp() + 4 * 60);
        assert!(!soon.is_expired(now));
        assert!(soon.expires_within(now, window));

        let gone = session_expiring_at(now.timestamp() - 1);
        assert!(gone.is_expired(now));
        assert!(!gone.expires_within(now, window));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", session_expiring_at(0));
        assert!(!rendered.contains("access-secret"));
        assert!(!rendered.contains("refresh-secret"));
        assert!(rendered.contains("a@example.com"));
    }

    #[test]
    fn test_auth_change_kind_wire_names() {
        let json = serde_json::to_string(&AuthChangeKind::TokenRefreshed).unwrap();
        assert_eq!(json, "\"TOKEN_REFRESHED\"");
    }

    #[test]
    fn test_extreme_expiry_saturates() {
        let now = DateTime::from_timestamp(1_000_000, 0).unwrap();

        let far = session_expiring_at(10_000_000_000_000_000);
        assert_eq!(far.expires_in(now), Duration::MAX);
        assert!(!far.is_expired(now));
        assert!(!far.expires_within(now, Duration::minutes(5)));

        let never = session_expiring_at(i64::MAX);
        assert!(!never.is_expired(now));

        let ancient = session_expiring_at(i64::MIN);
        assert_eq!(ancient.expires_in(now), Duration::MIN);
        assert!(ancient.is_expired(now));
    }
}
