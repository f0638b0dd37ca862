use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::notice::Notice;

/// Categories of identity-provider errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The provider refused the credentials.
    InvalidCredentials,
    /// Transport failure, timeout, or 5xx.
    Unavailable,
    /// Any other refusal (4xx on a non-credential call).
    Rejected,
    /// Response body could not be decoded.
    Parse,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::InvalidCredentials => write!(f, "invalid_credentials"),
            ProviderErrorKind::Unavailable => write!(f, "unavailable"),
            ProviderErrorKind::Rejected => write!(f, "rejected"),
            ProviderErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured error from the identity provider with kind and details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    /// Error category
    pub kind: ProviderErrorKind,
    /// One-line summary suitable for logs
    pub message: String,
    /// Optional raw error body
    pub details: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ProviderErrorKind::InvalidCredentials, "invalid credentials")
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Parse, message)
    }

    /// Builds an error from a non-success HTTP response.
    ///
    /// 5xx maps to `Unavailable`, everything else to `Rejected`. The
    /// auth API reports its reason as `error_description` or `msg`.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = if status >= 500 {
            ProviderErrorKind::Unavailable
        } else {
            ProviderErrorKind::Rejected
        };
        let reason = serde_json::from_str::<Value>(body).ok().and_then(|json| {
            ["error_description", "msg", "message"]
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_str).map(str::to_string))
        });
        let message = match reason {
            Some(reason) => format!("HTTP {status}: {reason}"),
            None => format!("HTTP {status}"),
        };
        Self {
            kind,
            message,
            details: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.kind == ProviderErrorKind::Unavailable
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Errors surfaced by the auth core.
///
/// Messages never say whether an account exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Too many sign-in attempts. Please try again in {} minutes.", minutes_ceil(.retry_after))]
    RateLimited { retry_after: Duration },

    #[error("Authentication service unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Password reset request failed")]
    ResetRequestFailed,

    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,

    #[error("Verifying your session is taking longer than expected")]
    VerificationTimeout,
}

impl AuthError {
    /// The single notice shown for this error.
    pub fn notice(&self) -> Notice {
        match self {
            AuthError::ProviderUnavailable(_) => {
                Notice::error("The authentication service is unreachable. Please try again.")
            }
            other => Notice::error(other.to_string()),
        }
    }
}

fn minutes_ceil(d: &Duration) -> u64 {
    d.as_secs().div_ceil(60).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_extracts_reason() {
        let err = ProviderError::http_status(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.kind, ProviderErrorKind::Rejected);
        assert_eq!(err.message, "HTTP 400: Invalid login credentials");
        assert!(err.details.is_some());
    }

    #[test]
    fn test_http_status_5xx_is_unavailable() {
        let err = ProviderError::http_status(503, "");
        assert!(err.is_unavailable());
        assert_eq!(err.message, "HTTP 503");
        assert_eq!(err.details, None);
    }

    #[test]
    fn test_rate_limited_message_rounds_up_minutes() {
        let err = AuthError::RateLimited {
            retry_after: Duration::from_secs(14 * 60 + 1),
        };
        assert_eq!(
            err.to_string(),
            "Too many sign-in attempts. Please try again in 15 minutes."
        );
    }

    #[test]
    fn test_provider_unavailable_notice_hides_details() {
        let notice = AuthError::ProviderUnavailable("connect refused 10.0.0.1".into()).notice();
        assert!(!notice.message.contains("10.0.0.1"));
    }
}
