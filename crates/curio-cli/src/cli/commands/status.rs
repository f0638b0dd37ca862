//! Status command handler.

use anyhow::Result;
use chrono::Utc;
use curio_core::config::Config;
use curio_core::store::AuthSnapshot;

use super::App;

pub fn describe(snapshot: &AuthSnapshot) -> String {
    if snapshot.loading {
        return "Checking session...".to_string();
    }
    let Some(session) = &snapshot.session else {
        return "Not signed in.".to_string();
    };

    let who = session
        .identity
        .email
        .as_deref()
        .unwrap_or(session.identity.id.as_str());
    let left = session.expires_in(Utc::now());
    if left <= chrono::Duration::zero() {
        format!("Signed in as {who} (session expired)")
    } else {
        format!(
            "Signed in as {who} (session expires in {} min)",
            left.num_minutes()
        )
    }
}

pub async fn run(config: &Config) -> Result<()> {
    let mut app = App::new(config)?;
    let scope = app.controller.start();
    app.wait_loaded().await;

    println!("{}", describe(&app.controller.store().snapshot()));
    scope.shutdown().await;
    app.flush();
    Ok(())
}

#[cfg(test)]
mod tests {
    use curio_types::{Identity, Session};

    use super::*;

    fn snapshot(session: Option<Session>) -> AuthSnapshot {
        AuthSnapshot {
            loading: false,
            session,
            ended: None,
        }
    }

    fn session(expires_at: i64) -> Session {
        Session {
            identity: Identity {
                id: "user-1".to_string(),
                email: Some("admin@example.com".to_string()),
            },
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_describe_signed_out() {
        assert_eq!(describe(&snapshot(None)), "Not signed in.");
        assert_eq!(describe(&AuthSnapshot::default()), "Checking session...");
    }

    #[test]
    fn test_describe_signed_in() {
        let expires_at = Utc::now().timestamp() + 3600;
        let text = describe(&snapshot(Some(session(expires_at))));
        assert!(text.starts_with("Signed in as admin@example.com"));
        assert!(text.contains("min)"));

        let text = describe(&snapshot(Some(session(0))));
        assert_eq!(text, "Signed in as admin@example.com (session expired)");
    }
}
