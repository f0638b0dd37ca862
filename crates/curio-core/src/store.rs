//! Session store.
//!
//! A single watch cell holding the current session and the loading flag.
//! Anyone may read or subscribe; only the auth controller writes (the
//! mutators are crate-private).

use curio_types::{Identity, Session};
use tokio::sync::watch;

/// Why the controller itself ended the last session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    SignedOut,
    Expired,
}

/// What consumers observe: whether the initial session check is still
/// running, and the session if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub loading: bool,
    pub session: Option<Session>,
    /// Set when the controller ended the session and has already told the
    /// user; cleared whenever a session is stored. A session lost through
    /// the provider's change feed leaves it `None`.
    pub ended: Option<SessionEnd>,
}

impl AuthSnapshot {
    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(|s| &s.identity)
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            loading: true,
            session: None,
            ended: None,
        }
    }
}

#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<AuthSnapshot>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Creates a store in the loading state with no session.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthSnapshot::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.tx.subscribe()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.tx.borrow().identity().cloned()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.tx.borrow().session.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().loading
    }

    /// Replaces the session; subscribers are woken only on actual change.
    pub(crate) fn replace_session(&self, session: Option<Session>) {
        self.tx.send_if_modified(|snap| {
            if snap.session == session {
                return false;
            }
            if session.is_some() {
                snap.ended = None;
            }
            snap.session = session;
            true
        });
    }

    /// Ends the loading phase with the result of the initial query.
    pub(crate) fn finish_loading(&self, session: Option<Session>) {
        self.tx.send_modify(|snap| {
            snap.session = session;
            snap.loading = false;
        });
    }

    /// Drops the session on the controller's behalf, recording why.
    pub(crate) fn end(&self, reason: SessionEnd) {
        self.tx.send_if_modified(|snap| {
            if snap.session.is_none() {
                return false;
            }
            snap.session = None;
            snap.ended = Some(reason);
            true
        });
    }

    #[cfg(test)]
    pub(crate) fn clear(&self) {
        self.replace_session(None);
    }
}

#[cfg(test)]
mod tests {
    use curio_types::Identity;

    use super::*;

    fn session() -> Session {
        Session {
            identity: Identity {
                id: "u1".to_string(),
                email: Some("a@example.com".to_string()),
            },
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: 0,
        }
    }

    #[test]
    fn test_starts_loading_without_session() {
        let store = SessionStore::new();
        assert!(store.is_loading());
        assert_eq!(store.current_identity(), None);
    }

    #[test]
    fn test_finish_loading_publishes_once() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.finish_loading(Some(session()));
        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone();
        assert!(!snap.loading);
        assert_eq!(snap.identity().map(|i| i.id.as_str()), Some("u1"));
    }

    #[test]
    fn test_replace_with_same_session_does_not_notify() {
        let store = SessionStore::new();
        store.finish_loading(Some(session()));
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.replace_session(Some(session()));
        assert!(!rx.has_changed().unwrap());

        store.clear();
        assert!(rx.has_changed().unwrap());
        assert_eq!(store.current_session(), None);
    }

    #[test]
    fn test_end_records_reason_until_next_session() {
        let store = SessionStore::new();
        store.finish_loading(Some(session()));

        store.end(SessionEnd::Expired);
        let snap = store.snapshot();
        assert_eq!(snap.session, None);
        assert_eq!(snap.ended, Some(SessionEnd::Expired));

        // Nothing left to end: the reason is kept and nobody is woken.
        let mut rx = store.subscribe();
        rx.borrow_and_update();
        store.end(SessionEnd::SignedOut);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(store.snapshot().ended, Some(SessionEnd::Expired));

        store.replace_session(Some(session()));
        assert_eq!(store.snapshot().ended, None);
    }
}
