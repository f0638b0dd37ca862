//! Sign-in, sign-out and password-reset flows through the controller.


use std::sync::atomic::Ordering;

use chrono::Duration;
use curio_core::surface::SurfaceEvent;
use curio_types::{AuthError, Route};
use fixtures::{EMAIL, Harness, PASSWORD};

#[tokio::test]
async fn test_successful_sign_in_navigates_to_admin() {
    let mut h = Harness::new();

    let session = h.controller.sign_in(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(session.identity.email.as_deref(), Some(EMAIL));
    assert_eq!(h.controller.current_identity(), Some(session.identity));
    assert_eq!(h.drain(), vec![SurfaceEvent::Navigate(Route::Admin)]);
}

#[tokio::test]
async fn test_each_failure_emits_exactly_one_notice() {
    let mut h = Harness::new();

    let err = h.controller.sign_in(EMAIL, "wrong").await.unwrap_err();

    assert_eq!(err, AuthError::InvalidCredentials);
    assert_eq!(h.notices(), vec!["[error] Invalid email or password"]);
    assert_eq!(h.controller.throttle().attempts(EMAIL), 1);
    assert_eq!(h.controller.current_identity(), None);
}

#[tokio::test]
async fn test_sixth_attempt_is_refused_without_contacting_provider() {
    let mut h = Harness::new();

    for _ in 0..5 {
        let err = h.controller.sign_in(EMAIL, "wrong").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }
    assert_eq!(h.controller.throttle().attempts(EMAIL), 5);

    // Even the right password is refused while locked out.
    let err = h.controller.sign_in(EMAIL, PASSWORD).await.unwrap_err();
    assert!(matches!(err, AuthError::RateLimited { .. }));
    assert_eq!(h.provider.sign_in_calls(), 5);

    let notices = h.notices();
    assert_eq!(notices.len(), 6);
    assert_eq!(
        notices[5],
        "[error] Too many sign-in attempts. Please try again in 15 minutes."
    );
}

#[tokio::test]
async fn test_lockout_lifts_after_window() {
    let mut h = Harness::new();
    for _ in 0..5 {
        let _ = h.controller.sign_in(EMAIL, "wrong").await;
    }

    h.clock.advance(Duration::minutes(16));
    h.controller.sign_in(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(h.controller.throttle().attempts(EMAIL), 0);
    assert_eq!(h.provider.sign_in_calls(), 6);
    assert_eq!(
        h.drain().last(),
        Some(&SurfaceEvent::Navigate(Route::Admin))
    );
}

#[tokio::test]
async fn test_success_clears_counter() {
    let h = Harness::new();
    for _ in 0..3 {
        let _ = h.controller.sign_in(EMAIL, "wrong").await;
    }
    assert_eq!(h.controller.throttle().attempts(EMAIL), 3);

    h.controller.sign_in(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(h.controller.throttle().attempts(EMAIL), 0);
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn test_outage_is_not_counted_as_failure() {
    let mut h = Harness::new();
    h.provider.unavailable.store(true, Ordering::SeqCst);

    let err = h.controller.sign_in(EMAIL, PASSWORD).await.unwrap_err();

    assert!(matches!(err, AuthError::ProviderUnavailable(_)));
    assert_eq!(h.controller.throttle().attempts(EMAIL), 0);
    assert_eq!(
        h.notices(),
        vec!["[error] The authentication service is unreachable. Please try again."]
    );
}

#[tokio::test]
async fn test_sign_out_is_idempotent() {
    let mut h = Harness::new();
    h.controller.sign_in(EMAIL, PASSWORD).await.unwrap();
    h.drain();

    h.controller.sign_out().await;
    h.controller.sign_out().await;

    assert_eq!(h.controller.current_identity(), None);
    assert_eq!(h.provider.held_session(), None);
    assert_eq!(
        h.drain(),
        vec![
            SurfaceEvent::Navigate(Route::Home),
            SurfaceEvent::Navigate(Route::Home),
        ]
    );
}

#[tokio::test]
async fn test_sign_out_clears_local_state_when_remote_fails() {
    let mut h = Harness::new();
    h.controller.sign_in(EMAIL, PASSWORD).await.unwrap();
    h.provider.fail_sign_out.store(true, Ordering::SeqCst);
    h.drain();

    h.controller.sign_out().await;

    assert_eq!(h.controller.current_identity(), None);
    assert_eq!(h.drain(), vec![SurfaceEvent::Navigate(Route::Home)]);
}

#[tokio::test]
async fn test_reset_request_uses_site_redirect_and_skips_throttle() {
    let mut h = Harness::new();
    for _ in 0..5 {
        let _ = h.controller.sign_in(EMAIL, "wrong").await;
    }
    h.drain();

    h.controller.reset_password_request(EMAIL).await.unwrap();

    assert_eq!(h.provider.reset_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *h.provider.reset_redirects.lock().unwrap(),
        vec!["http://localhost:8080/reset-password".to_string()]
    );
    assert_eq!(
        h.notices(),
        vec!["[success] If an account exists for this address, a password reset link has been sent."]
    );
    assert_eq!(h.controller.throttle().attempts(EMAIL), 5);
}

#[tokio::test]
async fn test_reset_request_failure_notifies() {
    let mut h = Harness::new();
    h.provider.unavailable.store(true, Ordering::SeqCst);

    let err = h.controller.reset_password_request(EMAIL).await.unwrap_err();

    assert!(matches!(err, AuthError::ProviderUnavailable(_)));
    assert_eq!(h.notices().len(), 1);
}

#[tokio::test]
async fn test_redirect_if_signed_in() {
    let mut h = Harness::new();
    assert!(!h.controller.redirect_if_signed_in());

    h.controller.sign_in(EMAIL, PASSWORD).await.unwrap();
    h.drain();

    assert!(h.controller.redirect_if_signed_in());
    assert_eq!(h.drain(), vec![SurfaceEvent::Navigate(Route::Admin)]);
}
