mod common;

use common::{seeded_client, DownClient, FlakyLogin};
use tradepulse_client::client::v1::LocalClient;
use tradepulse_client::mode::{ModeSelector, TradingMode};
use tradepulse_client::session::{SessionError, SessionManager, SessionState};
use tradepulse_client::store::{
    CredentialStore, MemoryStore, KEY_AUTH_TOKEN, KEY_COMPETITION_ID, KEY_COMPETITION_NAME,
    KEY_TRADING_MODE,
};
use tradepulse_http::http::v1::Client;

#[tokio::test]
async fn test_that_startup_without_token_is_anonymous() {
    let client = LocalClient::with_default_market();
    let mut session = SessionManager::new(client, MemoryStore::new());

    assert!(matches!(session.state(), SessionState::Unknown));
    session.start().await;
    assert!(matches!(session.state(), SessionState::Anonymous));
}

#[tokio::test]
async fn test_that_login_then_logout_ends_anonymous_without_token() {
    let client = seeded_client("trader@example.com", "hunter22");
    let mut session = SessionManager::new(client, MemoryStore::new());
    session.start().await;

    session.login("trader@example.com", "hunter22").await.unwrap();
    assert!(session.is_authenticated());
    assert!(session.store().get(KEY_AUTH_TOKEN).is_some());

    session.logout();
    assert!(matches!(session.state(), SessionState::Anonymous));
    assert!(session.store().get(KEY_AUTH_TOKEN).is_none());
}

#[tokio::test]
async fn test_that_wrong_credentials_surface_invalid_credentials() {
    let client = seeded_client("trader@example.com", "hunter22");
    let mut session = SessionManager::new(client, MemoryStore::new());
    session.start().await;

    let result = session.login("trader@example.com", "wrong-password").await;
    assert!(matches!(result, Err(SessionError::InvalidCredentials)));
    assert!(!session.is_authenticated());
    assert!(session.store().get(KEY_AUTH_TOKEN).is_none());
}

#[tokio::test]
async fn test_that_registration_logs_straight_in() {
    let client = LocalClient::with_default_market();
    let mut session = SessionManager::new(client, MemoryStore::new());
    session.start().await;

    let profile = session
        .register("fresh@example.com", "hunter22")
        .await
        .unwrap();
    assert_eq!(profile.email, "fresh@example.com");
    assert!(session.is_authenticated());

    let token = session.token().unwrap().to_string();
    let checked = session.client().me(&token).await.unwrap();
    assert_eq!(checked.email, "fresh@example.com");
}

#[tokio::test]
async fn test_that_rejected_registration_surfaces_backend_message_verbatim() {
    let client = seeded_client("taken@example.com", "hunter22");
    let mut session = SessionManager::new(client, MemoryStore::new());
    session.start().await;

    let result = session.register("taken@example.com", "other-pass").await;
    match result {
        Err(SessionError::RegistrationRejected(message)) => {
            assert_eq!(message, "Email already registered");
        }
        other => panic!("expected RegistrationRejected, got {other:?}"),
    }
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_that_startup_with_rejected_token_removes_it() {
    let client = LocalClient::with_default_market();
    let mut store = MemoryStore::new();
    store.set(KEY_AUTH_TOKEN, "stale-token");

    let mut session = SessionManager::new(client, store);
    session.start().await;

    assert!(matches!(session.state(), SessionState::Anonymous));
    assert!(session.store().get(KEY_AUTH_TOKEN).is_none());
}

#[tokio::test]
async fn test_that_startup_with_live_token_authenticates() {
    let client = seeded_client("trader@example.com", "hunter22");
    let token = client
        .login("trader@example.com", "hunter22")
        .await
        .unwrap()
        .access_token;

    let mut store = MemoryStore::new();
    store.set(KEY_AUTH_TOKEN, &token);
    let mut session = SessionManager::new(client, store);
    session.start().await;

    assert!(session.is_authenticated());
    assert_eq!(session.user().unwrap().email, "trader@example.com");
    assert_eq!(session.token(), Some(token.as_str()));
}

#[tokio::test]
async fn test_that_observed_unauthorized_clears_the_session() {
    let client = seeded_client("trader@example.com", "hunter22");
    let mut session = SessionManager::new(client, MemoryStore::new());
    session.start().await;
    session.login("trader@example.com", "hunter22").await.unwrap();

    let err = session.client().me("forged-token").await.unwrap_err();
    let verdict = session.observe(&err);

    assert!(matches!(verdict, Some(SessionError::SessionExpired)));
    assert!(!session.is_authenticated());
    assert!(session.store().get(KEY_AUTH_TOKEN).is_none());
}

#[tokio::test]
async fn test_that_non_auth_errors_are_not_observed_as_expiry() {
    let client = seeded_client("trader@example.com", "hunter22");
    let mut session = SessionManager::new(client, MemoryStore::new());
    session.start().await;
    session.login("trader@example.com", "hunter22").await.unwrap();

    let token = session.token().unwrap().to_string();
    let err = session
        .client()
        .stock_info("ZZZZ")
        .await
        .unwrap_err();
    assert!(session.observe(&err).is_none());
    assert!(session.is_authenticated());

    // The live token still works after the rejected call.
    assert!(session.client().me(&token).await.is_ok());
}

#[tokio::test]
async fn test_that_login_recovers_after_one_transport_failure() {
    let client = FlakyLogin::new(seeded_client("trader@example.com", "hunter22"), 1);
    let mut session = SessionManager::new(client, MemoryStore::new());
    session.start().await;

    // First attempt dies at the transport; the health probe succeeds and
    // the single retry lands.
    session.login("trader@example.com", "hunter22").await.unwrap();
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_that_persistent_transport_failure_surfaces_connection_unavailable() {
    let client = FlakyLogin::new(seeded_client("trader@example.com", "hunter22"), 2);
    let mut session = SessionManager::new(client, MemoryStore::new());
    session.start().await;

    let result = session.login("trader@example.com", "hunter22").await;
    assert!(matches!(result, Err(SessionError::ConnectionUnavailable)));
    assert!(session.store().get(KEY_AUTH_TOKEN).is_none());
}

#[tokio::test]
async fn test_that_unreachable_backend_surfaces_connection_unavailable() {
    let mut session = SessionManager::new(DownClient, MemoryStore::new());
    session.start().await;

    let result = session.login("trader@example.com", "hunter22").await;
    assert!(matches!(result, Err(SessionError::ConnectionUnavailable)));

    let result = session.register("trader@example.com", "hunter22").await;
    assert!(matches!(result, Err(SessionError::ConnectionUnavailable)));
}

#[tokio::test]
async fn test_that_refresh_is_a_noop_without_a_token() {
    let client = LocalClient::with_default_market();
    let mut session = SessionManager::new(client, MemoryStore::new());
    session.start().await;

    session.refresh().await;
    assert!(matches!(session.state(), SessionState::Anonymous));
}

#[test]
fn test_that_competition_selection_toggles_back_to_personal() {
    let mut selector = ModeSelector::load(MemoryStore::new());
    selector.set_competition_mode(7, "Spring Cup");
    assert_eq!(
        *selector.current(),
        TradingMode::Competition {
            id: 7,
            name: "Spring Cup".to_string()
        }
    );
    assert_eq!(
        selector.store().get(KEY_TRADING_MODE).as_deref(),
        Some("competition")
    );
    assert_eq!(selector.store().get(KEY_COMPETITION_ID).as_deref(), Some("7"));
    assert_eq!(
        selector.store().get(KEY_COMPETITION_NAME).as_deref(),
        Some("Spring Cup")
    );

    selector.toggle_mode();
    assert_eq!(*selector.current(), TradingMode::Personal);
    assert_eq!(selector.competition_id(), None);
    assert!(selector.store().get(KEY_COMPETITION_ID).is_none());
    assert!(selector.store().get(KEY_COMPETITION_NAME).is_none());

    // Documented asymmetry: toggling from personal does nothing.
    selector.toggle_mode();
    assert_eq!(*selector.current(), TradingMode::Personal);
}

#[test]
fn test_that_mode_selection_restores_from_storage() {
    let mut store = MemoryStore::new();
    store.set(KEY_TRADING_MODE, "competition");
    store.set(KEY_COMPETITION_ID, "42");
    store.set(KEY_COMPETITION_NAME, "Autumn Open");

    let selector = ModeSelector::load(store);
    assert_eq!(
        *selector.current(),
        TradingMode::Competition {
            id: 42,
            name: "Autumn Open".to_string()
        }
    );
}

#[test]
fn test_that_partial_competition_state_degrades_to_personal() {
    let mut store = MemoryStore::new();
    store.set(KEY_TRADING_MODE, "competition");

    let selector = ModeSelector::load(store);
    assert_eq!(*selector.current(), TradingMode::Personal);
}
