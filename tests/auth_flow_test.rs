//! Authorization handshake integration tests using wiremock
//!
//! Drives `PkceAuthProvider` against a mock OSM OAuth2 server:
//!
//! - The authorization URL carries the S256 challenge of the persisted verifier.
//! - The token exchange sends that verifier and persists the credential.
//! - A state mismatch fails before any request reaches the token endpoint.
//! - Token endpoint failures surface as `TokenExchangeFailure` with the body.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use osm_submit::auth::pkce::code_challenge;
use osm_submit::auth::session::{
    KEY_ACCESS_TOKEN, KEY_CODE_VERIFIER, KEY_CREDENTIAL_ENV, KEY_RESTORE_CONTEXT, KEY_SESSION_ENV,
    KEY_STATE,
};
use osm_submit::auth::{AuthPhase, AuthProvider};
use osm_submit::environment::{EndpointTable, EnvironmentEndpoints, OsmEnvironment};
use osm_submit::error::OsmSubmitError;
use osm_submit::storage::{MemoryStore, PersistentStore};

use common::{form_encoded, pkce_provider, pkce_provider_with_endpoints, CLIENT_ID};

fn query_map(url: &url::Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn token_response_body() -> serde_json::Value {
    serde_json::json!({
        "access_token": "test_access_token_xyz",
        "token_type": "Bearer",
        "scope": "read_prefs write_api",
        "created_at": 1_700_000_000
    })
}

fn assert_session_cleared(store: &MemoryStore) {
    for key in [KEY_CODE_VERIFIER, KEY_STATE, KEY_SESSION_ENV, KEY_RESTORE_CONTEXT] {
        assert_eq!(store.get(key).unwrap(), None, "{key} should be cleared");
    }
}

// ---------------------------------------------------------------------------
// Authorization URL
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_authorization_url_carries_challenge_of_stored_verifier() {
    let store = Arc::new(MemoryStore::new());
    let provider = pkce_provider("http://127.0.0.1:9", store.clone());

    let redirect = provider.begin_login(OsmEnvironment::Dev, None).unwrap();
    let params = query_map(&redirect.authorization_url);

    let verifier = store.get(KEY_CODE_VERIFIER).unwrap().unwrap();
    assert_eq!(verifier.len(), 128);
    assert_eq!(params["code_challenge"], code_challenge(&verifier));
    assert_eq!(params["code_challenge_method"], "S256");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["client_id"], CLIENT_ID);
    assert_eq!(params["scope"], "read_prefs write_api");
    assert_eq!(params["state"], redirect.state);
    assert_eq!(store.get(KEY_STATE).unwrap().as_deref(), Some(redirect.state.as_str()));
    assert_eq!(redirect.authorization_url.path(), "/oauth2/authorize");
    assert_eq!(provider.phase(), AuthPhase::AwaitingCallback);
}

// ---------------------------------------------------------------------------
// Token exchange
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_callback_exchanges_verifier_and_persists_credential() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let provider = pkce_provider(&server.uri(), store.clone());

    let redirect = provider
        .begin_login(OsmEnvironment::Dev, Some(serde_json::json!({"draft": {"lat": 1.5}})))
        .unwrap();
    let verifier = store.get(KEY_CODE_VERIFIER).unwrap().unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains(format!("client_id={}", CLIENT_ID)))
        .and(body_string_contains(format!(
            "code_verifier={}",
            form_encoded(&verifier)
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response_body()))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = provider
        .complete_callback("the-code", &redirect.state)
        .await
        .unwrap();

    assert_eq!(outcome.access_token, "test_access_token_xyz");
    assert_eq!(outcome.environment, OsmEnvironment::Dev);
    assert_eq!(
        outcome.restore_context,
        Some(serde_json::json!({"draft": {"lat": 1.5}}))
    );
    assert_eq!(
        store.get(KEY_ACCESS_TOKEN).unwrap().as_deref(),
        Some("test_access_token_xyz")
    );
    assert_eq!(store.get(KEY_CREDENTIAL_ENV).unwrap().as_deref(), Some("dev"));
    assert_session_cleared(&store);
    assert!(provider.is_authenticated().unwrap());
    assert_eq!(provider.phase(), AuthPhase::Authenticated);
}

#[tokio::test]
async fn test_credential_is_bound_to_login_environment() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let endpoints = EndpointTable {
        dev: EnvironmentEndpoints::with_base("http://127.0.0.1:9"),
        prod: EnvironmentEndpoints::with_base(&server.uri()),
    };
    let provider = pkce_provider_with_endpoints(endpoints, store.clone());

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response_body()))
        .expect(1)
        .mount(&server)
        .await;

    let redirect = provider.begin_login(OsmEnvironment::Prod, None).unwrap();
    assert!(redirect
        .authorization_url
        .as_str()
        .starts_with(&server.uri()));

    let outcome = provider
        .complete_callback("code", &redirect.state)
        .await
        .unwrap();
    assert_eq!(outcome.environment, OsmEnvironment::Prod);

    let credential = provider.credential().unwrap().unwrap();
    assert_eq!(credential.environment, OsmEnvironment::Prod);
    assert_eq!(store.get(KEY_CREDENTIAL_ENV).unwrap().as_deref(), Some("prod"));
}

#[tokio::test]
async fn test_token_endpoint_error_is_token_exchange_failure() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let provider = pkce_provider(&server.uri(), store.clone());

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .expect(1)
        .mount(&server)
        .await;

    let redirect = provider.begin_login(OsmEnvironment::Dev, None).unwrap();
    let err = provider
        .complete_callback("stale-code", &redirect.state)
        .await
        .unwrap_err();

    match err.downcast_ref::<OsmSubmitError>() {
        Some(OsmSubmitError::TokenExchangeFailure { status, body }) => {
            assert_eq!(*status, 400);
            assert_eq!(body, "invalid_grant");
        }
        other => panic!("expected TokenExchangeFailure, got {:?}", other),
    }
    assert!(!provider.is_authenticated().unwrap());
    assert_session_cleared(&store);
    assert_eq!(provider.phase(), AuthPhase::Failed);
}

#[tokio::test]
async fn test_token_response_without_access_token_fails() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let provider = pkce_provider(&server.uri(), store.clone());

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let redirect = provider.begin_login(OsmEnvironment::Dev, None).unwrap();
    let err = provider
        .complete_callback("code", &redirect.state)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<OsmSubmitError>(),
        Some(OsmSubmitError::TokenExchangeFailure { status: 200, .. })
    ));
    assert!(!provider.is_authenticated().unwrap());
}

// ---------------------------------------------------------------------------
// CSRF and session expiry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_state_mismatch_never_reaches_token_endpoint() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let provider = pkce_provider(&server.uri(), store.clone());

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response_body()))
        .expect(0)
        .mount(&server)
        .await;

    let redirect = provider.begin_login(OsmEnvironment::Dev, None).unwrap();
    assert_ne!(redirect.state, "forged");

    let err = provider
        .complete_callback("code", "forged")
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<OsmSubmitError>(),
        Some(OsmSubmitError::CsrfMismatch)
    ));
    assert!(!provider.is_authenticated().unwrap());
    assert_eq!(provider.phase(), AuthPhase::Failed);
    // The legitimate login can still finish.
    assert_eq!(
        store.get(KEY_STATE).unwrap().as_deref(),
        Some(redirect.state.as_str())
    );
}

#[tokio::test]
async fn test_callback_without_session_is_session_expired() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let provider = pkce_provider(&server.uri(), store);

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response_body()))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider
        .complete_callback("code", "any-state")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<OsmSubmitError>(),
        Some(OsmSubmitError::SessionExpired)
    ));
}

#[tokio::test]
async fn test_second_login_supersedes_first() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let provider = pkce_provider(&server.uri(), store.clone());

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response_body()))
        .expect(1)
        .mount(&server)
        .await;

    let first = provider.begin_login(OsmEnvironment::Dev, None).unwrap();
    let second = provider.begin_login(OsmEnvironment::Dev, None).unwrap();
    assert_ne!(first.state, second.state);

    let err = provider
        .complete_callback("code", &first.state)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<OsmSubmitError>(),
        Some(OsmSubmitError::CsrfMismatch)
    ));

    provider
        .complete_callback("code", &second.state)
        .await
        .unwrap();
    assert!(provider.is_authenticated().unwrap());
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let provider = pkce_provider(&server.uri(), store.clone());

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response_body()))
        .mount(&server)
        .await;

    let redirect = provider.begin_login(OsmEnvironment::Dev, None).unwrap();
    provider
        .complete_callback("code", &redirect.state)
        .await
        .unwrap();

    provider.logout().unwrap();
    provider.logout().unwrap();
    assert!(!provider.is_authenticated().unwrap());
    assert_eq!(store.get(KEY_ACCESS_TOKEN).unwrap(), None);
    assert_eq!(store.get(KEY_CREDENTIAL_ENV).unwrap(), None);
}
