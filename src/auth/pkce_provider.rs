//! OAuth 2.0 authorization code flow with PKCE against OpenStreetMap
//!
//! # Flow overview
//!
//! 1. [`begin_login`](PkceAuthProvider::begin_login) generates a verifier,
//!    its S256 challenge and a `state` token, persists them, and returns the
//!    authorization URL for the browser.
//! 2. The authorization server redirects back with `code` and `state`.
//! 3. [`complete_callback`](PkceAuthProvider::complete_callback) validates
//!    `state` against the persisted session before touching the network,
//!    exchanges the code at the token endpoint, stores the credential and
//!    deletes the session.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::auth::provider::{
    start_session, validate_session, AuthPhase, AuthProvider, CallbackOutcome, LoginRedirect,
    PhaseCell,
};
use crate::auth::session::{AuthorizationSession, Credential, SessionStore};
use crate::environment::{EndpointTable, OsmEnvironment};
use crate::error::{OsmSubmitError, Result};
use crate::storage::PersistentStore;

/// Registered OAuth client settings
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    /// Client identifier issued by the OSM OAuth2 application registry
    pub client_id: String,

    /// Redirect URI registered for the client
    pub redirect_uri: String,

    /// Space-separated scopes, e.g. `read_prefs write_api`
    pub scopes: String,

    /// Per-deployment endpoints
    pub endpoints: EndpointTable,
}

/// Raw JSON response from the token endpoint
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Real PKCE authentication provider
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use osm_submit::auth::{AuthProvider, OAuthClientConfig, PkceAuthProvider};
/// use osm_submit::environment::{EndpointTable, OsmEnvironment};
/// use osm_submit::storage::MemoryStore;
///
/// let provider = PkceAuthProvider::new(
///     reqwest::Client::new(),
///     OAuthClientConfig {
///         client_id: "my-client".to_string(),
///         redirect_uri: "http://127.0.0.1:8765/oauth/callback".to_string(),
///         scopes: "read_prefs write_api".to_string(),
///         endpoints: EndpointTable::default(),
///     },
///     Arc::new(MemoryStore::new()),
/// );
///
/// let redirect = provider.begin_login(OsmEnvironment::Dev, None).unwrap();
/// assert!(redirect.authorization_url.as_str().contains("code_challenge_method=S256"));
/// ```
pub struct PkceAuthProvider {
    http: reqwest::Client,
    config: OAuthClientConfig,
    sessions: SessionStore,
    phase: PhaseCell,
}

impl PkceAuthProvider {
    /// Creates a provider over the given HTTP client and store
    pub fn new(
        http: reqwest::Client,
        config: OAuthClientConfig,
        store: Arc<dyn PersistentStore>,
    ) -> Self {
        Self {
            http,
            config,
            sessions: SessionStore::new(store),
            phase: PhaseCell::new(),
        }
    }

    /// Builds the authorization URL with all required query parameters.
    fn build_authorization_url(
        &self,
        environment: OsmEnvironment,
        state: &str,
        code_challenge: &str,
    ) -> Result<Url> {
        let auth_url = &self.config.endpoints.for_env(environment).auth_url;
        let mut url = Url::parse(auth_url).map_err(|e| {
            OsmSubmitError::Config(format!("invalid authorization endpoint URL: {e}"))
        })?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", state);

        Ok(url)
    }

    /// Exchanges an authorization code for an access token.
    async fn exchange_code(&self, code: &str, session: &AuthorizationSession) -> Result<String> {
        let token_url = &self.config.endpoints.for_env(session.environment).token_url;
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", session.code_verifier.as_str()),
        ];

        tracing::info!(environment = %session.environment, "Exchanging code for token");

        let resp = self
            .http
            .post(token_url)
            .form(&params)
            .send()
            .await
            .map_err(OsmSubmitError::Http)?;

        let status = resp.status();
        let body = resp.text().await.map_err(OsmSubmitError::Http)?;

        if !status.is_success() {
            return Err(OsmSubmitError::TokenExchangeFailure {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        match serde_json::from_str::<TokenResponse>(&body) {
            Ok(raw) if !raw.access_token.is_empty() => Ok(raw.access_token),
            _ => Err(OsmSubmitError::TokenExchangeFailure {
                status: status.as_u16(),
                body,
            }
            .into()),
        }
    }

    fn fail<T>(&self, err: anyhow::Error) -> Result<T> {
        tracing::error!("OAuth callback failed: {}", err);
        self.phase.set(AuthPhase::Failed);
        Err(err)
    }
}

#[async_trait]
impl AuthProvider for PkceAuthProvider {
    fn begin_login(
        &self,
        environment: OsmEnvironment,
        restore_context: Option<serde_json::Value>,
    ) -> Result<LoginRedirect> {
        let (session, pkce) = start_session(&self.sessions, environment, restore_context)?;
        let authorization_url =
            self.build_authorization_url(environment, &session.state, &pkce.challenge)?;

        self.phase.set(AuthPhase::AwaitingCallback);
        tracing::info!(%environment, "Starting OAuth login flow");
        tracing::debug!(url = %authorization_url, "Authorization redirect");

        Ok(LoginRedirect {
            authorization_url,
            state: session.state,
            environment,
        })
    }

    async fn complete_callback(&self, code: &str, state: &str) -> Result<CallbackOutcome> {
        let session = match validate_session(&self.sessions, state) {
            Ok(session) => session,
            Err(e) => return self.fail(e),
        };

        self.phase.set(AuthPhase::Exchanging);
        let exchanged = self.exchange_code(code, &session).await;

        if let Err(e) = self.sessions.clear_session() {
            return self.fail(e);
        }

        let access_token = match exchanged {
            Ok(token) => token,
            Err(e) => return self.fail(e),
        };

        let credential = Credential {
            access_token: access_token.clone(),
            environment: session.environment,
        };
        if let Err(e) = self.sessions.save_credential(&credential) {
            return self.fail(e);
        }

        self.phase.set(AuthPhase::Authenticated);
        tracing::info!(environment = %session.environment, "OAuth login successful");

        Ok(CallbackOutcome {
            access_token,
            environment: session.environment,
            restore_context: session.restore_context,
        })
    }

    fn logout(&self) -> Result<()> {
        self.sessions.clear_credential()?;
        self.phase.set(AuthPhase::Idle);
        tracing::info!("Logged out");
        Ok(())
    }

    fn is_authenticated(&self) -> Result<bool> {
        Ok(self.sessions.load_credential()?.is_some())
    }

    fn credential(&self) -> Result<Option<Credential>> {
        self.sessions.load_credential()
    }

    fn phase(&self) -> AuthPhase {
        self.phase.get()
    }
}
