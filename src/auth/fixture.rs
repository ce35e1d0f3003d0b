//! Fixture authentication provider
//!
//! Runs the same session persistence and `state` validation as the real
//! provider but never contacts an authorization server: the "authorization
//! URL" it returns is the redirect URI itself, already carrying a fixture
//! code, and the callback stores the configured token.
//!
//! Only selected through `auth.provider: fixture` in the configuration.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::auth::provider::{
    start_session, validate_session, AuthPhase, AuthProvider, CallbackOutcome, LoginRedirect,
    PhaseCell,
};
use crate::auth::session::{Credential, SessionStore};
use crate::environment::OsmEnvironment;
use crate::error::{OsmSubmitError, Result};
use crate::storage::PersistentStore;

/// Authorization code handed out by the fixture redirect
pub const FIXTURE_CODE: &str = "fixture-code";

/// Offline provider that issues a preconfigured token
pub struct FixtureAuthProvider {
    token: String,
    redirect_uri: String,
    sessions: SessionStore,
    phase: PhaseCell,
}

impl FixtureAuthProvider {
    /// Creates a fixture provider issuing `token`
    pub fn new(
        token: impl Into<String>,
        redirect_uri: impl Into<String>,
        store: Arc<dyn PersistentStore>,
    ) -> Self {
        Self {
            token: token.into(),
            redirect_uri: redirect_uri.into(),
            sessions: SessionStore::new(store),
            phase: PhaseCell::new(),
        }
    }
}

#[async_trait]
impl AuthProvider for FixtureAuthProvider {
    fn begin_login(
        &self,
        environment: OsmEnvironment,
        restore_context: Option<serde_json::Value>,
    ) -> Result<LoginRedirect> {
        let (session, _pkce) = start_session(&self.sessions, environment, restore_context)?;

        let mut authorization_url = Url::parse(&self.redirect_uri)
            .map_err(|e| OsmSubmitError::Config(format!("invalid redirect URI: {e}")))?;
        authorization_url
            .query_pairs_mut()
            .append_pair("code", FIXTURE_CODE)
            .append_pair("state", &session.state);

        self.phase.set(AuthPhase::AwaitingCallback);
        tracing::info!(%environment, "Starting fixture login (no authorization server)");

        Ok(LoginRedirect {
            authorization_url,
            state: session.state,
            environment,
        })
    }

    async fn complete_callback(&self, code: &str, state: &str) -> Result<CallbackOutcome> {
        let session = match validate_session(&self.sessions, state) {
            Ok(session) => session,
            Err(e) => {
                self.phase.set(AuthPhase::Failed);
                return Err(e);
            }
        };
        self.phase.set(AuthPhase::Exchanging);
        self.sessions.clear_session()?;

        if code != FIXTURE_CODE {
            self.phase.set(AuthPhase::Failed);
            return Err(OsmSubmitError::TokenExchangeFailure {
                status: 400,
                body: format!("fixture provider does not recognise code {code:?}"),
            }
            .into());
        }

        let credential = Credential {
            access_token: self.token.clone(),
            environment: session.environment,
        };
        self.sessions.save_credential(&credential)?;
        self.phase.set(AuthPhase::Authenticated);
        tracing::info!(environment = %session.environment, "Fixture login successful");

        Ok(CallbackOutcome {
            access_token: credential.access_token,
            environment: session.environment,
            restore_context: session.restore_context,
        })
    }

    fn logout(&self) -> Result<()> {
        self.sessions.clear_credential()?;
        self.phase.set(AuthPhase::Idle);
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
