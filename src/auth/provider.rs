//! Authentication provider abstraction
//!
//! [`AuthProvider`] is the single seam between the CLI (or any other caller)
//! and the handshake. Two implementations exist and are chosen by
//! configuration only:
//!
//! - [`PkceAuthProvider`](super::pkce_provider::PkceAuthProvider) talks to the
//!   real authorization server.
//! - [`FixtureAuthProvider`](super::fixture::FixtureAuthProvider) issues a
//!   configured token without any network traffic.

use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::auth::pkce::{random_string, PkceChallenge, STATE_LENGTH};
use crate::auth::session::{AuthorizationSession, Credential, SessionStore};
use crate::environment::OsmEnvironment;
use crate::error::{OsmSubmitError, Result};

/// Handshake state machine position
///
/// `Idle -> AwaitingCallback -> Exchanging -> {Authenticated | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// No login started by this provider
    Idle,
    /// Session persisted, waiting for the browser to come back
    AwaitingCallback,
    /// Exchanging the authorization code for a token
    Exchanging,
    /// A credential was stored
    Authenticated,
    /// The last callback failed
    Failed,
}

/// Where to send the user to approve access
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    /// Fully parameterised authorization URL
    pub authorization_url: Url,
    /// CSRF state token embedded in the URL
    pub state: String,
    /// Deployment the login targets
    pub environment: OsmEnvironment,
}

/// Result of a successful callback
#[derive(Clone)]
pub struct CallbackOutcome {
    /// The bearer token now persisted
    pub access_token: String,
    /// Deployment the token belongs to
    pub environment: OsmEnvironment,
    /// The caller state captured by `begin_login`
    pub restore_context: Option<serde_json::Value>,
}

impl std::fmt::Debug for CallbackOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackOutcome")
            .field("access_token", &"<redacted>")
            .field("environment", &self.environment)
            .field("restore_context", &self.restore_context)
            .finish()
    }
}

/// Pluggable authentication provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Generates and persists a fresh session and returns the redirect target
    fn begin_login(
        &self,
        environment: OsmEnvironment,
        restore_context: Option<serde_json::Value>,
    ) -> Result<LoginRedirect>;

    /// Validates the callback and exchanges `code` for a credential
    ///
    /// # Errors
    ///
    /// - `CsrfMismatch` when `state` differs from the persisted token (checked
    ///   before any network traffic)
    /// - `SessionExpired` when no session or verifier is persisted
    /// - `TokenExchangeFailure` when the token endpoint rejects the exchange
    async fn complete_callback(&self, code: &str, state: &str) -> Result<CallbackOutcome>;

    /// Deletes the stored credential; idempotent
    fn logout(&self) -> Result<()>;

    /// True iff a credential is stored. The token is not checked remotely.
    fn is_authenticated(&self) -> Result<bool>;

    /// The stored credential, if any
    fn credential(&self) -> Result<Option<Credential>>;

    /// Current handshake phase
    fn phase(&self) -> AuthPhase;
}

/// Mutex-guarded [`AuthPhase`]
#[derive(Debug)]
pub(crate) struct PhaseCell(Mutex<AuthPhase>);

impl PhaseCell {
    pub(crate) fn new() -> Self {
        Self(Mutex::new(AuthPhase::Idle))
    }

    pub(crate) fn get(&self) -> AuthPhase {
        match self.0.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub(crate) fn set(&self, phase: AuthPhase) {
        match self.0.lock() {
            Ok(mut guard) => *guard = phase,
            Err(poisoned) => *poisoned.into_inner() = phase,
        }
        tracing::debug!(?phase, "Authorization phase changed");
    }
}

/// Creates and persists a new [`AuthorizationSession`] with fresh PKCE values
pub(crate) fn start_session(
    sessions: &SessionStore,
    environment: OsmEnvironment,
    restore_context: Option<serde_json::Value>,
) -> Result<(AuthorizationSession, PkceChallenge)> {
    let pkce = PkceChallenge::generate();
    let session = AuthorizationSession {
        code_verifier: pkce.verifier.clone(),
        state: random_string(STATE_LENGTH),
        environment,
        restore_context,
    };
    sessions.save_session(&session)?;
    if session.restore_context.is_some() {
        tracing::debug!("Saved restore context before authorization redirect");
    }
    Ok((session, pkce))
}

/// Checks the returned `state` against the persisted session
///
/// A mismatch leaves the session in place. A matching state with no verifier
/// clears the leftovers.
pub(crate) fn validate_session(
    sessions: &SessionStore,
    returned_state: &str,
) -> Result<AuthorizationSession> {
    let stored = sessions.load_session()?;

    if stored.is_absent() {
        return Err(OsmSubmitError::SessionExpired.into());
    }

    if stored.state.as_deref() != Some(returned_state) {
        tracing::warn!("OAuth callback state does not match the persisted session");
        return Err(OsmSubmitError::CsrfMismatch.into());
    }

    let Some(code_verifier) = stored.code_verifier else {
        sessions.clear_session()?;
        return Err(OsmSubmitError::SessionExpired.into());
    };

    Ok(AuthorizationSession {
        code_verifier,
        state: returned_state.to_string(),
        environment: stored.environment.unwrap_or_default(),
        restore_context: stored.restore_context,
    })
}
