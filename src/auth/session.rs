//! Persisted authorization session and credential
//!
//! Both records are spread over individual keys in the injected
//! [`PersistentStore`], one key per field.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::environment::OsmEnvironment;
use crate::error::Result;
use crate::storage::PersistentStore;

/// Ephemeral key holding the PKCE code verifier
pub const KEY_CODE_VERIFIER: &str = "oauth_code_verifier";
/// Ephemeral key holding the CSRF state token
pub const KEY_STATE: &str = "oauth_state";
/// Ephemeral key holding the environment selected at login
pub const KEY_SESSION_ENV: &str = "oauth_env";
/// Ephemeral key holding the caller's restore context (JSON)
pub const KEY_RESTORE_CONTEXT: &str = "oauth_app_state";
/// Durable key holding the bearer token
pub const KEY_ACCESS_TOKEN: &str = "osm_oauth_token";
/// Durable key holding the environment the token was issued for
pub const KEY_CREDENTIAL_ENV: &str = "osm_oauth_env";

/// One in-flight login attempt
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationSession {
    /// PKCE code verifier
    pub code_verifier: String,
    /// CSRF state token
    pub state: String,
    /// Deployment the login targets
    pub environment: OsmEnvironment,
    /// Opaque caller state handed back after the callback
    pub restore_context: Option<serde_json::Value>,
}

/// Whatever fragments of a session are present in the store.
///
/// The fields are loaded independently so the callback handler can tell a
/// missing session apart from a state mismatch.
#[derive(Debug, Clone, Default)]
pub struct StoredSession {
    /// Persisted verifier, if any
    pub code_verifier: Option<String>,
    /// Persisted state token, if any
    pub state: Option<String>,
    /// Persisted environment, if any
    pub environment: Option<OsmEnvironment>,
    /// Persisted restore context, if any
    pub restore_context: Option<serde_json::Value>,
}

impl StoredSession {
    /// True when neither the verifier nor the state token exist
    pub fn is_absent(&self) -> bool {
        self.code_verifier.is_none() && self.state.is_none()
    }
}

/// The bearer credential produced by a successful handshake.
///
/// No expiry is tracked; a credential stays valid locally until logout.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Opaque bearer token
    pub access_token: String,
    /// Deployment the token was issued by
    pub environment: OsmEnvironment,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("environment", &self.environment)
            .finish()
    }
}

/// Typed accessor over a [`PersistentStore`] for session and credential keys
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn PersistentStore>,
}

impl SessionStore {
    /// Wraps `store`
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    /// Persists every field of `session`, replacing any earlier attempt
    pub fn save_session(&self, session: &AuthorizationSession) -> Result<()> {
        self.store.set(KEY_CODE_VERIFIER, &session.code_verifier)?;
        self.store.set(KEY_STATE, &session.state)?;
        self.store
            .set(KEY_SESSION_ENV, session.environment.as_str())?;
        match &session.restore_context {
            Some(context) => self
                .store
                .set(KEY_RESTORE_CONTEXT, &serde_json::to_string(context)?)?,
            None => self.store.delete(KEY_RESTORE_CONTEXT)?,
        }
        Ok(())
    }

    /// Loads whatever session fragments exist
    ///
    /// An unparsable environment or restore context is treated as absent.
    pub fn load_session(&self) -> Result<StoredSession> {
        let environment = self
            .store
            .get(KEY_SESSION_ENV)?
            .and_then(|raw| raw.parse().ok());
        let restore_context = match self.store.get(KEY_RESTORE_CONTEXT)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Discarding unreadable restore context: {}", e);
                    None
                }
            },
            None => None,
        };
        Ok(StoredSession {
            code_verifier: self.store.get(KEY_CODE_VERIFIER)?,
            state: self.store.get(KEY_STATE)?,
            environment,
            restore_context,
        })
    }

    /// Deletes every ephemeral session key
    pub fn clear_session(&self) -> Result<()> {
        for key in [
            KEY_CODE_VERIFIER,
            KEY_STATE,
            KEY_SESSION_ENV,
            KEY_RESTORE_CONTEXT,
        ] {
            self.store.delete(key)?;
        }
        Ok(())
    }

    /// Persists `credential`, overwriting any previous one
    pub fn save_credential(&self, credential: &Credential) -> Result<()> {
        self.store.set(KEY_ACCESS_TOKEN, &credential.access_token)?;
        self.store
            .set(KEY_CREDENTIAL_ENV, credential.environment.as_str())?;
        Ok(())
    }

    /// Loads the stored credential
    ///
    /// A token without a recorded environment is attributed to the default
    /// (`dev`) deployment.
    pub fn load_credential(&self) -> Result<Option<Credential>> {
        let Some(access_token) = self.store.get(KEY_ACCESS_TOKEN)? else {
            return Ok(None);
        };
        let environment = self
            .store
            .get(KEY_CREDENTIAL_ENV)?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        Ok(Some(Credential {
            access_token,
            environment,
        }))
    }

    /// Deletes the stored credential; a no-op when none exists
    pub fn clear_credential(&self) -> Result<()> {
        self.store.delete(KEY_ACCESS_TOKEN)?;
        self.store.delete(KEY_CREDENTIAL_ENV)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn session_store() -> (Arc<MemoryStore>, SessionStore) {
        let mem = Arc::new(MemoryStore::new());
        let sessions = SessionStore::new(mem.clone());
        (mem, sessions)
    }

    fn sample_session() -> AuthorizationSession {
        AuthorizationSession {
            code_verifier: "v".repeat(128),
            state: "s".repeat(32),
            environment: OsmEnvironment::Prod,
            restore_context: Some(serde_json::json!({"draft": {"name": "Cafe"}})),
        }
    }

    #[test]
    fn test_save_and_load_session_roundtrip() {
        let (_, sessions) = session_store();
        let session = sample_session();
        sessions.save_session(&session).unwrap();

        let loaded = sessions.load_session().unwrap();
        assert_eq!(loaded.code_verifier.as_deref(), Some(session.code_verifier.as_str()));
        assert_eq!(loaded.state.as_deref(), Some(session.state.as_str()));
        assert_eq!(loaded.environment, Some(OsmEnvironment::Prod));
        assert_eq!(loaded.restore_context, session.restore_context);
    }

    #[test]
    fn test_session_uses_documented_keys() {
        let (mem, sessions) = session_store();
        sessions.save_session(&sample_session()).unwrap();
        assert!(mem.get(KEY_CODE_VERIFIER).unwrap().is_some());
        assert_eq!(mem.get(KEY_SESSION_ENV).unwrap().as_deref(), Some("prod"));
        assert!(mem.get(KEY_RESTORE_CONTEXT).unwrap().is_some());
    }

    #[test]
    fn test_clear_session_leaves_credential() {
        let (mem, sessions) = session_store();
        sessions.save_session(&sample_session()).unwrap();
        sessions
            .save_credential(&Credential {
                access_token: "tok".to_string(),
                environment: OsmEnvironment::Dev,
            })
            .unwrap();

        sessions.clear_session().unwrap();

        assert!(sessions.load_session().unwrap().is_absent());
        assert_eq!(mem.len(), 2);
        assert!(sessions.load_credential().unwrap().is_some());
    }

    #[test]
    fn test_load_credential_defaults_environment() {
        let (mem, sessions) = session_store();
        mem.set(KEY_ACCESS_TOKEN, "tok").unwrap();
        let credential = sessions.load_credential().unwrap().unwrap();
        assert_eq!(credential.environment, OsmEnvironment::Dev);
    }

    #[test]
    fn test_unreadable_restore_context_is_dropped() {
        let (mem, sessions) = session_store();
        mem.set(KEY_STATE, "abc").unwrap();
        mem.set(KEY_RESTORE_CONTEXT, "{not json").unwrap();
        let loaded = sessions.load_session().unwrap();
        assert!(loaded.restore_context.is_none());
        assert!(!loaded.is_absent());
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let credential = Credential {
            access_token: "super-secret".to_string(),
            environment: OsmEnvironment::Dev,
        };
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("super-secret"));
    }
}
