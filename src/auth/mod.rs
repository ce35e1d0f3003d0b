//! OAuth2 authorization code flow with PKCE
//!
//! # Module Layout
//!
//! - [`pkce`]           -- random tokens and the S256 challenge transform
//! - [`session`]        -- persisted session and credential records
//! - [`provider`]       -- the [`AuthProvider`] seam and handshake phases
//! - [`pkce_provider`]  -- the real handshake against the OSM OAuth2 server
//! - [`fixture`]        -- offline provider selected by configuration
//! - [`callback`]       -- redirect URL parsing and the loopback listener

pub mod callback;
pub mod fixture;
pub mod pkce;
pub mod pkce_provider;
pub mod provider;
pub mod session;

pub use callback::{wait_for_callback, CallbackParams};
pub use fixture::FixtureAuthProvider;
pub use pkce_provider::{OAuthClientConfig, PkceAuthProvider};
pub use provider::{AuthPhase, AuthProvider, CallbackOutcome, LoginRedirect};
pub use session::{AuthorizationSession, Credential, SessionStore};
