//! Error types for OSM Submit
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for OSM Submit operations
///
/// Covers the authorization handshake, the changeset write protocol, and the
/// ambient concerns (configuration, storage, transport) around them.
#[derive(Error, Debug)]
pub enum OsmSubmitError {
    /// The `state` returned by the authorization server does not match the
    /// one persisted when the login began
    #[error("Invalid state parameter - possible CSRF attack")]
    CsrfMismatch,

    /// No in-flight authorization session (or no code verifier) was found
    #[error("Code verifier not found - session may have expired")]
    SessionExpired,

    /// The token endpoint answered with a non-success status
    #[error("Token exchange failed: status={status}, {body}")]
    TokenExchangeFailure {
        /// HTTP status returned by the token endpoint
        status: u16,
        /// Raw response body
        body: String,
    },

    /// A bearer-authenticated call was rejected with 401
    #[error("Unauthorized. Please check your access token: {body}")]
    Unauthorized {
        /// Raw response body
        body: String,
    },

    /// The changeset could not be opened
    #[error("Changeset creation failed: {body}")]
    ChangesetCreateFailure {
        /// Raw response body
        body: String,
    },

    /// The node upload failed
    #[error("Node creation failed: {body}")]
    NodeCreateFailure {
        /// Raw response body or transport error text
        body: String,
    },

    /// The changeset could not be closed (logged, never surfaced by the pipeline)
    #[error("Changeset close failed: {body}")]
    ChangesetCloseFailure {
        /// Raw response body or transport error text
        body: String,
    },

    /// The callback URL was malformed or carried an authorization error
    #[error("Invalid OAuth callback: {0}")]
    InvalidCallback(String),

    /// A protected operation was requested with no stored credential
    #[error("Not authenticated. Run `osm-submit login` first")]
    NotAuthenticated,

    /// The user-details endpoint answered with a non-success status
    #[error("Failed to fetch user details: status={status}, {body}")]
    UserDetails {
        /// HTTP status returned by the endpoint
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Nearby-feature lookup errors
    #[error("Nearby lookup error: {0}")]
    Nearby(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistent store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for OSM Submit operations
///
/// Uses `anyhow::Error` so callers can attach context; the typed variant is
/// recovered with `err.downcast_ref::<OsmSubmitError>()`.
pub type Result<T> = anyhow::Result<T>;
