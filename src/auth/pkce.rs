//! PKCE S256 primitives
//!
//! Random token generation and the one-way challenge transform used by the
//! authorization handshake (RFC 7636).
//!
//! # How PKCE works
//!
//! 1. The client generates a high-entropy random `code_verifier`.
//! 2. The `code_challenge` is the base64url (no padding) SHA-256 digest of
//!    the verifier.
//! 3. The authorization request carries the challenge with
//!    `code_challenge_method=S256`.
//! 4. The token exchange carries the original verifier, which the server
//!    hashes and compares.

use base64::Engine as _;
use rand::Rng as _;
use sha2::{Digest, Sha256};

/// RFC 7636 unreserved characters: `A-Z a-z 0-9 - . _ ~`
pub const UNRESERVED_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Length of the generated code verifier (the RFC 7636 maximum)
pub const VERIFIER_LENGTH: usize = 128;

/// Length of the generated CSRF `state` token
pub const STATE_LENGTH: usize = 32;

/// Returns `length` characters drawn uniformly from [`UNRESERVED_CHARSET`].
///
/// Uses the thread-local CSPRNG.
///
/// # Examples
///
/// ```
/// use osm_submit::auth::pkce::{random_string, UNRESERVED_CHARSET};
///
/// let s = random_string(32);
/// assert_eq!(s.len(), 32);
/// assert!(s.bytes().all(|b| UNRESERVED_CHARSET.contains(&b)));
/// ```
pub fn random_string(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..UNRESERVED_CHARSET.len());
            UNRESERVED_CHARSET[idx] as char
        })
        .collect()
}

/// Computes `BASE64URL-NOPAD(SHA256(ASCII(verifier)))`.
///
/// # Examples
///
/// ```
/// use osm_submit::auth::pkce::code_challenge;
///
/// // RFC 7636 Appendix B
/// assert_eq!(
///     code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
///     "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
/// );
/// ```
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice())
}

/// A verifier and its derived challenge
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Sent to the token endpoint as `code_verifier`
    pub verifier: String,

    /// Sent to the authorization endpoint as `code_challenge`
    pub challenge: String,
}

impl PkceChallenge {
    /// Generates a fresh 128-character verifier and its S256 challenge
    pub fn generate() -> Self {
        let verifier = random_string(VERIFIER_LENGTH);
        let challenge = code_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    /// Challenge method sent alongside the challenge
    pub fn method(&self) -> &'static str {
        "S256"
    }
}
