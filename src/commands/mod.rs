/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `auth`: login, callback, logout and status
- `submit`: preview and submit a point of interest
- `nearby`: list existing features around a location

Handlers are small and use the library components: the configured
authentication provider, the changeset pipeline and the nearby lookup.
*/

use crate::auth::{AuthProvider, FixtureAuthProvider, PkceAuthProvider};
use crate::cli::PointArgs;
use crate::config::{AuthProviderKind, Config};
use crate::error::{OsmSubmitError, Result};
use crate::osm::PointOfInterest;
use crate::storage::{PersistentStore, SledStore};
use std::sync::Arc;

pub mod auth;
pub mod nearby;
pub mod submit;

/// Opens the persistent store at `storage.path`
///
/// # Errors
///
/// Returns `Storage` if the database cannot be opened (for instance when
/// another process holds it)
pub fn open_store(config: &Config) -> Result<Arc<dyn PersistentStore>> {
    tracing::debug!(path = %config.storage.path, "Opening state store");
    Ok(Arc::new(SledStore::open(&config.storage.path)?))
}

/// Create the authentication provider selected by `auth.provider`
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built or the fixture provider
/// has no token configured
pub fn create_auth_provider(
    config: &Config,
    store: Arc<dyn PersistentStore>,
) -> Result<Box<dyn AuthProvider>> {
    match config.auth.provider {
        AuthProviderKind::Pkce => Ok(Box::new(PkceAuthProvider::new(
            config.http_client()?,
            config.oauth_client_config(),
            store,
        ))),
        AuthProviderKind::Fixture => {
            let token = config.auth.fixture_token.clone().ok_or_else(|| {
                OsmSubmitError::Config(
                    "auth.fixture_token is required for the fixture provider".to_string(),
                )
            })?;
            tracing::warn!("Using fixture authentication provider; no real login takes place");
            Ok(Box::new(FixtureAuthProvider::new(
                token,
                config.osm.redirect_uri.clone(),
                store,
            )))
        }
    }
}

/// Builds a point from command-line coordinates and tags
///
/// Later duplicates of a key win.
pub fn point_from_args(args: &PointArgs) -> PointOfInterest {
    args.tags
        .iter()
        .fold(PointOfInterest::new(args.lat, args.lon), |poi, (k, v)| {
            poi.with_tag(k.clone(), v.clone())
        })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_from_args_last_duplicate_wins() {
        let args = PointArgs {
            lat: 1.0,
            lon: 2.0,
            tags: vec![
                ("name".to_string(), "First".to_string()),
                ("amenity".to_string(), "cafe".to_string()),
                ("name".to_string(), "Second".to_string()),
            ],
        };
        let poi = point_from_args(&args);
        assert_eq!(poi.lat, 1.0);
        assert_eq!(poi.tags.get("name").map(String::as_str), Some("Second"));
        assert_eq!(poi.tags.len(), 2);
    }

    #[test]
    fn test_create_auth_provider_fixture_without_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_support::fixture_config(dir.path());
        config.auth.fixture_token = None;
        let store = open_store(&config).unwrap();
        assert!(create_auth_provider(&config, store).is_err());
    }

    #[test]
    fn test_create_auth_provider_pkce() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_support::fixture_config(dir.path());
        config.auth.provider = AuthProviderKind::Pkce;
        config.osm.client_id = "abc".to_string();
        let store = open_store(&config).unwrap();
        let provider = create_auth_provider(&config, store).unwrap();
        assert!(!provider.is_authenticated().unwrap());
    }
}
