//! OSM Submit - OpenStreetMap point-of-interest submission library
//!
//! This library logs a user in to an OpenStreetMap deployment with the OAuth2
//! authorization-code flow (PKCE, S256) and creates single nodes through the
//! API 0.6 changeset protocol.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: PKCE primitives, session persistence, authentication providers
//! - `osm`: XML/JSON codec, API client, changeset submission pipeline
//! - `nearby`: existing-feature lookup around a coordinate
//! - `storage`: key-value persistence behind the session and credential
//! - `environment`: deployments and their endpoints
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface definition and handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use osm_submit::auth::{AuthProvider, PkceAuthProvider};
//! use osm_submit::osm::{ChangesetPipeline, MemoryLogSink, OsmApiClient, PointOfInterest};
//! use osm_submit::storage::SledStore;
//! use osm_submit::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::default();
//!     config.osm.client_id = "my-client".to_string();
//!     config.validate()?;
//!
//!     let store = Arc::new(SledStore::open(&config.storage.path)?);
//!     let auth = PkceAuthProvider::new(config.http_client()?, config.oauth_client_config(), store);
//!     let credential = auth.credential()?.ok_or(osm_submit::OsmSubmitError::NotAuthenticated)?;
//!
//!     let pipeline = ChangesetPipeline::new(
//!         OsmApiClient::new(config.http_client()?, config.endpoint_table()),
//!         config.osm.generator.clone(),
//!     );
//!     let poi = PointOfInterest::new(40.7128, -74.006).with_tag("amenity", "cafe");
//!     let node_id = pipeline.submit(&credential, &poi, &MemoryLogSink::new()).await?;
//!     println!("created node {node_id}");
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod environment;
pub mod error;
pub mod nearby;
pub mod osm;
pub mod storage;

// Re-export commonly used types
pub use auth::{AuthPhase, AuthProvider, Credential};
pub use config::Config;
pub use environment::OsmEnvironment;
pub use error::{OsmSubmitError, Result};
pub use osm::{ChangesetPipeline, PointOfInterest};
