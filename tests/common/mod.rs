//! Shared helpers for integration tests

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use osm_submit::auth::{Credential, OAuthClientConfig, PkceAuthProvider};
use osm_submit::environment::{EndpointTable, OsmEnvironment};
use osm_submit::osm::{ChangesetPipeline, OsmApiClient};
use osm_submit::storage::MemoryStore;

#[allow(dead_code)]
pub const CLIENT_ID: &str = "test-client";
#[allow(dead_code)]
pub const REDIRECT_URI: &str = "http://127.0.0.1:8765/oauth/callback";

/// PKCE provider whose endpoints all point at `base_url`
#[allow(dead_code)]
pub fn pkce_provider(base_url: &str, store: Arc<MemoryStore>) -> PkceAuthProvider {
    pkce_provider_with_endpoints(EndpointTable::uniform(base_url), store)
}

#[allow(dead_code)]
pub fn pkce_provider_with_endpoints(
    endpoints: EndpointTable,
    store: Arc<MemoryStore>,
) -> PkceAuthProvider {
    PkceAuthProvider::new(
        reqwest::Client::new(),
        OAuthClientConfig {
            client_id: CLIENT_ID.to_string(),
            redirect_uri: REDIRECT_URI.to_string(),
            scopes: "read_prefs write_api".to_string(),
            endpoints,
        },
        store,
    )
}

/// Pipeline whose API base is `base_url`/api/0.6
#[allow(dead_code)]
pub fn pipeline(base_url: &str) -> ChangesetPipeline {
    ChangesetPipeline::new(
        OsmApiClient::new(reqwest::Client::new(), EndpointTable::uniform(base_url)),
        "OSM Submit",
    )
}

#[allow(dead_code)]
pub fn credential() -> Credential {
    Credential {
        access_token: "test-token".to_string(),
        environment: OsmEnvironment::Dev,
    }
}

/// Form-encodes `value` the way the token request body does
#[allow(dead_code)]
pub fn form_encoded(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("osm-submit.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
