//! Configuration management for OSM Submit
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::auth::OAuthClientConfig;
use crate::environment::{EndpointTable, EnvironmentEndpoints, OsmEnvironment};
use crate::error::{OsmSubmitError, Result};
use crate::nearby::overpass::DEFAULT_OVERPASS_URL;
use crate::osm::codec::DEFAULT_GENERATOR;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/osm-submit.yaml";

/// Main configuration structure for OSM Submit
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// OpenStreetMap deployment and OAuth client registration
    #[serde(default)]
    pub osm: OsmConfig,
    /// Which authentication provider to run
    #[serde(default)]
    pub auth: AuthConfig,
    /// Where session and credential state is kept
    #[serde(default)]
    pub storage: StorageConfig,
    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpConfig,
    /// Duplicate check before submission
    #[serde(default)]
    pub nearby: NearbyConfig,
}

/// OpenStreetMap settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsmConfig {
    /// Deployment to log in to and write to
    #[serde(default)]
    pub environment: OsmEnvironment,

    /// OAuth2 client id registered with the deployment
    #[serde(default)]
    pub client_id: String,

    /// Registered redirect URI
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Space-separated OAuth2 scopes
    #[serde(default = "default_scopes")]
    pub scopes: String,

    /// `created_by` / `generator` value on uploads
    #[serde(default = "default_generator")]
    pub generator: String,

    /// Endpoint overrides for the dev deployment
    #[serde(default)]
    pub dev: EndpointOverrides,

    /// Endpoint overrides for the prod deployment
    #[serde(default)]
    pub prod: EndpointOverrides,
}

fn default_redirect_uri() -> String {
    "http://127.0.0.1:8765/oauth/callback".to_string()
}

fn default_scopes() -> String {
    "read_prefs write_api".to_string()
}

fn default_generator() -> String {
    DEFAULT_GENERATOR.to_string()
}

impl Default for OsmConfig {
    fn default() -> Self {
        Self {
            environment: OsmEnvironment::default(),
            client_id: String::new(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
            generator: default_generator(),
            dev: EndpointOverrides::default(),
            prod: EndpointOverrides::default(),
        }
    }
}

/// Per-deployment URL overrides; unset fields keep the built-in value
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct EndpointOverrides {
    /// Authorization endpoint
    #[serde(default)]
    pub auth_url: Option<String>,
    /// Token endpoint
    #[serde(default)]
    pub token_url: Option<String>,
    /// API 0.6 base
    #[serde(default)]
    pub api_url: Option<String>,
    /// User details endpoint
    #[serde(default)]
    pub user_url: Option<String>,
}

impl EndpointOverrides {
    fn apply(&self, endpoints: &mut EnvironmentEndpoints) {
        if let Some(url) = &self.auth_url {
            endpoints.auth_url = url.clone();
        }
        if let Some(url) = &self.token_url {
            endpoints.token_url = url.clone();
        }
        if let Some(url) = &self.api_url {
            endpoints.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = &self.user_url {
            endpoints.user_url = url.clone();
        }
    }
}

/// Authentication provider kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderKind {
    /// Real OAuth2 authorization-code flow with PKCE
    #[default]
    Pkce,
    /// Offline provider issuing `auth.fixture_token`
    Fixture,
}

impl std::str::FromStr for AuthProviderKind {
    type Err = OsmSubmitError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pkce" => Ok(Self::Pkce),
            "fixture" => Ok(Self::Fixture),
            other => Err(OsmSubmitError::Config(format!(
                "Invalid auth provider: {}. Must be one of: pkce, fixture",
                other
            ))),
        }
    }
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: AuthProviderKind,

    /// Token issued by the fixture provider
    #[serde(default)]
    pub fixture_token: Option<String>,
}

/// Persistent state settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// sled database directory
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_path() -> String {
    ".osm-submit/state".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// User-Agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("osm-submit/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

/// Nearby-feature lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyConfig {
    /// Check for existing features before submitting
    #[serde(default = "default_nearby_enabled")]
    pub enabled: bool,

    /// Overpass interpreter endpoint
    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,

    /// Search radius in meters
    #[serde(default = "default_radius_meters")]
    pub radius_meters: u32,
}

fn default_nearby_enabled() -> bool {
    true
}

fn default_overpass_url() -> String {
    DEFAULT_OVERPASS_URL.to_string()
}

fn default_radius_meters() -> u32 {
    20
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            enabled: default_nearby_enabled(),
            overpass_url: default_overpass_url(),
            radius_meters: default_radius_meters(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| OsmSubmitError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| OsmSubmitError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(env) = std::env::var("OSM_SUBMIT_ENV") {
            match env.parse() {
                Ok(value) => self.osm.environment = value,
                Err(_) => tracing::warn!("Invalid OSM_SUBMIT_ENV: {}", env),
            }
        }

        if let Ok(client_id) = std::env::var("OSM_SUBMIT_CLIENT_ID") {
            self.osm.client_id = client_id;
        }

        if let Ok(redirect_uri) = std::env::var("OSM_SUBMIT_REDIRECT_URI") {
            self.osm.redirect_uri = redirect_uri;
        }

        if let Ok(provider) = std::env::var("OSM_SUBMIT_AUTH_PROVIDER") {
            match provider.parse() {
                Ok(value) => self.auth.provider = value,
                Err(_) => tracing::warn!("Invalid OSM_SUBMIT_AUTH_PROVIDER: {}", provider),
            }
        }

        if let Ok(path) = std::env::var("OSM_SUBMIT_STORAGE_PATH") {
            self.storage.path = path;
        }

        if let Ok(url) = std::env::var("OSM_SUBMIT_OVERPASS_URL") {
            self.nearby.overpass_url = url;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(env) = cli.env {
            tracing::debug!(environment = %env, "Environment overridden from command line");
            self.osm.environment = env;
        }
    }

    /// Endpoint table with the configured overrides applied
    pub fn endpoint_table(&self) -> EndpointTable {
        let mut table = EndpointTable::default();
        self.osm.dev.apply(&mut table.dev);
        self.osm.prod.apply(&mut table.prod);
        table
    }

    /// Client registration handed to the PKCE provider
    pub fn oauth_client_config(&self) -> OAuthClientConfig {
        OAuthClientConfig {
            client_id: self.osm.client_id.clone(),
            redirect_uri: self.osm.redirect_uri.clone(),
            scopes: self.osm.scopes.clone(),
            endpoints: self.endpoint_table(),
        }
    }

    /// Shared HTTP client honouring the timeout and user agent settings
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend cannot be initialised
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.http.timeout_seconds))
            .user_agent(self.http.user_agent.clone())
            .build()
            .map_err(|e| OsmSubmitError::Config(format!("Failed to build HTTP client: {}", e)).into())
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.auth.provider == AuthProviderKind::Pkce && self.osm.client_id.trim().is_empty() {
            return Err(OsmSubmitError::Config(
                "osm.client_id is required for the pkce provider".to_string(),
            )
            .into());
        }

        if self.auth.provider == AuthProviderKind::Fixture
            && self
                .auth
                .fixture_token
                .as_deref()
                .map_or(true, |t| t.trim().is_empty())
        {
            return Err(OsmSubmitError::Config(
                "auth.fixture_token is required for the fixture provider".to_string(),
            )
            .into());
        }

        url::Url::parse(&self.osm.redirect_uri).map_err(|e| {
            OsmSubmitError::Config(format!(
                "Invalid osm.redirect_uri {}: {}",
                self.osm.redirect_uri, e
            ))
        })?;

        if self.osm.scopes.trim().is_empty() {
            return Err(OsmSubmitError::Config("osm.scopes cannot be empty".to_string()).into());
        }

        let table = self.endpoint_table();
        for (env, endpoints) in [("dev", &table.dev), ("prod", &table.prod)] {
            for url in endpoints.urls() {
                url::Url::parse(url).map_err(|e| {
                    OsmSubmitError::Config(format!("Invalid {} endpoint {}: {}", env, url, e))
                })?;
            }
        }

        if self.http.timeout_seconds == 0 {
            return Err(OsmSubmitError::Config(
                "http.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.nearby.radius_meters == 0 {
            return Err(OsmSubmitError::Config(
                "nearby.radius_meters must be greater than 0".to_string(),
            )
            .into());
        }

        if self.nearby.enabled {
            url::Url::parse(&self.nearby.overpass_url).map_err(|e| {
                OsmSubmitError::Config(format!(
                    "Invalid nearby.overpass_url {}: {}",
                    self.nearby.overpass_url, e
                ))
            })?;
        }

        Ok(())
    }
}
