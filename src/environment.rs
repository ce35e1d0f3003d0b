//! OpenStreetMap deployments and their endpoints
//!
//! Every credential and every in-flight login is bound to one
//! [`OsmEnvironment`]. The [`EndpointTable`] resolves an environment to the
//! four URLs the crate talks to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OsmSubmitError;

/// A remote OpenStreetMap deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OsmEnvironment {
    /// The public development sandbox (`master.apis.dev.openstreetmap.org`)
    #[default]
    Dev,
    /// The production map
    Prod,
}

impl OsmEnvironment {
    /// Stable lowercase identifier used in persisted state and config
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }
}

impl fmt::Display for OsmEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsmEnvironment {
    type Err = OsmSubmitError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" | "sandbox" => Ok(Self::Dev),
            "prod" | "production" => Ok(Self::Prod),
            other => Err(OsmSubmitError::Config(format!(
                "Invalid environment: {}. Must be one of: dev, prod",
                other
            ))),
        }
    }
}

/// The URLs for one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEndpoints {
    /// OAuth2 authorization endpoint (browser redirect target)
    pub auth_url: String,
    /// OAuth2 token endpoint
    pub token_url: String,
    /// API 0.6 base, without trailing slash
    pub api_url: String,
    /// User details endpoint (JSON)
    pub user_url: String,
}

impl EnvironmentEndpoints {
    /// Builds endpoints for a server whose OAuth and API live under one origin.
    ///
    /// Used for local mocks; `base` is something like `http://127.0.0.1:4000`.
    ///
    /// # Examples
    ///
    /// ```
    /// use osm_submit::environment::EnvironmentEndpoints;
    ///
    /// let e = EnvironmentEndpoints::with_base("http://localhost:4000/");
    /// assert_eq!(e.token_url, "http://localhost:4000/oauth2/token");
    /// assert_eq!(e.api_url, "http://localhost:4000/api/0.6");
    /// ```
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{}/oauth2/authorize", base),
            token_url: format!("{}/oauth2/token", base),
            api_url: format!("{}/api/0.6", base),
            user_url: format!("{}/api/0.6/user/details.json", base),
        }
    }

    fn dev_defaults() -> Self {
        Self::with_base("https://master.apis.dev.openstreetmap.org")
    }

    fn prod_defaults() -> Self {
        Self {
            auth_url: "https://www.openstreetmap.org/oauth2/authorize".to_string(),
            token_url: "https://www.openstreetmap.org/oauth2/token".to_string(),
            api_url: "https://api.openstreetmap.org/api/0.6".to_string(),
            user_url: "https://api.openstreetmap.org/api/0.6/user/details.json".to_string(),
        }
    }

    /// Every URL in this set, for validation
    pub fn urls(&self) -> [&str; 4] {
        [&self.auth_url, &self.token_url, &self.api_url, &self.user_url]
    }
}

/// Endpoints for every known deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTable {
    /// Development sandbox endpoints
    pub dev: EnvironmentEndpoints,
    /// Production endpoints
    pub prod: EnvironmentEndpoints,
}

impl EndpointTable {
    /// Resolves the endpoints for `environment`
    pub fn for_env(&self, environment: OsmEnvironment) -> &EnvironmentEndpoints {
        match environment {
            OsmEnvironment::Dev => &self.dev,
            OsmEnvironment::Prod => &self.prod,
        }
    }

    /// Points both environments at the same server (tests, local mocks)
    pub fn uniform(base: &str) -> Self {
        Self {
            dev: EnvironmentEndpoints::with_base(base),
            prod: EnvironmentEndpoints::with_base(base),
        }
    }
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self {
            dev: EnvironmentEndpoints::dev_defaults(),
            prod: EnvironmentEndpoints::prod_defaults(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_str_accepts_aliases() {
        assert_eq!("dev".parse::<OsmEnvironment>().unwrap(), OsmEnvironment::Dev);
        assert_eq!(
            "Production".parse::<OsmEnvironment>().unwrap(),
            OsmEnvironment::Prod
        );
        assert_eq!(
            " sandbox ".parse::<OsmEnvironment>().unwrap(),
            OsmEnvironment::Dev
        );
    }

    #[test]
    fn test_environment_from_str_rejects_unknown() {
        let err = "staging".parse::<OsmEnvironment>().unwrap_err();
        assert!(err.to_string().contains("staging"));
    }

    #[test]
    fn test_environment_serde_lowercase() {
        let json = serde_json::to_string(&OsmEnvironment::Prod).unwrap();
        assert_eq!(json, "\"prod\"");
        let back: OsmEnvironment = serde_json::from_str("\"dev\"").unwrap();
        assert_eq!(back, OsmEnvironment::Dev);
    }

    #[test]
    fn test_default_table_resolves_each_environment() {
        let table = EndpointTable::default();
        assert!(table
            .for_env(OsmEnvironment::Dev)
            .api_url
            .starts_with("https://master.apis.dev.openstreetmap.org"));
        assert_eq!(
            table.for_env(OsmEnvironment::Prod).auth_url,
            "https://www.openstreetmap.org/oauth2/authorize"
        );
    }

    #[test]
    fn test_with_base_trims_trailing_slash() {
        let e = EnvironmentEndpoints::with_base("http://127.0.0.1:9/");
        assert_eq!(e.auth_url, "http://127.0.0.1:9/oauth2/authorize");
        assert_eq!(e.user_url, "http://127.0.0.1:9/api/0.6/user/details.json");
    }
}
