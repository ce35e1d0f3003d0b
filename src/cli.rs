//! Command-line interface definition for OSM Submit
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for logging in, previewing and submitting points.

use crate::environment::OsmEnvironment;
use clap::{Parser, Subcommand, ValueEnum};

/// OSM Submit - add points of interest to OpenStreetMap
///
/// Logs in with OAuth2 (PKCE) and creates one node per submission inside its
/// own changeset.
#[derive(Parser, Debug, Clone)]
#[command(name = "osm-submit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the deployment from config (dev, prod)
    #[arg(short, long)]
    pub env: Option<OsmEnvironment>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for OSM Submit
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an OAuth login
    Login {
        /// JSON blob handed back unchanged after a successful callback
        #[arg(long)]
        restore_context: Option<String>,

        /// Wait for the redirect on the loopback redirect URI
        #[arg(short, long)]
        listen: bool,

        /// Print the authorization URL without opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Complete a login with the redirect the browser landed on
    Callback {
        /// Full redirect URL
        #[arg(long, conflicts_with_all = ["code", "state"])]
        url: Option<String>,

        /// Authorization code
        #[arg(long, requires = "state")]
        code: Option<String>,

        /// State token
        #[arg(long, requires = "code")]
        state: Option<String>,
    },

    /// Forget the stored credential
    Logout,

    /// Show whether a credential is stored
    Status {
        /// Also fetch the user's details from the API
        #[arg(long)]
        fetch_user: bool,
    },

    /// Print the document that would be uploaded
    Preview {
        /// Point to render
        #[command(flatten)]
        point: PointArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = PreviewFormat::Xml)]
        format: PreviewFormat,
    },

    /// Create a node in a new changeset
    Submit {
        /// Point to create
        #[command(flatten)]
        point: PointArgs,

        /// Submit even when similar features exist nearby
        #[arg(short, long)]
        force: bool,
    },

    /// List existing features around a location
    Nearby {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius in meters (defaults to config)
        #[arg(short, long)]
        radius: Option<u32>,
    },
}

/// Coordinates and tags of a point
#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct PointArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Tag as key=value (repeatable)
    #[arg(short, long = "tag", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,
}

/// Preview output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewFormat {
    /// API 0.6 XML node document
    Xml,
    /// JSON preview
    Json,
}

/// Parses `key=value`, splitting on the first `=`
///
/// # Examples
///
/// ```
/// use osm_submit::cli::parse_tag;
///
/// assert_eq!(
///     parse_tag("opening_hours=Mo-Fr 08:00-17:00").unwrap(),
///     ("opening_hours".to_string(), "Mo-Fr 08:00-17:00".to_string())
/// );
/// assert_eq!(parse_tag("note=a=b").unwrap().1, "a=b");
/// assert!(parse_tag("no-separator").is_err());
/// ```
pub fn parse_tag(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        Some(_) => Err(format!("tag key cannot be empty in {:?}", raw)),
        None => Err(format!("expected key=value, got {:?}", raw)),
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
