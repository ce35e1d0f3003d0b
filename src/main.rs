//! OSM Submit - add points of interest to OpenStreetMap
//!
#![doc = "Main entry point for the osm-submit command-line tool."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use osm_submit::cli::{Cli, Commands};
use osm_submit::commands;
use osm_submit::config::{Config, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse first so --verbose / --json-logs shape the subscriber
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let config = Config::load(config_path, &cli)?;

    let json_logs = cli.json_logs;

    // Execute command
    match cli.command {
        Commands::Login {
            restore_context,
            listen,
            no_browser,
        } => {
            config.validate()?;
            tracing::info!("Starting login");
            commands::auth::login(&config, restore_context, listen, no_browser).await?;
            Ok(())
        }
        Commands::Callback { url, code, state } => {
            config.validate()?;
            commands::auth::callback(&config, url, code, state).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::auth::logout(&config)?;
            Ok(())
        }
        Commands::Status { fetch_user } => {
            commands::auth::status(&config, fetch_user).await?;
            Ok(())
        }
        Commands::Preview { point, format } => {
            commands::submit::preview(&config, &point, format);
            Ok(())
        }
        Commands::Submit { point, force } => {
            config.validate()?;
            let sink = commands::submit::progress_sink(json_logs);
            if let Some(node_id) =
                commands::submit::submit(&config, &point, force, sink.as_ref()).await?
            {
                println!("Created node {}", node_id);
            }
            Ok(())
        }
        Commands::Nearby { lat, lon, radius } => {
            let lookup = commands::nearby::overpass_client(&config)?;
            commands::nearby::list_nearby(&config, &lookup, lat, lon, radius).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "osm_submit=debug" } else { "osm_submit=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
