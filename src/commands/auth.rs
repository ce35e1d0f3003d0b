//! Login, callback, logout and status commands
//!
//! A CLI login spans two processes unless `--listen` is used: `login` persists
//! the session and prints the authorization URL, and `callback` completes it
//! from the redirect the browser landed on. The sled store carries the
//! session between them.

use super::{create_auth_provider, open_store};
use crate::auth::{wait_for_callback, CallbackOutcome, CallbackParams};
use crate::config::Config;
use crate::error::{OsmSubmitError, Result};
use crate::osm::OsmApiClient;
use colored::Colorize;
use url::Url;

/// Starts a login and, with `listen`, completes it on the loopback listener
///
/// # Arguments
///
/// * `config` - Loaded configuration
/// * `restore_context` - Optional JSON handed back after the callback
/// * `listen` - Wait for the redirect on the configured redirect URI
/// * `no_browser` - Only print the authorization URL
pub async fn login(
    config: &Config,
    restore_context: Option<String>,
    listen: bool,
    no_browser: bool,
) -> Result<()> {
    let restore_context = restore_context
        .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
        .transpose()
        .map_err(OsmSubmitError::Serialization)?;

    let store = open_store(config)?;
    let provider = create_auth_provider(config, store)?;

    let redirect = provider.begin_login(config.osm.environment, restore_context)?;
    tracing::info!(environment = %redirect.environment, "Login started");

    println!(
        "Open this URL to authorize OSM Submit on {}:\n\n  {}\n",
        redirect.environment.to_string().bold(),
        redirect.authorization_url
    );
    if !no_browser {
        try_open_browser(redirect.authorization_url.as_str());
    }

    if !listen {
        println!(
            "After approving, run:\n\n  osm-submit callback --url '<the URL your browser was sent to>'"
        );
        return Ok(());
    }

    let params = wait_for_callback(&config.osm.redirect_uri).await?;
    let outcome = provider.complete_callback(&params.code, &params.state).await?;
    report_login(&outcome);
    Ok(())
}

/// Completes a login from a redirect URL or an explicit code/state pair
///
/// # Errors
///
/// `InvalidCallback` when neither form is supplied or the URL is malformed,
/// otherwise whatever the provider's `complete_callback` returns
pub async fn callback(
    config: &Config,
    url: Option<String>,
    code: Option<String>,
    state: Option<String>,
) -> Result<CallbackOutcome> {
    let params = match (url, code, state) {
        (Some(url), _, _) => {
            let parsed = Url::parse(&url)
                .map_err(|e| OsmSubmitError::InvalidCallback(format!("invalid URL: {e}")))?;
            CallbackParams::from_url(&parsed)?
        }
        (None, Some(code), Some(state)) => CallbackParams { code, state },
        _ => {
            return Err(OsmSubmitError::InvalidCallback(
                "Missing authorization code or state".to_string(),
            )
            .into())
        }
    };

    let store = open_store(config)?;
    let provider = create_auth_provider(config, store)?;
    let outcome = provider.complete_callback(&params.code, &params.state).await?;
    report_login(&outcome);
    Ok(outcome)
}

fn report_login(outcome: &CallbackOutcome) {
    println!(
        "{} Logged in to {}",
        "✓".green(),
        outcome.environment.to_string().bold()
    );
    if let Some(context) = &outcome.restore_context {
        println!("Restored context: {}", context);
    }
}

/// Deletes the stored credential
pub fn logout(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let provider = create_auth_provider(config, store)?;
    provider.logout()?;
    println!("Logged out.");
    Ok(())
}

/// Reports whether a credential is stored, optionally asking the API who it
/// belongs to
pub async fn status(config: &Config, fetch_user: bool) -> Result<bool> {
    let store = open_store(config)?;
    let provider = create_auth_provider(config, store)?;

    let Some(credential) = provider.credential()? else {
        println!("Not logged in.");
        return Ok(false);
    };

    println!(
        "Logged in to {}",
        credential.environment.to_string().bold()
    );
    if credential.environment != config.osm.environment {
        println!(
            "{} configured environment is {}; submissions use the credential's environment",
            "warning:".yellow(),
            config.osm.environment
        );
    }

    if fetch_user {
        let client = OsmApiClient::new(config.http_client()?, config.endpoint_table());
        let user = client.user_details(&credential).await?;
        match user.id {
            Some(id) => println!("User: {} (#{})", user.display_name, id),
            None => println!("User: {}", user.display_name),
        }
        if let Some(avatar) = user.avatar_url {
            println!("Avatar: {}", avatar);
        }
    }

    Ok(true)
}

/// Best-effort attempt to open `url` in the system browser
fn try_open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    {
        let _ = std::process::Command::new("open").arg(url).spawn();
    }
    #[cfg(target_os = "linux")]
    {
        let _ = std::process::Command::new("xdg-open").arg(url).spawn();
    }
    #[cfg(target_os = "windows")]
    {
        let _ = std::process::Command::new("cmd")
            .args(["/C", "start", "", url])
            .spawn();
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        let _ = url;
    }
}
