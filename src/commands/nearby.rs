//! Nearby-feature listing and the pre-submission duplicate check

use crate::config::Config;
use crate::error::Result;
use crate::nearby::{NearbyFeature, NearbyLookup, OverpassClient};
use colored::Colorize;

/// Overpass client built from the `nearby` config section
pub fn overpass_client(config: &Config) -> Result<OverpassClient> {
    Ok(OverpassClient::new(
        config.http_client()?,
        config.nearby.overpass_url.clone(),
    ))
}

/// Lists features within `radius` (or the configured radius) of a point
pub async fn list_nearby(
    config: &Config,
    lookup: &dyn NearbyLookup,
    lat: f64,
    lon: f64,
    radius: Option<u32>,
) -> Result<Vec<NearbyFeature>> {
    let radius = radius.unwrap_or(config.nearby.radius_meters);
    let features = lookup.nearby(lat, lon, radius).await?;

    if features.is_empty() {
        println!("No amenities or shops within {} m.", radius);
    } else {
        println!("{} feature(s) within {} m:", features.len(), radius);
        for feature in &features {
            println!(
                "  {} {}/{} at {}, {}",
                feature.display_name().bold(),
                feature.kind,
                feature.id,
                feature.lat,
                feature.lon
            );
        }
    }

    Ok(features)
}

/// Duplicate check run before a submission
///
/// Returns true when the submission may go ahead. Lookup failures only warn.
pub async fn clear_to_submit(
    lookup: &dyn NearbyLookup,
    lat: f64,
    lon: f64,
    radius: u32,
    force: bool,
) -> bool {
    let features = match lookup.nearby(lat, lon, radius).await {
        Ok(features) => features,
        Err(e) => {
            tracing::warn!("Nearby check failed, continuing: {}", e);
            return true;
        }
    };

    if features.is_empty() {
        return true;
    }

    println!(
        "{} {} existing feature(s) within {} m:",
        "warning:".yellow(),
        features.len(),
        radius
    );
    for feature in &features {
        println!("  - {}", feature.display_name());
    }

    if force {
        tracing::info!(count = features.len(), "Submitting despite nearby features");
        true
    } else {
        println!("Re-run with --force to submit anyway.");
        false
    }
}
