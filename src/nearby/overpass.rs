//! Overpass API backed [`NearbyLookup`]

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::{NearbyFeature, NearbyLookup};
use crate::error::{OsmSubmitError, Result};

/// Public Overpass endpoint
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    /// Nodes carry their own position, ways a computed center
    fn into_feature(self) -> Option<NearbyFeature> {
        let (lat, lon) = match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => (lat, lon),
            (_, _, Some(center)) => (center.lat, center.lon),
            _ => return None,
        };
        Some(NearbyFeature {
            kind: self.kind,
            id: self.id,
            lat,
            lon,
            tags: self.tags,
        })
    }
}

/// Builds the Overpass QL query for amenities and shops around a point
pub fn build_query(lat: f64, lon: f64, radius_meters: u32) -> String {
    let around = format!("around:{},{},{}", radius_meters, lat, lon);
    format!(
        "[out:json][timeout:10];\n(\n  node({around})[amenity];\n  node({around})[shop];\n  way({around})[amenity];\n  way({around})[shop];\n);\nout tags center;",
        around = around
    )
}

/// Queries an Overpass interpreter endpoint
#[derive(Clone)]
pub struct OverpassClient {
    http: reqwest::Client,
    url: String,
}

impl OverpassClient {
    /// Creates a client posting queries to `url`
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl NearbyLookup for OverpassClient {
    async fn nearby(&self, lat: f64, lon: f64, radius_meters: u32) -> Result<Vec<NearbyFeature>> {
        let query = build_query(lat, lon, radius_meters);
        tracing::debug!(url = %self.url, radius_meters, "Querying Overpass");

        let resp = self
            .http
            .post(&self.url)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .map_err(OsmSubmitError::Http)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OsmSubmitError::Nearby(format!(
                "Overpass returned {}: {}",
                status.as_u16(),
                body
            ))
            .into());
        }

        let parsed: OverpassResponse = resp
            .json()
            .await
            .map_err(|e| OsmSubmitError::Nearby(format!("unreadable Overpass response: {e}")))?;

        let features: Vec<NearbyFeature> = parsed
            .elements
            .into_iter()
            .filter_map(OverpassElement::into_feature)
            .collect();
        tracing::debug!(count = features.len(), "Nearby features found");
        Ok(features)
    }
}
