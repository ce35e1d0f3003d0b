//! Nearby-feature lookup
//!
//! Before creating a node the CLI checks whether the map already has a
//! point of interest close by. The lookup is a narrow interface: only ids,
//! coordinates and tags of the hits are exposed.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::osm::PointOfInterest;

pub mod overpass;

pub use overpass::OverpassClient;

/// An existing map element near a location
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyFeature {
    /// `node` or `way`
    pub kind: String,
    /// Element id
    pub id: u64,
    /// Node position or way center
    pub lat: f64,
    /// Node position or way center
    pub lon: f64,
    /// Element tags
    pub tags: BTreeMap<String, String>,
}

impl NearbyFeature {
    fn amenity(&self) -> Option<&str> {
        self.tags
            .get("amenity")
            .or_else(|| self.tags.get("shop"))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Short label: `name (amenity)`, `name`, the amenity, or `POI #id`
    ///
    /// # Examples
    ///
    /// ```
    /// use osm_submit::nearby::NearbyFeature;
    ///
    /// let feature = NearbyFeature {
    ///     kind: "node".to_string(),
    ///     id: 7,
    ///     lat: 0.0,
    ///     lon: 0.0,
    ///     tags: [("amenity".to_string(), "fast_food".to_string())].into(),
    /// };
    /// assert_eq!(feature.display_name(), "fast food");
    /// ```
    pub fn display_name(&self) -> String {
        let name = self
            .tags
            .get("name")
            .map(String::as_str)
            .filter(|v| !v.is_empty());
        match (name, self.amenity()) {
            (Some(name), Some(amenity)) => format!("{} ({})", name, amenity),
            (Some(name), None) => name.to_string(),
            (None, Some(amenity)) => amenity.replacen('_', " ", 1),
            (None, None) => format!("POI #{}", self.id),
        }
    }

    /// Draft point pre-filled from this feature
    ///
    /// `shop` is folded into `amenity` when the element has no amenity.
    pub fn to_point_of_interest(&self) -> PointOfInterest {
        let mut poi = PointOfInterest::new(self.lat, self.lon);
        poi.tags = self.tags.clone();
        if !poi.tags.contains_key("amenity") {
            if let Some(shop) = self.tags.get("shop") {
                poi.tags.insert("amenity".to_string(), shop.clone());
            }
        }
        poi
    }
}

/// Finds existing features around a coordinate
#[async_trait]
pub trait NearbyLookup: Send + Sync {
    /// Features within `radius_meters` of (`lat`, `lon`)
    async fn nearby(&self, lat: f64, lon: f64, radius_meters: u32) -> Result<Vec<NearbyFeature>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(tags: &[(&str, &str)]) -> NearbyFeature {
        NearbyFeature {
            kind: "node".to_string(),
            id: 99,
            lat: 1.0,
            lon: 2.0,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_display_name_variants() {
        assert_eq!(
            feature(&[("name", "Joe's"), ("amenity", "cafe")]).display_name(),
            "Joe's (cafe)"
        );
        assert_eq!(feature(&[("name", "Joe's")]).display_name(), "Joe's");
        assert_eq!(feature(&[("shop", "bakery")]).display_name(), "bakery");
        assert_eq!(feature(&[]).display_name(), "POI #99");
    }

    #[test]
    fn test_to_point_of_interest_folds_shop_into_amenity() {
        let poi = feature(&[("name", "Corner"), ("shop", "convenience")]).to_point_of_interest();
        assert_eq!(poi.lat, 1.0);
        assert_eq!(poi.tags.get("amenity").map(String::as_str), Some("convenience"));
        assert_eq!(poi.tags.get("name").map(String::as_str), Some("Corner"));
    }
}
