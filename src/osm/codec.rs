//! Point-of-interest serialization
//!
//! Two pure, total encodings of a [`PointOfInterest`]: the API 0.6 XML node
//! document uploaded to the node-create endpoint, and a JSON preview.
//! Blank tag values are dropped from both.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default `generator` / `created_by` value
pub const DEFAULT_GENERATOR: &str = "OSM Submit";

/// A single node to be created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// OSM tags (`name`, `amenity`, `addr:street`, ...)
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl PointOfInterest {
    /// Creates a point with no tags
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            tags: BTreeMap::new(),
        }
    }

    /// Adds a tag, builder style
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Tags whose value is not empty or whitespace-only
    pub fn transmitted_tags(&self) -> impl Iterator<Item = (&String, &String)> {
        self.tags.iter().filter(|(_, v)| !v.trim().is_empty())
    }

    /// What the changeset comment calls this point: its name, or "a place"
    pub fn comment_subject(&self) -> &str {
        match self.tags.get("name") {
            Some(name) if !name.trim().is_empty() => name,
            _ => "a place",
        }
    }
}

/// Escapes the five XML-reserved characters.
///
/// # Examples
///
/// ```
/// use osm_submit::osm::codec::escape_xml;
///
/// assert_eq!(escape_xml(r#"<a href="x">Joe's & co</a>"#),
///            "&lt;a href=&quot;x&quot;&gt;Joe&apos;s &amp; co&lt;/a&gt;");
/// ```
pub fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

/// Rounds to 7 decimals (about 1 cm) and prints the shortest form.
///
/// `40.712800` becomes `40.7128`; Rust's float `Display` never uses an
/// exponent, so tiny values stay in plain decimal notation.
pub fn format_coordinate(value: f64) -> String {
    let rounded = (value * 1e7).round() / 1e7;
    // Avoid printing "-0".
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{}", rounded)
}

/// Renders the node-create document for `poi` inside `changeset_id`.
///
/// Output is byte-identical for identical input: tags are emitted in key
/// order.
///
/// # Examples
///
/// ```
/// use osm_submit::osm::codec::{to_osm_xml, PointOfInterest};
///
/// let poi = PointOfInterest::new(40.7128, -74.006).with_tag("amenity", "cafe");
/// let xml = to_osm_xml(&poi, "42", "OSM Submit");
/// assert!(xml.contains(r#"<node changeset="42" lat="40.7128" lon="-74.006">"#));
/// assert!(xml.contains(r#"<tag k="amenity" v="cafe"/>"#));
/// ```
pub fn to_osm_xml(poi: &PointOfInterest, changeset_id: &str, generator: &str) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!(
        "<osm version=\"0.6\" generator=\"{}\">\n",
        escape_xml(generator)
    ));
    xml.push_str(&format!(
        "  <node changeset=\"{}\" lat=\"{}\" lon=\"{}\">\n",
        escape_xml(changeset_id),
        format_coordinate(poi.lat),
        format_coordinate(poi.lon)
    ));
    for (key, value) in poi.transmitted_tags() {
        xml.push_str(&format!(
            "    <tag k=\"{}\" v=\"{}\"/>\n",
            escape_xml(key),
            escape_xml(value)
        ));
    }
    xml.push_str("  </node>\n");
    xml.push_str("</osm>");
    xml
}

#[derive(Serialize)]
struct JsonNode<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    lat: f64,
    lon: f64,
    tags: BTreeMap<&'a str, &'a str>,
}

/// Renders the JSON preview `{type: "node", lat, lon, tags}`.
///
/// # Examples
///
/// ```
/// use osm_submit::osm::codec::{to_osm_json, PointOfInterest};
///
/// let poi = PointOfInterest::new(1.5, 2.5).with_tag("name", " ");
/// let value: serde_json::Value = serde_json::from_str(&to_osm_json(&poi)).unwrap();
/// assert_eq!(value["type"], "node");
/// assert!(value["tags"].as_object().unwrap().is_empty());
/// ```
pub fn to_osm_json(poi: &PointOfInterest) -> String {
    let node = JsonNode {
        kind: "node",
        lat: poi.lat,
        lon: poi.lon,
        tags: poi
            .transmitted_tags()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect(),
    };
    // Strings and floats always serialize.
    serde_json::to_string_pretty(&node).unwrap_or_else(|_| "{}".to_string())
}

/// Renders the changeset-create document with `created_by` and `comment` tags.
pub fn changeset_xml(poi: &PointOfInterest, generator: &str) -> String {
    let comment = format!("Added {} via {}", poi.comment_subject(), generator);
    format!(
        "<osm>\n  <changeset>\n    <tag k=\"created_by\" v=\"{}\"/>\n    <tag k=\"comment\" v=\"{}\"/>\n  </changeset>\n</osm>",
        escape_xml(generator),
        escape_xml(&comment)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joes_pizza() -> PointOfInterest {
        PointOfInterest::new(40.712800, -74.006000)
            .with_tag("name", "Joe's Pizza")
            .with_tag("amenity", "restaurant")
    }

    #[test]
    fn test_xml_scenario_joes_pizza() {
        let xml = to_osm_xml(&joes_pizza(), "42", DEFAULT_GENERATOR);
        assert!(xml.contains(r#"<node changeset="42" lat="40.7128" lon="-74.006">"#));
        assert!(xml.contains(r#"<tag k="name" v="Joe&apos;s Pizza"/>"#));
        assert!(xml.contains(r#"<tag k="amenity" v="restaurant"/>"#));
    }

    #[test]
    fn test_xml_exact_document_shape() {
        let poi = PointOfInterest::new(1.0, 2.0).with_tag("amenity", "bench");
        let expected = concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<osm version=\"0.6\" generator=\"OSM Submit\">\n",
            "  <node changeset=\"7\" lat=\"1\" lon=\"2\">\n",
            "    <tag k=\"amenity\" v=\"bench\"/>\n",
            "  </node>\n",
            "</osm>"
        );
        assert_eq!(to_osm_xml(&poi, "7", DEFAULT_GENERATOR), expected);
    }

    #[test]
    fn test_xml_is_idempotent() {
        let poi = joes_pizza().with_tag("addr:city", "New York");
        assert_eq!(
            to_osm_xml(&poi, "42", DEFAULT_GENERATOR),
            to_osm_xml(&poi, "42", DEFAULT_GENERATOR)
        );
    }

    #[test]
    fn test_blank_tags_are_filtered_from_both_formats() {
        let poi = joes_pizza()
            .with_tag("cuisine", "")
            .with_tag("phone", "   ")
            .with_tag("website", "\t\n");
        let xml = to_osm_xml(&poi, "1", DEFAULT_GENERATOR);
        let json = to_osm_json(&poi);
        for key in ["cuisine", "phone", "website"] {
            assert!(!xml.contains(key), "{key} leaked into xml");
            assert!(!json.contains(key), "{key} leaked into json");
        }
        assert_eq!(poi.transmitted_tags().count(), 2);
    }

    #[test]
    fn test_escape_xml_all_reserved_characters() {
        assert_eq!(escape_xml("<>&'\""), "&lt;&gt;&amp;&apos;&quot;");
        assert_eq!(escape_xml("plain"), "plain");
        assert_eq!(escape_xml("Café – ü"), "Café – ü");
    }

    #[test]
    fn test_tag_keys_are_escaped() {
        let poi = PointOfInterest::new(0.0, 0.0).with_tag("a\"b", "v");
        let xml = to_osm_xml(&poi, "1", DEFAULT_GENERATOR);
        assert!(xml.contains(r#"k="a&quot;b""#));
    }

    #[test]
    fn test_format_coordinate_rounds_to_seven_decimals() {
        assert_eq!(format_coordinate(40.712800), "40.7128");
        assert_eq!(format_coordinate(-74.006), "-74.006");
        assert_eq!(format_coordinate(51.123456789), "51.1234568");
        assert_eq!(format_coordinate(0.00000001), "0");
        assert_eq!(format_coordinate(-0.0), "0");
        assert_eq!(format_coordinate(0.0000001), "0.0000001");
    }

    #[test]
    fn test_json_document_shape() {
        let value: serde_json::Value = serde_json::from_str(&to_osm_json(&joes_pizza())).unwrap();
        assert_eq!(value["type"], "node");
        assert_eq!(value["lat"], 40.7128);
        assert_eq!(value["lon"], -74.006);
        assert_eq!(value["tags"]["name"], "Joe's Pizza");
        assert_eq!(value["tags"]["amenity"], "restaurant");
    }

    #[test]
    fn test_json_is_pretty_printed() {
        let json = to_osm_json(&joes_pizza());
        assert!(json.starts_with("{\n  \"type\": \"node\""));
    }

    #[test]
    fn test_changeset_xml_uses_name_or_fallback() {
        let named = changeset_xml(&joes_pizza(), DEFAULT_GENERATOR);
        assert!(named.contains(r#"v="Added Joe&apos;s Pizza via OSM Submit""#));
        assert!(named.contains(r#"<tag k="created_by" v="OSM Submit"/>"#));

        let unnamed = changeset_xml(&PointOfInterest::new(0.0, 0.0), DEFAULT_GENERATOR);
        assert!(unnamed.contains("Added a place via OSM Submit"));
    }

    #[test]
    fn test_poi_deserializes_without_tags() {
        let poi: PointOfInterest = serde_json::from_str(r#"{"lat": 1.0, "lon": 2.0}"#).unwrap();
        assert!(poi.tags.is_empty());
    }
}
