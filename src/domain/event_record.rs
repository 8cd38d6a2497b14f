//! One volcano's current lightning detection state.
//!
//! [`EventRecord`] is the flat in-memory form used by the parser and the
//! scheduler. On the wire (WebSocket payloads and the store's `features`
//! attribute) every record is a GeoJSON `Feature` with a `Point` geometry,
//! so serde goes through [`Feature`].

use serde::{Deserialize, Serialize};

/// Row severity derived from the report's row styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Sub-alert ("inner") row.
    Warning,
    /// Alert row.
    Alert,
}

/// Longitude/latitude pair in report column order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
}

impl Coordinates {
    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Returns `[longitude, latitude]`, the GeoJSON position order.
    #[must_use]
    pub const fn to_position(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// A volcano with recent lightning strikes, as listed in the report.
///
/// Only records whose strike counts are both non-zero are ever built, so
/// the counts are plain integers here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Feature", from = "Feature")]
pub struct EventRecord {
    /// Short volcano code, when the report carries one.
    pub identifier: Option<String>,
    /// Volcano name.
    pub name: Option<String>,
    /// Observatory area or region.
    pub area: Option<String>,
    /// Point location.
    pub coordinates: Coordinates,
    /// Strikes detected within 20 km.
    pub strikes_within_20km: u32,
    /// Strikes detected within 100 km.
    pub strikes_within_100km: u32,
    /// Descriptive volcano type (e.g. `"Stratovolcano"`).
    pub volcano_type: String,
    /// Row severity.
    pub severity: Severity,
}

/// GeoJSON `Feature` wire shape of an [`EventRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    /// Always `"Feature"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Point geometry.
    pub geometry: Geometry,
    /// Descriptive properties.
    pub properties: Properties,
}

/// GeoJSON `Point` geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    /// Always `"Point"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

/// Feature properties as consumed by the map frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    /// Short volcano code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    /// Volcano name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Observatory area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    /// Strikes within 20 km.
    pub twenty_km_strikes: u32,
    /// Strikes within 100 km.
    pub hundred_km_strikes: u32,
    /// Volcano type.
    #[serde(default)]
    pub volcano_type: String,
    /// Row severity.
    pub severity: Severity,
}

impl From<EventRecord> for Feature {
    fn from(record: EventRecord) -> Self {
        Self {
            kind: "Feature".to_string(),
            geometry: Geometry {
                kind: "Point".to_string(),
                coordinates: record.coordinates.to_position(),
            },
            properties: Properties {
                number: record.identifier,
                name: record.name,
                area: record.area,
                twenty_km_strikes: record.strikes_within_20km,
                hundred_km_strikes: record.strikes_within_100km,
                volcano_type: record.volcano_type,
                severity: record.severity,
            },
        }
    }
}

impl From<Feature> for EventRecord {
    fn from(feature: Feature) -> Self {
        let [longitude, latitude] = feature.geometry.coordinates;
        let props = feature.properties;
        Self {
            identifier: props.number,
            name: props.name,
            area: props.area,
            coordinates: Coordinates::new(longitude, latitude),
            strikes_within_20km: props.twenty_km_strikes,
            strikes_within_100km: props.hundred_km_strikes,
            volcano_type: props.volcano_type,
            severity: props.severity,
        }
    }
}
