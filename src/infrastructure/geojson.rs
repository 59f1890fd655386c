//! GeoJSON reading
//!
//! Accepts a `FeatureCollection`, a single `Feature`, or a bare geometry.
//! Coordinates are taken as-is; no reprojection happens.

use serde::Deserialize;
use serde_json::{Map, Value};

/// `[x, y]` or `[x, y, z]`.
pub type Position = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Position,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
}

impl Geometry {
    /// Upper-case OGC type name as used in `gpkg_geometry_columns`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "POINT",
            Geometry::MultiPoint { .. } => "MULTIPOINT",
            Geometry::LineString { .. } => "LINESTRING",
            Geometry::MultiLineString { .. } => "MULTILINESTRING",
            Geometry::Polygon { .. } => "POLYGON",
            Geometry::MultiPolygon { .. } => "MULTIPOLYGON",
            Geometry::GeometryCollection { .. } => "GEOMETRYCOLLECTION",
        }
    }

    /// Visit every position of the geometry.
    pub fn for_each_position<F: FnMut(&[f64])>(&self, f: &mut F) {
        match self {
            Geometry::Point { coordinates } => {
                if !coordinates.is_empty() {
                    f(coordinates)
                }
            }
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                coordinates.iter().for_each(|p| f(p))
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                coordinates.iter().flatten().for_each(|p| f(p))
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().for_each(|p| f(p))
            }
            Geometry::GeometryCollection { geometries } => {
                geometries.iter().for_each(|g| g.for_each_position(f))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        let mut any = false;
        self.for_each_position(&mut |_| any = true);
        !any
    }

    pub fn has_z(&self) -> bool {
        let mut z = false;
        self.for_each_position(&mut |p| z |= p.len() > 2);
        z
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

/// Parse any GeoJSON object into a list of features.
pub fn parse_features(content: &str) -> serde_json::Result<Vec<Feature>> {
    let value: Value = serde_json::from_str(content)?;
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            Ok(serde_json::from_value::<FeatureCollection>(value)?.features)
        }
        Some("Feature") => Ok(vec![serde_json::from_value::<Feature>(value)?]),
        _ => {
            let geometry = serde_json::from_value::<Geometry>(value)?;
            Ok(vec![Feature {
                geometry: Some(geometry),
                properties: None,
            }])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_feature_collection_when_parsing_then_keeps_order_and_properties() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                 "properties": {"name": "a"}},
                {"type": "Feature", "geometry": null, "properties": null}
            ]
        }"#;

        let features = parse_features(content).unwrap();

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].geometry.as_ref().unwrap().type_name(), "POINT");
        assert_eq!(
            features[0].properties.as_ref().unwrap()["name"],
            Value::from("a")
        );
        assert!(features[1].geometry.is_none());
        assert!(features[1].properties.is_none());
    }

    #[test]
    fn given_bare_geometry_when_parsing_then_wraps_in_feature() {
        let content = r#"{"type": "LineString", "coordinates": [[0, 0, 5], [1, 1, 6]]}"#;

        let features = parse_features(content).unwrap();

        let geometry = features[0].geometry.as_ref().unwrap();
        assert_eq!(geometry.type_name(), "LINESTRING");
        assert!(geometry.has_z());
        assert!(!geometry.is_empty());
    }

    #[test]
    fn given_empty_point_when_checking_then_is_empty() {
        let geometry: Geometry =
            serde_json::from_str(r#"{"type": "Point", "coordinates": []}"#).unwrap();
        assert!(geometry.is_empty());
    }

    #[test]
    fn given_unknown_type_when_parsing_then_fails() {
        assert!(parse_features(r#"{"type": "Circle", "radius": 3}"#).is_err());
    }
}
