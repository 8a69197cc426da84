//! Geometry types and the GeoJSON boundary conversion
//!
//! The canonical internal representation is a single polygon ring of
//! `(lat, lng)` points. GeoJSON positions are `[lng, lat]`, so the axis
//! order is swapped exactly once at this boundary — on ingest in
//! [`Polygon::from_geojson`] and on egress in [`Polygon::to_geojson_ring`].
//! No other code touches coordinate order.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single geographic point, latitude first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A polygon stored as its outer ring only
///
/// Hole rings and secondary MultiPolygon members are dropped on ingest;
/// the hierarchy model stores one boundary per entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub ring: Vec<GeoPoint>,
}

impl Polygon {
    /// Build a polygon from a GeoJSON geometry
    ///
    /// Accepts `Polygon` (first ring) and `MultiPolygon` (first ring of the
    /// first member polygon). Anything else is a geometry error for the
    /// caller to report against the offending feature.
    pub fn from_geojson(geometry: &geojson::Geometry) -> Result<Polygon> {
        let ring = match &geometry.value {
            geojson::Value::Polygon(rings) => rings
                .first()
                .ok_or_else(|| Error::Geometry("Polygon has no rings".to_string()))?,
            geojson::Value::MultiPolygon(polygons) => polygons
                .first()
                .and_then(|rings| rings.first())
                .ok_or_else(|| Error::Geometry("MultiPolygon has no rings".to_string()))?,
            other => {
                return Err(Error::Geometry(format!(
                    "Unsupported geometry type: {}",
                    geometry_type_name(other)
                )))
            }
        };

        let points = ring
            .iter()
            .map(|position| {
                if position.len() < 2 {
                    return Err(Error::Geometry(format!(
                        "Position has {} coordinates, expected at least 2",
                        position.len()
                    )));
                }
                // GeoJSON order is [lng, lat]
                Ok(GeoPoint {
                    lat: position[1],
                    lng: position[0],
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if points.is_empty() {
            return Err(Error::Geometry("Polygon ring is empty".to_string()));
        }

        Ok(Polygon { ring: points })
    }

    /// Emit the ring as GeoJSON `[lng, lat]` positions
    pub fn to_geojson_ring(&self) -> Vec<Vec<f64>> {
        self.ring.iter().map(|p| vec![p.lng, p.lat]).collect()
    }

    /// Emit a full GeoJSON Polygon geometry
    pub fn to_geojson_geometry(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::Polygon(vec![self.to_geojson_ring()]))
    }

    /// Serialize for the TEXT polygon column
    pub fn to_db_json(&self) -> String {
        // Polygon is a plain struct of f64 pairs; serialization cannot fail
        serde_json::to_string(self).expect("polygon serialization")
    }

    /// Deserialize from the TEXT polygon column
    pub fn from_db_json(raw: &str) -> Result<Polygon> {
        serde_json::from_str(raw)
            .map_err(|e| Error::Internal(format!("Corrupt polygon column: {}", e)))
    }
}

fn geometry_type_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polygon_geometry(rings: Vec<Vec<Vec<f64>>>) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::Polygon(rings))
    }

    #[test]
    fn ingest_swaps_axis_order() {
        let geometry = polygon_geometry(vec![vec![
            vec![-63.18, -17.78],
            vec![-63.17, -17.78],
            vec![-63.17, -17.79],
            vec![-63.18, -17.78],
        ]]);

        let polygon = Polygon::from_geojson(&geometry).unwrap();
        assert_eq!(polygon.ring[0], GeoPoint { lat: -17.78, lng: -63.18 });
        assert_eq!(polygon.ring[2], GeoPoint { lat: -17.79, lng: -63.17 });
    }

    #[test]
    fn egress_swaps_back_exactly_once() {
        let original = vec![vec![
            vec![-63.18, -17.78],
            vec![-63.17, -17.78],
            vec![-63.17, -17.79],
            vec![-63.18, -17.78],
        ]];
        let polygon = Polygon::from_geojson(&polygon_geometry(original.clone())).unwrap();

        // Round trip restores GeoJSON [lng, lat] order bit-for-bit
        assert_eq!(polygon.to_geojson_ring(), original[0]);
    }

    #[test]
    fn multipolygon_takes_first_ring_of_first_member() {
        let geometry = geojson::Geometry::new(geojson::Value::MultiPolygon(vec![
            vec![vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![1.0, 2.0]]],
            vec![vec![vec![9.0, 9.0], vec![8.0, 8.0], vec![9.0, 9.0]]],
        ]));

        let polygon = Polygon::from_geojson(&geometry).unwrap();
        assert_eq!(polygon.ring.len(), 3);
        assert_eq!(polygon.ring[0], GeoPoint { lat: 2.0, lng: 1.0 });
    }

    #[test]
    fn holes_are_ignored() {
        let geometry = polygon_geometry(vec![
            vec![vec![0.0, 0.0], vec![10.0, 0.0], vec![10.0, 10.0], vec![0.0, 0.0]],
            vec![vec![2.0, 2.0], vec![3.0, 2.0], vec![3.0, 3.0], vec![2.0, 2.0]],
        ]);

        let polygon = Polygon::from_geojson(&geometry).unwrap();
        assert_eq!(polygon.ring.len(), 4);
    }

    #[test]
    fn rejects_unsupported_geometry() {
        let geometry = geojson::Geometry::new(geojson::Value::Point(vec![1.0, 2.0]));
        let err = Polygon::from_geojson(&geometry).unwrap_err();
        assert!(err.to_string().contains("Unsupported geometry type"));
    }

    #[test]
    fn db_json_round_trip() {
        let polygon = Polygon {
            ring: vec![
                GeoPoint { lat: -17.78, lng: -63.18 },
                GeoPoint { lat: -17.79, lng: -63.17 },
            ],
        };

        let restored = Polygon::from_db_json(&polygon.to_db_json()).unwrap();
        assert_eq!(restored, polygon);
    }
}
