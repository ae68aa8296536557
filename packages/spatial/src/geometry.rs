//! Polygon helpers: centroids, envelopes, and `GeoJSON` conversion.

use geo::{BoundingRect as _, Centroid as _, MultiPolygon};
use rstar::AABB;

/// Centroid of a polygon as `(lat, lon)`.
///
/// Returns `None` for empty or non-finite geometry.
#[must_use]
pub fn centroid(polygon: &MultiPolygon<f64>) -> Option<(f64, f64)> {
    let point = polygon.centroid()?;
    let (lat, lon) = (point.y(), point.x());
    (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
#[must_use]
pub fn geometry_to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
pub(crate) fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polygon(json: &str) -> Option<MultiPolygon<f64>> {
        geometry_to_multipolygon(json.parse::<geojson::Geometry>().unwrap())
    }

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[-74.0,40.0],[-73.0,40.0],[-73.0,41.0],[-74.0,41.0],[-74.0,40.0]]]}"#;

    #[test]
    fn centroid_of_square() {
        let mp = polygon(SQUARE).unwrap();
        let (lat, lon) = centroid(&mp).unwrap();
        assert!((lat - 40.5).abs() < 1e-9);
        assert!((lon + 73.5).abs() < 1e-9);
    }

    #[test]
    fn centroid_of_empty_is_none() {
        assert!(centroid(&MultiPolygon(vec![])).is_none());
    }

    #[test]
    fn rejects_non_polygon_geometry() {
        let point = r#"{"type":"Point","coordinates":[-73.9,40.7]}"#;
        assert!(polygon(point).is_none());
    }

    #[test]
    fn envelope_covers_polygon() {
        let mp = polygon(SQUARE).unwrap();
        let env = compute_envelope(&mp).unwrap();
        assert_eq!(env.lower(), [-74.0, 40.0]);
        assert_eq!(env.upper(), [-73.0, 41.0]);
    }
}
