//! Geodesic distance between latitude/longitude pairs.
//!
//! Malformed coordinates never produce an error. They produce
//! [`GeoDistance::Invalid`], which every range check treats as out of range.

use geo::{Distance as _, Geodesic, Point};

/// Result of a distance computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoDistance {
    /// Distance along the WGS84 ellipsoid, in meters.
    Meters(f64),
    /// One of the inputs was not a usable coordinate.
    Invalid,
}

impl GeoDistance {
    /// Whether the distance is valid and no greater than `radius_m`.
    #[must_use]
    pub fn within(self, radius_m: f64) -> bool {
        match self {
            Self::Meters(m) => m <= radius_m,
            Self::Invalid => false,
        }
    }
}

/// Whether `(lat, lon)` is a finite coordinate on the globe.
#[must_use]
pub fn is_valid_coordinate((lat, lon): (f64, f64)) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

/// Geodesic distance between two `(lat, lon)` pairs.
#[must_use]
pub fn distance(p1: (f64, f64), p2: (f64, f64)) -> GeoDistance {
    if !is_valid_coordinate(p1) || !is_valid_coordinate(p2) {
        return GeoDistance::Invalid;
    }

    let a = Point::new(p1.1, p1.0);
    let b = Point::new(p2.1, p2.0);
    let meters = Geodesic.distance(a, b);

    if meters.is_finite() && meters >= 0.0 {
        GeoDistance::Meters(meters)
    } else {
        GeoDistance::Invalid
    }
}
