//! Geographic primitives shared by the editor and the provider adapters.
//!
//! Distances use the haversine formula. That is accurate enough for the
//! tolerance checks the editor performs (tens of metres) and for route
//! length summaries.

use serde::{Deserialize, Serialize};

/// Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 coordinate.
///
/// Serialized as a `[lng, lat]` pair, which is the order both OSRM and
/// GeoJSON use on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Great-circle distance to `other` in metres.
    pub fn haversine_m(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lng = (other.lng - self.lng).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }

    /// True when `other` lies within `tolerance_m` metres of this point.
    pub fn within(&self, other: &GeoPoint, tolerance_m: f64) -> bool {
        self == other || self.haversine_m(other) <= tolerance_m
    }

    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lng, lat): (f64, f64)) -> Self {
        Self { lng, lat }
    }
}

impl From<GeoPoint> for (f64, f64) {
    fn from(point: GeoPoint) -> Self {
        (point.lng, point.lat)
    }
}

/// An axis-aligned lng/lat box, used to bias place searches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl Bounds {
    pub fn new(south_west: GeoPoint, north_east: GeoPoint) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// A square box of roughly `radius_m` around `center`.
    pub fn around(center: GeoPoint, radius_m: f64) -> Self {
        let dlat = (radius_m / EARTH_RADIUS_M).to_degrees();
        let cos_lat = center.lat.to_radians().cos().max(1e-6);
        let dlng = dlat / cos_lat;
        Self {
            south_west: GeoPoint::new(center.lng - dlng, center.lat - dlat),
            north_east: GeoPoint::new(center.lng + dlng, center.lat + dlat),
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
            && point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
    }
}
