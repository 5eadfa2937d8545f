//! Johannesburg taxi ranks used as route origins and destinations.

use route_sketch::geo::GeoPoint;
use route_sketch::places::NamedPlace;

#[derive(Debug, Clone)]
pub struct Rank {
    pub name: &'static str,
    pub lng: f64,
    pub lat: f64,
}

impl Rank {
    pub const fn new(name: &'static str, lng: f64, lat: f64) -> Self {
        Self { name, lng, lat }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lng, self.lat)
    }

    pub fn place(&self) -> NamedPlace {
        NamedPlace::new(self.name, self.point())
    }
}

pub const BREE_STREET: Rank = Rank::new("Bree Street Taxi Rank", 28.0364, -26.2002);
pub const NOORD_STREET: Rank = Rank::new("Noord Street Taxi Rank", 28.0489, -26.1953);
pub const PARK_STATION: Rank = Rank::new("Park Station", 28.0424, -26.1968);
pub const BARA: Rank = Rank::new("Baragwanath Taxi Rank", 27.9397, -26.2617);
pub const RANDBURG: Rank = Rank::new("Randburg Taxi Rank", 28.0063, -26.0936);
pub const GERMISTON: Rank = Rank::new("Germiston Taxi Rank", 28.1685, -26.2178);

/// Clicks between Bree Street and Baragwanath, roughly along the Soweto Highway.
pub const SOWETO_CLICKS: &[(f64, f64)] = &[
    (28.0201, -26.2109),
    (27.9993, -26.2231),
    (27.9768, -26.2384),
    (27.9562, -26.2501),
];
