//! Stub routing providers.

use route_sketch::error::ProviderError;
use route_sketch::geo::GeoPoint;
use route_sketch::routing::RoutingAdapter;
use route_sketch::traits::RoutingProvider;

/// Straight interpolation with `interior` evenly spaced samples.
pub fn interpolate(from: GeoPoint, to: GeoPoint, interior: usize) -> Vec<GeoPoint> {
    let steps = interior + 1;
    (0..=steps)
        .map(|k| {
            let t = k as f64 / steps as f64;
            GeoPoint::new(from.lng + (to.lng - from.lng) * t, from.lat + (to.lat - from.lat) * t)
        })
        .collect()
}

fn fixed(interior: usize) -> impl Fn(GeoPoint, GeoPoint) -> Result<Vec<GeoPoint>, ProviderError> {
    move |from, to| Ok(interpolate(from, to, interior))
}

/// Every segment has `interior` samples between its endpoints.
pub fn fixed_router(interior: usize) -> RoutingAdapter<impl RoutingProvider> {
    RoutingAdapter::new(fixed(interior))
}

fn varying(from: GeoPoint, to: GeoPoint) -> Result<Vec<GeoPoint>, ProviderError> {
    let seed = (from.lng * 1e4).round() as i64 + (to.lat * 1e4).round() as i64;
    Ok(interpolate(from, to, seed.rem_euclid(5) as usize))
}

/// Sample count depends on the endpoints, so replacing a segment usually
/// changes the buffer length.
pub fn varying_router() -> RoutingAdapter<impl RoutingProvider> {
    RoutingAdapter::new(varying)
}

fn unavailable(_from: GeoPoint, _to: GeoPoint) -> Result<Vec<GeoPoint>, ProviderError> {
    Err(ProviderError::Status("503 Service Unavailable".to_string()))
}

/// Always fails, forcing the straight-line fallback.
pub fn failing_router() -> RoutingAdapter<impl RoutingProvider> {
    RoutingAdapter::new(unavailable)
}
