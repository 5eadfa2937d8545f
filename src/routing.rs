//! Routing provider adapter with a straight-line fallback.
//!
//! A failed provider call must not abort a drawing session. Any failure
//! degrades to the two-point segment `[from, to]`, flagged as approximate so
//! the caller can tell the user.

use tracing::{debug, warn};

use crate::geo::GeoPoint;
use crate::traits::RoutingProvider;

/// Default distance within which a provider endpoint is considered to be
/// the requested point.
pub const DEFAULT_TOLERANCE_M: f64 = 25.0;

/// Result of one provider round-trip between two reference points.
///
/// `points[0]` is always exactly `from` and the last point exactly `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub points: Vec<GeoPoint>,
    /// True when the provider failed and the straight fallback was used.
    pub approximate: bool,
}

impl Segment {
    pub fn straight(from: GeoPoint, to: GeoPoint) -> Self {
        Self {
            points: vec![from, to],
            approximate: true,
        }
    }

    pub fn start(&self) -> Option<GeoPoint> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<GeoPoint> {
        self.points.last().copied()
    }
}

/// Wraps a [`RoutingProvider`] and applies the fallback policy.
#[derive(Debug, Clone)]
pub struct RoutingAdapter<P> {
    provider: P,
    tolerance_m: f64,
}

impl<P: RoutingProvider> RoutingAdapter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            tolerance_m: DEFAULT_TOLERANCE_M,
        }
    }

    pub fn with_tolerance(mut self, tolerance_m: f64) -> Self {
        self.tolerance_m = tolerance_m;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Requests the road path from `from` to `to`. Never fails.
    pub fn request_segment(&self, from: GeoPoint, to: GeoPoint) -> Segment {
        if from == to {
            return Segment {
                points: vec![from],
                approximate: false,
            };
        }

        match self.provider.route(from, to) {
            Ok(points) => match self.normalize(from, to, points) {
                Some(points) => {
                    debug!(samples = points.len(), "routed segment");
                    Segment {
                        points,
                        approximate: false,
                    }
                }
                None => {
                    warn!(?from, ?to, "provider returned degenerate geometry, using straight line");
                    Segment::straight(from, to)
                }
            },
            Err(err) => {
                warn!(?from, ?to, error = %err, "routing provider unavailable, using straight line");
                Segment::straight(from, to)
            }
        }
    }

    /// Pins the provider's geometry to the requested endpoints.
    ///
    /// Providers snap to the road network, so their first and last samples
    /// are usually a few metres off. Samples within tolerance are replaced by
    /// the requested point, otherwise the requested point is added.
    fn normalize(&self, from: GeoPoint, to: GeoPoint, mut points: Vec<GeoPoint>) -> Option<Vec<GeoPoint>> {
        points.retain(GeoPoint::is_finite);
        points.dedup();
        if points.len() < 2 {
            return None;
        }

        if points[0].within(&from, self.tolerance_m) {
            points[0] = from;
        } else {
            points.insert(0, from);
        }

        let last = points.len() - 1;
        if points[last].within(&to, self.tolerance_m) {
            points[last] = to;
        } else {
            points.push(to);
        }

        points.dedup();
        if points.len() < 2 {
            return None;
        }
        Some(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;

    fn p(lng: f64, lat: f64) -> GeoPoint {
        GeoPoint::new(lng, lat)
    }

    fn stub<F>(f: F) -> RoutingAdapter<F>
    where
        F: Fn(GeoPoint, GeoPoint) -> Result<Vec<GeoPoint>, ProviderError>,
    {
        RoutingAdapter::new(f)
    }

    #[test]
    fn test_failure_falls_back_to_straight_line() {
        let adapter = stub(|_, _| Err(ProviderError::Status("503 Service Unavailable".into())));
        let a = p(28.0, -26.2);
        let b = p(28.1, -26.3);
        let segment = adapter.request_segment(a, b);
        assert_eq!(segment.points, vec![a, b]);
        assert!(segment.approximate);
    }

    #[test]
    fn test_empty_geometry_falls_back() {
        let adapter = stub(|_, _| Ok(Vec::new()));
        let segment = adapter.request_segment(p(28.0, -26.2), p(28.1, -26.3));
        assert!(segment.approximate);
        assert_eq!(segment.points.len(), 2);
    }

    #[test]
    fn test_snapped_endpoints_are_pinned() {
        let from = p(28.0, -26.2);
        let to = p(28.01, -26.21);
        let adapter = stub(|_, _| Ok(vec![p(28.00001, -26.20001), p(28.005, -26.2), p(28.01001, -26.21001)]));
        let segment = adapter.request_segment(from, to);
        assert!(!segment.approximate);
        assert_eq!(segment.start(), Some(from));
        assert_eq!(segment.end(), Some(to));
        assert_eq!(segment.points.len(), 3);
    }

    #[test]
    fn test_far_endpoints_are_connected() {
        let from = p(28.0, -26.2);
        let to = p(28.1, -26.3);
        let adapter = stub(|_, _| Ok(vec![p(28.03, -26.23), p(28.07, -26.27)]));
        let segment = adapter.request_segment(from, to);
        assert_eq!(segment.points.len(), 4);
        assert_eq!(segment.start(), Some(from));
        assert_eq!(segment.end(), Some(to));
    }

    #[test]
    fn test_duplicate_samples_are_removed() {
        let from = p(28.0, -26.2);
        let to = p(28.1, -26.3);
        let adapter = stub(move |_, _| Ok(vec![from, from, p(28.05, -26.25), p(28.05, -26.25), to]));
        let segment = adapter.request_segment(from, to);
        assert_eq!(segment.points, vec![from, p(28.05, -26.25), to]);
    }

    #[test]
    fn test_same_point_skips_provider() {
        let adapter = stub(|_, _| panic!("provider must not be called"));
        let a = p(28.0, -26.2);
        let segment = adapter.request_segment(a, a);
        assert_eq!(segment.points, vec![a]);
        assert!(!segment.approximate);
    }
}
