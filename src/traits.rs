//! Collaborator seams for the route editor.
//!
//! The editor itself holds no network clients and no rendering state. It
//! talks to a routing provider, a places provider and a map surface through
//! these traits; concrete apps (or tests) supply the implementations.

use crate::buffer::AnchorId;
use crate::error::ProviderError;
use crate::geo::GeoPoint;
use crate::places::{NamedPlace, PlaceQuery};

/// Point-to-point driving route service.
///
/// Returns the road path from `from` to `to` as an ordered list of samples.
/// Implementations report failures; the fallback policy lives in
/// [`crate::routing::RoutingAdapter`].
pub trait RoutingProvider {
    fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<Vec<GeoPoint>, ProviderError>;
}

impl<F> RoutingProvider for F
where
    F: Fn(GeoPoint, GeoPoint) -> Result<Vec<GeoPoint>, ProviderError>,
{
    fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<Vec<GeoPoint>, ProviderError> {
        self(from, to)
    }
}

/// Free-text place search, used to pick origin and destination ranks.
pub trait PlacesProvider {
    fn search(&self, query: &PlaceQuery) -> Result<Vec<NamedPlace>, ProviderError>;
}

/// Opaque handle to a marker drawn on the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

/// Which line of a route is being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// The committed dense buffer.
    Committed,
    /// Untouched samples before the waypoint being dragged.
    BehindOverlay,
    /// Untouched samples after the waypoint being dragged.
    ForwardOverlay,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineLayer {
    pub route: String,
    pub kind: LayerKind,
}

impl LineLayer {
    pub fn new(route: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            route: route.into(),
            kind,
        }
    }
}

/// Style hint passed along with line geometry. Rendering is up to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Active,
    Inactive,
    Overlay,
}

/// Renders markers and polylines, and is the source of click/drag events.
///
/// Event delivery is the caller's business: the UI layer translates surface
/// events into editor calls, passing the target [`AnchorId`] explicitly.
pub trait MapSurface {
    fn place_marker(&mut self, route: &str, anchor: AnchorId, at: GeoPoint) -> MarkerHandle;
    fn move_marker(&mut self, marker: MarkerHandle, at: GeoPoint);
    fn remove_marker(&mut self, marker: MarkerHandle);
    fn draw_line(&mut self, layer: &LineLayer, points: &[GeoPoint], style: LineStyle);
    fn clear_line(&mut self, layer: &LineLayer);
}
