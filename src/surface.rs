//! In-memory map surface.
//!
//! Keeps the markers and lines the editor pushes, so a headless caller (a
//! server-side preview, or a test) can inspect what a real map would show.

use std::collections::{BTreeMap, HashMap};

use crate::buffer::AnchorId;
use crate::geo::GeoPoint;
use crate::traits::{LayerKind, LineLayer, LineStyle, MapSurface, MarkerHandle};

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEntry {
    pub route: String,
    pub anchor: AnchorId,
    pub at: GeoPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineEntry {
    pub points: Vec<GeoPoint>,
    pub style: LineStyle,
}

#[derive(Debug, Default)]
pub struct MemorySurface {
    next_marker: u64,
    markers: BTreeMap<MarkerHandle, MarkerEntry>,
    lines: HashMap<LineLayer, LineEntry>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&MarkerEntry> {
        self.markers.get(&handle)
    }

    /// Markers currently bound to `route`, in placement order.
    pub fn markers_for(&self, route: &str) -> Vec<&MarkerEntry> {
        self.markers
            .values()
            .filter(|entry| entry.route == route)
            .collect()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn line(&self, route: &str, kind: LayerKind) -> Option<&LineEntry> {
        self.lines.get(&LineLayer::new(route, kind))
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl MapSurface for MemorySurface {
    fn place_marker(&mut self, route: &str, anchor: AnchorId, at: GeoPoint) -> MarkerHandle {
        let handle = MarkerHandle(self.next_marker);
        self.next_marker += 1;
        self.markers.insert(
            handle,
            MarkerEntry {
                route: route.to_string(),
                anchor,
                at,
            },
        );
        handle
    }

    fn move_marker(&mut self, marker: MarkerHandle, at: GeoPoint) {
        if let Some(entry) = self.markers.get_mut(&marker) {
            entry.at = at;
        }
    }

    fn remove_marker(&mut self, marker: MarkerHandle) {
        self.markers.remove(&marker);
    }

    fn draw_line(&mut self, layer: &LineLayer, points: &[GeoPoint], style: LineStyle) {
        self.lines.insert(
            layer.clone(),
            LineEntry {
                points: points.to_vec(),
                style,
            },
        );
    }

    fn clear_line(&mut self, layer: &LineLayer) {
        self.lines.remove(layer);
    }
}
