//! Edit engine for one named route.
//!
//! Operations that need the routing provider run in two phases. `begin_*`
//! validates the input, marks the route as waiting on the provider and
//! hands back a [`PendingEdit`] listing the segments to fetch; `resolve`
//! splices the fetched segments in. Until then every other input on this
//! route is rejected, so a second click cannot read a half-updated buffer.
//! The `append`, `finish` and `drop_at` wrappers run both phases in one call.

use tracing::debug;

use crate::buffer::{AnchorId, AnchorWaypoint, RouteBuffer, RouteKind, RouteState};
use crate::error::EditError;
use crate::geo::GeoPoint;
use crate::polyline::Polyline;
use crate::routing::{RoutingAdapter, Segment, DEFAULT_TOLERANCE_M};
use crate::traits::{LayerKind, LineLayer, LineStyle, MapSurface, RoutingProvider};

#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// How far a dense sample may sit from the anchor it belongs to.
    pub tolerance_m: f64,
    /// Clicks closer than this to the previous waypoint are rejected.
    pub duplicate_click_m: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tolerance_m: DEFAULT_TOLERANCE_M,
            duplicate_click_m: 0.5,
        }
    }
}

/// One provider round-trip an edit is waiting on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRequest {
    pub from: GeoPoint,
    pub to: GeoPoint,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingOp {
    Append { at: GeoPoint },
    Finish,
    Move { anchor: AnchorId, to: GeoPoint },
}

/// Ticket for an edit waiting on the routing provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdit {
    ticket: u64,
    op: PendingOp,
    requests: Vec<SegmentRequest>,
}

impl PendingEdit {
    pub fn requests(&self) -> &[SegmentRequest] {
        &self.requests
    }

    /// Fetches every requested segment through `router`.
    pub fn fetch<P: RoutingProvider>(&self, router: &RoutingAdapter<P>) -> Vec<Segment> {
        self.requests
            .iter()
            .map(|request| router.request_segment(request.from, request.to))
            .collect()
    }
}

/// Non-fatal notes about a completed edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditWarning {
    /// The provider failed; this leg is a straight line.
    ApproximateSegment { from: GeoPoint, to: GeoPoint },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditOutcome {
    pub warnings: Vec<EditWarning>,
}

/// Untouched parts of the line shown while a waypoint is dragged.
#[derive(Debug, Clone, PartialEq)]
pub struct DragOverlay {
    pub behind: Vec<GeoPoint>,
    pub forward: Vec<GeoPoint>,
}

#[derive(Debug, Clone)]
struct DragSession {
    anchor: AnchorId,
    origin: GeoPoint,
    resume: RouteState,
}

#[derive(Debug, Clone)]
pub struct RouteEditor {
    name: String,
    buffer: RouteBuffer,
    config: EditorConfig,
    style: LineStyle,
    pending: Option<(u64, PendingOp)>,
    drag: Option<DragSession>,
    next_ticket: u64,
}

impl RouteEditor {
    pub fn new(name: impl Into<String>, kind: RouteKind, config: EditorConfig) -> Self {
        Self {
            name: name.into(),
            buffer: RouteBuffer::new(kind, config.tolerance_m),
            config,
            style: LineStyle::Active,
            pending: None,
            drag: None,
            next_ticket: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RouteState {
        self.buffer.state()
    }

    pub fn buffer(&self) -> &RouteBuffer {
        &self.buffer
    }

    pub fn anchors(&self) -> &[AnchorWaypoint] {
        self.buffer.anchors()
    }

    pub fn dense(&self) -> &Polyline {
        self.buffer.dense()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Length of the drawn line in metres.
    pub fn distance_m(&self) -> f64 {
        self.buffer.dense().length_m()
    }

    pub fn check_invariants(&self) -> Result<(), EditError> {
        Ok(self.buffer.check_invariants()?)
    }

    /// Starts drawing. A straight route gets its origin rank as anchor 0.
    pub fn start(&mut self, surface: &mut dyn MapSurface) -> Result<(), EditError> {
        if self.buffer.state() != RouteState::Idle {
            return Err(EditError::NotIdle(self.buffer.state()));
        }
        if let RouteKind::Straight { origin, .. } = *self.buffer.kind() {
            let id = self.buffer.allocate_id();
            let marker = surface.place_marker(&self.name, id, origin);
            self.buffer.seed(id, origin, marker);
        }
        self.buffer.set_state(RouteState::Drawing);
        debug!(route = %self.name, "started drawing");
        self.redraw(surface);
        Ok(())
    }

    pub fn begin_append(&mut self, at: GeoPoint) -> Result<PendingEdit, EditError> {
        self.ensure_drawing()?;
        if !at.is_finite() {
            return Err(EditError::InvalidPosition);
        }

        let requests = match self.buffer.last_anchor() {
            // First point of a loop: it becomes the origin, nothing to route.
            None => Vec::new(),
            Some(prev) => {
                if prev.position().within(&at, self.config.duplicate_click_m) {
                    return Err(EditError::DuplicateWaypoint);
                }
                vec![SegmentRequest {
                    from: prev.position(),
                    to: at,
                }]
            }
        };
        Ok(self.issue(PendingOp::Append { at }, requests))
    }

    pub fn begin_finish(&mut self) -> Result<PendingEdit, EditError> {
        self.ensure_drawing()?;
        let required = self.buffer.kind().min_anchors_to_finish();
        let found = self.buffer.anchors().len();
        if found < required {
            return Err(EditError::InsufficientWaypoints { required, found });
        }

        let (Some(last), Some(endpoint)) = (self.buffer.last_anchor(), self.buffer.endpoint()) else {
            return Err(EditError::InsufficientWaypoints { required, found });
        };
        let request = SegmentRequest {
            from: last.position(),
            to: endpoint,
        };
        Ok(self.issue(PendingOp::Finish, vec![request]))
    }

    /// Removes `anchor` and everything drawn after it.
    ///
    /// This is a tail truncation: the part after the removed waypoint is not
    /// reconnected and has to be drawn again. A finished route reopens.
    /// Removing a loop's first point empties the route; a straight route's
    /// origin rank stays.
    pub fn remove_from(&mut self, anchor: AnchorId, surface: &mut dyn MapSurface) -> Result<Vec<AnchorId>, EditError> {
        self.ensure_idle_input()?;
        match self.buffer.state() {
            RouteState::Drawing | RouteState::Finished => {}
            state => return Err(EditError::NotDrawing(state)),
        }
        let pos = self
            .buffer
            .position_of(anchor)
            .ok_or(EditError::UnknownAnchor(anchor))?;
        if pos == 0 && matches!(self.buffer.kind(), RouteKind::Straight { .. }) {
            return Err(EditError::OriginLocked);
        }

        let mut next = self.buffer.clone();
        let removed = next.truncate_from(pos);
        next.set_state(RouteState::Drawing);
        next.check_invariants()?;
        self.buffer = next;

        for waypoint in &removed {
            surface.remove_marker(waypoint.marker());
        }
        debug!(route = %self.name, %anchor, removed = removed.len(), "truncated route");
        self.redraw(surface);
        Ok(removed.iter().map(AnchorWaypoint::id).collect())
    }

    /// Picks up `anchor` for dragging.
    ///
    /// The committed line is replaced by two overlays: the samples up to the
    /// predecessor and the samples from the anchor onward. Only the part
    /// between them is routed again when the anchor is dropped.
    pub fn begin_drag(&mut self, anchor: AnchorId, surface: &mut dyn MapSurface) -> Result<DragOverlay, EditError> {
        self.ensure_idle_input()?;
        let resume = self.buffer.state();
        match resume {
            RouteState::Drawing | RouteState::Finished => {}
            state => return Err(EditError::NotDrawing(state)),
        }
        let pos = self
            .buffer
            .position_of(anchor)
            .ok_or(EditError::UnknownAnchor(anchor))?;
        if pos == 0 {
            return Err(EditError::OriginLocked);
        }

        let points = self.buffer.dense().points();
        let prev_index = self.buffer.anchors()[pos - 1].buffer_index();
        let behind = points[..=prev_index].to_vec();
        let forward = points[self.buffer.anchors()[pos].buffer_index()..].to_vec();

        self.drag = Some(DragSession {
            anchor,
            origin: self.buffer.anchors()[pos].position(),
            resume,
        });
        self.buffer.set_state(RouteState::Editing);

        surface.clear_line(&self.layer(LayerKind::Committed));
        surface.draw_line(&self.layer(LayerKind::BehindOverlay), &behind, LineStyle::Overlay);
        surface.draw_line(&self.layer(LayerKind::ForwardOverlay), &forward, LineStyle::Overlay);
        debug!(route = %self.name, %anchor, "dragging waypoint");
        Ok(DragOverlay { behind, forward })
    }

    /// Follows the cursor with the dragged marker. No routing happens.
    pub fn drag_over(&mut self, at: GeoPoint, surface: &mut dyn MapSurface) -> Result<(), EditError> {
        let session = self.drag.as_ref().ok_or(EditError::NotEditing)?;
        let pos = self
            .buffer
            .position_of(session.anchor)
            .ok_or(EditError::UnknownAnchor(session.anchor))?;
        surface.move_marker(self.buffer.anchors()[pos].marker(), at);
        Ok(())
    }

    /// Drops the dragged anchor at `at`.
    ///
    /// Only the leg from the predecessor is routed again. Samples after the
    /// anchor's old position are kept and now follow `at` directly.
    pub fn begin_drop(&mut self, at: GeoPoint) -> Result<PendingEdit, EditError> {
        self.ensure_idle_input()?;
        let session = self.drag.as_ref().ok_or(EditError::NotEditing)?;
        if !at.is_finite() {
            return Err(EditError::InvalidPosition);
        }
        let anchor = session.anchor;
        let pos = self
            .buffer
            .position_of(anchor)
            .ok_or(EditError::UnknownAnchor(anchor))?;

        let prev = self.buffer.anchors()[pos - 1].position();
        let following = self
            .buffer
            .dense()
            .get(self.buffer.anchors()[pos].buffer_index() + 1)
            .copied();
        let tolerance = self.config.duplicate_click_m;
        if prev.within(&at, tolerance) || following.is_some_and(|next| next.within(&at, tolerance)) {
            return Err(EditError::DuplicateWaypoint);
        }

        let request = SegmentRequest { from: prev, to: at };
        Ok(self.issue(PendingOp::Move { anchor, to: at }, vec![request]))
    }

    /// Puts the dragged waypoint back and restores the committed line.
    pub fn cancel_drag(&mut self, surface: &mut dyn MapSurface) -> Result<(), EditError> {
        self.ensure_idle_input()?;
        let session = self.drag.take().ok_or(EditError::NotEditing)?;
        if let Some(pos) = self.buffer.position_of(session.anchor) {
            surface.move_marker(self.buffer.anchors()[pos].marker(), session.origin);
        }
        self.buffer.set_state(session.resume);
        self.clear_overlays(surface);
        self.redraw(surface);
        Ok(())
    }

    /// Applies the segments fetched for `pending`.
    ///
    /// On error the pending edit is discarded and the buffer is unchanged;
    /// a dragged waypoint stays picked up so it can be dropped again.
    pub fn resolve(
        &mut self,
        pending: PendingEdit,
        segments: Vec<Segment>,
        surface: &mut dyn MapSurface,
    ) -> Result<EditOutcome, EditError> {
        match self.pending {
            Some((ticket, _)) if ticket == pending.ticket => {}
            _ => return Err(EditError::StalePending),
        }
        let Some((_, op)) = self.pending.take() else {
            return Err(EditError::StalePending);
        };

        if segments.len() != pending.requests.len() {
            return Err(EditError::SegmentMismatch {
                expected: pending.requests.len(),
                found: segments.len(),
            });
        }
        for (request, segment) in pending.requests.iter().zip(&segments) {
            if segment.start() != Some(request.from) || segment.end() != Some(request.to) {
                return Err(EditError::SegmentEndpointMismatch);
            }
        }

        let warnings = segments
            .iter()
            .filter(|segment| segment.approximate)
            .map(|segment| EditWarning::ApproximateSegment {
                from: segment.points[0],
                to: segment.points[segment.points.len() - 1],
            })
            .collect();

        match op {
            PendingOp::Append { at } => self.apply_append(at, &segments, surface)?,
            PendingOp::Finish => self.apply_finish(&segments)?,
            PendingOp::Move { anchor, to } => self.apply_move(anchor, to, &segments, surface)?,
        }

        self.redraw(surface);
        Ok(EditOutcome { warnings })
    }

    pub fn append<P: RoutingProvider>(
        &mut self,
        at: GeoPoint,
        router: &RoutingAdapter<P>,
        surface: &mut dyn MapSurface,
    ) -> Result<EditOutcome, EditError> {
        let pending = self.begin_append(at)?;
        let segments = pending.fetch(router);
        self.resolve(pending, segments, surface)
    }

    pub fn finish<P: RoutingProvider>(
        &mut self,
        router: &RoutingAdapter<P>,
        surface: &mut dyn MapSurface,
    ) -> Result<EditOutcome, EditError> {
        let pending = self.begin_finish()?;
        let segments = pending.fetch(router);
        self.resolve(pending, segments, surface)
    }

    pub fn drop_at<P: RoutingProvider>(
        &mut self,
        at: GeoPoint,
        router: &RoutingAdapter<P>,
        surface: &mut dyn MapSurface,
    ) -> Result<EditOutcome, EditError> {
        let pending = self.begin_drop(at)?;
        let segments = pending.fetch(router);
        self.resolve(pending, segments, surface)
    }

    /// Discards the whole route, including any edit still waiting on the
    /// provider, and returns to `Idle`.
    pub fn clear(&mut self, surface: &mut dyn MapSurface) {
        for waypoint in self.buffer.clear() {
            surface.remove_marker(waypoint.marker());
        }
        self.pending = None;
        self.drag = None;
        self.clear_overlays(surface);
        surface.clear_line(&self.layer(LayerKind::Committed));
        debug!(route = %self.name, "cleared route");
    }

    pub fn set_style(&mut self, style: LineStyle, surface: &mut dyn MapSurface) {
        self.style = style;
        if self.drag.is_none() {
            self.redraw(surface);
        }
    }

    fn apply_append(&mut self, at: GeoPoint, segments: &[Segment], surface: &mut dyn MapSurface) -> Result<(), EditError> {
        let mut next = self.buffer.clone();
        let id = next.allocate_id();
        let marker = surface.place_marker(&self.name, id, at);
        match segments.first() {
            None => next.seed(id, at, marker),
            Some(segment) => next.push_anchor(id, &segment.points, marker),
        }

        if let Err(violation) = next.check_invariants() {
            surface.remove_marker(marker);
            return Err(violation.into());
        }
        self.buffer = next;
        debug!(route = %self.name, anchor = %id, samples = self.buffer.dense().len(), "appended waypoint");
        Ok(())
    }

    fn apply_finish(&mut self, segments: &[Segment]) -> Result<(), EditError> {
        let mut next = self.buffer.clone();
        if let Some(segment) = segments.first() {
            next.close(&segment.points);
        }
        next.set_state(RouteState::Finished);
        next.check_invariants()?;
        self.buffer = next;
        debug!(route = %self.name, samples = self.buffer.dense().len(), "finished route");
        Ok(())
    }

    fn apply_move(
        &mut self,
        anchor: AnchorId,
        to: GeoPoint,
        segments: &[Segment],
        surface: &mut dyn MapSurface,
    ) -> Result<(), EditError> {
        let pos = self
            .buffer
            .position_of(anchor)
            .ok_or(EditError::UnknownAnchor(anchor))?;
        let Some(upstream) = segments.first() else {
            return Err(EditError::SegmentMismatch { expected: 1, found: 0 });
        };

        let mut next = self.buffer.clone();
        next.splice_move(pos, &upstream.points);
        if let Some(session) = &self.drag {
            next.set_state(session.resume);
        }
        next.check_invariants()?;
        self.buffer = next;

        surface.move_marker(self.buffer.anchors()[pos].marker(), to);
        self.drag = None;
        self.clear_overlays(surface);
        debug!(route = %self.name, %anchor, samples = self.buffer.dense().len(), "moved waypoint");
        Ok(())
    }

    fn issue(&mut self, op: PendingOp, requests: Vec<SegmentRequest>) -> PendingEdit {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending = Some((ticket, op));
        PendingEdit { ticket, op, requests }
    }

    fn ensure_idle_input(&self) -> Result<(), EditError> {
        if self.pending.is_some() {
            return Err(EditError::OperationPending);
        }
        Ok(())
    }

    fn ensure_drawing(&self) -> Result<(), EditError> {
        self.ensure_idle_input()?;
        match self.buffer.state() {
            RouteState::Drawing => Ok(()),
            RouteState::Finished => Err(EditError::AlreadyFinished),
            state => Err(EditError::NotDrawing(state)),
        }
    }

    fn layer(&self, kind: LayerKind) -> LineLayer {
        LineLayer::new(self.name.clone(), kind)
    }

    fn clear_overlays(&self, surface: &mut dyn MapSurface) {
        surface.clear_line(&self.layer(LayerKind::BehindOverlay));
        surface.clear_line(&self.layer(LayerKind::ForwardOverlay));
    }

    fn redraw(&self, surface: &mut dyn MapSurface) {
        let layer = self.layer(LayerKind::Committed);
        if self.buffer.dense().is_empty() {
            surface.clear_line(&layer);
        } else {
            surface.draw_line(&layer, self.buffer.dense().points(), self.style);
        }
    }
}
