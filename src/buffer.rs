//! Route buffer: anchors, the dense polyline and their markers, kept in step.
//!
//! Each anchor records the dense-buffer index of the sample it corresponds
//! to. All mutation goes through methods that keep those indices correct,
//! and [`RouteBuffer::check_invariants`] verifies them after every edit.

use std::fmt;

use crate::error::InvariantViolation;
use crate::geo::GeoPoint;
use crate::polyline::Polyline;
use crate::traits::MarkerHandle;

/// Order in which an anchor was placed. Never reused within a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(pub u32);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Idle,
    Drawing,
    Editing,
    Finished,
}

/// Where a route starts and where `finish` closes it to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteKind {
    /// Starts at the origin rank, finishes at the destination rank.
    Straight { origin: GeoPoint, destination: GeoPoint },
    /// Starts at the first placed point and finishes back there.
    Loop,
}

impl RouteKind {
    /// Anchors needed before `finish` is allowed.
    pub fn min_anchors_to_finish(&self) -> usize {
        match self {
            RouteKind::Straight { .. } => 2,
            RouteKind::Loop => 1,
        }
    }
}

/// A user-placed vertex of the route.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorWaypoint {
    id: AnchorId,
    position: GeoPoint,
    buffer_index: usize,
    marker: MarkerHandle,
}

impl AnchorWaypoint {
    pub fn id(&self) -> AnchorId {
        self.id
    }

    pub fn position(&self) -> GeoPoint {
        self.position
    }

    /// Index of this anchor's sample in the dense buffer.
    pub fn buffer_index(&self) -> usize {
        self.buffer_index
    }

    pub fn marker(&self) -> MarkerHandle {
        self.marker
    }
}

#[derive(Debug, Clone)]
pub struct RouteBuffer {
    kind: RouteKind,
    anchors: Vec<AnchorWaypoint>,
    dense: Polyline,
    state: RouteState,
    /// The closing segment to the endpoint has been appended.
    closed: bool,
    next_id: u32,
    tolerance_m: f64,
}

impl RouteBuffer {
    pub fn new(kind: RouteKind, tolerance_m: f64) -> Self {
        Self {
            kind,
            anchors: Vec::new(),
            dense: Polyline::default(),
            state: RouteState::Idle,
            closed: false,
            next_id: 0,
            tolerance_m,
        }
    }

    pub fn kind(&self) -> &RouteKind {
        &self.kind
    }

    pub fn anchors(&self) -> &[AnchorWaypoint] {
        &self.anchors
    }

    pub fn dense(&self) -> &Polyline {
        &self.dense
    }

    pub fn state(&self) -> RouteState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn last_anchor(&self) -> Option<&AnchorWaypoint> {
        self.anchors.last()
    }

    pub fn position_of(&self, id: AnchorId) -> Option<usize> {
        self.anchors.iter().position(|anchor| anchor.id == id)
    }

    /// The origin anchor's position: dense[0] whenever anchors exist.
    pub fn origin(&self) -> Option<GeoPoint> {
        match self.kind {
            RouteKind::Straight { origin, .. } => Some(origin),
            RouteKind::Loop => self.anchors.first().map(|anchor| anchor.position),
        }
    }

    /// The point `finish` closes the route to.
    pub fn endpoint(&self) -> Option<GeoPoint> {
        match self.kind {
            RouteKind::Straight { destination, .. } => Some(destination),
            RouteKind::Loop => self.origin(),
        }
    }

    pub(crate) fn set_state(&mut self, state: RouteState) {
        self.state = state;
    }

    pub(crate) fn allocate_id(&mut self) -> AnchorId {
        let id = AnchorId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Places the first anchor. No provider call is involved.
    pub(crate) fn seed(&mut self, id: AnchorId, position: GeoPoint, marker: MarkerHandle) {
        debug_assert!(self.anchors.is_empty());
        self.dense.clear();
        self.dense.append_joined(&[position]);
        self.anchors.push(AnchorWaypoint {
            id,
            position,
            buffer_index: 0,
            marker,
        });
    }

    /// Appends the segment leading from the last anchor to a new anchor at
    /// the segment's last point.
    pub(crate) fn push_anchor(&mut self, id: AnchorId, segment: &[GeoPoint], marker: MarkerHandle) {
        let Some(&position) = segment.last() else {
            return;
        };
        let buffer_index = self.dense.append_joined(segment);
        self.anchors.push(AnchorWaypoint {
            id,
            position,
            buffer_index,
            marker,
        });
    }

    /// Appends the closing segment from the last anchor to the endpoint.
    pub(crate) fn close(&mut self, segment: &[GeoPoint]) {
        self.dense.append_joined(segment);
        self.closed = true;
    }

    /// Removes the anchor at `pos` and everything drawn after it.
    ///
    /// The dense buffer is cut back to the predecessor's sample. Returns the
    /// removed anchors so the caller can drop their markers.
    pub(crate) fn truncate_from(&mut self, pos: usize) -> Vec<AnchorWaypoint> {
        if pos >= self.anchors.len() {
            return Vec::new();
        }
        let removed = self.anchors.split_off(pos);
        match self.anchors.last() {
            Some(prev) => self.dense.truncate_after(prev.buffer_index),
            None => self.dense.clear(),
        }
        self.closed = false;
        removed
    }

    /// Moves the anchor at `pos` (never 0) to the end of `upstream`.
    ///
    /// `upstream` runs from the predecessor to the new position and replaces
    /// the samples after the predecessor up to the anchor's old sample. The
    /// samples after that are kept as they are; the indices of all later
    /// anchors shift by the change in length.
    pub(crate) fn splice_move(&mut self, pos: usize, upstream: &[GeoPoint]) {
        let Some(&position) = upstream.last() else {
            return;
        };
        if pos == 0 || pos >= self.anchors.len() {
            return;
        }
        let prev_index = self.anchors[pos - 1].buffer_index;
        let old_index = self.anchors[pos].buffer_index;
        let new_index = self.dense.splice_joined(prev_index, old_index, upstream);

        let shift = new_index as isize - old_index as isize;
        for anchor in &mut self.anchors[pos + 1..] {
            anchor.buffer_index = (anchor.buffer_index as isize + shift) as usize;
        }

        let anchor = &mut self.anchors[pos];
        anchor.position = position;
        anchor.buffer_index = new_index;
    }

    /// Drops all anchors and samples. Returns the removed anchors.
    pub(crate) fn clear(&mut self) -> Vec<AnchorWaypoint> {
        self.dense.clear();
        self.closed = false;
        self.state = RouteState::Idle;
        std::mem::take(&mut self.anchors)
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let Some(first) = self.anchors.first() else {
            return if self.closed {
                Err(InvariantViolation::UnclosedRoute)
            } else {
                Ok(())
            };
        };

        let points = self.dense.points();
        if first.buffer_index != 0 || points.first() != Some(&first.position) {
            return Err(InvariantViolation::HeadMismatch);
        }

        let mut previous: Option<usize> = None;
        for anchor in &self.anchors {
            let index = anchor.buffer_index;
            if index >= points.len() {
                return Err(InvariantViolation::IndexOutOfBounds {
                    anchor: anchor.id,
                    index,
                    len: points.len(),
                });
            }
            if let Some(prev) = previous {
                if index <= prev {
                    return Err(InvariantViolation::IndexNotIncreasing {
                        anchor: anchor.id,
                        index,
                    });
                }
            }
            let sample = points[index];
            if !sample.within(&anchor.position, self.tolerance_m) {
                return Err(InvariantViolation::AnchorDrift {
                    anchor: anchor.id,
                    distance_m: sample.haversine_m(&anchor.position),
                });
            }
            if index > 0 && points[index - 1] == sample {
                return Err(InvariantViolation::DuplicateJoin { index });
            }
            if points.get(index + 1) == Some(&sample) {
                return Err(InvariantViolation::DuplicateJoin { index: index + 1 });
            }
            previous = Some(index);
        }

        let last_index = self.anchors.last().map_or(0, |anchor| anchor.buffer_index);
        if self.closed {
            let ends_at_endpoint = match (points.last(), self.endpoint()) {
                (Some(last), Some(endpoint)) => last.within(&endpoint, self.tolerance_m),
                _ => false,
            };
            if !ends_at_endpoint {
                return Err(InvariantViolation::UnclosedRoute);
            }
        } else if last_index + 1 != points.len() {
            return Err(InvariantViolation::DanglingTail {
                trailing: points.len() - last_index - 1,
            });
        }

        Ok(())
    }
}
