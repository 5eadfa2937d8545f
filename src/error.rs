//! Error taxonomy for providers, the edit engine and route collections.

use crate::buffer::{AnchorId, RouteState};

/// A routing or places provider could not produce a usable answer.
///
/// The adapters recover from these locally (straight-line fallback, empty
/// suggestion list); they never reach the editor's callers as errors.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider answered with status {0}")]
    Status(String),
    #[error("malformed provider response: {0}")]
    Malformed(String),
    #[error("provider returned an empty geometry")]
    EmptyGeometry,
}

/// A route buffer failed its consistency check.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("dense buffer does not start at the origin anchor")]
    HeadMismatch,
    #[error("anchor {anchor} points at buffer index {index}, past the end ({len})")]
    IndexOutOfBounds { anchor: AnchorId, index: usize, len: usize },
    #[error("anchor {anchor} buffer index {index} is not after its predecessor's")]
    IndexNotIncreasing { anchor: AnchorId, index: usize },
    #[error("anchor {anchor} is {distance_m:.1} m away from its buffer sample")]
    AnchorDrift { anchor: AnchorId, distance_m: f64 },
    #[error("join point at buffer index {index} is duplicated")]
    DuplicateJoin { index: usize },
    #[error("open route has {trailing} samples after its last anchor")]
    DanglingTail { trailing: usize },
    #[error("finished route does not end at its endpoint")]
    UnclosedRoute,
}

/// An edit operation was rejected. The route buffer is left unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("route needs at least {required} waypoints to finish, has {found}")]
    InsufficientWaypoints { required: usize, found: usize },
    #[error("route has already been started (state: {0:?})")]
    NotIdle(RouteState),
    #[error("route is not being drawn (state: {0:?})")]
    NotDrawing(RouteState),
    #[error("no waypoint is being dragged")]
    NotEditing,
    #[error("route is finished; clear or edit it instead")]
    AlreadyFinished,
    #[error("a routing request is still pending for this route")]
    OperationPending,
    #[error("pending edit no longer applies to this route")]
    StalePending,
    #[error("unknown waypoint {0}")]
    UnknownAnchor(AnchorId),
    #[error("the origin waypoint cannot be moved or removed")]
    OriginLocked,
    #[error("waypoint coincides with a neighbouring one")]
    DuplicateWaypoint,
    #[error("waypoint position is not a finite coordinate")]
    InvalidPosition,
    #[error("expected {expected} segments, got {found}")]
    SegmentMismatch { expected: usize, found: usize },
    #[error("segment endpoints do not match the requested waypoints")]
    SegmentEndpointMismatch,
    #[error("route buffer invariant violated: {0}")]
    InvariantViolation(#[from] InvariantViolation),
}

/// A route collection operation was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollectionError {
    #[error("price must be positive, got {0}")]
    InvalidPrice(f64),
    #[error("no price has been set for this collection")]
    PriceNotSet,
    #[error("a route named {0:?} already exists")]
    DuplicateRoute(String),
    #[error("no route named {0:?}")]
    UnknownRoute(String),
    #[error("route name must not be blank")]
    EmptyName,
    #[error("no route is active")]
    NoActiveRoute,
    #[error("route {route:?}: {source}")]
    Edit {
        route: String,
        #[source]
        source: EditError,
    },
}
