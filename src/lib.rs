//! route-sketch: interactive route drawing and editing
//!
//! Operators trace taxi routes on a map by placing waypoints. Each pair of
//! consecutive waypoints is resolved into a road-following polyline by a
//! routing provider, and drawn routes can be edited by regenerating only the
//! affected part of the line.

pub mod buffer;
pub mod collection;
pub mod editor;
pub mod error;
pub mod geo;
pub mod osrm;
pub mod osrm_data;
pub mod places;
pub mod polyline;
pub mod routing;
pub mod surface;
pub mod traits;
