//! Test fixtures for route-sketch.
//!
//! Provides:
//! - Johannesburg taxi ranks (approximate positions from OpenStreetMap)
//! - Stub routing providers with predictable geometry

#![allow(dead_code)]

pub mod johannesburg_ranks;
pub mod routers;

pub use johannesburg_ranks::*;
pub use routers::*;
