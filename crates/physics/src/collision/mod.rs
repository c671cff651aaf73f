//! Ray-based collision queries against static level geometry.
//!
//! The character never sweeps a volume through the world. Every probe is a
//! ray (ground whiskers, wall cast, ceiling cast, line-of-sight), so the world
//! only has to answer "what is the first brush along this ray".
//!
//! # Key Types
//!
//! - [`CollisionWorld`]: Tagged brushes plus the ray query
//! - [`TraceResult`]: Output from a ray query
//! - [`SurfaceFlags`]: Floor / wall / ceiling / crusher tags read by the solver

mod flags;
mod trace;
mod world;

pub use flags::{ContentFlags, SurfaceFlags};
pub use trace::{BrushId, TraceResult};
pub use world::{CollisionBrush, CollisionError, CollisionWorld};
