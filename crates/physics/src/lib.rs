//! Railrunner Physics
//!
//! Geometry and numerics for a path-relative platformer character. No game
//! rules live here: the game crate decides *when* to accelerate, jump or
//! grind, this crate answers *how* the pose changes.
//!
//! # Architecture
//!
//! - **Collision**: tagged static brushes and ray queries
//! - **Path**: baked curves and the curve-relative [`PathFollower`] frame
//! - **Movement**: the character pose and per-state speed curves
//! - **Solver**: ground / wall / ceiling probes and up-direction recovery
//!
//! # Conventions
//!
//! Y is world up. Yaw `0` faces `+Z` and grows toward `+X`. The side axis of
//! any frame is `forward × up`, the right-hand side when facing forward.

pub mod collision;
pub mod math;
pub mod movement;
pub mod path;
pub mod solver;

// Re-export commonly used types
pub use collision::{
    BrushId, CollisionError, CollisionWorld, ContentFlags, SurfaceFlags, TraceResult,
};
pub use movement::{GroundContact, MovementFlags, MovementSetting, MovementState, SolverConfig};
pub use path::{Curve, CurveError, CurveId, CurvePoint, PathFollower};
pub use solver::{CeilingContact, CollisionSolver, GroundEvent, SolveOptions, SolveReport, WallContact};
