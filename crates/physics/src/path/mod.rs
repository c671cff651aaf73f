//! Level paths and the curve-relative character frame.
//!
//! - [`Curve`]: a baked Catmull-Rom spline addressed by arc length
//! - [`PathFollower`]: progress along the active curve plus the path frame

mod curve;
mod follower;

pub use curve::{Curve, CurveError, CurveId, CurvePoint};
pub use follower::PathFollower;
