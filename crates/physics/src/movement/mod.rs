//! Character movement data.
//!
//! - [`MovementState`]: the pose every system reads and the solver writes
//! - [`MovementSetting`]: per-state speed curve (cap, traction, braking)
//! - [`SolverConfig`]: probe dimensions, angle limits and orientation rates

mod config;
mod setting;
mod state;

pub use config::SolverConfig;
pub use setting::MovementSetting;
pub use state::{GroundContact, MovementFlags, MovementState};
