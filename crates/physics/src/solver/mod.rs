//! Raycast collision solver for the character.
//!
//! The solver never moves the character on its own. It is run after a state
//! has integrated the pose for the tick, and corrects that pose against the
//! level: snap to the floor, stop at walls, bump ceilings, straighten up in
//! the air.
//!
//! # Order
//!
//! Within a tick the probes run ground, then wall, then ceiling, then
//! orientation. [`CollisionSolver::solve`] runs them in that order.

mod ceiling;
mod ground;
mod orientation;
mod wall;

pub use ceiling::CeilingContact;
pub use ground::GroundEvent;
pub use wall::WallContact;

use crate::collision::CollisionWorld;
use crate::movement::{MovementState, SolverConfig};
use crate::path::PathFollower;

/// Per-call switches for [`CollisionSolver::solve`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveOptions {
    /// Skip the wall probe (scripted movers, grinding).
    pub skip_walls: bool,
    /// Allow sliding along slanted ceilings instead of stopping.
    pub allow_ceiling_slide: bool,
}

/// What the solver found this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    pub ground: GroundEvent,
    pub wall: WallContact,
    pub ceiling: CeilingContact,
}

/// Borrowed view over the level geometry and solver tuning.
#[derive(Debug, Clone, Copy)]
pub struct CollisionSolver<'a> {
    world: &'a CollisionWorld,
    config: &'a SolverConfig,
}

impl<'a> CollisionSolver<'a> {
    pub fn new(world: &'a CollisionWorld, config: &'a SolverConfig) -> Self {
        Self { world, config }
    }

    pub fn world(&self) -> &'a CollisionWorld {
        self.world
    }

    pub fn config(&self) -> &'a SolverConfig {
        self.config
    }

    /// Run every probe in order against an already-moved pose.
    pub fn solve(
        &self,
        state: &mut MovementState,
        follower: &PathFollower,
        dt: f32,
        options: SolveOptions,
    ) -> SolveReport {
        let ground = self.update_ground(state, dt);
        let wall = if options.skip_walls {
            WallContact::None
        } else {
            self.update_wall(state, dt)
        };
        let ceiling = self.update_ceiling(state, dt, options.allow_ceiling_slide);
        self.recover_up_direction(state, follower, dt);

        SolveReport {
            ground,
            wall,
            ceiling,
        }
    }
}
