//! Airborne up-direction recovery.

use glam::Vec3;

use super::CollisionSolver;
use crate::math::rotate_toward;
use crate::movement::MovementState;
use crate::path::PathFollower;

impl CollisionSolver<'_> {
    /// Where the up direction relaxes to while airborne: the path's banked up
    /// axis on tilt-following paths, world up otherwise.
    pub fn air_up_target(follower: &PathFollower) -> Vec3 {
        if follower.tilt_following && follower.active_path().is_some() {
            follower.up_axis()
        } else {
            Vec3::Y
        }
    }

    /// Relax the up direction toward [`Self::air_up_target`]. Fast while
    /// falling, very slow while rising so launches keep their orientation.
    /// Does nothing while grounded.
    pub fn recover_up_direction(&self, state: &mut MovementState, follower: &PathFollower, dt: f32) {
        if state.is_grounded() {
            return;
        }
        let target = Self::air_up_target(follower);
        let rate = self.config.air_recovery_rate(state.vertical_speed);
        let up = rotate_toward(state.up_direction(), target, rate * dt);
        state.set_up_direction(up);
    }
}
