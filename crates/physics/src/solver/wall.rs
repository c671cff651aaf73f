//! Wall probing along the direction of travel.

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

use super::CollisionSolver;
use crate::collision::{BrushId, ContentFlags};
use crate::math::angle_between;
use crate::movement::{MovementFlags, MovementState};

/// Outcome of the wall probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WallContact {
    /// Nothing ahead, or only surfaces that don't count as walls.
    None,
    /// Near head-on hit: speed was zeroed.
    Blocked { normal: Vec3, brush: Option<BrushId> },
    /// Glancing hit: speed was scaled by `scale`.
    Glancing { normal: Vec3, scale: f32 },
}

impl CollisionSolver<'_> {
    /// Deviation of a wall from the travel direction, `0` = parallel,
    /// `PI / 2` = head-on. `None` when the surface faces away from travel.
    pub fn wall_deviation(direction: Vec3, normal: Vec3) -> Option<f32> {
        let into = -direction.dot(normal);
        if into <= 0.0 {
            return None;
        }
        Some(into.clamp(0.0, 1.0).asin())
    }

    /// Whether a forward cast of `distance` from the body center would hit a
    /// blocking wall. Pure query used for grind and dash gating.
    pub fn wall_ahead(&self, state: &MovementState, direction: Vec3, distance: f32) -> bool {
        let up = state.up_direction();
        let origin = state.position + up * self.config.collision_radius;
        let trace = self.world.raycast(
            origin,
            direction,
            self.config.collision_radius + distance,
            ContentFlags::MASK_CHARACTER,
        );
        let Some(normal) = trace.hit_normal else {
            return false;
        };
        trace.hit_surface.is_wall()
            && angle_between(normal, up) > self.config.max_ground_angle
            && Self::wall_deviation(direction, normal)
                .is_some_and(|dev| dev >= self.config.wall_head_on_angle)
    }

    /// Cast along travel and apply wall response to the pose.
    pub fn update_wall(&self, state: &mut MovementState, dt: f32) -> WallContact {
        let up = state.up_direction();
        let travel = state.forward_direction() * state.move_speed
            + state.side_direction() * state.strafe_speed;
        let travel_speed = travel.length();

        if travel_speed < 1.0e-4 {
            return WallContact::None;
        }

        let direction = travel / travel_speed;
        let stopping_distance = travel_speed * dt;
        let origin = state.position + up * self.config.collision_radius;
        let trace = self.world.raycast(
            origin,
            direction,
            self.config.collision_radius + stopping_distance,
            ContentFlags::MASK_CHARACTER,
        );

        let Some(normal) = trace.hit_normal else {
            return WallContact::None;
        };
        if !trace.hit_surface.is_wall() {
            return WallContact::None;
        }
        // Floor-like faces are the ground probe's business
        if angle_between(normal, up) <= self.config.max_ground_angle {
            return WallContact::None;
        }
        let Some(deviation) = Self::wall_deviation(direction, normal) else {
            return WallContact::None;
        };
        if deviation < self.config.wall_min_angle {
            return WallContact::None;
        }

        if deviation >= self.config.wall_head_on_angle {
            let penetration = self.config.collision_radius - trace.distance;
            if penetration > 0.0 {
                state.position -= direction * penetration;
            }
            state.move_speed = 0.0;
            state.strafe_speed = 0.0;
            state.flags.set(MovementFlags::ON_WALL, true);
            log::trace!("blocked by wall {:?}", trace.hit_brush);
            return WallContact::Blocked {
                normal,
                brush: trace.hit_brush,
            };
        }

        let scale = (1.0 - deviation / FRAC_PI_2).clamp(0.0, 1.0);
        state.move_speed *= scale;
        state.strafe_speed *= scale;
        WallContact::Glancing { normal, scale }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollisionWorld, SurfaceFlags};
    use crate::movement::SolverConfig;
    use glam::Quat;

    const DT: f32 = 1.0 / 60.0;

    fn running_state(position: Vec3, angle: f32, speed: f32) -> MovementState {
        let mut state = MovementState::new(position);
        state.set_movement_angle(angle);
        state.move_speed = speed;
        state.flags.set(MovementFlags::ON_GROUND, true);
        state
    }

    #[test]
    fn test_head_on_wall_stops() {
        let mut world = CollisionWorld::new();
        world.add_box(
            Vec3::new(0.0, 2.0, 10.0),
            Vec3::new(10.0, 2.0, 0.5),
            ContentFlags::SOLID,
            SurfaceFlags::WALL,
        );
        let config = SolverConfig::default();
        let solver = CollisionSolver::new(&world, &config);

        let mut state = running_state(Vec3::new(0.0, 0.0, 9.2), 0.0, 12.0);
        let contact = solver.update_wall(&mut state, DT);

        assert!(matches!(contact, WallContact::Blocked { .. }));
        assert_eq!(state.move_speed, 0.0);
        assert!(state.flags.on_wall());
        assert!(state.position.z <= 9.5 - config.collision_radius + 1.0e-4);
    }

    #[test]
    fn test_glancing_wall_scales_speed() {
        let mut world = CollisionWorld::new();
        // Wall rotated so travel along +Z meets it at 30 degrees
        world.add_oriented_box(
            Vec3::new(0.0, 2.0, 10.0),
            Vec3::new(10.0, 2.0, 0.5),
            Quat::from_rotation_y(60.0_f32.to_radians()),
            ContentFlags::SOLID,
            SurfaceFlags::WALL,
        );
        let config = SolverConfig::default();
        let solver = CollisionSolver::new(&world, &config);

        let mut state = running_state(Vec3::new(0.0, 0.0, 8.6), 0.0, 12.0);
        let contact = solver.update_wall(&mut state, DT);

        let WallContact::Glancing { scale, .. } = contact else {
            panic!("expected glancing contact, got {contact:?}");
        };
        assert!((scale - 2.0 / 3.0).abs() < 1.0e-3);
        assert!((state.move_speed - 8.0).abs() < 1.0e-2);
        assert!(!state.flags.on_wall());
    }

    #[test]
    fn test_parallel_and_floor_surfaces_ignored() {
        let mut world = CollisionWorld::new();
        // Nearly parallel to +Z travel (5 degrees)
        world.add_oriented_box(
            Vec3::new(0.0, 2.0, 10.0),
            Vec3::new(10.0, 2.0, 0.5),
            Quat::from_rotation_y(85.0_f32.to_radians()),
            ContentFlags::SOLID,
            SurfaceFlags::WALL,
        );
        let config = SolverConfig::default();
        let solver = CollisionSolver::new(&world, &config);

        let mut state = running_state(Vec3::new(0.0, 0.0, 0.0), 0.0, 12.0);
        // Walk the ray up to the surface before probing
        let trace = world.raycast(Vec3::new(0.0, 0.4, 0.0), Vec3::Z, 50.0, ContentFlags::SOLID);
        state.position.z = trace.end_position.z - 0.45;

        assert_eq!(solver.update_wall(&mut state, DT), WallContact::None);
        assert_eq!(state.move_speed, 12.0);
    }

    #[test]
    fn test_wall_deviation() {
        let head_on = CollisionSolver::wall_deviation(Vec3::Z, Vec3::NEG_Z);
        assert!((head_on.unwrap_or_default() - FRAC_PI_2).abs() < 1.0e-3);
        assert!(CollisionSolver::wall_deviation(Vec3::Z, Vec3::Z).is_none());
    }
}
