//! Ceiling probing: head bumps, slanted-ceiling slides and crushers.

use super::CollisionSolver;
use crate::collision::{BrushId, ContentFlags};
use crate::math::angle_between;
use crate::movement::{MovementFlags, MovementState};

/// Ray origins sit this far above the feet so the floor itself is never hit.
const CEILING_RAY_LIFT: f32 = 0.05;

/// Outcome of the ceiling probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeilingContact {
    None,
    /// Vertical speed was clamped to zero.
    Blocked,
    /// Slanted ceiling during a slide-allowed move; vertical speed reduced.
    Slid,
    /// A crusher is pressing down on a grounded character.
    Crushed(Option<BrushId>),
}

impl CollisionSolver<'_> {
    /// Cast upward from the feet, extended by any rising speed, and apply the
    /// ceiling response. `allow_slide` enables the slanted-ceiling allowance.
    pub fn update_ceiling(
        &self,
        state: &mut MovementState,
        dt: f32,
        allow_slide: bool,
    ) -> CeilingContact {
        let up = state.up_direction();
        let origin = state.position + up * CEILING_RAY_LIFT;
        let reach = self.config.collision_height - CEILING_RAY_LIFT + state.vertical_speed.max(0.0) * dt;
        let trace = self.world.raycast(origin, up, reach, ContentFlags::MASK_CHARACTER);

        let Some(normal) = trace.hit_normal else {
            return CeilingContact::None;
        };
        // Only faces pointing back down at the character count
        if normal.dot(up) >= 0.0 {
            return CeilingContact::None;
        }

        if trace.hit_surface.is_crusher() && state.is_grounded() {
            log::debug!("crushed by {:?}", trace.hit_brush);
            return CeilingContact::Crushed(trace.hit_brush);
        }

        if !trace.hit_surface.is_ceiling() {
            return CeilingContact::None;
        }

        state.flags.set(MovementFlags::ON_CEILING, true);

        let slant = angle_between(normal, -up);
        if allow_slide && slant > self.config.ceiling_slide_angle {
            // Keep the share of rising speed that runs along the slant
            let along = (1.0 - normal.dot(-up)).clamp(0.0, 1.0);
            state.vertical_speed *= along;
            return CeilingContact::Slid;
        }

        state.vertical_speed = state.vertical_speed.min(0.0);
        if !state.is_grounded() {
            let overlap = self.config.collision_height - CEILING_RAY_LIFT - trace.distance;
            if overlap > 0.0 {
                state.position -= up * overlap;
            }
        }
        CeilingContact::Blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollisionWorld, SurfaceFlags};
    use crate::movement::SolverConfig;
    use glam::{Quat, Vec3};

    const DT: f32 = 1.0 / 60.0;

    fn world_with_ceiling(surface: SurfaceFlags, rotation: Quat) -> CollisionWorld {
        let mut world = CollisionWorld::new();
        world.add_box(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(20.0, 0.5, 20.0),
            ContentFlags::SOLID,
            SurfaceFlags::TERRAIN,
        );
        world.add_oriented_box(
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(5.0, 0.5, 5.0),
            rotation,
            ContentFlags::SOLID,
            surface,
        );
        world
    }

    #[test]
    fn test_rising_into_ceiling_clamps_vertical_speed() {
        let world = world_with_ceiling(SurfaceFlags::TERRAIN, Quat::IDENTITY);
        let config = SolverConfig::default();
        let solver = CollisionSolver::new(&world, &config);

        let mut state = MovementState::new(Vec3::new(0.0, 0.4, 0.0));
        state.vertical_speed = 10.0;

        assert_eq!(solver.update_ceiling(&mut state, DT, false), CeilingContact::Blocked);
        assert_eq!(state.vertical_speed, 0.0);
        assert!(state.flags.has(MovementFlags::ON_CEILING));
        assert!(state.position.y + config.collision_height <= 1.5 + 1.0e-4);
    }

    #[test]
    fn test_slanted_ceiling_slide_only_reduces_speed() {
        let world = world_with_ceiling(SurfaceFlags::CEILING, Quat::from_rotation_x(0.8));
        let config = SolverConfig::default();
        let solver = CollisionSolver::new(&world, &config);

        let mut state = MovementState::new(Vec3::new(0.0, 0.3, 0.0));
        state.vertical_speed = 10.0;

        assert_eq!(solver.update_ceiling(&mut state, DT, true), CeilingContact::Slid);
        assert!(state.vertical_speed > 0.0);
        assert!(state.vertical_speed < 10.0);

        let mut no_slide = MovementState::new(Vec3::new(0.0, 0.3, 0.0));
        no_slide.vertical_speed = 10.0;
        assert_eq!(solver.update_ceiling(&mut no_slide, DT, false), CeilingContact::Blocked);
        assert_eq!(no_slide.vertical_speed, 0.0);
    }

    #[test]
    fn test_crusher_only_crushes_grounded_character() {
        let world = world_with_ceiling(SurfaceFlags::CEILING | SurfaceFlags::CRUSHER, Quat::IDENTITY);
        let config = SolverConfig {
            collision_height: 1.6,
            ..Default::default()
        };
        let solver = CollisionSolver::new(&world, &config);

        let mut grounded = MovementState::new(Vec3::ZERO);
        grounded.flags.set(MovementFlags::ON_GROUND, true);
        assert_eq!(solver.update_ceiling(&mut grounded, DT, false), CeilingContact::Crushed(Some(1)));

        let mut airborne = MovementState::new(Vec3::new(0.0, 0.2, 0.0));
        airborne.vertical_speed = 5.0;
        assert_eq!(solver.update_ceiling(&mut airborne, DT, false), CeilingContact::Blocked);
    }

    #[test]
    fn test_open_sky() {
        let mut world = CollisionWorld::new();
        world.add_box(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(20.0, 0.5, 20.0),
            ContentFlags::SOLID,
            SurfaceFlags::TERRAIN,
        );
        let config = SolverConfig::default();
        let solver = CollisionSolver::new(&world, &config);

        let mut state = MovementState::new(Vec3::ZERO);
        state.vertical_speed = 10.0;
        assert_eq!(solver.update_ceiling(&mut state, DT, false), CeilingContact::None);
        assert_eq!(state.vertical_speed, 10.0);
    }
}
