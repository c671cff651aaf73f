//! Ground probing with a ring of whisker rays.

use std::f32::consts::TAU;

use glam::Vec3;

use super::CollisionSolver;
use crate::collision::ContentFlags;
use crate::math::{angle_between, normalize_or, rotate_toward};
use crate::movement::{GroundContact, MovementFlags, MovementState};

/// Extra reach so a character resting exactly on a floor still finds it.
const GROUND_SKIN: f32 = 0.02;

/// What happened to ground contact this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundEvent {
    /// Still standing on a floor.
    Grounded,
    /// Touched down this tick.
    Landed,
    /// Left the ground this tick.
    TookOff,
    /// Still in the air.
    Airborne,
}

impl GroundEvent {
    pub fn is_grounded(self) -> bool {
        matches!(self, Self::Grounded | Self::Landed)
    }
}

impl CollisionSolver<'_> {
    /// Ray origins: the center plus a ring perpendicular to `up`, all lifted
    /// one collision radius above the feet.
    pub fn whisker_origins(&self, position: Vec3, up: Vec3) -> Vec<Vec3> {
        let radius = self.config.collision_radius;
        let base = position + up * radius;

        let reference = if up.dot(Vec3::Z).abs() < 0.9 { Vec3::Z } else { Vec3::X };
        let a = normalize_or(reference - up * reference.dot(up), Vec3::X);
        let b = up.cross(a);
        let ring = radius * self.config.whisker_ring_ratio;

        let mut origins = Vec::with_capacity(self.config.whisker_count + 1);
        origins.push(base);
        for i in 0..self.config.whisker_count {
            let angle = i as f32 / self.config.whisker_count as f32 * TAU;
            origins.push(base + (a * angle.cos() + b * angle.sin()) * ring);
        }
        origins
    }

    /// Distance fallen this tick; zero while grounded or rising.
    fn fall_distance(state: &MovementState, dt: f32) -> f32 {
        if state.is_grounded() {
            0.0
        } else {
            (-state.vertical_speed).max(0.0) * dt
        }
    }

    /// Length of each ground ray for the current motion.
    pub fn ground_ray_length(&self, state: &MovementState, dt: f32) -> f32 {
        let extension = if state.is_grounded() {
            self.config.snap_margin
        } else {
            Self::fall_distance(state, dt)
        };
        self.config.collision_radius + GROUND_SKIN + extension
    }

    /// Cast the whiskers and average every accepted floor hit. Pure query.
    pub fn probe_ground(&self, state: &MovementState, dt: f32) -> Option<GroundContact> {
        let up = state.up_direction();
        // A fast fall can carry the feet further than the whisker lift, so the
        // rays start from where the character was at the start of the tick.
        let lift = Self::fall_distance(state, dt);
        let length = self.ground_ray_length(state, dt) + lift;
        let external = state.flags.external_control();

        let mut point_sum = Vec3::ZERO;
        let mut normal_sum = Vec3::ZERO;
        let mut hit_count = 0;
        let mut nearest: Option<(f32, crate::collision::TraceResult)> = None;

        for origin in self.whisker_origins(state.position + up * lift, up) {
            let trace = self.world.raycast(origin, -up, length, ContentFlags::MASK_CHARACTER);
            let Some(normal) = trace.hit_normal else {
                continue;
            };

            if !trace.hit_surface.is_floor() {
                continue;
            }
            if !external && angle_between(normal, up) > self.config.max_ground_angle {
                continue;
            }

            point_sum += trace.end_position;
            normal_sum += normal;
            hit_count += 1;

            if nearest.as_ref().map_or(true, |(d, _)| trace.distance < *d) {
                nearest = Some((trace.distance, trace));
            }
        }

        let (_, nearest) = nearest?;
        let normal = normalize_or(normal_sum, up);

        Some(GroundContact {
            point: point_sum / hit_count as f32,
            normal,
            surface: nearest.hit_surface,
            brush: nearest.hit_brush,
            material: nearest.material,
            hit_count,
        })
    }

    /// Probe for ground and apply the result to the pose.
    ///
    /// Landing snaps the up direction to the floor normal and zeroes vertical
    /// speed. While grounded the up direction blends toward the normal, faster
    /// at higher ground speed. A rising character is never snapped down.
    pub fn update_ground(&self, state: &mut MovementState, dt: f32) -> GroundEvent {
        let was_grounded = state.is_grounded();

        if state.vertical_speed > 0.0 {
            if was_grounded {
                state.take_off();
                return GroundEvent::TookOff;
            }
            return GroundEvent::Airborne;
        }

        let Some(contact) = self.probe_ground(state, dt) else {
            if was_grounded {
                log::trace!("ground lost at {:?}", state.position);
                state.take_off();
                return GroundEvent::TookOff;
            }
            return GroundEvent::Airborne;
        };

        let up = state.up_direction();
        state.position += up * (contact.point - state.position).dot(up);
        state.vertical_speed = 0.0;

        let event = if was_grounded {
            let rate = self.config.up_blend_rate(state.move_speed);
            state.set_up_direction(rotate_toward(up, contact.normal, rate * dt));
            GroundEvent::Grounded
        } else {
            log::trace!("landed on {:?} at {:?}", contact.brush, contact.point);
            state.set_up_direction(contact.normal);
            state.flags.set(MovementFlags::JUST_LANDED, true);
            GroundEvent::Landed
        };

        state.flags.set(MovementFlags::ON_GROUND, true);
        state.ground = Some(contact);
        event
    }
}
