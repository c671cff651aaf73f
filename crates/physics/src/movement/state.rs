//! Character pose: where the character is, which way is up, how fast it goes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collision::{BrushId, SurfaceFlags};
use crate::math::{movement_direction, normalize_or, wrap_angle};

/// Flags describing the character's current contact state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFlags(pub u16);

impl MovementFlags {
    /// Character is standing on a floor.
    pub const ON_GROUND: u16 = 1 << 0;

    /// Character ran head-on into a wall this tick.
    pub const ON_WALL: u16 = 1 << 1;

    /// Character touched down this tick.
    pub const JUST_LANDED: u16 = 1 << 2;

    /// Character left the ground this tick.
    pub const JUST_TOOK_OFF: u16 = 1 << 3;

    /// Position is driven by a scripted mover (launcher, zipline, automation).
    pub const EXTERNAL_CONTROL: u16 = 1 << 4;

    /// Character hit a ceiling this tick.
    pub const ON_CEILING: u16 = 1 << 5;

    /// Flags that only describe the last tick.
    pub const PER_TICK: u16 =
        Self::ON_WALL | Self::JUST_LANDED | Self::JUST_TOOK_OFF | Self::ON_CEILING;

    /// Check if a flag is set.
    #[inline]
    pub fn has(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    /// Set or clear a flag.
    #[inline]
    pub fn set(&mut self, flag: u16, value: bool) {
        if value {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    #[inline]
    pub fn on_ground(self) -> bool {
        self.has(Self::ON_GROUND)
    }

    #[inline]
    pub fn on_wall(self) -> bool {
        self.has(Self::ON_WALL)
    }

    #[inline]
    pub fn just_landed(self) -> bool {
        self.has(Self::JUST_LANDED)
    }

    #[inline]
    pub fn external_control(self) -> bool {
        self.has(Self::EXTERNAL_CONTROL)
    }
}

/// The floor the character stands on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundContact {
    /// Averaged contact point.
    pub point: Vec3,
    /// Averaged floor normal.
    pub normal: Vec3,
    /// Tags of the brush under the character's center (or the nearest whisker).
    pub surface: SurfaceFlags,
    pub brush: Option<BrushId>,
    pub material: Option<String>,
    /// How many whiskers found floor.
    pub hit_count: usize,
}

/// Complete pose of the character.
///
/// Speeds are expressed in the character's own frame: `move_speed` along the
/// movement direction (forward positive), `strafe_speed` along its right side,
/// `vertical_speed` along the up direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementState {
    /// Position in world space (feet).
    pub position: Vec3,

    /// Unit up direction, following the floor.
    up_direction: Vec3,

    /// World yaw of travel, in `[0, 2PI)`.
    movement_angle: f32,

    /// Signed speed along the movement direction (meters/second).
    pub move_speed: f32,

    /// Speed along the right-hand side axis (meters/second).
    pub strafe_speed: f32,

    /// Speed along the up direction (meters/second, positive = rising).
    pub vertical_speed: f32,

    pub flags: MovementFlags,

    /// Last accepted floor (valid while `ON_GROUND`).
    pub ground: Option<GroundContact>,
}

impl Default for MovementState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            up_direction: Vec3::Y,
            movement_angle: 0.0,
            move_speed: 0.0,
            strafe_speed: 0.0,
            vertical_speed: 0.0,
            flags: MovementFlags::default(),
            ground: None,
        }
    }
}

impl MovementState {
    /// Create a new state at the given position.
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    #[inline]
    pub fn up_direction(&self) -> Vec3 {
        self.up_direction
    }

    /// Set the up direction. Degenerate vectors are ignored.
    pub fn set_up_direction(&mut self, up: Vec3) {
        self.up_direction = normalize_or(up, self.up_direction);
    }

    #[inline]
    pub fn movement_angle(&self) -> f32 {
        self.movement_angle
    }

    pub fn set_movement_angle(&mut self, angle: f32) {
        self.movement_angle = wrap_angle(angle);
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.flags.on_ground()
    }

    /// Clear the flags that only describe the previous tick.
    pub fn begin_tick(&mut self) {
        self.flags.0 &= !MovementFlags::PER_TICK;
    }

    /// Direction of travel on the current up plane.
    pub fn forward_direction(&self) -> Vec3 {
        movement_direction(self.movement_angle, self.up_direction)
    }

    /// Right-hand side of the direction of travel.
    pub fn side_direction(&self) -> Vec3 {
        self.forward_direction().cross(self.up_direction)
    }

    /// World-space velocity.
    pub fn velocity(&self) -> Vec3 {
        self.forward_direction() * self.move_speed
            + self.side_direction() * self.strafe_speed
            + self.up_direction * self.vertical_speed
    }

    /// Stop all motion.
    pub fn stop(&mut self) {
        self.move_speed = 0.0;
        self.strafe_speed = 0.0;
        self.vertical_speed = 0.0;
    }

    /// Leave the ground (jump, launch, knockback).
    pub fn take_off(&mut self) {
        if self.flags.on_ground() {
            self.flags.set(MovementFlags::JUST_TOOK_OFF, true);
        }
        self.flags.set(MovementFlags::ON_GROUND, false);
        self.ground = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_movement_flags() {
        let mut flags = MovementFlags::default();
        assert!(!flags.on_ground());

        flags.set(MovementFlags::ON_GROUND, true);
        flags.set(MovementFlags::JUST_LANDED, true);
        assert!(flags.on_ground());

        let mut state = MovementState {
            flags,
            ..Default::default()
        };
        state.begin_tick();
        assert!(state.flags.on_ground());
        assert!(!state.flags.just_landed());
    }

    #[test]
    fn test_up_direction_stays_unit() {
        let mut state = MovementState::new(Vec3::ZERO);
        state.set_up_direction(Vec3::new(0.0, 3.0, 4.0));
        assert!((state.up_direction().length() - 1.0).abs() < 1.0e-6);

        state.set_up_direction(Vec3::ZERO);
        assert!((state.up_direction() - Vec3::new(0.0, 0.6, 0.8)).length() < 1.0e-6);
    }

    #[test]
    fn test_directions_and_velocity() {
        let mut state = MovementState::new(Vec3::ZERO);
        state.set_movement_angle(PI / 2.0 + 2.0 * PI);
        assert!((state.movement_angle() - PI / 2.0).abs() < 1.0e-5);
        assert!((state.forward_direction() - Vec3::X).length() < 1.0e-5);

        state.move_speed = 2.0;
        state.vertical_speed = -1.0;
        let velocity = state.velocity();
        assert!((velocity - Vec3::new(2.0, -1.0, 0.0)).length() < 1.0e-5);
    }
}
