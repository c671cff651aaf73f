//! Scripted launch arcs.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use railrunner_physics::math::lerp;

/// A launcher's flight: a straight line from `start` to `end` with a
/// parabolic bump of `apex_height` on top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaunchSettings {
    pub start: Vec3,
    pub end: Vec3,
    /// Extra height at the midpoint, above the straight line.
    pub apex_height: f32,
    /// Seconds from start to end.
    pub duration: f32,
    /// Speed ratio kept after release, in `[0, 1]` of the flight speed.
    #[serde(default)]
    pub exit_speed_ratio: f32,
}

impl LaunchSettings {
    pub fn new(start: Vec3, end: Vec3, apex_height: f32, duration: f32) -> Self {
        Self {
            start,
            end,
            apex_height,
            duration,
            exit_speed_ratio: 0.5,
        }
    }

    /// Same arc, starting from where the character actually is.
    pub fn with_start(mut self, start: Vec3) -> Self {
        self.start = start;
        self
    }

    /// Position at normalized time `t` in `[0, 1]`.
    pub fn interpolate(&self, t: f32) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        let mut position = Vec3::new(
            lerp(self.start.x, self.end.x, t),
            lerp(self.start.y, self.end.y, t),
            lerp(self.start.z, self.end.z, t),
        );
        position.y += 4.0 * self.apex_height * t * (1.0 - t);
        position
    }

    /// World velocity at normalized time `t`.
    pub fn velocity_at(&self, t: f32) -> Vec3 {
        if self.duration <= 0.0 {
            return Vec3::ZERO;
        }
        let t = t.clamp(0.0, 1.0);
        let mut velocity = self.end - self.start;
        velocity.y += 4.0 * self.apex_height * (1.0 - 2.0 * t);
        velocity / self.duration
    }
}
