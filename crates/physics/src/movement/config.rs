//! Collision solver configuration.
//!
//! All solver parameters are grouped here for easy tuning. Angles are in
//! radians, rates in radians/second.

use serde::{Deserialize, Serialize};

/// Configuration for ground, wall and ceiling probing and orientation.
///
/// All values use metric units (meters, seconds) unless otherwise noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    // ========================================================================
    // Character Dimensions
    // ========================================================================
    /// Collision radius (meters). Ground rays start this far above the feet.
    pub collision_radius: f32,

    /// Body height (meters), used by the ceiling probe.
    pub collision_height: f32,

    // ========================================================================
    // Ground
    // ========================================================================
    /// Number of whisker rays in the ring around the center ray.
    pub whisker_count: usize,

    /// Ring radius as a fraction of the collision radius.
    pub whisker_ring_ratio: f32,

    /// Extra ray length while grounded, keeps the character attached over bumps.
    pub snap_margin: f32,

    /// Steepest floor (relative to the current up direction) that can be stood on.
    pub max_ground_angle: f32,

    // ========================================================================
    // Walls and Ceilings
    // ========================================================================
    /// Walls closer to parallel with travel than this are ignored.
    pub wall_min_angle: f32,

    /// Walls steeper into travel than this stop the character.
    pub wall_head_on_angle: f32,

    /// Slanted ceilings tilted beyond this may be slid along (backflip).
    pub ceiling_slide_angle: f32,

    // ========================================================================
    // Orientation
    // ========================================================================
    /// Up blend rate while grounded and standing still.
    pub up_blend_min_rate: f32,

    /// Up blend rate while grounded at `up_blend_reference_speed`.
    pub up_blend_max_rate: f32,

    /// Ground speed at which the up blend reaches its max rate.
    pub up_blend_reference_speed: f32,

    /// Airborne up recovery while falling at `air_recovery_fall_speed` or faster.
    pub air_recovery_fast_rate: f32,

    /// Airborne up recovery right at the apex.
    pub air_recovery_slow_rate: f32,

    /// Airborne up recovery while rising.
    pub air_recovery_rising_rate: f32,

    /// Fall speed at which recovery reaches its fast rate.
    pub air_recovery_fall_speed: f32,

    // ========================================================================
    // Physics
    // ========================================================================
    /// Gravity acceleration (meters/second²).
    pub gravity: f32,

    /// Terminal fall speed (meters/second).
    pub max_fall_speed: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            collision_radius: 0.4,
            collision_height: 1.2,

            whisker_count: 8,
            whisker_ring_ratio: 0.8,
            snap_margin: 0.35,
            max_ground_angle: 55.0_f32.to_radians(),

            wall_min_angle: 15.0_f32.to_radians(),
            wall_head_on_angle: 60.0_f32.to_radians(),
            ceiling_slide_angle: 30.0_f32.to_radians(),

            up_blend_min_rate: 3.0,
            up_blend_max_rate: 18.0,
            up_blend_reference_speed: 20.0,

            air_recovery_fast_rate: 6.0,
            air_recovery_slow_rate: 1.0,
            air_recovery_rising_rate: 0.15,
            air_recovery_fall_speed: 15.0,

            gravity: 35.0,
            max_fall_speed: 45.0,
        }
    }
}

impl SolverConfig {
    /// Up blend rate for a ground speed.
    pub fn up_blend_rate(&self, ground_speed: f32) -> f32 {
        let t = if self.up_blend_reference_speed > 0.0 {
            (ground_speed.abs() / self.up_blend_reference_speed).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.up_blend_min_rate + (self.up_blend_max_rate - self.up_blend_min_rate) * t
    }

    /// Airborne up recovery rate for a vertical speed (positive = rising).
    pub fn air_recovery_rate(&self, vertical_speed: f32) -> f32 {
        if vertical_speed > 0.0 {
            return self.air_recovery_rising_rate;
        }
        let t = if self.air_recovery_fall_speed > 0.0 {
            (-vertical_speed / self.air_recovery_fall_speed).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.air_recovery_slow_rate + (self.air_recovery_fast_rate - self.air_recovery_slow_rate) * t
    }
}
