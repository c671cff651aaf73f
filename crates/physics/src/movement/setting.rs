//! Per-state speed curve: cap, acceleration and the three kinds of braking.

use serde::{Deserialize, Serialize};

use crate::math::move_toward;

/// Input magnitudes below this count as "no input".
const INPUT_EPSILON: f32 = 1.0e-4;

/// Slope ratios below this count as level ground.
const SLOPE_EPSILON: f32 = 1.0e-3;

/// Speed curve for one movement state.
///
/// All rates are in meters/second².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSetting {
    /// Speed cap (meters/second).
    pub speed: f32,
    /// Acceleration toward the input-scaled cap.
    pub traction: f32,
    /// Deceleration toward zero when there is no input.
    pub friction: f32,
    /// Deceleration while above the cap.
    pub overspeed: f32,
    /// Deceleration while input opposes the current direction.
    pub turnaround: f32,
}

impl Default for MovementSetting {
    fn default() -> Self {
        Self {
            speed: 10.0,
            traction: 5.0,
            friction: 8.0,
            overspeed: 4.0,
            turnaround: 30.0,
        }
    }
}

impl MovementSetting {
    pub const fn new(speed: f32, traction: f32, friction: f32, overspeed: f32, turnaround: f32) -> Self {
        Self {
            speed,
            traction,
            friction,
            overspeed,
            turnaround,
        }
    }

    /// Advance a signed speed one tick toward `speed * input`.
    ///
    /// `input` is the signed input strength in `[-1, 1]`. The result never
    /// passes the value it is moving toward.
    pub fn update_interpolate(&self, current: f32, input: f32, dt: f32) -> f32 {
        let target = self.speed * input;

        if input.abs() < INPUT_EPSILON {
            return move_toward(current, 0.0, self.friction * dt);
        }

        if current.abs() > INPUT_EPSILON && current.signum() != input.signum() {
            return move_toward(current, 0.0, self.turnaround * dt);
        }

        if current.abs() > self.speed {
            return move_toward(current, target, self.overspeed * dt);
        }

        if current.abs() > target.abs() {
            return move_toward(current, target, self.friction * dt);
        }

        move_toward(current, target, self.traction * dt)
    }

    /// Advance an unsigned slide speed one tick.
    ///
    /// `slope_ratio` is positive downhill and negative uphill, with `1.0`
    /// meaning straight down the fall line.
    pub fn update_slide(&self, current: f32, slope_ratio: f32, dt: f32) -> f32 {
        let current = current.max(0.0);

        let next = if current > self.speed {
            move_toward(current, self.speed, self.overspeed * dt)
        } else if slope_ratio > SLOPE_EPSILON {
            move_toward(current, self.speed, self.traction * slope_ratio * dt)
        } else if slope_ratio < -SLOPE_EPSILON {
            let brake = self.friction + self.turnaround * -slope_ratio;
            move_toward(current, 0.0, brake * dt)
        } else {
            move_toward(current, 0.0, self.friction * dt)
        };

        next.max(0.0)
    }

    /// `|current| / speed`, unclamped. Zero for a zero cap.
    pub fn speed_ratio(&self, current: f32) -> f32 {
        if self.speed <= f32::EPSILON {
            0.0
        } else {
            current.abs() / self.speed
        }
    }

    /// [`Self::speed_ratio`] clamped to `[0, 1]`.
    pub fn speed_ratio_clamped(&self, current: f32) -> f32 {
        self.speed_ratio(current).min(1.0)
    }

    /// Copy with scaled traction and friction (used by lockouts).
    pub fn with_multipliers(&self, traction: f32, friction: f32) -> Self {
        Self {
            traction: self.traction * traction,
            friction: self.friction * friction,
            ..*self
        }
    }
}
