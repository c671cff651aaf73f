//! Player input handling.
//!
//! Raw per-tick frames ([`PlayerInput`]) go through the [`InputSampler`],
//! which applies the analog deadzone, edge-detects presses and keeps the
//! short buffers that let a press land a few ticks early.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use railrunner_physics::math::wrap_angle;

/// Raw player input for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Analog stick, `x` = right, `y` = forward, each in `[-1, 1]`.
    pub axis: Vec2,

    /// Action button states.
    pub actions: ActionInput,
}

/// Action button states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInput {
    pub jump: bool,
    /// Crouch / slide / drift / stomp.
    pub action: bool,
    /// Homing attack / jump dash.
    pub attack: bool,
    pub light_dash: bool,
    pub brake: bool,
    pub quick_step_left: bool,
    pub quick_step_right: bool,
}

impl PlayerInput {
    /// Full-forward stick, no buttons.
    pub fn forward() -> Self {
        Self {
            axis: Vec2::new(0.0, 1.0),
            ..Default::default()
        }
    }

    pub fn with_axis(mut self, x: f32, y: f32) -> Self {
        self.axis = Vec2::new(x, y);
        self
    }

    pub fn with_jump(mut self) -> Self {
        self.actions.jump = true;
        self
    }

    pub fn with_action(mut self) -> Self {
        self.actions.action = true;
        self
    }

    pub fn with_attack(mut self) -> Self {
        self.actions.attack = true;
        self
    }

    /// Check if any movement input is active.
    pub fn has_movement(&self) -> bool {
        self.axis.length_squared() > 0.0
    }
}

/// Input tuning: analog deadzone and buffer windows (seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Radial deadzone on the stick.
    pub deadzone: f32,
    pub jump_buffer: f32,
    pub action_buffer: f32,
    pub attack_buffer: f32,
    pub light_dash_buffer: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            deadzone: 0.2,
            jump_buffer: 0.1,
            action_buffer: 0.1,
            attack_buffer: 0.12,
            light_dash_buffer: 0.15,
        }
    }
}

/// Remaining window below this counts as expired (absorbs float drift).
const BUFFER_EPSILON: f32 = 1.0e-5;

/// A press that stays "active" for a short window after it happened.
#[derive(Debug, Clone, Copy, Default)]
struct BufferedTrigger {
    remaining: f32,
}

impl BufferedTrigger {
    fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    fn press(&mut self, window: f32) {
        self.remaining = window;
    }

    fn is_active(self) -> bool {
        self.remaining > BUFFER_EPSILON
    }

    fn reset(&mut self) {
        self.remaining = 0.0;
    }
}

/// Deadzone-filtered, buffered view of the player's input.
#[derive(Debug, Clone, Default)]
pub struct InputSampler {
    config: InputConfig,
    axis: Vec2,
    current: ActionInput,
    previous: ActionInput,
    jump: BufferedTrigger,
    action: BufferedTrigger,
    attack: BufferedTrigger,
    light_dash: BufferedTrigger,
}

impl InputSampler {
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Take this tick's frame. Buffers age first, then new presses refill them.
    pub fn sample(&mut self, input: &PlayerInput, dt: f32) {
        self.jump.tick(dt);
        self.action.tick(dt);
        self.attack.tick(dt);
        self.light_dash.tick(dt);

        self.previous = self.current;
        self.current = input.actions;
        self.axis = apply_deadzone(input.axis, self.config.deadzone);

        if self.current.jump && !self.previous.jump {
            self.jump.press(self.config.jump_buffer);
        }
        if self.current.action && !self.previous.action {
            self.action.press(self.config.action_buffer);
        }
        if self.current.attack && !self.previous.attack {
            self.attack.press(self.config.attack_buffer);
        }
        if self.current.light_dash && !self.previous.light_dash {
            self.light_dash.press(self.config.light_dash_buffer);
        }
    }

    /// Filtered stick, magnitude in `[0, 1]`.
    pub fn axis(&self) -> Vec2 {
        self.axis
    }

    pub fn has_input(&self) -> bool {
        self.axis != Vec2::ZERO
    }

    pub fn strength(&self) -> f32 {
        self.axis.length().min(1.0)
    }

    /// World yaw the stick points at, relative to `reference_yaw` (the yaw
    /// "forward on the stick" maps to). `None` inside the deadzone.
    pub fn input_angle(&self, reference_yaw: f32) -> Option<f32> {
        if !self.has_input() {
            return None;
        }
        // Stick right turns clockwise seen from above, i.e. toward lower yaw
        Some(wrap_angle(reference_yaw + (-self.axis.x).atan2(self.axis.y)))
    }

    pub fn is_jump_buffer_active(&self) -> bool {
        self.jump.is_active()
    }

    pub fn reset_jump_buffer(&mut self) {
        self.jump.reset();
    }

    pub fn is_action_buffer_active(&self) -> bool {
        self.action.is_active()
    }

    pub fn reset_action_buffer(&mut self) {
        self.action.reset();
    }

    pub fn is_attack_buffer_active(&self) -> bool {
        self.attack.is_active()
    }

    pub fn reset_attack_buffer(&mut self) {
        self.attack.reset();
    }

    pub fn is_light_dash_buffer_active(&self) -> bool {
        self.light_dash.is_active()
    }

    pub fn reset_light_dash_buffer(&mut self) {
        self.light_dash.reset();
    }

    pub fn is_jump_held(&self) -> bool {
        self.current.jump
    }

    pub fn is_action_held(&self) -> bool {
        self.current.action
    }

    pub fn is_attack_held(&self) -> bool {
        self.current.attack
    }

    pub fn is_brake_held(&self) -> bool {
        self.current.brake
    }

    pub fn quick_step_left_pressed(&self) -> bool {
        self.current.quick_step_left && !self.previous.quick_step_left
    }

    pub fn quick_step_right_pressed(&self) -> bool {
        self.current.quick_step_right && !self.previous.quick_step_right
    }

    /// Jump presses this tick (edge), ignoring the buffer.
    pub fn jump_pressed(&self) -> bool {
        self.current.jump && !self.previous.jump
    }

    /// Drop every buffered press.
    pub fn reset_all_buffers(&mut self) {
        self.jump.reset();
        self.action.reset();
        self.attack.reset();
        self.light_dash.reset();
    }
}

/// Radial deadzone: magnitudes inside `deadzone` become zero, the rest are
/// rescaled so the usable range still spans `[0, 1]`.
pub fn apply_deadzone(raw: Vec2, deadzone: f32) -> Vec2 {
    let length = raw.length();
    if length <= deadzone || length <= f32::EPSILON {
        return Vec2::ZERO;
    }
    let scaled = ((length - deadzone) / (1.0 - deadzone).max(f32::EPSILON)).min(1.0);
    raw / length * scaled
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_deadzone_rescales() {
        assert_eq!(apply_deadzone(Vec2::new(0.1, 0.1), 0.2), Vec2::ZERO);

        let half = apply_deadzone(Vec2::new(0.0, 0.6), 0.2);
        assert!((half.y - 0.5).abs() < 1.0e-5);

        let full = apply_deadzone(Vec2::new(3.0, 4.0), 0.2);
        assert!((full.length() - 1.0).abs() < 1.0e-5);
    }

    #[test]
    fn test_jump_buffer_window() {
        let mut sampler = InputSampler::new(InputConfig::default());

        sampler.sample(&PlayerInput::default().with_jump(), DT);
        assert!(sampler.is_jump_buffer_active());

        // Held: no new edge, the buffer keeps aging
        for _ in 0..5 {
            sampler.sample(&PlayerInput::default().with_jump(), DT);
        }
        assert!(sampler.is_jump_buffer_active());
        sampler.sample(&PlayerInput::default(), DT);
        assert!(!sampler.is_jump_buffer_active());
    }

    #[test]
    fn test_reset_consumes_buffer() {
        let mut sampler = InputSampler::new(InputConfig::default());
        sampler.sample(&PlayerInput::default().with_jump(), DT);
        sampler.reset_jump_buffer();
        assert!(!sampler.is_jump_buffer_active());
        assert!(sampler.is_jump_held());

        // Holding does not re-arm it
        sampler.sample(&PlayerInput::default().with_jump(), DT);
        assert!(!sampler.is_jump_buffer_active());
    }

    #[test]
    fn test_press_after_decrement_gets_full_window() {
        let config = InputConfig {
            jump_buffer: 2.0 * DT,
            ..Default::default()
        };
        let mut sampler = InputSampler::new(config);
        sampler.sample(&PlayerInput::default().with_jump(), DT);
        sampler.sample(&PlayerInput::default(), DT);
        assert!(sampler.is_jump_buffer_active());
        sampler.sample(&PlayerInput::default(), DT);
        assert!(!sampler.is_jump_buffer_active());
    }

    #[test]
    fn test_input_angle_is_camera_relative() {
        let mut sampler = InputSampler::new(InputConfig::default());
        sampler.sample(&PlayerInput::forward(), DT);
        assert!(sampler.input_angle(1.0).is_some_and(|a| (a - 1.0).abs() < 1.0e-5));

        sampler.sample(&PlayerInput::default().with_axis(-1.0, 0.0), DT);
        let left = sampler.input_angle(0.0).unwrap_or_default();
        assert!((left - FRAC_PI_2).abs() < 1.0e-5);

        sampler.sample(&PlayerInput::default(), DT);
        assert!(sampler.input_angle(0.0).is_none());
    }

    #[test]
    fn test_quick_step_edges() {
        let mut sampler = InputSampler::new(InputConfig::default());
        let mut input = PlayerInput::default();
        input.actions.quick_step_left = true;

        sampler.sample(&input, DT);
        assert!(sampler.quick_step_left_pressed());
        sampler.sample(&input, DT);
        assert!(!sampler.quick_step_left_pressed());
        assert!(!sampler.quick_step_right_pressed());
    }
}
