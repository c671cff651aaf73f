//! Character and simulation tuning.
//!
//! Every value has a shipped default; JSON overrides only need the fields
//! they change.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use railrunner_physics::{MovementSetting, SolverConfig};

use crate::ground_type::GroundTypeTable;
use crate::input::InputConfig;
use crate::lockon::LockonConfig;

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Rail attachment and grinding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrindConfig {
    /// Attach is refused this close to either rail end.
    pub end_fudge: f32,
    /// Max height of the feet above the rail when attaching.
    pub vertical_tolerance: f32,
    /// Max sideways distance from the rail when attaching.
    pub lateral_tolerance: f32,
    /// Sideways tolerance while grind-stepping between rails.
    pub step_lateral_tolerance: f32,
    /// Allow attaching on the landing tick even outside the vertical window.
    pub allow_landing_grind: bool,
    /// Forward wall check on attach.
    pub wall_check_distance: f32,
    /// Speed granted on attach when slower.
    pub min_entry_speed: f32,
    pub step_power: f32,
    pub step_side_speed: f32,
}

impl Default for GrindConfig {
    fn default() -> Self {
        Self {
            end_fudge: 1.0,
            vertical_tolerance: 0.6,
            lateral_tolerance: 1.0,
            step_lateral_tolerance: 3.5,
            allow_landing_grind: true,
            wall_check_distance: 1.0,
            min_entry_speed: 8.0,
            step_power: 7.0,
            step_side_speed: 12.0,
        }
    }
}

/// Per-character tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub run: MovementSetting,
    pub backstep: MovementSetting,
    pub air: MovementSetting,
    pub slide: MovementSetting,
    pub drift: MovementSetting,
    pub crouch: MovementSetting,
    pub sidle: MovementSetting,
    pub grind: MovementSetting,
    pub zipline: MovementSetting,

    /// Turn smooth time at standstill (seconds).
    pub turn_smooth_standing: f32,
    /// Turn smooth time at top speed.
    pub turn_smooth_top_speed: f32,
    /// Turn smooth time when input pulls back across the path forward.
    pub turn_smooth_recenter: f32,
    /// Input this far from travel (radians) counts as reversing.
    pub skid_angle: f32,
    /// Input multiplier when input is perpendicular to travel.
    pub perpendicular_input_scale: f32,
    /// Largest angle from the path forward allowed at top speed.
    pub high_speed_arc: f32,
    /// Speed ratio above which the arc clamp applies.
    pub high_speed_arc_ratio: f32,

    pub jump_power: f32,
    /// Holding jump this long keeps gravity reduced.
    pub jump_hold_time: f32,
    pub jump_hold_gravity_scale: f32,
    pub backflip_power: f32,
    pub backflip_back_speed: f32,
    pub spin_jump_power: f32,
    pub bounce_power: f32,
    pub stomp_speed: f32,

    pub jump_dash_speed: f32,
    pub jump_dash_time: f32,
    pub homing_speed: f32,
    pub homing_max_time: f32,
    pub homing_hit_distance: f32,
    pub homing_rebound: f32,
    pub light_dash_speed: f32,
    /// Max gap between consecutive light-dash rings.
    pub light_dash_range: f32,

    pub knockback_speed: f32,
    pub knockback_height: f32,
    pub invincibility_time: f32,
    pub teleport_delay: f32,
    /// Seconds removed from a petrify per jump press.
    pub petrify_mash: f32,
    pub quick_step_distance: f32,
    pub quick_step_time: f32,
    /// Slide ends below this speed.
    pub slide_min_speed: f32,
    /// Drift needs at least this much speed to start and to keep going.
    pub drift_min_speed: f32,
    /// Drift turn rate at full stick (radians/second).
    pub drift_turn_rate: f32,
    /// Recentering lateral speed as a fraction of move speed.
    pub recenter_ratio: f32,
    /// Share of the recentering rate lost while the stick pushes fully away
    /// from the centerline, in `[0, 1]`.
    pub recenter_input_damping: f32,
    /// Stick deflection along the path that counts as a deliberate push out
    /// of Backstep.
    pub backstep_push_threshold: f32,
    /// Crossfade handed to the camera on teleports and path switches.
    pub camera_crossfade: f32,

    pub rail: GrindConfig,
    pub input: InputConfig,
    pub lockon: LockonConfig,
    pub solver: SolverConfig,
    pub ground_types: GroundTypeTable,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            run: MovementSetting::new(30.0, 14.0, 18.0, 6.0, 60.0),
            backstep: MovementSetting::new(8.0, 10.0, 16.0, 12.0, 40.0),
            air: MovementSetting::new(30.0, 8.0, 2.0, 3.0, 20.0),
            slide: MovementSetting::new(35.0, 12.0, 6.0, 4.0, 20.0),
            drift: MovementSetting::new(32.0, 6.0, 4.0, 3.0, 10.0),
            crouch: MovementSetting::new(4.0, 8.0, 20.0, 20.0, 40.0),
            sidle: MovementSetting::new(5.0, 10.0, 20.0, 20.0, 40.0),
            grind: MovementSetting::new(28.0, 4.0, 1.0, 2.0, 10.0),
            zipline: MovementSetting::new(24.0, 10.0, 1.0, 4.0, 10.0),

            turn_smooth_standing: 0.12,
            turn_smooth_top_speed: 0.3,
            turn_smooth_recenter: 0.06,
            skid_angle: 135f32.to_radians(),
            perpendicular_input_scale: 0.6,
            high_speed_arc: 70f32.to_radians(),
            high_speed_arc_ratio: 0.75,

            jump_power: 13.0,
            jump_hold_time: 0.25,
            jump_hold_gravity_scale: 0.55,
            backflip_power: 15.0,
            backflip_back_speed: -6.0,
            spin_jump_power: 11.0,
            bounce_power: 17.0,
            stomp_speed: 40.0,

            jump_dash_speed: 28.0,
            jump_dash_time: 0.25,
            homing_speed: 40.0,
            homing_max_time: 1.0,
            homing_hit_distance: 0.9,
            homing_rebound: 11.0,
            light_dash_speed: 45.0,
            light_dash_range: 7.0,

            knockback_speed: -8.0,
            knockback_height: 6.0,
            invincibility_time: 1.5,
            teleport_delay: 0.3,
            petrify_mash: 0.25,
            quick_step_distance: 3.0,
            quick_step_time: 0.15,
            slide_min_speed: 3.0,
            drift_min_speed: 12.0,
            drift_turn_rate: 2.2,
            recenter_ratio: 0.25,
            recenter_input_damping: 0.6,
            backstep_push_threshold: 0.1,
            camera_crossfade: 0.4,

            rail: GrindConfig::default(),
            input: InputConfig::default(),
            lockon: LockonConfig::default(),
            solver: SolverConfig::default(),
            ground_types: GroundTypeTable::default(),
        }
    }
}

impl CharacterConfig {
    /// Reject values that would break the integrators.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let settings = [
            ("run", &self.run),
            ("backstep", &self.backstep),
            ("air", &self.air),
            ("slide", &self.slide),
            ("drift", &self.drift),
            ("crouch", &self.crouch),
            ("sidle", &self.sidle),
            ("grind", &self.grind),
            ("zipline", &self.zipline),
        ];
        for (name, setting) in settings {
            if setting.speed <= 0.0 {
                return Err(ConfigError::Invalid(format!("{name}.speed must be positive")));
            }
            if setting.traction < 0.0 || setting.friction < 0.0 || setting.turnaround < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} rates must not be negative")));
            }
        }
        if self.solver.whisker_count == 0 {
            return Err(ConfigError::Invalid("solver.whisker_count must be at least 1".into()));
        }
        if self.turn_smooth_standing <= 0.0
            || self.turn_smooth_top_speed <= 0.0
            || self.turn_smooth_recenter <= 0.0
        {
            return Err(ConfigError::Invalid("turn smooth times must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.recenter_input_damping) {
            return Err(ConfigError::Invalid(
                "recenter_input_damping must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Game simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulation tick rate (ticks per second).
    pub tick_rate: u32,

    pub character: CharacterConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            character: CharacterConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Get the time step per tick in seconds.
    pub fn delta_time(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be positive".into()));
        }
        self.character.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.delta_time() - 1.0 / 60.0).abs() < 1.0e-7);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = SimulationConfig::from_json_str(
            r#"{ "tick_rate": 120, "character": { "jump_power": 20.0, "run": { "speed": 10.0, "traction": 5.0 } } }"#,
        )
        .expect("valid config");

        assert_eq!(config.tick_rate, 120);
        assert_eq!(config.character.jump_power, 20.0);
        assert_eq!(config.character.run.speed, 10.0);
        assert_eq!(config.character.run.traction, 5.0);
        // Untouched fields keep their defaults
        assert_eq!(
            config.character.backstep.speed,
            CharacterConfig::default().backstep.speed
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SimulationConfig::from_json_str(r#"{ "tick_rate": 0 }"#);
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let err = SimulationConfig::from_json_str(r#"{ "character": { "run": { "speed": -1.0 } } }"#);
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let err = SimulationConfig::from_json_str(
            r#"{ "character": { "recenter_input_damping": 1.5 } }"#,
        );
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let err = SimulationConfig::from_json_str("{ not json");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SimulationConfig::from_json_file("/nonexistent/railrunner.json");
        assert!(matches!(err, Err(ConfigError::Io(_))));
    }
}
