//! Railrunner Game Logic
//!
//! The character rules that sit on top of `railrunner-physics`:
//!
//! - Input sampling with buffered triggers
//! - Lockouts (temporary control overrides) and lockon targeting
//! - The movement states and the machine that drives them
//! - Level description and the fixed-tick simulation loop
//!
//! # Architecture
//!
//! All mutable character data lives in one [`CharacterContext`] that every
//! state receives by reference. States return the next [`StateId`] or `None`;
//! the [`StateMachine`] checks the edge against its [`TransitionTable`] and
//! performs the exit/enter swap.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Simulation                          │
//! │  ┌─────────┐   ┌──────────────┐   ┌───────────────────────┐  │
//! │  │ Input   │──►│ StateMachine │──►│ motion / solver       │  │
//! │  │ Sampler │   │ (interrupts, │   │ (speed, turning, path,│  │
//! │  └─────────┘   │  states)     │   │  ground, wall, ceil.) │  │
//! │                └──────────────┘   └───────────────────────┘  │
//! │        ▲                                    │                │
//! │        └──────── trigger volumes ◄──────────┘                │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod character;
pub mod collaborators;
pub mod config;
pub mod grind;
pub mod ground_type;
pub mod input;
pub mod launcher;
pub mod level;
pub mod lockon;
pub mod lockout;
pub mod machine;
pub mod motion;
pub mod simulation;
pub mod states;

// Re-export main types
pub use character::{CharacterContext, GrindBinding, Interrupt, LevelEvent};
pub use collaborators::{
    AnimationDriver, CameraDriver, Collaborators, EffectsDriver, Notification, RecordingLog,
};
pub use config::{CharacterConfig, ConfigError, SimulationConfig};
pub use ground_type::GroundType;
pub use input::{InputSampler, PlayerInput};
pub use launcher::LaunchSettings;
pub use level::{Level, TriggerKind, TriggerVolume};
pub use lockon::LockonTargeting;
pub use lockout::{LockoutResource, LockoutStack, MovementMode, ResetFlags, SpaceMode};
pub use machine::StateMachine;
pub use simulation::Simulation;
pub use states::{PlayerState, StateId, TransitionTable, Trigger};

// Re-export physics types for convenience
pub use railrunner_physics::{
    CollisionWorld, ContentFlags, Curve, CurveId, MovementSetting, MovementState, PathFollower,
    SurfaceFlags,
};
