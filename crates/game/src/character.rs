//! The character context: everything a state may read or write.
//!
//! States own no copy of the character. Each callback receives the single
//! [`CharacterContext`] by `&mut` and the level by `&`.

use std::collections::HashSet;
use std::sync::Arc;

use glam::Vec3;

use railrunner_physics::{Curve, MovementState, PathFollower};

use crate::collaborators::Collaborators;
use crate::config::CharacterConfig;
use crate::input::InputSampler;
use crate::launcher::LaunchSettings;
use crate::lockon::{LockonTargeting, ViewPose};
use crate::lockout::LockoutStack;
use crate::states::Trigger;

/// Out-of-band event that may force a state change before the current state
/// runs. Payloads are handed to the entered state through
/// [`CharacterContext::payload`].
#[derive(Debug, Clone)]
pub enum Interrupt {
    Damage { source: Vec3 },
    Crush,
    Launcher { volume_id: u32, settings: LaunchSettings },
    Teleporter { destination: Vec3, angle: f32 },
    Petrify { duration: f32 },
    Automation { curve: Arc<Curve>, speed: f32 },
    Zipline { curve: Arc<Curve> },
    Sidle,
}

impl Interrupt {
    pub fn trigger(&self) -> Trigger {
        match self {
            Self::Damage { .. } => Trigger::Damage,
            Self::Crush => Trigger::Crush,
            Self::Launcher { .. } => Trigger::Launcher,
            Self::Teleporter { .. } => Trigger::Teleporter,
            Self::Petrify { .. } => Trigger::Petrify,
            Self::Automation { .. } => Trigger::Automation,
            Self::Zipline { .. } => Trigger::Zipline,
            Self::Sidle => Trigger::Sidle,
        }
    }
}

/// Changes the character asks the level to make after the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEvent {
    DestroyTarget(u32),
}

/// The rail the character is attached to.
#[derive(Debug, Clone)]
pub struct GrindBinding {
    pub rail_id: u32,
    /// Frame along the rail, bound in travel direction.
    pub follower: PathFollower,
    /// Distance travelled along the rail in travel direction.
    pub progress: f32,
}

impl GrindBinding {
    pub fn new(rail_id: u32, curve: Arc<Curve>, reversed: bool, position: Vec3) -> Self {
        let mut follower = PathFollower::new();
        follower.set_active_path(curve, reversed, position);
        let progress = follower.progress();
        Self {
            rail_id,
            follower,
            progress,
        }
    }

    pub fn length(&self) -> f32 {
        self.follower
            .active_path()
            .map_or(0.0, |curve| curve.length())
    }

    /// Closed rails have no end; progress keeps growing lap after lap.
    pub fn is_looping(&self) -> bool {
        self.follower.is_looping()
    }

    /// Progress as a fraction of the rail, `1.0` at the far end. On a loop
    /// this is the fraction of the current lap and stays below `1.0`.
    pub fn progress_ratio(&self) -> f32 {
        let length = self.length();
        if length <= 0.0 {
            return 1.0;
        }
        if self.is_looping() {
            let ratio = self.progress.rem_euclid(length) / length;
            return if ratio < 1.0 { ratio } else { 0.0 };
        }
        (self.progress / length).clamp(0.0, 1.0)
    }

    /// Reached the far end of an open rail.
    pub fn at_end(&self) -> bool {
        !self.is_looping() && self.progress_ratio() >= 1.0
    }
}

/// Mutable character state shared by all movement states.
#[derive(Debug)]
pub struct CharacterContext {
    pub pose: MovementState,
    pub follower: PathFollower,
    pub input: InputSampler,
    pub lockouts: LockoutStack,
    pub lockon: LockonTargeting,
    pub config: Arc<CharacterConfig>,
    pub collaborators: Collaborators,
    /// Seconds per tick.
    pub dt: f32,

    /// Raised during a tick, consumed by the machine before the next state
    /// update.
    pub interrupts: Vec<Interrupt>,
    pub level_events: Vec<LevelEvent>,
    /// Payload of the interrupt that caused the current state entry.
    pub payload: Option<Interrupt>,

    pub grind: Option<GrindBinding>,
    /// Rail left most recently, skipped by grind-step reattachment.
    pub last_rail: Option<u32>,
    /// Launcher volume currently flying the character.
    pub active_launcher: Option<u32>,
    /// Remaining drift-zone window.
    pub drift_window: f32,
    pub invincibility: f32,
    pub can_air_dash: bool,
    pub in_sidle_zone: bool,
    pub consumed_rings: HashSet<u32>,
    /// Smoothing velocity for movement-angle damping.
    pub turn_velocity: f32,
    /// Ticks spent in the current state.
    pub state_ticks: u32,
}

impl CharacterContext {
    pub fn new(config: Arc<CharacterConfig>, collaborators: Collaborators, dt: f32) -> Self {
        Self {
            pose: MovementState::default(),
            follower: PathFollower::new(),
            input: InputSampler::new(config.input.clone()),
            lockouts: LockoutStack::new(),
            lockon: LockonTargeting::new(config.lockon.clone()),
            config,
            collaborators,
            dt,
            interrupts: Vec::new(),
            level_events: Vec::new(),
            payload: None,
            grind: None,
            last_rail: None,
            active_launcher: None,
            drift_window: 0.0,
            invincibility: 0.0,
            can_air_dash: true,
            in_sidle_zone: false,
            consumed_rings: HashSet::new(),
            turn_velocity: 0.0,
            state_ticks: 0,
        }
    }

    /// Place the character and bind the path follower.
    pub fn spawn(&mut self, position: Vec3, angle: f32, path: Option<(Arc<Curve>, bool)>) {
        self.pose = MovementState::new(position);
        self.pose.set_movement_angle(angle);
        self.turn_velocity = 0.0;
        match path {
            Some((curve, reversed)) => {
                self.follower.set_active_path(curve, reversed, position);
                self.follower.resync(position);
            }
            None => self.follower.clear_path(),
        }
    }

    pub fn is_invincible(&self) -> bool {
        self.invincibility > 0.0
    }

    /// Whether the active lockout suppresses jump / attack / action.
    pub fn actions_disabled(&self) -> bool {
        self.lockouts.actions_disabled()
    }

    /// Count down orthogonal timers.
    pub fn tick_timers(&mut self) {
        self.invincibility = (self.invincibility - self.dt).max(0.0);
        self.drift_window = (self.drift_window - self.dt).max(0.0);
        self.lockouts.update(self.dt);
    }

    /// Pose for lockon visibility queries.
    pub fn view_pose(&self) -> ViewPose {
        ViewPose {
            position: self.pose.position,
            up: self.pose.up_direction(),
            forward: self.pose.forward_direction(),
        }
    }

    /// Teleport-style position change: moves and resyncs the path frame.
    pub fn warp_to(&mut self, position: Vec3) {
        self.pose.position = position;
        self.follower.resync(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railrunner_physics::CurveId;

    fn context() -> CharacterContext {
        CharacterContext::new(
            Arc::new(CharacterConfig::default()),
            Collaborators::null(),
            1.0 / 60.0,
        )
    }

    #[test]
    fn test_spawn_binds_path() {
        let curve = Curve::from_positions(CurveId(3), &[Vec3::ZERO, Vec3::new(0.0, 0.0, 50.0)])
            .expect("curve");
        let mut ctx = context();
        ctx.spawn(Vec3::new(1.0, 0.0, 10.0), 0.0, Some((Arc::new(curve), false)));

        assert!((ctx.follower.progress() - 10.0).abs() < 0.05);
        assert_eq!(ctx.pose.position, Vec3::new(1.0, 0.0, 10.0));
    }

    #[test]
    fn test_timers_count_down_to_zero() {
        let mut ctx = context();
        ctx.invincibility = 0.02;
        ctx.drift_window = 1.0;
        ctx.tick_timers();
        ctx.tick_timers();
        assert!(!ctx.is_invincible());
        assert!(ctx.drift_window > 0.9);
    }

    #[test]
    fn test_grind_binding_ratio() {
        let curve = Curve::from_positions(CurveId(4), &[Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0)])
            .expect("curve");
        let mut binding = GrindBinding::new(1, Arc::new(curve), false, Vec3::new(0.0, 0.5, 2.0));
        assert!((binding.progress_ratio() - 0.2).abs() < 0.01);
        binding.progress = binding.length();
        assert_eq!(binding.progress_ratio(), 1.0);
        assert!(binding.at_end());
    }

    #[test]
    fn test_loop_binding_never_ends() {
        let curve = Curve::from_positions(
            CurveId(5),
            &[
                Vec3::ZERO,
                Vec3::new(10.0, 0.0, 0.0),
                Vec3::new(10.0, 0.0, 10.0),
                Vec3::ZERO,
            ],
        )
        .expect("curve");
        let mut binding = GrindBinding::new(1, Arc::new(curve), false, Vec3::ZERO);
        assert!(binding.is_looping());

        let length = binding.length();
        binding.progress = length;
        assert!(binding.progress_ratio() < 1.0e-3);
        binding.progress = length * 2.5;
        assert!((binding.progress_ratio() - 0.5).abs() < 1.0e-3);
        assert!(!binding.at_end());
    }

    #[test]
    fn test_interrupt_maps_to_trigger() {
        assert_eq!(Interrupt::Crush.trigger(), Trigger::Crush);
        assert_eq!(Interrupt::Petrify { duration: 1.0 }.trigger(), Trigger::Petrify);
    }
}
