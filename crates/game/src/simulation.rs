//! Game simulation - the fixed-tick loop.
//!
//! One tick samples input, counts down timers, refreshes the lockon target,
//! steps the state machine and then feeds trigger-volume edges back in as
//! interrupts for the next tick. Nothing here can fail; stale references are
//! dropped and logged.

use std::sync::Arc;

use railrunner_physics::{CurveError, MovementState};

use crate::character::{CharacterContext, Interrupt, LevelEvent};
use crate::collaborators::Collaborators;
use crate::config::SimulationConfig;
use crate::input::PlayerInput;
use crate::level::{Level, TriggerEvent, TriggerKind};
use crate::machine::StateMachine;
use crate::states::StateId;

/// The character simulation.
///
/// Runs deterministically: the same level, config and input tape always
/// produce the same poses.
#[derive(Debug)]
pub struct Simulation {
    /// Current frame/tick number.
    pub frame: u64,

    pub config: SimulationConfig,

    pub level: Level,

    character: CharacterContext,
    machine: StateMachine,
}

impl Simulation {
    /// Create a headless simulation spawned at the level's start.
    pub fn new(config: SimulationConfig, level: Level) -> Self {
        Self::with_collaborators(config, level, Collaborators::null())
    }

    /// Create a simulation that reports to the given presentation drivers.
    pub fn with_collaborators(
        config: SimulationConfig,
        level: Level,
        collaborators: Collaborators,
    ) -> Self {
        let dt = config.delta_time();
        let mut character =
            CharacterContext::new(Arc::new(config.character.clone()), collaborators, dt);
        character.spawn(
            level.spawn_position,
            level.spawn_angle,
            level
                .main_path
                .clone()
                .map(|curve| (curve, level.main_path_reversed)),
        );

        let mut machine = StateMachine::standard(StateId::Fall);
        machine.start(&mut character, &level);

        Self {
            frame: 0,
            config,
            level,
            character,
            machine,
        }
    }

    /// Default configuration on the built-in test course.
    pub fn test() -> Result<Self, CurveError> {
        Ok(Self::new(SimulationConfig::default(), Level::test_course()?))
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self, input: &PlayerInput) {
        let ctx = &mut self.character;
        ctx.pose.begin_tick();
        ctx.input.sample(input, ctx.dt);
        ctx.tick_timers();

        let view = ctx.view_pose();
        if ctx.lockon.update(&view, &self.level) {
            let target = ctx
                .lockon
                .current()
                .and_then(|id| self.level.target(id))
                .map(|target| target.position);
            ctx.collaborators.camera.set_lockon_target(target);
        }

        self.machine.step(&mut self.character, &self.level);

        for event in std::mem::take(&mut self.character.level_events) {
            match event {
                LevelEvent::DestroyTarget(id) => {
                    if self.level.remove_target(id) {
                        log::debug!("target {} destroyed", id);
                    }
                }
            }
        }

        let position = self.character.pose.position;
        for event in self.level.update_triggers(position) {
            self.handle_trigger(event);
        }

        self.frame += 1;
    }

    /// Turn a trigger-volume edge into character state or a queued interrupt.
    fn handle_trigger(&mut self, event: TriggerEvent) {
        let ctx = &mut self.character;
        log::trace!(
            "trigger {} {}",
            event.volume_id,
            if event.entered { "entered" } else { "exited" }
        );

        match (event.kind, event.entered) {
            (TriggerKind::Sidle, entered) => {
                ctx.in_sidle_zone = entered;
                if entered {
                    ctx.interrupts.push(Interrupt::Sidle);
                }
            }
            (TriggerKind::Lockout(lockout), true) => ctx.lockouts.add(lockout),
            (TriggerKind::Lockout(lockout), false) => {
                ctx.lockouts.remove(&lockout);
            }
            (TriggerKind::LockonTarget(id), true) => ctx.lockon.add_candidate(id),
            (TriggerKind::LockonTarget(id), false) => ctx.lockon.remove_candidate(id),
            (_, false) => {}
            (TriggerKind::Drift { window }, true) => ctx.drift_window = window,
            (TriggerKind::PathSwitch { curve, reversed }, true) => {
                let position = ctx.pose.position;
                if ctx.follower.set_active_path(curve, reversed, position) {
                    ctx.collaborators
                        .camera
                        .start_crossfade(ctx.config.camera_crossfade);
                }
            }
            (TriggerKind::Launcher(settings), true) => ctx.interrupts.push(Interrupt::Launcher {
                volume_id: event.volume_id,
                settings,
            }),
            (TriggerKind::Teleporter { destination, angle }, true) => {
                ctx.interrupts
                    .push(Interrupt::Teleporter { destination, angle })
            }
            (TriggerKind::Petrify { duration }, true) => {
                ctx.interrupts.push(Interrupt::Petrify { duration })
            }
            (TriggerKind::Automation { curve, speed }, true) => {
                ctx.interrupts.push(Interrupt::Automation { curve, speed })
            }
            (TriggerKind::Zipline { curve }, true) => {
                ctx.interrupts.push(Interrupt::Zipline { curve })
            }
            (TriggerKind::Damage, true) => {
                let source = self
                    .level
                    .triggers
                    .iter()
                    .find(|volume| volume.id == event.volume_id)
                    .map_or(ctx.pose.position, |volume| volume.center);
                ctx.interrupts.push(Interrupt::Damage { source });
            }
        }
    }

    /// Put the character back at the level start in `Fall`.
    pub fn respawn(&mut self) {
        let ctx = &mut self.character;
        ctx.lockouts.clear();
        ctx.lockon.clear();
        ctx.interrupts.clear();
        ctx.consumed_rings.clear();
        ctx.input.reset_all_buffers();
        ctx.spawn(
            self.level.spawn_position,
            self.level.spawn_angle,
            self.level
                .main_path
                .clone()
                .map(|curve| (curve, self.level.main_path_reversed)),
        );
        self.level.reset_occupancy();
        self.machine
            .change_state(StateId::Fall, &mut self.character, &self.level);
        log::debug!("respawned at {:?}", self.level.spawn_position);
    }

    /// Force a state change outside the normal transition rules.
    pub fn change_state(&mut self, next: StateId) {
        self.machine
            .change_state(next, &mut self.character, &self.level);
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.frame
    }

    pub fn state(&self) -> StateId {
        self.machine.current()
    }

    pub fn pose(&self) -> &MovementState {
        &self.character.pose
    }

    pub fn character(&self) -> &CharacterContext {
        &self.character
    }

    pub fn character_mut(&mut self) -> &mut CharacterContext {
        &mut self.character
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut StateMachine {
        &mut self.machine
    }

    /// Get the delta time for this simulation.
    pub fn delta_time(&self) -> f32 {
        self.config.delta_time()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use railrunner_physics::{ContentFlags, SurfaceFlags};

    use crate::level::TriggerVolume;

    fn flat_level() -> Level {
        let mut level = Level::new("flat", "Flat");
        level.collision.add_box(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(50.0, 0.5, 50.0),
            ContentFlags::SOLID,
            SurfaceFlags::TERRAIN,
        );
        level
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulation::test().expect("test course");
        assert_eq!(sim.frame, 0);
        assert_eq!(sim.state(), StateId::Fall);
        assert!(sim.character().follower.active_path().is_some());
    }

    #[test]
    fn test_tick_advances_frame() {
        let mut sim = Simulation::test().expect("test course");

        sim.tick(&PlayerInput::default());
        assert_eq!(sim.tick_count(), 1);

        sim.tick(&PlayerInput::default());
        assert_eq!(sim.tick_count(), 2);
    }

    #[test]
    fn test_settles_into_idle() {
        let mut sim = Simulation::new(SimulationConfig::default(), flat_level());
        sim.tick(&PlayerInput::default());
        assert_eq!(sim.state(), StateId::Idle);
        assert!(sim.pose().is_grounded());
    }

    #[test]
    fn test_movement_input() {
        let mut sim = Simulation::test().expect("test course");
        let start = sim.pose().position;

        for _ in 0..60 {
            sim.tick(&PlayerInput::forward());
        }

        let distance = (sim.pose().position - start).length();
        assert!(distance > 1.0, "character should have moved, distance={}", distance);
        assert_eq!(sim.state(), StateId::Run);
    }

    #[test]
    fn test_damage_volume_knocks_back() {
        let mut level = flat_level();
        level.triggers.push(TriggerVolume::new(
            7,
            Vec3::new(0.0, 1.0, 3.0),
            Vec3::new(5.0, 2.0, 1.0),
            TriggerKind::Damage,
        ));
        let mut sim = Simulation::new(SimulationConfig::default(), level);

        let mut knocked = false;
        for _ in 0..120 {
            sim.tick(&PlayerInput::forward());
            if sim.state() == StateId::Knockback {
                knocked = true;
                break;
            }
        }
        assert!(knocked);
        assert!(sim.character().is_invincible());
    }

    #[test]
    fn test_respawn_returns_to_start() {
        let mut sim = Simulation::new(SimulationConfig::default(), flat_level());
        for _ in 0..30 {
            sim.tick(&PlayerInput::forward());
        }
        sim.respawn();
        assert_eq!(sim.pose().position, Vec3::ZERO);
        assert_eq!(sim.pose().move_speed, 0.0);
        assert_eq!(sim.state(), StateId::Fall);
    }

    #[test]
    fn test_determinism() {
        // Run simulation twice with same inputs - should get same results
        let inputs: Vec<_> = (0..200)
            .map(|i| {
                let mut input = PlayerInput::forward();
                if i % 3 == 0 {
                    input.axis.x = 0.5;
                }
                input.actions.jump = i % 40 == 0;
                input
            })
            .collect();

        let mut sim1 = Simulation::test().expect("test course");
        let mut sim2 = Simulation::test().expect("test course");
        for input in &inputs {
            sim1.tick(input);
            sim2.tick(input);
        }

        let pos1 = sim1.pose().position;
        let pos2 = sim2.pose().position;
        assert!(
            (pos1 - pos2).length() < 0.0001,
            "Simulations should be deterministic: {:?} vs {:?}",
            pos1,
            pos2
        );
        assert_eq!(sim1.state(), sim2.state());
    }
}
