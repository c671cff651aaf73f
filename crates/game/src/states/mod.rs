//! Movement states.
//!
//! Each state is a small struct implementing [`PlayerState`]. States hold
//! only their own per-entry timers; everything shared lives on the
//! [`CharacterContext`]. `process_physics` returns the next state, or `None`
//! to stay.

mod air;
mod attack;
mod ground;
mod rail;
mod special;
mod transitions;

pub use transitions::{TransitionTable, Trigger, TriggerRule};

use crate::character::CharacterContext;
use crate::level::Level;

/// Identifier for every movement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    Idle,
    Run,
    Backstep,
    Crouch,
    Slide,
    Drift,
    QuickStep,
    Sidle,
    Jump,
    Fall,
    Backflip,
    SpinJump,
    JumpDash,
    HomingAttack,
    Bounce,
    Stomp,
    LightSpeedDash,
    Grind,
    GrindStep,
    Launch,
    Zipline,
    Automation,
    Knockback,
    Teleport,
    Petrify,
}

impl StateId {
    /// Every state, in declaration order.
    pub const ALL: [StateId; 25] = [
        StateId::Idle,
        StateId::Run,
        StateId::Backstep,
        StateId::Crouch,
        StateId::Slide,
        StateId::Drift,
        StateId::QuickStep,
        StateId::Sidle,
        StateId::Jump,
        StateId::Fall,
        StateId::Backflip,
        StateId::SpinJump,
        StateId::JumpDash,
        StateId::HomingAttack,
        StateId::Bounce,
        StateId::Stomp,
        StateId::LightSpeedDash,
        StateId::Grind,
        StateId::GrindStep,
        StateId::Launch,
        StateId::Zipline,
        StateId::Automation,
        StateId::Knockback,
        StateId::Teleport,
        StateId::Petrify,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StateId::Idle => "idle",
            StateId::Run => "run",
            StateId::Backstep => "backstep",
            StateId::Crouch => "crouch",
            StateId::Slide => "slide",
            StateId::Drift => "drift",
            StateId::QuickStep => "quick_step",
            StateId::Sidle => "sidle",
            StateId::Jump => "jump",
            StateId::Fall => "fall",
            StateId::Backflip => "backflip",
            StateId::SpinJump => "spin_jump",
            StateId::JumpDash => "jump_dash",
            StateId::HomingAttack => "homing_attack",
            StateId::Bounce => "bounce",
            StateId::Stomp => "stomp",
            StateId::LightSpeedDash => "light_speed_dash",
            StateId::Grind => "grind",
            StateId::GrindStep => "grind_step",
            StateId::Launch => "launch",
            StateId::Zipline => "zipline",
            StateId::Automation => "automation",
            StateId::Knockback => "knockback",
            StateId::Teleport => "teleport",
            StateId::Petrify => "petrify",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A movement state.
pub trait PlayerState: Send {
    fn id(&self) -> StateId;

    /// Called once when the machine switches into this state.
    fn enter_state(&mut self, _ctx: &mut CharacterContext, _level: &Level) {}

    /// Called once when the machine switches away.
    fn exit_state(&mut self, _ctx: &mut CharacterContext, _level: &Level) {}

    /// Per-tick update. Returns the state to switch to, if any.
    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId>;
}

/// One instance of every state, indexed by [`StateId`].
pub struct StateSet {
    states: Vec<Box<dyn PlayerState>>,
}

impl StateSet {
    /// The shipped implementation of every state.
    pub fn standard() -> Self {
        let states: Vec<Box<dyn PlayerState>> = vec![
            Box::new(ground::Idle),
            Box::new(ground::Run),
            Box::new(ground::Backstep),
            Box::new(ground::Crouch),
            Box::new(ground::Slide),
            Box::new(ground::Drift),
            Box::new(ground::QuickStep::default()),
            Box::new(ground::Sidle),
            Box::new(air::Jump::default()),
            Box::new(air::Fall),
            Box::new(air::Backflip),
            Box::new(air::SpinJump),
            Box::new(attack::JumpDash::default()),
            Box::new(attack::HomingAttack::default()),
            Box::new(air::Bounce),
            Box::new(attack::Stomp),
            Box::new(attack::LightSpeedDash::default()),
            Box::new(rail::Grind),
            Box::new(rail::GrindStep),
            Box::new(special::Launch::default()),
            Box::new(rail::Zipline::default()),
            Box::new(special::Automation::default()),
            Box::new(special::Knockback::default()),
            Box::new(special::Teleport::default()),
            Box::new(special::Petrify::default()),
        ];
        debug_assert!(states
            .iter()
            .zip(StateId::ALL)
            .all(|(state, id)| state.id() == id));
        Self { states }
    }

    pub fn get_mut(&mut self, id: StateId) -> &mut dyn PlayerState {
        self.states[id.index()].as_mut()
    }

    /// Swap in a different implementation for `state.id()`.
    pub fn replace(&mut self, state: Box<dyn PlayerState>) -> Box<dyn PlayerState> {
        let index = state.id().index();
        std::mem::replace(&mut self.states[index], state)
    }
}

impl std::fmt::Debug for StateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.states.iter().map(|state| state.id()))
            .finish()
    }
}
