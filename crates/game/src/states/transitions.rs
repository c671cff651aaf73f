//! Allowed state edges and interrupt routing.
//!
//! States still pick their own successor by returning it; the table only
//! declares which `(from, to)` pairs are legal and which state an interrupt
//! lands in, guarded per trigger.

use std::collections::HashSet;

use super::StateId;
use crate::character::{CharacterContext, Interrupt};

/// External reasons to leave the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Damage,
    Crush,
    Launcher,
    Teleporter,
    Petrify,
    Automation,
    Zipline,
    Sidle,
}

/// Guard deciding whether an interrupt may fire from `current`.
pub type Guard = fn(current: StateId, ctx: &CharacterContext, interrupt: &Interrupt) -> bool;

#[derive(Clone, Copy)]
pub struct TriggerRule {
    pub trigger: Trigger,
    pub target: StateId,
    pub guard: Guard,
}

impl std::fmt::Debug for TriggerRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerRule")
            .field("trigger", &self.trigger)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// States a landing can go to.
const LANDING: [StateId; 4] = [StateId::Idle, StateId::Run, StateId::Backstep, StateId::Jump];

/// Moves available from any airborne jump-like state.
const AIRBORNE: [StateId; 6] = [
    StateId::Fall,
    StateId::JumpDash,
    StateId::HomingAttack,
    StateId::Stomp,
    StateId::LightSpeedDash,
    StateId::Grind,
];

#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    edges: HashSet<(StateId, StateId)>,
    rules: Vec<TriggerRule>,
}

impl TransitionTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shipped state graph.
    pub fn standard() -> Self {
        use StateId::*;

        let mut table = Self::empty();
        table
            .allow(
                Idle,
                &[Run, Backstep, Jump, Fall, Crouch, Slide, Drift, QuickStep, LightSpeedDash],
            )
            .allow(
                Run,
                &[Idle, Jump, Fall, Crouch, Slide, Drift, QuickStep, LightSpeedDash],
            )
            .allow(Backstep, &[Idle, Run, Backflip, Fall, Crouch])
            .allow(Crouch, &[Idle, Run, SpinJump, Fall, Slide])
            .allow(Slide, &[Crouch, Idle, Run, SpinJump, Fall])
            .allow(Drift, &[Run, Idle, Jump, Fall])
            .allow(QuickStep, &[Run, Idle, Fall, Jump])
            .allow(Sidle, &[Idle, Run, Fall]);

        for from in [Jump, Fall, Backflip, SpinJump, Bounce] {
            table.allow(from, &LANDING).allow(from, &AIRBORNE);
        }

        table
            .allow(Stomp, &LANDING)
            .allow(Stomp, &[Bounce])
            .allow(JumpDash, &LANDING)
            .allow(JumpDash, &[Fall, Grind, HomingAttack])
            .allow(HomingAttack, &LANDING)
            .allow(HomingAttack, &[Bounce, Fall])
            .allow(LightSpeedDash, &[Fall, Run])
            .allow(Grind, &[Fall, Jump, GrindStep])
            .allow(GrindStep, &LANDING)
            .allow(GrindStep, &[Grind, Fall])
            .allow(Launch, &LANDING)
            .allow(Launch, &[Fall])
            .allow(Zipline, &[Fall, Jump])
            .allow(Automation, &[Run, Fall])
            .allow(Knockback, &LANDING)
            .allow(Knockback, &[Fall])
            .allow(Teleport, &[Idle, Fall])
            .allow(Petrify, &[Idle, Fall]);

        table
            .rule(Trigger::Damage, Knockback, |current, ctx, _| {
                !ctx.is_invincible() && !matches!(current, Knockback | Teleport)
            })
            .rule(Trigger::Crush, Knockback, |current, _, _| current != Knockback)
            .rule(Trigger::Launcher, Launch, |current, ctx, interrupt| {
                // The launcher already flying the character can't restart itself
                match interrupt {
                    Interrupt::Launcher { volume_id, .. } => {
                        !(current == Launch && ctx.active_launcher == Some(*volume_id))
                    }
                    _ => false,
                }
            })
            .rule(Trigger::Teleporter, Teleport, |current, _, _| current != Teleport)
            .rule(Trigger::Petrify, Petrify, |current, _, _| {
                !matches!(current, Petrify | Knockback | Teleport)
            })
            .rule(Trigger::Automation, Automation, |current, _, _| {
                current != Automation
            })
            .rule(Trigger::Zipline, Zipline, |current, _, _| {
                !matches!(current, Zipline | Launch | Automation)
            })
            .rule(Trigger::Sidle, Sidle, |current, _, _| {
                matches!(current, Idle | Run | Backstep)
            });

        table
    }

    /// Declare `from -> to` legal for each `to`.
    pub fn allow(&mut self, from: StateId, to: &[StateId]) -> &mut Self {
        for &target in to {
            self.edges.insert((from, target));
        }
        self
    }

    pub fn rule(&mut self, trigger: Trigger, target: StateId, guard: Guard) -> &mut Self {
        self.rules.push(TriggerRule {
            trigger,
            target,
            guard,
        });
        self
    }

    /// Whether a state may return `to` from `from`.
    pub fn allows(&self, from: StateId, to: StateId) -> bool {
        from == to || self.edges.contains(&(from, to))
    }

    /// Target state for an interrupt, or `None` when no guard passes.
    pub fn resolve(
        &self,
        current: StateId,
        interrupt: &Interrupt,
        ctx: &CharacterContext,
    ) -> Option<StateId> {
        let trigger = interrupt.trigger();
        self.rules
            .iter()
            .filter(|rule| rule.trigger == trigger)
            .find(|rule| (rule.guard)(current, ctx, interrupt))
            .map(|rule| rule.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use glam::Vec3;

    use crate::collaborators::Collaborators;
    use crate::config::CharacterConfig;
    use crate::launcher::LaunchSettings;

    fn context() -> CharacterContext {
        CharacterContext::new(
            Arc::new(CharacterConfig::default()),
            Collaborators::null(),
            1.0 / 60.0,
        )
    }

    fn launcher(volume_id: u32) -> Interrupt {
        Interrupt::Launcher {
            volume_id,
            settings: LaunchSettings::new(Vec3::ZERO, Vec3::Z * 10.0, 2.0, 1.0),
        }
    }

    #[test]
    fn test_declared_edges() {
        let table = TransitionTable::standard();
        assert!(table.allows(StateId::Run, StateId::Jump));
        assert!(table.allows(StateId::Fall, StateId::Backstep));
        assert!(table.allows(StateId::Grind, StateId::GrindStep));
        assert!(!table.allows(StateId::Idle, StateId::Grind));
        assert!(!table.allows(StateId::Teleport, StateId::Run));
        // Staying put is always allowed
        assert!(table.allows(StateId::Petrify, StateId::Petrify));
    }

    #[test]
    fn test_damage_respects_invincibility() {
        let table = TransitionTable::standard();
        let mut ctx = context();
        let damage = Interrupt::Damage { source: Vec3::ZERO };

        assert_eq!(table.resolve(StateId::Run, &damage, &ctx), Some(StateId::Knockback));
        assert_eq!(table.resolve(StateId::Knockback, &damage, &ctx), None);

        ctx.invincibility = 1.0;
        assert_eq!(table.resolve(StateId::Run, &damage, &ctx), None);
    }

    #[test]
    fn test_same_launcher_is_rejected() {
        let table = TransitionTable::standard();
        let mut ctx = context();
        ctx.active_launcher = Some(20);

        assert_eq!(table.resolve(StateId::Launch, &launcher(20), &ctx), None);
        assert_eq!(
            table.resolve(StateId::Launch, &launcher(21), &ctx),
            Some(StateId::Launch)
        );
        assert_eq!(
            table.resolve(StateId::Fall, &launcher(20), &ctx),
            Some(StateId::Launch)
        );
    }

    #[test]
    fn test_sidle_only_from_ground_movement() {
        let table = TransitionTable::standard();
        let ctx = context();
        assert_eq!(
            table.resolve(StateId::Run, &Interrupt::Sidle, &ctx),
            Some(StateId::Sidle)
        );
        assert_eq!(table.resolve(StateId::Jump, &Interrupt::Sidle, &ctx), None);
    }
}
