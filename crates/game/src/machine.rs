//! Current-plus-pending state machine.
//!
//! One tick: drain interrupts through the transition table, apply a queued
//! state, then run the current state's physics and take the state it returns.

use crate::character::CharacterContext;
use crate::level::Level;
use crate::states::{PlayerState, StateId, StateSet, TransitionTable};

#[derive(Debug)]
pub struct StateMachine {
    states: StateSet,
    table: TransitionTable,
    current: StateId,
    pending: Option<StateId>,
    transitions: u64,
}

impl StateMachine {
    pub fn new(states: StateSet, table: TransitionTable, initial: StateId) -> Self {
        Self {
            states,
            table,
            current: initial,
            pending: None,
            transitions: 0,
        }
    }

    /// The shipped states and graph, starting in `initial`.
    pub fn standard(initial: StateId) -> Self {
        Self::new(StateSet::standard(), TransitionTable::standard(), initial)
    }

    /// Run the initial state's entry.
    pub fn start(&mut self, ctx: &mut CharacterContext, level: &Level) {
        ctx.state_ticks = 0;
        self.states.get_mut(self.current).enter_state(ctx, level);
        ctx.collaborators.animation.play_state(self.current);
    }

    pub fn current(&self) -> StateId {
        self.current
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Number of state changes so far.
    pub fn transition_count(&self) -> u64 {
        self.transitions
    }

    /// Switch to `next`. Switching to the current state does nothing.
    pub fn change_state(&mut self, next: StateId, ctx: &mut CharacterContext, level: &Level) {
        if next == self.current {
            return;
        }
        self.switch(next, ctx, level);
    }

    /// Apply `next` at the start of the next step.
    pub fn queue(&mut self, next: StateId) {
        self.pending = Some(next);
    }

    /// Swap in a different implementation for one state.
    pub fn replace_state(&mut self, state: Box<dyn PlayerState>) -> Box<dyn PlayerState> {
        self.states.replace(state)
    }

    /// Advance one tick.
    pub fn step(&mut self, ctx: &mut CharacterContext, level: &Level) {
        self.handle_interrupts(ctx, level);

        if let Some(next) = self.pending.take() {
            self.change_state(next, ctx, level);
        }

        ctx.state_ticks += 1;
        let current = self.current;
        let Some(next) = self.states.get_mut(current).process_physics(ctx, level) else {
            return;
        };

        if !self.table.allows(current, next) {
            log::warn!("rejected transition {} -> {}", current, next);
            return;
        }
        self.change_state(next, ctx, level);
    }

    fn handle_interrupts(&mut self, ctx: &mut CharacterContext, level: &Level) {
        let interrupts = std::mem::take(&mut ctx.interrupts);
        for interrupt in interrupts {
            let Some(target) = self.table.resolve(self.current, &interrupt, ctx) else {
                log::debug!("{:?} ignored in {}", interrupt.trigger(), self.current);
                continue;
            };
            ctx.payload = Some(interrupt);
            // Interrupts re-enter their state so the new payload takes effect
            self.switch(target, ctx, level);
            ctx.payload = None;
        }
    }

    fn switch(&mut self, next: StateId, ctx: &mut CharacterContext, level: &Level) {
        let previous = self.current;
        self.states.get_mut(previous).exit_state(ctx, level);
        self.current = next;
        self.transitions += 1;
        ctx.state_ticks = 0;
        self.states.get_mut(next).enter_state(ctx, level);
        ctx.collaborators.animation.play_state(next);
        log::debug!("state {} -> {}", previous, next);
    }
}
