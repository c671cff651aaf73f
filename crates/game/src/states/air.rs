//! Airborne states: jumps, falling and bounces.

use railrunner_physics::{SolveOptions, SolveReport};

use super::{PlayerState, StateId};
use crate::character::CharacterContext;
use crate::grind::find_grind_rail;
use crate::level::Level;
use crate::motion::{apply_gravity, apply_movement, landing_transition, process_movement, take_off};

use super::attack::next_ring;

/// Button-driven exits available in the air.
pub(super) fn air_actions(ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
    if ctx.actions_disabled() {
        return None;
    }

    if ctx.input.is_attack_buffer_active() {
        let pose = ctx.view_pose();
        let has_target = ctx
            .lockon
            .current()
            .is_some_and(|id| ctx.lockon.is_target_valid(id, &pose, level));
        if has_target {
            ctx.input.reset_attack_buffer();
            return Some(StateId::HomingAttack);
        }
        if ctx.can_air_dash {
            ctx.input.reset_attack_buffer();
            return Some(StateId::JumpDash);
        }
    }

    if ctx.input.is_action_buffer_active() {
        ctx.input.reset_action_buffer();
        return Some(StateId::Stomp);
    }

    if ctx.input.is_light_dash_buffer_active() && next_ring(ctx, level).is_some() {
        ctx.input.reset_light_dash_buffer();
        return Some(StateId::LightSpeedDash);
    }

    None
}

/// Air steering, gravity, then the move.
pub(super) fn air_movement(
    ctx: &mut CharacterContext,
    level: &Level,
    gravity_scale: f32,
    options: SolveOptions,
) -> SolveReport {
    let setting = ctx.config.air;
    process_movement(ctx, &setting);
    apply_gravity(ctx, gravity_scale);
    apply_movement(ctx, level, options)
}

/// Rail attach first, then landing.
pub(super) fn after_air_move(
    ctx: &mut CharacterContext,
    level: &Level,
    report: &SolveReport,
) -> Option<StateId> {
    if let Some(binding) = find_grind_rail(ctx, level, false, None) {
        ctx.grind = Some(binding);
        return Some(StateId::Grind);
    }
    if report.ground.is_grounded() {
        return Some(landing_transition(ctx));
    }
    None
}

/// Plain airborne movement shared by Fall and the jump variants.
fn fall_tick(ctx: &mut CharacterContext, level: &Level, options: SolveOptions) -> Option<StateId> {
    if let Some(next) = air_actions(ctx, level) {
        return Some(next);
    }
    let report = air_movement(ctx, level, 1.0, options);
    after_air_move(ctx, level, &report)
}

/// Variable-height jump: holding the button keeps gravity low for a while.
#[derive(Debug, Default)]
pub struct Jump {
    hold_remaining: f32,
}

impl PlayerState for Jump {
    fn id(&self) -> StateId {
        StateId::Jump
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        let power = ctx.config.jump_power;
        take_off(ctx, power);
        self.hold_remaining = ctx.config.jump_hold_time;
        ctx.collaborators.animation.jump_animation();
        ctx.collaborators.effects.play_action_sfx("jump");
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        if let Some(next) = air_actions(ctx, level) {
            return Some(next);
        }

        self.hold_remaining -= ctx.dt;
        let holding = self.hold_remaining > 0.0 && ctx.input.is_jump_held();
        let scale = if holding {
            ctx.config.jump_hold_gravity_scale
        } else {
            1.0
        };

        let report = air_movement(ctx, level, scale, SolveOptions::default());
        if let Some(next) = after_air_move(ctx, level, &report) {
            return Some(next);
        }
        if ctx.pose.vertical_speed < 0.0 {
            return Some(StateId::Fall);
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct Fall;

impl PlayerState for Fall {
    fn id(&self) -> StateId {
        StateId::Fall
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        fall_tick(ctx, level, SolveOptions::default())
    }
}

/// Backwards flip out of a backstep. May slide along slanted ceilings.
#[derive(Debug, Default)]
pub struct Backflip;

impl PlayerState for Backflip {
    fn id(&self) -> StateId {
        StateId::Backflip
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        let power = ctx.config.backflip_power;
        take_off(ctx, power);
        ctx.pose.move_speed = ctx.config.backflip_back_speed;
        ctx.collaborators.animation.jump_animation();
        ctx.collaborators.effects.play_action_sfx("backflip");
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        let options = SolveOptions {
            allow_ceiling_slide: true,
            ..Default::default()
        };
        fall_tick(ctx, level, options)
    }
}

/// Jump out of a crouch or slide, keeping its ground speed.
#[derive(Debug, Default)]
pub struct SpinJump;

impl PlayerState for SpinJump {
    fn id(&self) -> StateId {
        StateId::SpinJump
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        let power = ctx.config.spin_jump_power;
        take_off(ctx, power);
        ctx.collaborators.animation.jump_animation();
        ctx.collaborators.effects.start_trail_fx();
        ctx.collaborators.effects.play_action_sfx("spin_jump");
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        fall_tick(ctx, level, SolveOptions::default())
    }
}

/// Rebound after a stomp or a homing hit. The state handing over sets the
/// vertical speed.
#[derive(Debug, Default)]
pub struct Bounce;

impl PlayerState for Bounce {
    fn id(&self) -> StateId {
        StateId::Bounce
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        let power = ctx.pose.vertical_speed.max(0.0);
        take_off(ctx, power);
        ctx.can_air_dash = true;
        ctx.collaborators.animation.jump_animation();
        ctx.collaborators.effects.play_action_sfx("bounce");
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        fall_tick(ctx, level, SolveOptions::default())
    }
}
