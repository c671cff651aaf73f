//! Grounded states.

use railrunner_physics::math::delta_angle;
use railrunner_physics::SolveOptions;

use super::attack::next_ring;
use super::{PlayerState, StateId};
use crate::character::CharacterContext;
use crate::level::Level;
use crate::motion::{
    apply_movement, movement_intent, path_forward_angle, process_movement, process_turning,
    turn_instantly, wants_backstep, SPEED_EPSILON,
};

/// Button-driven exits shared by Idle and Run.
fn ground_actions(ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
    if ctx.actions_disabled() {
        return None;
    }

    if ctx.input.is_jump_buffer_active() {
        return Some(StateId::Jump);
    }

    if ctx.input.is_light_dash_buffer_active() && next_ring(ctx, level).is_some() {
        ctx.input.reset_light_dash_buffer();
        return Some(StateId::LightSpeedDash);
    }

    if ctx.input.quick_step_left_pressed() || ctx.input.quick_step_right_pressed() {
        return Some(StateId::QuickStep);
    }

    if ctx.input.is_action_buffer_active() {
        ctx.input.reset_action_buffer();
        let speed = ctx.pose.move_speed;
        let config = &ctx.config;
        return Some(if ctx.drift_window > 0.0 && speed >= config.drift_min_speed {
            StateId::Drift
        } else if speed >= config.slide_min_speed {
            StateId::Slide
        } else {
            StateId::Crouch
        });
    }

    None
}

/// Signed stick push along the path forward, `+` = forward.
fn path_push(ctx: &CharacterContext) -> f32 {
    let intent = movement_intent(ctx);
    intent.angle.map_or(0.0, |angle| {
        intent.strength * delta_angle(path_forward_angle(ctx), angle).cos()
    })
}

/// Standing still.
#[derive(Debug, Default)]
pub struct Idle;

impl PlayerState for Idle {
    fn id(&self) -> StateId {
        StateId::Idle
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.pose.strafe_speed = 0.0;
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        let intent = movement_intent(ctx);
        if wants_backstep(ctx, &intent) {
            return Some(StateId::Backstep);
        }
        if let Some(next) = ground_actions(ctx, level) {
            return Some(next);
        }

        let setting = ctx.config.run;
        process_movement(ctx, &setting);
        let report = apply_movement(ctx, level, SolveOptions::default());

        if !report.ground.is_grounded() {
            return Some(StateId::Fall);
        }
        if ctx.pose.move_speed > SPEED_EPSILON {
            return Some(StateId::Run);
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct Run;

impl PlayerState for Run {
    fn id(&self) -> StateId {
        StateId::Run
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        if let Some(next) = ground_actions(ctx, level) {
            return Some(next);
        }

        let setting = ctx.config.run;
        let intent = process_movement(ctx, &setting);
        let report = apply_movement(ctx, level, SolveOptions::default());

        if !report.ground.is_grounded() {
            return Some(StateId::Fall);
        }
        if ctx.pose.move_speed.abs() <= SPEED_EPSILON && intent.angle.is_none() {
            ctx.pose.move_speed = 0.0;
            return Some(StateId::Idle);
        }
        None
    }
}

/// Walking backwards while facing the path forward. Speed is negative.
#[derive(Debug, Default)]
pub struct Backstep;

impl PlayerState for Backstep {
    fn id(&self) -> StateId {
        StateId::Backstep
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        let forward = path_forward_angle(ctx);
        turn_instantly(ctx, forward);
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        if !ctx.actions_disabled() {
            if ctx.input.is_jump_buffer_active() {
                return Some(StateId::Backflip);
            }
            if ctx.input.is_action_buffer_active() {
                ctx.input.reset_action_buffer();
                return Some(StateId::Crouch);
            }
        }

        let push = path_push(ctx);
        let threshold = ctx.config.backstep_push_threshold;
        if push > threshold {
            return Some(StateId::Run);
        }

        let forward = path_forward_angle(ctx);
        ctx.pose.set_movement_angle(forward);
        let setting = ctx.config.backstep;
        let input = push.min(0.0);
        ctx.pose.move_speed = setting.update_interpolate(ctx.pose.move_speed, input, ctx.dt);

        let report = apply_movement(ctx, level, SolveOptions::default());
        if !report.ground.is_grounded() {
            return Some(StateId::Fall);
        }
        if ctx.pose.move_speed.abs() <= SPEED_EPSILON && input > -threshold {
            ctx.pose.move_speed = 0.0;
            return Some(StateId::Idle);
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct Crouch;

impl PlayerState for Crouch {
    fn id(&self) -> StateId {
        StateId::Crouch
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.collaborators.effects.play_action_sfx("crouch");
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        if !ctx.actions_disabled() && ctx.input.is_jump_buffer_active() {
            return Some(StateId::SpinJump);
        }
        if !ctx.input.is_action_held() {
            return Some(if ctx.pose.move_speed > SPEED_EPSILON {
                StateId::Run
            } else {
                StateId::Idle
            });
        }

        let setting = ctx.config.crouch;
        process_movement(ctx, &setting);
        let report = apply_movement(ctx, level, SolveOptions::default());
        if !report.ground.is_grounded() {
            return Some(StateId::Fall);
        }
        None
    }
}

/// Momentum slide: gains speed downhill, bleeds it on flat ground.
#[derive(Debug, Default)]
pub struct Slide;

impl PlayerState for Slide {
    fn id(&self) -> StateId {
        StateId::Slide
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.collaborators.effects.play_action_sfx("slide");
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        if !ctx.actions_disabled() && ctx.input.is_jump_buffer_active() {
            return Some(StateId::SpinJump);
        }
        if !ctx.input.is_action_held() {
            return Some(if ctx.pose.move_speed > SPEED_EPSILON {
                StateId::Run
            } else {
                StateId::Idle
            });
        }

        let setting = ctx.config.slide;
        if let Some(angle) = movement_intent(ctx).angle {
            process_turning(ctx, angle, &setting);
        }
        let slope_ratio = -ctx.pose.forward_direction().y;
        ctx.pose.move_speed = setting.update_slide(ctx.pose.move_speed, slope_ratio, ctx.dt);

        let report = apply_movement(ctx, level, SolveOptions::default());
        if !report.ground.is_grounded() {
            return Some(StateId::Fall);
        }
        if ctx.pose.move_speed < ctx.config.slide_min_speed {
            return Some(StateId::Crouch);
        }
        None
    }
}

/// Power-slide turn, available inside a drift zone.
#[derive(Debug, Default)]
pub struct Drift;

impl PlayerState for Drift {
    fn id(&self) -> StateId {
        StateId::Drift
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.collaborators.effects.play_action_sfx("drift");
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        if !ctx.actions_disabled() && ctx.input.is_jump_buffer_active() {
            return Some(StateId::Jump);
        }
        if !ctx.input.is_action_held()
            || ctx.drift_window <= 0.0
            || ctx.pose.move_speed < ctx.config.drift_min_speed
        {
            return Some(StateId::Run);
        }

        // Stick left turns toward higher yaw
        let turn = -ctx.input.axis().x * ctx.config.drift_turn_rate * ctx.dt;
        let angle = ctx.pose.movement_angle() + turn;
        ctx.pose.set_movement_angle(angle);

        let setting = ctx.config.drift;
        ctx.pose.move_speed = setting.update_interpolate(ctx.pose.move_speed, 1.0, ctx.dt);

        let report = apply_movement(ctx, level, SolveOptions::default());
        if !report.ground.is_grounded() {
            return Some(StateId::Fall);
        }
        None
    }
}

/// Short timed sidestep.
#[derive(Debug, Default)]
pub struct QuickStep {
    remaining: f32,
}

impl PlayerState for QuickStep {
    fn id(&self) -> StateId {
        StateId::QuickStep
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        let config = &ctx.config;
        let direction = if ctx.input.quick_step_left_pressed() {
            -1.0
        } else {
            1.0
        };
        self.remaining = config.quick_step_time;
        ctx.pose.strafe_speed =
            direction * config.quick_step_distance / config.quick_step_time.max(ctx.dt);
        ctx.collaborators.effects.play_action_sfx("quick_step");
    }

    fn exit_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.pose.strafe_speed = 0.0;
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        if !ctx.actions_disabled() && ctx.input.is_jump_buffer_active() {
            return Some(StateId::Jump);
        }

        let strafe = ctx.pose.strafe_speed;
        let setting = ctx.config.run;
        process_movement(ctx, &setting);
        ctx.pose.strafe_speed = strafe;

        let report = apply_movement(ctx, level, SolveOptions::default());
        if !report.ground.is_grounded() {
            return Some(StateId::Fall);
        }

        self.remaining -= ctx.dt;
        if self.remaining <= 0.0 {
            return Some(if ctx.pose.move_speed > SPEED_EPSILON {
                StateId::Run
            } else {
                StateId::Idle
            });
        }
        None
    }
}

/// Shuffling sideways along a narrow ledge.
#[derive(Debug, Default)]
pub struct Sidle;

impl PlayerState for Sidle {
    fn id(&self) -> StateId {
        StateId::Sidle
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.pose.move_speed = 0.0;
        let forward = path_forward_angle(ctx);
        turn_instantly(ctx, forward);
    }

    fn exit_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.pose.strafe_speed = 0.0;
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        if !ctx.in_sidle_zone {
            return Some(StateId::Idle);
        }

        let forward = path_forward_angle(ctx);
        ctx.pose.set_movement_angle(forward);
        let setting = ctx.config.sidle;
        let input = ctx.input.axis().x;
        ctx.pose.strafe_speed = setting.update_interpolate(ctx.pose.strafe_speed, input, ctx.dt);

        let report = apply_movement(ctx, level, SolveOptions::default());
        if !report.ground.is_grounded() {
            return Some(StateId::Fall);
        }
        None
    }
}
