//! Air attacks and dashes.

use glam::Vec3;

use railrunner_physics::math::{normalize_or, project_on_plane, yaw_of};
use railrunner_physics::{MovementFlags, SolveOptions, WallContact};

use super::{PlayerState, StateId};
use crate::character::{CharacterContext, LevelEvent};
use crate::grind::find_grind_rail;
use crate::level::{Level, Ring};
use crate::motion::{apply_movement, landing_transition, movement_intent, process_turning};

/// Nearest unconsumed ring within light-dash range of the character.
pub(super) fn next_ring(ctx: &CharacterContext, level: &Level) -> Option<Ring> {
    let origin = ctx.pose.position;
    let range = ctx.config.light_dash_range;
    level
        .rings
        .iter()
        .filter(|ring| !ctx.consumed_rings.contains(&ring.id))
        .map(|ring| (ring.position.distance(origin), ring))
        .filter(|(distance, _)| *distance <= range)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, ring)| *ring)
}

/// Point the pose at `direction`: yaw from its horizontal part, the rest
/// split into move and vertical speed.
fn aim(ctx: &mut CharacterContext, direction: Vec3, speed: f32) {
    let up = ctx.pose.up_direction();
    let horizontal = project_on_plane(direction, up);
    if horizontal.length_squared() > 1.0e-8 {
        ctx.pose.set_movement_angle(yaw_of(horizontal));
    }
    ctx.pose.move_speed = horizontal.length() * speed;
    ctx.pose.vertical_speed = direction.dot(up) * speed;
    ctx.pose.strafe_speed = 0.0;
}

/// Short level burst in the air.
#[derive(Debug, Default)]
pub struct JumpDash {
    remaining: f32,
}

impl PlayerState for JumpDash {
    fn id(&self) -> StateId {
        StateId::JumpDash
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        self.remaining = ctx.config.jump_dash_time;
        ctx.can_air_dash = false;
        ctx.pose.move_speed = ctx.pose.move_speed.max(ctx.config.jump_dash_speed);
        ctx.pose.vertical_speed = 0.0;
        ctx.collaborators.effects.start_trail_fx();
        ctx.collaborators.effects.play_action_sfx("jump_dash");
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        if !ctx.actions_disabled() && ctx.input.is_attack_buffer_active() {
            let pose = ctx.view_pose();
            if let Some(id) = ctx.lockon.current() {
                if ctx.lockon.is_target_valid(id, &pose, level) {
                    ctx.input.reset_attack_buffer();
                    return Some(StateId::HomingAttack);
                }
            }
        }

        let setting = ctx.config.air;
        if let Some(angle) = movement_intent(ctx).angle {
            process_turning(ctx, angle, &setting);
        }
        ctx.pose.vertical_speed = 0.0;
        let report = apply_movement(ctx, level, SolveOptions::default());

        if let Some(binding) = find_grind_rail(ctx, level, false, None) {
            ctx.grind = Some(binding);
            return Some(StateId::Grind);
        }
        if report.ground.is_grounded() {
            return Some(landing_transition(ctx));
        }
        if matches!(report.wall, WallContact::Blocked { .. }) {
            return Some(StateId::Fall);
        }

        self.remaining -= ctx.dt;
        if self.remaining <= 0.0 {
            return Some(StateId::Fall);
        }
        None
    }
}

/// Fly at the current lockon target.
#[derive(Debug, Default)]
pub struct HomingAttack {
    target: Option<u32>,
    elapsed: f32,
}

impl PlayerState for HomingAttack {
    fn id(&self) -> StateId {
        StateId::HomingAttack
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        self.target = ctx.lockon.current();
        self.elapsed = 0.0;
        ctx.can_air_dash = false;
        ctx.pose.take_off();
        ctx.collaborators.effects.start_trail_fx();
        ctx.collaborators.effects.play_action_sfx("homing_attack");
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        // Target destroyed or never there
        let Some(target) = self.target.and_then(|id| level.target(id)).copied() else {
            return Some(StateId::Fall);
        };

        let to_target = target.position - ctx.pose.position;
        if to_target.length() <= ctx.config.homing_hit_distance {
            ctx.level_events.push(LevelEvent::DestroyTarget(target.id));
            ctx.lockon.remove_candidate(target.id);
            ctx.pose.move_speed = 0.0;
            ctx.pose.vertical_speed = ctx.config.homing_rebound;
            return Some(StateId::Bounce);
        }

        self.elapsed += ctx.dt;
        if self.elapsed >= ctx.config.homing_max_time {
            return Some(StateId::Fall);
        }

        let direction = normalize_or(to_target, ctx.pose.forward_direction());
        let speed = ctx.config.homing_speed;
        aim(ctx, direction, speed);

        let report = apply_movement(ctx, level, SolveOptions::default());
        if report.ground.is_grounded() {
            return Some(landing_transition(ctx));
        }
        None
    }
}

/// Straight-down slam. Landing with the button held bounces.
#[derive(Debug, Default)]
pub struct Stomp;

impl PlayerState for Stomp {
    fn id(&self) -> StateId {
        StateId::Stomp
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.pose.take_off();
        ctx.pose.vertical_speed = -ctx.config.stomp_speed;
        ctx.pose.strafe_speed = 0.0;
        ctx.collaborators.effects.play_action_sfx("stomp");
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        let setting = ctx.config.air;
        ctx.pose.move_speed = setting.update_interpolate(ctx.pose.move_speed, 0.0, ctx.dt);
        ctx.pose.vertical_speed = -ctx.config.stomp_speed;

        let report = apply_movement(ctx, level, SolveOptions::default());
        if report.ground.is_grounded() {
            if ctx.input.is_action_held() {
                ctx.pose.vertical_speed = ctx.config.bounce_power;
                return Some(StateId::Bounce);
            }
            return Some(landing_transition(ctx));
        }
        None
    }
}

/// Ride a chain of rings, each within range of the previous one.
#[derive(Debug, Default)]
pub struct LightSpeedDash {
    target: Option<Ring>,
}

impl PlayerState for LightSpeedDash {
    fn id(&self) -> StateId {
        StateId::LightSpeedDash
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, level: &Level) {
        self.target = next_ring(ctx, level);
        ctx.pose.take_off();
        ctx.pose.flags.set(MovementFlags::EXTERNAL_CONTROL, true);
        ctx.collaborators.effects.start_trail_fx();
        ctx.collaborators.effects.play_action_sfx("light_speed_dash");
    }

    fn exit_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        self.target = None;
        ctx.pose.flags.set(MovementFlags::EXTERNAL_CONTROL, false);
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        let Some(ring) = self.target else {
            return Some(StateId::Fall);
        };

        let speed = ctx.config.light_dash_speed;
        let to_ring = ring.position - ctx.pose.position;
        let step = speed * ctx.dt;
        let direction = normalize_or(to_ring, ctx.pose.forward_direction());
        aim(ctx, direction, speed);

        if to_ring.length() <= step {
            ctx.warp_to(ring.position);
            ctx.consumed_rings.insert(ring.id);
            self.target = next_ring(ctx, level);
        } else {
            let position = ctx.pose.position + direction * step;
            ctx.warp_to(position);
        }
        // Leave with level momentum
        ctx.pose.vertical_speed = 0.0;
        None
    }
}
