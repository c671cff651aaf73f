//! Rail riding: grinding, hopping between rails and ziplines.

use railrunner_physics::math::delta_angle;
use railrunner_physics::{MovementFlags, PathFollower, SolveOptions};

use super::{PlayerState, StateId};
use crate::character::{CharacterContext, Interrupt};
use crate::grind::find_grind_rail;
use crate::level::Level;
use crate::motion::{
    apply_gravity, apply_movement, landing_transition, movement_intent, take_off, SPEED_EPSILON,
};

/// Grind-step needs the stick this far to one side.
const STEP_INPUT: f32 = 0.5;

/// Feet hang this far below a zipline.
const HANG_DEPTH: f32 = 1.8;

/// Riding a rail. Position comes from the rail, not from the solver.
#[derive(Debug, Default)]
pub struct Grind;

impl PlayerState for Grind {
    fn id(&self) -> StateId {
        StateId::Grind
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        let Some(binding) = ctx.grind.as_ref() else {
            return;
        };
        let position = binding.follower.local_to_world(0.0, 0.0, binding.progress);
        let angle = binding.follower.forward_angle();
        log::debug!("grinding rail {} from {:.2}", binding.rail_id, binding.progress);

        ctx.warp_to(position);
        ctx.pose.take_off();
        ctx.pose.set_movement_angle(angle);
        ctx.pose.move_speed = ctx.pose.move_speed.abs().max(ctx.config.rail.min_entry_speed);
        ctx.pose.vertical_speed = 0.0;
        ctx.pose.strafe_speed = 0.0;
        ctx.can_air_dash = true;
        ctx.collaborators.animation.start_balancing();
        ctx.collaborators.effects.play_action_sfx("grind");
    }

    fn exit_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.last_rail = ctx.grind.take().map(|binding| binding.rail_id);
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        let Some(binding) = ctx.grind.as_ref() else {
            return Some(StateId::Fall);
        };
        if level.rail(binding.rail_id).is_none() {
            log::debug!("rail {} removed mid-grind", binding.rail_id);
            return Some(StateId::Fall);
        }
        if binding.at_end() {
            return Some(StateId::Fall);
        }

        if !ctx.actions_disabled() && ctx.input.is_jump_buffer_active() {
            if ctx.input.axis().x.abs() > STEP_INPUT {
                return Some(StateId::GrindStep);
            }
            return Some(StateId::Jump);
        }

        let dt = ctx.dt;
        let setting = ctx.config.grind;
        let push = rail_push(ctx, binding.follower.forward_angle());
        let slope_ratio = -binding.follower.forward_axis().y;
        let slid = setting.update_slide(ctx.pose.move_speed, slope_ratio, dt);
        let speed = if push > 0.0 {
            slid.max(setting.update_interpolate(ctx.pose.move_speed, push, dt))
        } else {
            slid
        };
        if speed <= SPEED_EPSILON {
            log::debug!("stalled on rail {}", binding.rail_id);
            ctx.pose.move_speed = 0.0;
            return Some(StateId::Fall);
        }

        let Some(binding) = ctx.grind.as_mut() else {
            return Some(StateId::Fall);
        };
        binding.progress += speed * dt;
        if !binding.is_looping() {
            binding.progress = binding.progress.min(binding.length());
        }
        let position = binding.follower.local_to_world(0.0, 0.0, binding.progress);
        binding.follower.update(position);
        let angle = binding.follower.forward_angle();
        let up = binding.follower.up_axis();

        ctx.pose.move_speed = speed;
        ctx.warp_to(position);
        ctx.pose.set_movement_angle(angle);
        ctx.pose.set_up_direction(up);
        None
    }
}

/// How hard the stick pushes along the rail's travel direction, in `[0, 1]`.
fn rail_push(ctx: &CharacterContext, rail_angle: f32) -> f32 {
    let intent = movement_intent(ctx);
    intent.angle.map_or(0.0, |angle| {
        (intent.strength * delta_angle(rail_angle, angle).cos()).max(0.0)
    })
}

/// Sideways hop from one rail toward another.
#[derive(Debug, Default)]
pub struct GrindStep;

impl PlayerState for GrindStep {
    fn id(&self) -> StateId {
        StateId::GrindStep
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        let direction = ctx.input.axis().x.signum();
        let power = ctx.config.rail.step_power;
        take_off(ctx, power);
        ctx.pose.strafe_speed = direction * ctx.config.rail.step_side_speed;
        ctx.collaborators.animation.jump_animation();
        ctx.collaborators.effects.play_action_sfx("grind_step");
    }

    fn exit_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.pose.strafe_speed = 0.0;
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        apply_gravity(ctx, 1.0);
        let report = apply_movement(ctx, level, SolveOptions::default());

        if ctx.pose.vertical_speed < 0.0 {
            if let Some(binding) = find_grind_rail(ctx, level, true, ctx.last_rail) {
                ctx.grind = Some(binding);
                return Some(StateId::Grind);
            }
        }
        if report.ground.is_grounded() {
            return Some(landing_transition(ctx));
        }
        if ctx.pose.vertical_speed < -ctx.config.rail.step_power {
            return Some(StateId::Fall);
        }
        None
    }
}

/// Hanging from a zipline and sliding down it.
#[derive(Debug, Default)]
pub struct Zipline {
    follower: PathFollower,
    progress: f32,
}

impl PlayerState for Zipline {
    fn id(&self) -> StateId {
        StateId::Zipline
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        self.follower = PathFollower::new();
        if let Some(Interrupt::Zipline { curve }) = ctx.payload.clone() {
            let offset = curve.closest_offset(ctx.pose.position);
            let reversed = curve.sample_tangent(offset).dot(ctx.pose.velocity()) < 0.0;
            self.follower.set_active_path(curve, reversed, ctx.pose.position);
            self.progress = self.follower.progress();
        }
        ctx.pose.take_off();
        ctx.pose.flags.set(MovementFlags::EXTERNAL_CONTROL, true);
        ctx.pose.move_speed = ctx.pose.move_speed.abs();
        ctx.pose.vertical_speed = 0.0;
        ctx.pose.strafe_speed = 0.0;
        ctx.collaborators.effects.play_action_sfx("zipline");
    }

    fn exit_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        self.follower.clear_path();
        ctx.pose.flags.set(MovementFlags::EXTERNAL_CONTROL, false);
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, _level: &Level) -> Option<StateId> {
        let Some(length) = self.follower.active_path().map(|curve| curve.length()) else {
            return Some(StateId::Fall);
        };
        if !ctx.actions_disabled() && ctx.input.is_jump_buffer_active() {
            return Some(StateId::Jump);
        }

        let setting = ctx.config.zipline;
        let slope_ratio = -self.follower.forward_axis().y;
        let speed = setting.update_slide(ctx.pose.move_speed, slope_ratio, ctx.dt);
        self.progress += speed * ctx.dt;
        if self.progress >= length {
            return Some(StateId::Fall);
        }

        let position = self.follower.local_to_world(0.0, -HANG_DEPTH, self.progress);
        self.follower.update(position);
        ctx.pose.move_speed = speed;
        ctx.warp_to(position);
        ctx.pose.set_movement_angle(self.follower.forward_angle());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use glam::Vec3;
    use railrunner_physics::{Curve, CurveId};

    use crate::character::GrindBinding;
    use crate::collaborators::{Collaborators, Notification};
    use crate::config::CharacterConfig;
    use crate::input::PlayerInput;
    use crate::level::GrindRail;

    const DT: f32 = 1.0 / 60.0;

    fn rail_level() -> Level {
        let mut level = Level::new("rails", "Rails");
        for (id, x) in [(1, 0.0), (2, 3.0)] {
            let curve = Curve::from_positions(
                CurveId(id),
                &[Vec3::new(x, 2.0, 0.0), Vec3::new(x, 2.0, 20.0)],
            )
            .expect("rail");
            level.rails.push(GrindRail {
                id,
                curve: Arc::new(curve),
            });
        }
        level
    }

    fn grinding(level: &Level, z: f32) -> CharacterContext {
        let mut ctx = CharacterContext::new(
            Arc::new(CharacterConfig::default()),
            Collaborators::null(),
            DT,
        );
        ctx.pose.position = Vec3::new(0.0, 2.0, z);
        ctx.grind = Some(GrindBinding::new(
            1,
            level.rails[0].curve.clone(),
            false,
            ctx.pose.position,
        ));
        ctx
    }

    #[test]
    fn test_grind_enter_balances_and_sets_speed() {
        let level = rail_level();
        let (collaborators, log) = Collaborators::recording();
        let mut ctx = grinding(&level, 5.0);
        ctx.collaborators = collaborators;

        Grind.enter_state(&mut ctx, &level);
        assert_eq!(ctx.pose.move_speed, ctx.config.rail.min_entry_speed);
        assert_eq!(log.count(|n| *n == Notification::StartBalancing), 1);
    }

    #[test]
    fn test_grind_runs_off_the_end() {
        let level = rail_level();
        let mut ctx = grinding(&level, 18.0);
        let mut grind = Grind;
        grind.enter_state(&mut ctx, &level);

        let mut next = None;
        for _ in 0..60 {
            next = grind.process_physics(&mut ctx, &level);
            if next.is_some() {
                break;
            }
        }
        assert_eq!(next, Some(StateId::Fall));
        assert!((ctx.pose.position.z - 20.0).abs() < 1.0e-3);

        grind.exit_state(&mut ctx, &level);
        assert!(ctx.grind.is_none());
        assert_eq!(ctx.last_rail, Some(1));
    }

    fn long_rail_level() -> Level {
        let mut level = Level::new("long", "Long");
        let curve = Curve::from_positions(
            CurveId(3),
            &[Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 2.0, 200.0)],
        )
        .expect("rail");
        level.rails.push(GrindRail {
            id: 1,
            curve: Arc::new(curve),
        });
        level
    }

    fn ride(
        grind: &mut Grind,
        ctx: &mut CharacterContext,
        level: &Level,
        input: &PlayerInput,
        ticks: u32,
    ) -> Option<StateId> {
        for _ in 0..ticks {
            ctx.input.sample(input, DT);
            if let Some(next) = grind.process_physics(ctx, level) {
                return Some(next);
            }
        }
        None
    }

    #[test]
    fn test_forward_input_holds_speed_on_flat_rail() {
        let level = long_rail_level();
        let mut ctx = grinding(&level, 5.0);
        let mut grind = Grind;
        grind.enter_state(&mut ctx, &level);

        let next = ride(&mut grind, &mut ctx, &level, &PlayerInput::forward(), 1800);
        assert_eq!(next, Some(StateId::Fall));
        assert!((ctx.pose.position.z - 200.0).abs() < 1.0e-2);
        assert!(ctx.pose.move_speed > ctx.config.rail.min_entry_speed);
    }

    #[test]
    fn test_coasting_stalls_off_the_rail() {
        let level = long_rail_level();
        let mut ctx = grinding(&level, 5.0);
        let mut grind = Grind;
        grind.enter_state(&mut ctx, &level);

        let next = ride(&mut grind, &mut ctx, &level, &PlayerInput::default(), 900);
        assert_eq!(next, Some(StateId::Fall));
        assert_eq!(ctx.pose.move_speed, 0.0);
        assert!(ctx.pose.position.z < 50.0);
    }

    #[test]
    fn test_closed_rail_loops_without_end() {
        let mut level = Level::new("ring", "Ring");
        let curve = Curve::from_positions(
            CurveId(9),
            &[
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(20.0, 2.0, 0.0),
                Vec3::new(20.0, 2.0, 20.0),
                Vec3::new(0.0, 2.0, 20.0),
                Vec3::new(0.0, 2.0, 0.0),
            ],
        )
        .expect("ring");
        let curve = Arc::new(curve);
        level.rails.push(GrindRail {
            id: 9,
            curve: curve.clone(),
        });

        let mut ctx = CharacterContext::new(
            Arc::new(CharacterConfig::default()),
            Collaborators::null(),
            DT,
        );
        ctx.pose.position = curve.sample_position(5.0);
        ctx.grind = Some(GrindBinding::new(9, curve.clone(), false, ctx.pose.position));
        let mut grind = Grind;
        grind.enter_state(&mut ctx, &level);

        for _ in 0..600 {
            ctx.pose.move_speed = 25.0;
            assert_eq!(grind.process_physics(&mut ctx, &level), None);
        }
        let binding = ctx.grind.as_ref().expect("still grinding");
        assert!(binding.progress > curve.length() * 2.0);
        assert!(binding.progress_ratio() < 1.0);
        let on_rail = curve.sample_position(curve.closest_offset(ctx.pose.position));
        assert!((on_rail - ctx.pose.position).length() < 1.0e-2);
    }

    #[test]
    fn test_removed_rail_falls() {
        let mut level = rail_level();
        let mut ctx = grinding(&level, 5.0);
        level.remove_rail(1);
        assert_eq!(Grind.process_physics(&mut ctx, &level), Some(StateId::Fall));
    }

    #[test]
    fn test_jump_with_side_input_steps() {
        let level = rail_level();
        let mut ctx = grinding(&level, 5.0);
        ctx.input
            .sample(&PlayerInput::default().with_axis(-1.0, 0.0).with_jump(), DT);
        assert_eq!(Grind.process_physics(&mut ctx, &level), Some(StateId::GrindStep));

        let mut ctx = grinding(&level, 5.0);
        ctx.input.sample(&PlayerInput::default().with_jump(), DT);
        assert_eq!(Grind.process_physics(&mut ctx, &level), Some(StateId::Jump));
    }

    #[test]
    fn test_grind_step_lands_on_neighbour_rail() {
        let level = rail_level();
        let mut ctx = grinding(&level, 5.0);
        let mut grind = Grind;
        grind.enter_state(&mut ctx, &level);
        // Stick left: strafe toward +X, where rail 2 sits
        ctx.input
            .sample(&PlayerInput::default().with_axis(-1.0, 0.0).with_jump(), DT);
        grind.exit_state(&mut ctx, &level);

        let mut step = GrindStep;
        step.enter_state(&mut ctx, &level);
        let mut next = None;
        for _ in 0..90 {
            next = step.process_physics(&mut ctx, &level);
            if next.is_some() {
                break;
            }
        }
        assert_eq!(next, Some(StateId::Grind));
        assert_eq!(ctx.grind.as_ref().map(|b| b.rail_id), Some(2));
    }

    #[test]
    fn test_zipline_rides_to_the_end() {
        let level = Level::new("zip", "Zip");
        let curve = Curve::from_positions(
            CurveId(5),
            &[Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 5.0, 20.0)],
        )
        .expect("zipline");
        let mut ctx = CharacterContext::new(
            Arc::new(CharacterConfig::default()),
            Collaborators::null(),
            DT,
        );
        ctx.pose.position = Vec3::new(0.0, 8.0, 1.0);
        ctx.pose.move_speed = 5.0;
        ctx.payload = Some(Interrupt::Zipline {
            curve: Arc::new(curve),
        });

        let mut zipline = Zipline::default();
        zipline.enter_state(&mut ctx, &level);
        let mut next = None;
        for _ in 0..600 {
            next = zipline.process_physics(&mut ctx, &level);
            if next.is_some() {
                break;
            }
        }
        assert_eq!(next, Some(StateId::Fall));
        assert!(ctx.pose.move_speed > 5.0);
    }
}
