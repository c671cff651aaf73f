//! Movement template shared by the states.
//!
//! A grounded state's tick is, in order: read the intent (stick or lockout),
//! turn, change speed, then [`apply_movement`]. `apply_movement` integrates
//! the pose, applies lockout recentering, advances the path follower and runs
//! the collision solver, so probing always happens after the move.

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use railrunner_physics::math::{
    delta_angle, direction_from_yaw, lerp, move_toward, smooth_damp_angle, wrap_angle,
};
use railrunner_physics::{
    CeilingContact, CollisionSolver, GroundEvent, MovementSetting, SolveOptions, SolveReport,
};

use crate::character::{CharacterContext, Interrupt};
use crate::level::Level;
use crate::lockout::{MovementMode, ResetTrigger, SpaceMode};
use crate::states::StateId;

/// Speeds below this count as standing still.
pub const SPEED_EPSILON: f32 = 1.0e-4;

/// What the character is being asked to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveIntent {
    /// World yaw to travel toward. `None` without input.
    pub angle: Option<f32>,
    /// Input strength in `[0, 1]`.
    pub strength: f32,
    /// Sideways input for strafe lockouts, `+` = right.
    pub strafe: f32,
    /// Direction comes from a lockout rather than the stick.
    pub locked: bool,
}

/// Path forward angle, or world forward without a path.
pub fn path_forward_angle(ctx: &CharacterContext) -> f32 {
    if ctx.follower.active_path().is_some() {
        ctx.follower.forward_angle()
    } else {
        0.0
    }
}

/// Yaw a space mode's angles are measured from.
pub fn reference_angle(ctx: &CharacterContext, space: SpaceMode) -> f32 {
    match space {
        SpaceMode::Local => ctx.pose.movement_angle(),
        SpaceMode::Camera => ctx
            .collaborators
            .camera
            .forward_angle()
            .unwrap_or_else(|| path_forward_angle(ctx)),
        SpaceMode::PathFollower => path_forward_angle(ctx),
    }
}

/// Combine the stick and the active lockout into a movement intent.
pub fn movement_intent(ctx: &CharacterContext) -> MoveIntent {
    let Some(lockout) = ctx.lockouts.active() else {
        let reference = reference_angle(ctx, SpaceMode::Camera);
        return MoveIntent {
            angle: ctx.input.input_angle(reference),
            strength: ctx.input.strength(),
            strafe: 0.0,
            locked: false,
        };
    };

    let reference = reference_angle(ctx, lockout.space_mode);
    match lockout.movement_mode {
        MovementMode::Free => MoveIntent {
            angle: ctx.input.input_angle(reference),
            strength: ctx.input.strength(),
            strafe: 0.0,
            locked: false,
        },
        MovementMode::Replace => MoveIntent {
            angle: Some(wrap_angle(reference + lockout.movement_angle)),
            strength: 1.0,
            strafe: 0.0,
            locked: true,
        },
        MovementMode::Strafe => {
            let axis = ctx.input.axis();
            MoveIntent {
                angle: Some(wrap_angle(reference + lockout.movement_angle)),
                strength: axis.y.max(0.0),
                strafe: axis.x,
                locked: true,
            }
        }
    }
}

/// Brake held, or input pointing back against travel while moving.
pub fn is_skidding(ctx: &CharacterContext, intent: &MoveIntent) -> bool {
    if ctx.pose.move_speed <= SPEED_EPSILON {
        return false;
    }
    if ctx.input.is_brake_held() {
        return true;
    }
    if intent.locked {
        return false;
    }
    intent.angle.is_some_and(|angle| {
        delta_angle(ctx.pose.movement_angle(), angle).abs() > ctx.config.skid_angle
    })
}

/// Snap the movement angle (used whenever there is no speed to smooth with).
pub fn turn_instantly(ctx: &mut CharacterContext, angle: f32) {
    ctx.pose.set_movement_angle(angle);
    ctx.turn_velocity = 0.0;
    ctx.collaborators
        .animation
        .snap_rotation(ctx.pose.movement_angle());
}

/// Input and travel sit on opposite sides of the path forward.
fn is_recentering(ctx: &CharacterContext, target: f32) -> bool {
    if ctx.follower.active_path().is_none() {
        return false;
    }
    let forward = ctx.follower.forward_angle();
    let input_side = delta_angle(forward, target);
    let travel_side = delta_angle(forward, ctx.pose.movement_angle());
    input_side * travel_side < 0.0
}

/// Keep a fast-moving character within an arc of the path forward.
fn clamp_high_speed_arc(ctx: &CharacterContext, angle: f32, speed_ratio: f32) -> f32 {
    if ctx.follower.active_path().is_none()
        || ctx.pose.move_speed <= 0.0
        || speed_ratio < ctx.config.high_speed_arc_ratio
    {
        return angle;
    }
    let forward = ctx.follower.forward_angle();
    let offset = delta_angle(forward, angle);
    // Only while travelling forward along the path
    if offset.abs() >= FRAC_PI_2 {
        return angle;
    }
    let arc = ctx.config.high_speed_arc;
    if offset.abs() > arc {
        wrap_angle(forward + arc.copysign(offset))
    } else {
        angle
    }
}

/// Smooth the movement angle toward `target`, faster when slow.
pub fn process_turning(ctx: &mut CharacterContext, target: f32, setting: &MovementSetting) {
    if ctx.pose.move_speed.abs() <= SPEED_EPSILON {
        turn_instantly(ctx, target);
        return;
    }

    let config = Arc::clone(&ctx.config);
    let ratio = setting.speed_ratio_clamped(ctx.pose.move_speed.abs());
    let smooth_time = if is_recentering(ctx, target) {
        config.turn_smooth_recenter
    } else {
        lerp(config.turn_smooth_standing, config.turn_smooth_top_speed, ratio)
    };

    let angle = smooth_damp_angle(
        ctx.pose.movement_angle(),
        target,
        &mut ctx.turn_velocity,
        smooth_time,
        ctx.dt,
    );
    let angle = clamp_high_speed_arc(ctx, angle, ratio);
    ctx.pose.set_movement_angle(angle);
}

/// Move speed toward the intent. Lockout speed overrides win outright.
pub fn process_move_speed(
    ctx: &mut CharacterContext,
    setting: &MovementSetting,
    intent: &MoveIntent,
    skidding: bool,
) {
    let dt = ctx.dt;

    if let Some((ratio, lockout)) = ctx.lockouts.speed_override() {
        let pinned = setting.with_multipliers(lockout.traction_multiplier, lockout.friction_multiplier);
        ctx.pose.move_speed = pinned.update_interpolate(ctx.pose.move_speed, ratio, dt);
        return;
    }

    if skidding {
        ctx.pose.move_speed = move_toward(ctx.pose.move_speed, 0.0, setting.turnaround * dt);
        return;
    }

    let input = match intent.angle {
        None => 0.0,
        Some(angle) => {
            let off_axis = delta_angle(ctx.pose.movement_angle(), angle).sin().abs();
            intent.strength * lerp(1.0, ctx.config.perpendicular_input_scale, off_axis)
        }
    };
    ctx.pose.move_speed = setting.update_interpolate(ctx.pose.move_speed, input, dt);
}

/// Strafe speed follows the stick only under a strafe lockout.
pub fn process_strafe(ctx: &mut CharacterContext, setting: &MovementSetting, intent: &MoveIntent) {
    let strafing = intent.locked
        && ctx
            .lockouts
            .active()
            .is_some_and(|lockout| lockout.movement_mode == MovementMode::Strafe);
    ctx.pose.strafe_speed = if strafing {
        setting.update_interpolate(ctx.pose.strafe_speed, intent.strafe, ctx.dt)
    } else {
        move_toward(ctx.pose.strafe_speed, 0.0, setting.friction * ctx.dt)
    };
}

/// The shared template: turn, then change speed, then strafe.
pub fn process_movement(ctx: &mut CharacterContext, setting: &MovementSetting) -> MoveIntent {
    let intent = movement_intent(ctx);
    let skidding = is_skidding(ctx, &intent);
    if !skidding {
        if let Some(angle) = intent.angle {
            process_turning(ctx, angle, setting);
        }
    }
    process_move_speed(ctx, setting, &intent, skidding);
    process_strafe(ctx, setting, &intent);
    intent
}

pub fn apply_gravity(ctx: &mut CharacterContext, scale: f32) {
    if ctx.pose.is_grounded() {
        return;
    }
    let solver = &ctx.config.solver;
    ctx.pose.vertical_speed =
        (ctx.pose.vertical_speed - solver.gravity * scale * ctx.dt).max(-solver.max_fall_speed);
}

/// Stick push along the path side axis, `+` = toward `side_axis`. Zero when
/// a replacing lockout ignores the stick.
fn lateral_input(ctx: &CharacterContext) -> f32 {
    let ignored = ctx
        .lockouts
        .active()
        .is_some_and(|lockout| lockout.movement_mode == MovementMode::Replace);
    if ignored {
        return 0.0;
    }
    let reference = reference_angle(ctx, SpaceMode::Camera);
    ctx.input.input_angle(reference).map_or(0.0, |angle| {
        direction_from_yaw(angle).dot(ctx.follower.side_axis()) * ctx.input.strength()
    })
}

/// Pull the character back toward the path centerline under a recentering
/// lockout. Slower than steering by hand. Stick input toward the center
/// takes over completely; input away from it weakens the pull.
pub fn recenter(ctx: &mut CharacterContext) {
    if !ctx.lockouts.wants_recenter() || ctx.follower.active_path().is_none() {
        return;
    }
    let side = ctx.follower.world_to_local(ctx.pose.position).x;
    if side.abs() <= f32::EPSILON {
        return;
    }
    // Positive when the stick points back at the centerline
    let toward_center = -side.signum() * lateral_input(ctx);
    if toward_center > 0.0 {
        return;
    }
    let damping = 1.0 - ctx.config.recenter_input_damping * (-toward_center).min(1.0);
    let rate = (ctx.pose.move_speed.abs() * ctx.config.recenter_ratio).max(1.0) * damping;
    let corrected = move_toward(side, 0.0, rate * ctx.dt);
    ctx.pose.position += ctx.follower.side_axis() * (corrected - side);
}

/// Integrate, recenter, advance the path, then probe ground, wall, ceiling
/// and orientation.
pub fn apply_movement(ctx: &mut CharacterContext, level: &Level, options: SolveOptions) -> SolveReport {
    let dt = ctx.dt;
    ctx.pose.position += ctx.pose.velocity() * dt;
    recenter(ctx);
    ctx.follower.update(ctx.pose.position);
    ctx.follower.tilt_following =
        level.tilt_follow || ctx.collaborators.camera.path_tilt_follows();

    let previous_brush = ctx.pose.ground.as_ref().and_then(|ground| ground.brush);
    let config = Arc::clone(&ctx.config);
    let solver = CollisionSolver::new(&level.collision, &config.solver);
    let report = solver.solve(&mut ctx.pose, &ctx.follower, dt, options);

    if let CeilingContact::Crushed(brush) = report.ceiling {
        log::debug!("crushed by {:?}", brush);
        ctx.interrupts.push(Interrupt::Crush);
    }

    if report.ground == GroundEvent::Landed {
        ctx.lockouts.reset(ResetTrigger::Land);
        ctx.can_air_dash = true;
    }

    if report.ground.is_grounded() {
        let brush = ctx.pose.ground.as_ref().and_then(|ground| ground.brush);
        if report.ground == GroundEvent::Landed || brush != previous_brush {
            let material = ctx.pose.ground.as_ref().and_then(|ground| ground.material.as_deref());
            let ground_type = config.ground_types.classify(material);
            ctx.collaborators.effects.update_ground_type(ground_type, brush);
        }
    }

    report
}

/// Leave the ground with `power` of vertical speed.
pub fn take_off(ctx: &mut CharacterContext, power: f32) {
    ctx.pose.take_off();
    ctx.pose.vertical_speed = power;
    ctx.input.reset_jump_buffer();
    ctx.lockouts.reset(ResetTrigger::Jump);
}

/// Where a landing goes: a buffered jump wins, otherwise the speed sign picks
/// Idle / Run / Backstep.
pub fn landing_transition(ctx: &mut CharacterContext) -> StateId {
    ctx.collaborators.animation.landing_animation();

    if ctx.input.is_jump_buffer_active() && !ctx.actions_disabled() {
        return StateId::Jump;
    }
    if ctx.pose.move_speed > SPEED_EPSILON {
        StateId::Run
    } else if ctx.pose.move_speed < -SPEED_EPSILON {
        StateId::Backstep
    } else {
        ctx.pose.move_speed = 0.0;
        StateId::Idle
    }
}

/// Whether the stick points back along the path, far enough to backstep.
pub fn wants_backstep(ctx: &CharacterContext, intent: &MoveIntent) -> bool {
    if intent.locked || ctx.follower.active_path().is_none() {
        return false;
    }
    intent.angle.is_some_and(|angle| {
        delta_angle(ctx.follower.forward_angle(), angle).abs() > ctx.config.skid_angle
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Collaborators;
    use crate::config::CharacterConfig;
    use crate::input::PlayerInput;
    use crate::lockout::LockoutResource;
    use glam::Vec3;
    use railrunner_physics::{ContentFlags, Curve, CurveId, SurfaceFlags};
    use std::f32::consts::PI;

    const DT: f32 = 1.0 / 60.0;

    fn flat_level() -> Level {
        let mut level = Level::new("flat", "Flat");
        level.collision.add_box(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(100.0, 0.5, 100.0),
            ContentFlags::SOLID,
            SurfaceFlags::TERRAIN,
        );
        level
    }

    fn context_on_path(config: CharacterConfig) -> CharacterContext {
        let mut ctx = CharacterContext::new(Arc::new(config), Collaborators::null(), DT);
        let path = Curve::from_positions(CurveId(0), &[Vec3::ZERO, Vec3::new(0.0, 0.0, 100.0)])
            .expect("curve");
        ctx.spawn(Vec3::new(0.0, 0.0, 10.0), 0.0, Some((Arc::new(path), false)));
        ctx
    }

    #[test]
    fn test_first_tick_from_rest() {
        let mut config = CharacterConfig::default();
        config.run = MovementSetting::new(10.0, 5.0, 8.0, 4.0, 30.0);
        let mut ctx = context_on_path(config);
        ctx.input.sample(&PlayerInput::forward(), DT);

        let setting = ctx.config.run;
        process_movement(&mut ctx, &setting);
        assert!((ctx.pose.move_speed - 5.0 * DT).abs() < 1.0e-5);
        assert!(ctx.pose.movement_angle().abs() < 1.0e-6);
    }

    #[test]
    fn test_zero_speed_turn_snaps() {
        let (collaborators, log) = Collaborators::recording();
        let mut ctx = context_on_path(CharacterConfig::default());
        ctx.collaborators = collaborators;
        ctx.input.sample(&PlayerInput::default().with_axis(-1.0, 0.0), DT);

        let setting = ctx.config.run;
        process_movement(&mut ctx, &setting);
        assert!((ctx.pose.movement_angle() - FRAC_PI_2).abs() < 1.0e-5);
        assert_eq!(
            log.count(|n| matches!(n, crate::collaborators::Notification::SnapRotation(_))),
            1
        );
    }

    #[test]
    fn test_moving_turn_is_smoothed() {
        let mut ctx = context_on_path(CharacterConfig::default());
        ctx.pose.move_speed = 10.0;
        ctx.input.sample(&PlayerInput::default().with_axis(-1.0, 0.0), DT);

        let setting = ctx.config.run;
        process_movement(&mut ctx, &setting);
        let angle = ctx.pose.movement_angle();
        assert!(angle > 0.0 && angle < FRAC_PI_2);
    }

    #[test]
    fn test_reverse_input_skids_with_turnaround() {
        let mut ctx = context_on_path(CharacterConfig::default());
        ctx.pose.move_speed = 20.0;
        ctx.input.sample(&PlayerInput::default().with_axis(0.0, -1.0), DT);

        let setting = ctx.config.run;
        process_movement(&mut ctx, &setting);
        assert!((ctx.pose.move_speed - (20.0 - setting.turnaround * DT)).abs() < 1.0e-4);
        // No turning while skidding
        assert!(ctx.pose.movement_angle().abs() < 1.0e-6);
    }

    #[test]
    fn test_perpendicular_input_costs_speed() {
        let mut straight = context_on_path(CharacterConfig::default());
        let mut sideways = context_on_path(CharacterConfig::default());
        straight.pose.move_speed = 25.0;
        sideways.pose.move_speed = 25.0;
        straight.input.sample(&PlayerInput::forward(), DT);
        sideways.input.sample(&PlayerInput::default().with_axis(-1.0, 0.0), DT);

        let setting = straight.config.run;
        process_movement(&mut straight, &setting);
        process_movement(&mut sideways, &setting);
        assert!(straight.pose.move_speed > 25.0);
        assert!(sideways.pose.move_speed < 25.0);
    }

    #[test]
    fn test_high_speed_arc_clamp() {
        let mut ctx = context_on_path(CharacterConfig::default());
        let setting = ctx.config.run;
        ctx.pose.move_speed = setting.speed;
        ctx.input.sample(&PlayerInput::default().with_axis(-1.0, 0.0), DT);

        for _ in 0..120 {
            process_movement(&mut ctx, &setting);
            ctx.pose.move_speed = setting.speed;
        }
        let offset = delta_angle(ctx.follower.forward_angle(), ctx.pose.movement_angle());
        assert!(offset <= ctx.config.high_speed_arc + 1.0e-4);
        assert!(offset > ctx.config.high_speed_arc - 0.05);
    }

    #[test]
    fn test_speed_override_lockout() {
        let mut ctx = context_on_path(CharacterConfig::default());
        ctx.lockouts
            .add(LockoutResource::path_boost(1, 0.0, 0.5).into_shared());
        // Stick says stop, the lockout says half speed forward
        ctx.input.sample(&PlayerInput::default(), DT);

        let setting = ctx.config.run;
        for _ in 0..600 {
            process_movement(&mut ctx, &setting);
        }
        assert!((ctx.pose.move_speed - setting.speed * 0.5).abs() < 1.0e-3);
    }

    #[test]
    fn test_replace_lockout_steers() {
        let mut ctx = context_on_path(CharacterConfig::default());
        let mut lockout = LockoutResource::new(1, 0.0);
        lockout.movement_mode = MovementMode::Replace;
        lockout.space_mode = SpaceMode::PathFollower;
        lockout.movement_angle = PI;
        ctx.lockouts.add(lockout.into_shared());
        ctx.input.sample(&PlayerInput::forward(), DT);

        let setting = ctx.config.run;
        process_movement(&mut ctx, &setting);
        assert!((ctx.pose.movement_angle() - PI).abs() < 1.0e-5);
    }

    #[test]
    fn test_recenter_is_gradual() {
        let mut ctx = context_on_path(CharacterConfig::default());
        ctx.lockouts
            .add(LockoutResource::new(1, 0.0).with_recenter().into_shared());
        ctx.pose.position = Vec3::new(-3.0, 0.0, 10.0);
        ctx.follower.resync(ctx.pose.position);
        ctx.pose.move_speed = 8.0;

        recenter(&mut ctx);
        let side = ctx.follower.world_to_local(ctx.pose.position).x;
        assert!(side.abs() < 3.0 && side.abs() > 2.9);
    }

    fn recentering_context(input: &PlayerInput) -> CharacterContext {
        let mut ctx = context_on_path(CharacterConfig::default());
        ctx.lockouts
            .add(LockoutResource::new(1, 0.0).with_recenter().into_shared());
        // World -X is the path's side axis, so this sits 3 m on the `+` side
        ctx.pose.position = Vec3::new(-3.0, 0.0, 10.0);
        ctx.follower.resync(ctx.pose.position);
        ctx.pose.move_speed = 8.0;
        ctx.input.sample(input, DT);
        ctx
    }

    fn recenter_step(ctx: &mut CharacterContext) -> f32 {
        let before = ctx.follower.world_to_local(ctx.pose.position).x;
        recenter(ctx);
        before - ctx.follower.world_to_local(ctx.pose.position).x
    }

    #[test]
    fn test_recenter_follows_stick_direction() {
        let neutral = recenter_step(&mut recentering_context(&PlayerInput::default()));
        // Stick right pushes further out along the side axis
        let away = recenter_step(&mut recentering_context(
            &PlayerInput::default().with_axis(1.0, 0.0),
        ));
        let toward = recenter_step(&mut recentering_context(
            &PlayerInput::default().with_axis(-1.0, 0.0),
        ));

        assert!(neutral > 0.0);
        assert!(away > 0.0 && away < neutral);
        assert!(toward.abs() < 1.0e-6);
    }

    #[test]
    fn test_recenter_is_slower_than_strafing() {
        let mut ctx = recentering_context(&PlayerInput::default());
        let strafe_step = ctx.config.run.speed * DT;
        let step = recenter_step(&mut ctx);
        assert!(step > 0.0);
        assert!(step < strafe_step);
    }

    #[test]
    fn test_apply_movement_probes_after_moving() {
        let level = flat_level();
        let mut ctx = context_on_path(CharacterConfig::default());
        ctx.pose.move_speed = 6.0;

        let report = apply_movement(&mut ctx, &level, SolveOptions::default());
        assert_eq!(report.ground, GroundEvent::Landed);
        assert!((ctx.pose.position.z - (10.0 + 6.0 * DT)).abs() < 1.0e-4);
        assert!((ctx.follower.progress() - ctx.pose.position.z).abs() < 0.05);
    }

    #[test]
    fn test_landing_transition_by_speed_sign() {
        let mut ctx = context_on_path(CharacterConfig::default());
        ctx.pose.move_speed = 0.0;
        assert_eq!(landing_transition(&mut ctx), StateId::Idle);
        ctx.pose.move_speed = 3.0;
        assert_eq!(landing_transition(&mut ctx), StateId::Run);
        ctx.pose.move_speed = -3.0;
        assert_eq!(landing_transition(&mut ctx), StateId::Backstep);

        ctx.input.sample(&PlayerInput::default().with_jump(), DT);
        assert_eq!(landing_transition(&mut ctx), StateId::Jump);
    }
}
