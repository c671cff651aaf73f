//! Scripted and hazard states entered through interrupts.

use std::sync::Arc;

use glam::Vec3;

use railrunner_physics::math::{project_on_plane, yaw_of};
use railrunner_physics::{Curve, MovementFlags, PathFollower, SolveOptions};

use super::{PlayerState, StateId};
use crate::character::{CharacterContext, Interrupt};
use crate::launcher::LaunchSettings;
use crate::level::Level;
use crate::motion::{apply_gravity, apply_movement, take_off, turn_instantly};

/// Flight along a launcher arc.
#[derive(Debug, Default)]
pub struct Launch {
    settings: Option<LaunchSettings>,
    elapsed: f32,
}

impl PlayerState for Launch {
    fn id(&self) -> StateId {
        StateId::Launch
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        self.settings = None;
        self.elapsed = 0.0;
        if let Some(Interrupt::Launcher {
            volume_id,
            settings,
        }) = ctx.payload.clone()
        {
            log::debug!("launcher {} fired", volume_id);
            self.settings = Some(settings.with_start(ctx.pose.position));
            ctx.active_launcher = Some(volume_id);
        }
        ctx.pose.take_off();
        ctx.pose.flags.set(MovementFlags::EXTERNAL_CONTROL, true);
        ctx.collaborators.animation.jump_animation();
        ctx.collaborators.effects.play_action_sfx("launch");
    }

    fn exit_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.active_launcher = None;
        ctx.pose.flags.set(MovementFlags::EXTERNAL_CONTROL, false);
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, _level: &Level) -> Option<StateId> {
        let Some(settings) = self.settings else {
            return Some(StateId::Fall);
        };

        self.elapsed += ctx.dt;
        let t = if settings.duration > 0.0 {
            (self.elapsed / settings.duration).min(1.0)
        } else {
            1.0
        };

        let velocity = settings.velocity_at(t);
        let horizontal = project_on_plane(velocity, Vec3::Y);
        if horizontal.length_squared() > 1.0e-8 {
            ctx.pose.set_movement_angle(yaw_of(horizontal));
        }
        ctx.warp_to(settings.interpolate(t));

        if t >= 1.0 {
            ctx.pose.move_speed = horizontal.length() * settings.exit_speed_ratio;
            ctx.pose.vertical_speed = velocity.y * settings.exit_speed_ratio;
            ctx.pose.strafe_speed = 0.0;
            return Some(StateId::Fall);
        }
        None
    }
}

/// Carried along a curve at a fixed speed.
#[derive(Debug, Default)]
pub struct Automation {
    follower: PathFollower,
    progress: f32,
    speed: f32,
}

impl Automation {
    fn bind(&mut self, curve: Arc<Curve>, speed: f32, position: Vec3) {
        self.follower = PathFollower::new();
        self.follower.set_active_path(curve, false, position);
        self.progress = self.follower.progress();
        self.speed = speed;
    }
}

impl PlayerState for Automation {
    fn id(&self) -> StateId {
        StateId::Automation
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        self.follower.clear_path();
        if let Some(Interrupt::Automation { curve, speed }) = ctx.payload.clone() {
            self.bind(curve, speed, ctx.pose.position);
        }
        ctx.pose.flags.set(MovementFlags::EXTERNAL_CONTROL, true);
        ctx.pose.strafe_speed = 0.0;
        ctx.pose.vertical_speed = 0.0;
    }

    fn exit_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.pose.flags.set(MovementFlags::EXTERNAL_CONTROL, false);
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, _level: &Level) -> Option<StateId> {
        let Some(length) = self.follower.active_path().map(|curve| curve.length()) else {
            return Some(StateId::Fall);
        };

        self.progress = (self.progress + self.speed * ctx.dt).min(length);
        let position = self.follower.local_to_world(0.0, 0.0, self.progress);
        self.follower.update(position);
        ctx.pose.move_speed = self.speed;
        ctx.warp_to(position);
        ctx.pose.set_movement_angle(self.follower.forward_angle());

        if self.progress >= length {
            return Some(StateId::Run);
        }
        None
    }
}

/// Hit reaction: hop backwards, land, wait for the recovery animation.
#[derive(Debug, Default)]
pub struct Knockback {
    landed: bool,
}

impl PlayerState for Knockback {
    fn id(&self) -> StateId {
        StateId::Knockback
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        self.landed = false;
        // Face the hit so the backward speed carries away from it
        if let Some(Interrupt::Damage { source }) = ctx.payload {
            let toward = project_on_plane(source - ctx.pose.position, ctx.pose.up_direction());
            if toward.length_squared() > 1.0e-8 {
                ctx.pose.set_movement_angle(yaw_of(toward));
            }
        }

        let config = Arc::clone(&ctx.config);
        ctx.invincibility = config.invincibility_time;
        ctx.input.reset_all_buffers();
        take_off(ctx, config.knockback_height);
        ctx.pose.move_speed = config.knockback_speed;
        ctx.pose.strafe_speed = 0.0;
        ctx.collaborators.effects.play_action_sfx("damage");
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        if !self.landed {
            apply_gravity(ctx, 1.0);
        }
        let report = apply_movement(ctx, level, SolveOptions::default());

        if !self.landed {
            if report.ground.is_grounded() {
                self.landed = true;
                ctx.pose.move_speed = 0.0;
                ctx.collaborators.animation.landing_animation();
            }
            return None;
        }

        if !report.ground.is_grounded() {
            return Some(StateId::Fall);
        }
        if ctx.collaborators.animation.is_recovery_playing() {
            return None;
        }
        Some(StateId::Idle)
    }
}

/// Short fade, then reappear at the destination.
#[derive(Debug, Default)]
pub struct Teleport {
    remaining: f32,
    destination: Option<(Vec3, f32)>,
}

impl PlayerState for Teleport {
    fn id(&self) -> StateId {
        StateId::Teleport
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        self.remaining = ctx.config.teleport_delay;
        self.destination = match ctx.payload {
            Some(Interrupt::Teleporter { destination, angle }) => Some((destination, angle)),
            _ => None,
        };
        ctx.pose.stop();
        ctx.pose.flags.set(MovementFlags::EXTERNAL_CONTROL, true);
        ctx.collaborators.effects.play_action_sfx("teleport");
    }

    fn exit_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        ctx.pose.flags.set(MovementFlags::EXTERNAL_CONTROL, false);
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, _level: &Level) -> Option<StateId> {
        self.remaining -= ctx.dt;
        if self.remaining > 0.0 {
            return None;
        }

        if let Some((destination, angle)) = self.destination.take() {
            ctx.warp_to(destination);
            ctx.pose.take_off();
            turn_instantly(ctx, angle);
            let crossfade = ctx.config.camera_crossfade;
            ctx.collaborators.camera.start_crossfade(crossfade);
        }
        Some(StateId::Fall)
    }
}

/// Turned to stone for a while. Mashing jump breaks out sooner.
#[derive(Debug, Default)]
pub struct Petrify {
    remaining: f32,
}

impl PlayerState for Petrify {
    fn id(&self) -> StateId {
        StateId::Petrify
    }

    fn enter_state(&mut self, ctx: &mut CharacterContext, _level: &Level) {
        self.remaining = match ctx.payload {
            Some(Interrupt::Petrify { duration }) => duration,
            _ => 0.0,
        };
        ctx.pose.move_speed = 0.0;
        ctx.pose.strafe_speed = 0.0;
        ctx.collaborators.effects.play_action_sfx("petrify");
    }

    fn process_physics(&mut self, ctx: &mut CharacterContext, level: &Level) -> Option<StateId> {
        if ctx.input.jump_pressed() {
            self.remaining -= ctx.config.petrify_mash;
        }
        // Presses spent on mashing never carry over into a jump
        ctx.input.reset_jump_buffer();
        self.remaining -= ctx.dt;

        apply_gravity(ctx, 1.0);
        let report = apply_movement(ctx, level, SolveOptions::default());

        if self.remaining > 0.0 {
            return None;
        }
        Some(if report.ground.is_grounded() {
            StateId::Idle
        } else {
            StateId::Fall
        })
    }
}
