//! Outbound notifications to the presentation layer.
//!
//! Animation, effects and camera are driven through one-way calls. The only
//! things read back are a couple of gating flags (recovery animation still
//! playing, camera forward, tilt-follow setting); none of them write physics.

use std::sync::{Arc, Mutex};

use glam::Vec3;

use railrunner_physics::BrushId;

use crate::ground_type::GroundType;
use crate::states::StateId;

/// Animation side of the character.
pub trait AnimationDriver: Send {
    fn jump_animation(&mut self) {}

    fn landing_animation(&mut self) {}

    fn start_balancing(&mut self) {}

    /// Snap the visual rotation to `angle` instead of smoothing toward it.
    fn snap_rotation(&mut self, _angle: f32) {}

    fn play_state(&mut self, _state: StateId) {}

    /// Whether a knockback recovery animation is still running.
    fn is_recovery_playing(&self) -> bool {
        false
    }
}

/// Audio and particle side.
pub trait EffectsDriver: Send {
    fn play_action_sfx(&mut self, _key: &str) {}

    fn start_trail_fx(&mut self) {}

    fn update_ground_type(&mut self, _ground: GroundType, _brush: Option<BrushId>) {}
}

/// Camera side.
pub trait CameraDriver: Send {
    /// Camera yaw used for camera-relative input. `None` means the camera
    /// follows the path and the path's forward angle should be used.
    fn forward_angle(&self) -> Option<f32> {
        None
    }

    /// Whether the camera setting asks airborne orientation to follow the
    /// path's tilt.
    fn path_tilt_follows(&self) -> bool {
        false
    }

    fn set_lockon_target(&mut self, _target: Option<Vec3>) {}

    fn start_crossfade(&mut self, _duration: f32) {}
}

/// Presentation drivers that ignore everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCollaborator;

impl AnimationDriver for NullCollaborator {}
impl EffectsDriver for NullCollaborator {}
impl CameraDriver for NullCollaborator {}

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    JumpAnimation,
    LandingAnimation,
    StartBalancing,
    SnapRotation(f32),
    PlayState(StateId),
    ActionSfx(String),
    TrailFx,
    GroundType(GroundType),
    LockonTarget(Option<Vec3>),
    Crossfade(f32),
}

/// Shared log written by [`Recorder`].
#[derive(Debug, Clone, Default)]
pub struct RecordingLog(Arc<Mutex<Vec<Notification>>>);

impl RecordingLog {
    fn push(&self, notification: Notification) {
        if let Ok(mut entries) = self.0.lock() {
            entries.push(notification);
        }
    }

    /// Copy of everything recorded so far.
    pub fn entries(&self) -> Vec<Notification> {
        self.0.lock().map(|entries| entries.clone()).unwrap_or_default()
    }

    pub fn count(&self, predicate: impl Fn(&Notification) -> bool) -> usize {
        self.0
            .lock()
            .map(|entries| entries.iter().filter(|n| predicate(n)).count())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.0.lock() {
            entries.clear();
        }
    }
}

/// Driver that records every notification into a [`RecordingLog`].
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: RecordingLog,
    /// Reported by [`AnimationDriver::is_recovery_playing`].
    pub recovery_playing: bool,
    /// Reported by [`CameraDriver::forward_angle`].
    pub camera_angle: Option<f32>,
}

impl Recorder {
    pub fn new(log: RecordingLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }
}

impl AnimationDriver for Recorder {
    fn jump_animation(&mut self) {
        self.log.push(Notification::JumpAnimation);
    }

    fn landing_animation(&mut self) {
        self.log.push(Notification::LandingAnimation);
    }

    fn start_balancing(&mut self) {
        self.log.push(Notification::StartBalancing);
    }

    fn snap_rotation(&mut self, angle: f32) {
        self.log.push(Notification::SnapRotation(angle));
    }

    fn play_state(&mut self, state: StateId) {
        self.log.push(Notification::PlayState(state));
    }

    fn is_recovery_playing(&self) -> bool {
        self.recovery_playing
    }
}

impl EffectsDriver for Recorder {
    fn play_action_sfx(&mut self, key: &str) {
        self.log.push(Notification::ActionSfx(key.to_string()));
    }

    fn start_trail_fx(&mut self) {
        self.log.push(Notification::TrailFx);
    }

    fn update_ground_type(&mut self, ground: GroundType, _brush: Option<BrushId>) {
        self.log.push(Notification::GroundType(ground));
    }
}

impl CameraDriver for Recorder {
    fn forward_angle(&self) -> Option<f32> {
        self.camera_angle
    }

    fn set_lockon_target(&mut self, target: Option<Vec3>) {
        self.log.push(Notification::LockonTarget(target));
    }

    fn start_crossfade(&mut self, duration: f32) {
        self.log.push(Notification::Crossfade(duration));
    }
}

/// The three presentation drivers a character talks to.
pub struct Collaborators {
    pub animation: Box<dyn AnimationDriver>,
    pub effects: Box<dyn EffectsDriver>,
    pub camera: Box<dyn CameraDriver>,
}

impl Collaborators {
    /// Drivers that do nothing (headless runs).
    pub fn null() -> Self {
        Self {
            animation: Box::new(NullCollaborator),
            effects: Box::new(NullCollaborator),
            camera: Box::new(NullCollaborator),
        }
    }

    /// Drivers that record into a shared log.
    pub fn recording() -> (Self, RecordingLog) {
        let log = RecordingLog::default();
        let collaborators = Self {
            animation: Box::new(Recorder::new(log.clone())),
            effects: Box::new(Recorder::new(log.clone())),
            camera: Box::new(Recorder::new(log.clone())),
        };
        (collaborators, log)
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::null()
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_collects_calls_in_order() {
        let (mut collaborators, log) = Collaborators::recording();
        collaborators.animation.jump_animation();
        collaborators.effects.play_action_sfx("jump");
        collaborators.camera.start_crossfade(0.5);

        assert_eq!(
            log.entries(),
            vec![
                Notification::JumpAnimation,
                Notification::ActionSfx("jump".to_string()),
                Notification::Crossfade(0.5),
            ]
        );
        assert_eq!(log.count(|n| *n == Notification::JumpAnimation), 1);
    }

    #[test]
    fn test_null_drivers_report_defaults() {
        let collaborators = Collaborators::null();
        assert!(!collaborators.animation.is_recovery_playing());
        assert!(collaborators.camera.forward_angle().is_none());
        assert!(!collaborators.camera.path_tilt_follows());
    }
}
