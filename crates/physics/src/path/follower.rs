//! Curve-relative frame that tracks the character along the active path.
//!
//! The follower re-expresses a world position as progress along a curve plus
//! side/height offsets, and caches the path frame (forward, side, up axes and
//! forward yaw) at that progress. Call [`PathFollower::update`] once per tick
//! after the character moved and [`PathFollower::resync`] after any
//! out-of-band position change.

use std::sync::Arc;

use glam::Vec3;

use super::curve::Curve;
use crate::math::{delta_angle, normalize_or, yaw_of};

/// Horizontal tangent length below which the tangent counts as vertical.
const VERTICAL_TANGENT_EPSILON: f32 = 1.0e-3;

#[derive(Debug, Clone)]
pub struct PathFollower {
    curve: Option<Arc<Curve>>,
    reversed: bool,
    looping: bool,
    progress: f32,

    forward_axis: Vec3,
    side_axis: Vec3,
    up_axis: Vec3,
    center: Vec3,

    forward_angle: f32,
    previous_forward_angle: f32,
    delta_angle: f32,
    has_frame: bool,

    /// Offset from the curve center to the character, in path axes
    /// (`x` = side, `y` = height, `z` = along the forward axis).
    local_offset: Vec3,
    /// Offset from the curve center to the character, in world space.
    global_offset: Vec3,

    /// Whether the active path's banking should drive airborne orientation.
    pub tilt_following: bool,
}

impl Default for PathFollower {
    fn default() -> Self {
        Self {
            curve: None,
            reversed: false,
            looping: false,
            progress: 0.0,
            forward_axis: Vec3::Z,
            side_axis: Vec3::NEG_X,
            up_axis: Vec3::Y,
            center: Vec3::ZERO,
            forward_angle: 0.0,
            previous_forward_angle: 0.0,
            delta_angle: 0.0,
            has_frame: false,
            local_offset: Vec3::ZERO,
            global_offset: Vec3::ZERO,
            tilt_following: false,
        }
    }
}

impl PathFollower {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a curve. Returns `false` when already bound to the same curve
    /// in the same direction (nothing changes in that case).
    pub fn set_active_path(&mut self, curve: Arc<Curve>, reversed: bool, position: Vec3) -> bool {
        if let Some(current) = &self.curve {
            if current.id() == curve.id() && self.reversed == reversed {
                return false;
            }
        }

        log::debug!(
            "path follower bound to {:?} (reversed: {}, closed: {})",
            curve.id(),
            reversed,
            curve.is_closed()
        );

        self.looping = curve.is_closed();
        self.reversed = reversed;
        self.curve = Some(curve);
        self.has_frame = false;
        self.resync(position);
        true
    }

    /// Drop the active curve.
    pub fn clear_path(&mut self) {
        self.curve = None;
        self.has_frame = false;
        self.delta_angle = 0.0;
    }

    pub fn active_path(&self) -> Option<&Arc<Curve>> {
        self.curve.as_ref()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Snap progress to the closest point on the curve and rebuild the frame.
    pub fn resync(&mut self, position: Vec3) {
        let Some(curve) = &self.curve else {
            return;
        };
        self.progress = self.directed(curve, curve.closest_offset(position));
        self.recalculate_data(position);
        self.previous_forward_angle = self.forward_angle;
        self.delta_angle = 0.0;
    }

    /// Per-tick progress tracking. Progress stays continuous across the seam
    /// of a looping curve.
    pub fn update(&mut self, position: Vec3) {
        if self.curve.is_none() {
            return;
        }
        self.progress = self.get_progress(position);
        self.recalculate_data(position);
    }

    /// Rebuild axes, forward angle, delta angle and offsets at the current
    /// progress.
    pub fn recalculate_data(&mut self, position: Vec3) {
        let Some(curve) = self.curve.clone() else {
            return;
        };

        let offset = self.curve_offset(&curve, self.progress);
        let mut forward = curve.sample_tangent(offset);
        if self.reversed {
            forward = -forward;
        }

        let horizontal = Vec3::new(forward.x, 0.0, forward.z);
        let (side, up, angle) = if horizontal.length() < VERTICAL_TANGENT_EPSILON {
            // Vertical tangent: cross with up is singular, keep last side axis
            let side = normalize_or(
                self.side_axis - forward * self.side_axis.dot(forward),
                Vec3::NEG_X,
            );
            (side, side.cross(forward), self.forward_angle)
        } else {
            let up = curve.sample_up(offset);
            let side = normalize_or(forward.cross(up), self.side_axis);
            (side, side.cross(forward), yaw_of(forward))
        };

        self.previous_forward_angle = if self.has_frame {
            self.forward_angle
        } else {
            angle
        };
        self.forward_axis = forward;
        self.side_axis = side;
        self.up_axis = up;
        self.forward_angle = angle;
        self.delta_angle = delta_angle(self.previous_forward_angle, angle);
        self.has_frame = true;

        self.center = curve.sample_position(offset);
        self.global_offset = position - self.center;
        self.local_offset = Vec3::new(
            self.global_offset.dot(side),
            self.global_offset.dot(up),
            self.global_offset.dot(forward),
        );
    }

    /// Progress the given position would have, without changing any state.
    /// On loops the result is unwrapped to lie nearest the current progress.
    pub fn get_progress(&self, position: Vec3) -> f32 {
        let Some(curve) = &self.curve else {
            return 0.0;
        };
        let raw = self.directed(curve, curve.closest_offset(position));
        if !self.looping {
            return raw;
        }

        let length = curve.length();
        let laps = ((self.progress - raw) / length).round();
        raw + laps * length
    }

    /// Raw progress (meters along the path in travel direction).
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Progress as a fraction of the path length, in `[0, 1]`.
    pub fn progress_ratio(&self) -> f32 {
        let Some(curve) = &self.curve else {
            return 0.0;
        };
        if self.looping {
            self.progress.rem_euclid(curve.length()) / curve.length()
        } else {
            (self.progress / curve.length()).clamp(0.0, 1.0)
        }
    }

    /// Distance left before the end of an open path.
    pub fn remaining_distance(&self) -> f32 {
        match &self.curve {
            Some(curve) if !self.looping => (curve.length() - self.progress).max(0.0),
            _ => f32::MAX,
        }
    }

    /// Whether a point lies further along the path than the character.
    pub fn is_ahead(&self, position: Vec3) -> bool {
        self.get_progress(position) > self.progress
    }

    /// World position for path-local coordinates.
    pub fn local_to_world(&self, side: f32, height: f32, progress: f32) -> Vec3 {
        let Some(curve) = &self.curve else {
            return Vec3::new(side, height, progress);
        };
        let offset = self.curve_offset(curve, progress);
        let mut forward = curve.sample_tangent(offset);
        if self.reversed {
            forward = -forward;
        }
        let up = curve.sample_up(offset);
        let side_axis = normalize_or(forward.cross(up), self.side_axis);
        let up_axis = side_axis.cross(forward);
        curve.sample_position(offset) + side_axis * side + up_axis * height
    }

    /// Path-local coordinates `(side, height, progress)` of a world position.
    pub fn world_to_local(&self, position: Vec3) -> Vec3 {
        let Some(curve) = &self.curve else {
            return position;
        };
        let progress = self.get_progress(position);
        let offset = self.curve_offset(curve, progress);
        let mut forward = curve.sample_tangent(offset);
        if self.reversed {
            forward = -forward;
        }
        let up = curve.sample_up(offset);
        let side_axis = normalize_or(forward.cross(up), self.side_axis);
        let up_axis = side_axis.cross(forward);
        let delta = position - curve.sample_position(offset);
        Vec3::new(delta.dot(side_axis), delta.dot(up_axis), progress)
    }

    pub fn forward_axis(&self) -> Vec3 {
        self.forward_axis
    }

    pub fn back_axis(&self) -> Vec3 {
        -self.forward_axis
    }

    /// Right-hand side of the path when facing forward.
    pub fn side_axis(&self) -> Vec3 {
        self.side_axis
    }

    pub fn up_axis(&self) -> Vec3 {
        self.up_axis
    }

    /// Closest point on the curve, as of the last recalculation.
    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn forward_angle(&self) -> f32 {
        self.forward_angle
    }

    /// Signed change of the forward angle since the previous tick.
    pub fn delta_angle(&self) -> f32 {
        self.delta_angle
    }

    pub fn local_offset(&self) -> Vec3 {
        self.local_offset
    }

    pub fn global_offset(&self) -> Vec3 {
        self.global_offset
    }

    fn directed(&self, curve: &Curve, offset: f32) -> f32 {
        if self.reversed {
            curve.length() - offset
        } else {
            offset
        }
    }

    fn curve_offset(&self, curve: &Curve, progress: f32) -> f32 {
        let offset = curve.normalize_offset(progress);
        if self.reversed {
            curve.length() - offset
        } else {
            offset
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{CurveId, CurvePoint};

    fn straight() -> Arc<Curve> {
        Arc::new(
            Curve::from_positions(CurveId(1), &[Vec3::ZERO, Vec3::new(0.0, 0.0, 100.0)])
                .expect("valid curve"),
        )
    }

    fn ring() -> Arc<Curve> {
        let points: Vec<Vec3> = (0..=12)
            .map(|i| {
                let a = i as f32 / 12.0 * std::f32::consts::TAU;
                Vec3::new(a.sin() * 30.0, 0.0, a.cos() * 30.0)
            })
            .collect();
        Arc::new(Curve::from_positions(CurveId(2), &points).expect("valid curve"))
    }

    #[test]
    fn test_resync_is_idempotent() {
        let mut follower = PathFollower::new();
        let position = Vec3::new(2.0, 1.0, 37.5);
        follower.set_active_path(straight(), false, position);

        follower.resync(position);
        let first = follower.progress();
        follower.resync(position);
        assert!((follower.progress() - first).abs() < 1.0e-5);
        assert_eq!(follower.delta_angle(), 0.0);
    }

    #[test]
    fn test_frame_on_straight_path() {
        let mut follower = PathFollower::new();
        follower.set_active_path(straight(), false, Vec3::new(-3.0, 1.0, 10.0));

        assert!((follower.progress() - 10.0).abs() < 1.0e-3);
        assert!((follower.forward_axis() - Vec3::Z).length() < 1.0e-4);
        assert!((follower.up_axis() - Vec3::Y).length() < 1.0e-4);
        assert!((follower.side_axis() - Vec3::NEG_X).length() < 1.0e-4);
        // -3 on x is to the right when facing +Z
        assert!((follower.local_offset().x - 3.0).abs() < 1.0e-3);
        assert!((follower.local_offset().y - 1.0).abs() < 1.0e-3);
        assert!(follower.forward_angle().abs() < 1.0e-4);
    }

    #[test]
    fn test_rebinding_same_path_is_noop() {
        let curve = straight();
        let mut follower = PathFollower::new();
        assert!(follower.set_active_path(curve.clone(), false, Vec3::new(0.0, 0.0, 5.0)));
        follower.update(Vec3::new(0.0, 0.0, 20.0));
        assert!(!follower.set_active_path(curve.clone(), false, Vec3::ZERO));
        assert!((follower.progress() - 20.0).abs() < 1.0e-3);
        assert!(follower.set_active_path(curve, true, Vec3::new(0.0, 0.0, 20.0)));
        assert!((follower.progress() - 80.0).abs() < 1.0e-3);
        assert!((follower.forward_axis() - Vec3::NEG_Z).length() < 1.0e-4);
    }

    #[test]
    fn test_loop_progress_is_continuous() {
        let curve = ring();
        let length = curve.length();
        let mut follower = PathFollower::new();
        follower.set_active_path(curve.clone(), false, curve.sample_position(length - 1.0));

        follower.update(curve.sample_position(1.0));
        assert!((follower.progress() - (length + 1.0)).abs() < 0.05);
        assert!(follower.progress_ratio() < 0.05);
    }

    #[test]
    fn test_delta_angle_tracks_curvature() {
        let curve = ring();
        let mut follower = PathFollower::new();
        follower.set_active_path(curve.clone(), false, curve.sample_position(5.0));
        follower.update(curve.sample_position(6.0));
        assert!(follower.delta_angle().abs() > 1.0e-4);
        assert!(follower.delta_angle().abs() < 0.1);
    }

    #[test]
    fn test_vertical_tangent_keeps_side_axis() {
        let curve = Arc::new(
            Curve::new(
                CurveId(3),
                vec![
                    CurvePoint::new(Vec3::ZERO),
                    CurvePoint::new(Vec3::new(0.0, 0.0, 10.0)),
                    CurvePoint::new(Vec3::new(0.0, 0.0, 10.000_1)),
                    CurvePoint::new(Vec3::new(0.0, 20.0, 10.0)),
                ],
            )
            .expect("valid curve"),
        );
        let mut follower = PathFollower::new();
        follower.set_active_path(curve.clone(), false, Vec3::new(0.0, 0.0, 5.0));
        let side_before = follower.side_axis();

        follower.update(Vec3::new(0.0, 15.0, 10.0));
        assert!(follower.side_axis().is_finite());
        assert!((follower.side_axis() - side_before).length() < 1.0e-3);
        assert!(follower.up_axis().is_finite());
    }

    #[test]
    fn test_local_world_round_trip() {
        let mut follower = PathFollower::new();
        follower.set_active_path(straight(), false, Vec3::ZERO);
        let world = follower.local_to_world(2.0, 1.0, 30.0);
        let local = follower.world_to_local(world);
        assert!((local - Vec3::new(2.0, 1.0, 30.0)).length() < 1.0e-3);
        assert!(follower.is_ahead(world));
    }
}
