//! Angle and direction helpers shared by the path follower, the solver and
//! the movement states.
//!
//! Angles are yaw values in radians around world up: `0` faces `+Z`,
//! `PI / 2` faces `+X`. Stored angles live in `[0, 2PI)`; differences are
//! always taken through [`delta_angle`], never by subtracting.

use std::f32::consts::{PI, TAU};

use glam::{Quat, Vec3};

/// Wrap an angle into `[0, 2PI)`.
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `from` to `to`, in `(-PI, PI]`.
#[inline]
pub fn delta_angle(from: f32, to: f32) -> f32 {
    let diff = (to - from).rem_euclid(TAU);
    if diff > PI {
        diff - TAU
    } else {
        diff
    }
}

/// Linear interpolation.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Where `value` sits between `a` and `b`, unclamped. Zero when `a == b`.
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        0.0
    } else {
        (value - a) / (b - a)
    }
}

/// Step `current` toward `target` by at most `max_delta`.
#[inline]
pub fn move_toward(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Step an angle toward `target` along the shortest arc by at most `max_delta`.
pub fn move_toward_angle(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = delta_angle(current, target);
    if delta.abs() <= max_delta {
        wrap_angle(target)
    } else {
        wrap_angle(current + delta.signum() * max_delta)
    }
}

/// Critically damped spring toward `target`.
///
/// `velocity` carries the spring state between calls. `smooth_time` is roughly
/// the time to reach the target. The result never passes the target.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return current;
    }

    let smooth_time = smooth_time.max(1.0e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let output = target + (change + temp) * decay;

    if (target - current > 0.0) == (output > target) {
        *velocity = 0.0;
        target
    } else {
        output
    }
}

/// [`smooth_damp`] for angles, following the shortest arc. Output is wrapped.
pub fn smooth_damp_angle(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    dt: f32,
) -> f32 {
    let unwrapped_target = current + delta_angle(current, target);
    wrap_angle(smooth_damp(current, unwrapped_target, velocity, smooth_time, dt))
}

/// Yaw of a vector, ignoring its vertical component.
#[inline]
pub fn yaw_of(v: Vec3) -> f32 {
    wrap_angle(v.x.atan2(v.z))
}

/// Horizontal unit vector for a yaw.
#[inline]
pub fn direction_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Remove the component of `v` along `normal` (`normal` must be unit length).
#[inline]
pub fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    v - normal * v.dot(normal)
}

/// Normalize, or return `fallback` for degenerate input.
#[inline]
pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let n = v.normalize_or_zero();
    if n == Vec3::ZERO {
        fallback
    } else {
        n
    }
}

/// Unsigned angle between two vectors. Zero if either is degenerate.
#[inline]
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    if a.length_squared() < 1.0e-12 || b.length_squared() < 1.0e-12 {
        return 0.0;
    }
    a.angle_between(b)
}

/// Rotate unit vector `from` toward unit vector `to` by fraction `t`.
///
/// Antiparallel inputs rotate around an arbitrary perpendicular axis rather
/// than collapsing to zero.
pub fn slerp_direction(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    let from = normalize_or(from, Vec3::Y);
    let to = normalize_or(to, Vec3::Y);
    let t = t.clamp(0.0, 1.0);
    let arc = Quat::from_rotation_arc(from, to);
    normalize_or(Quat::IDENTITY.slerp(arc, t) * from, from)
}

/// Rotate `from` toward `to` by at most `max_radians`.
pub fn rotate_toward(from: Vec3, to: Vec3, max_radians: f32) -> Vec3 {
    let angle = angle_between(from, to);
    if angle <= max_radians || angle < 1.0e-6 {
        normalize_or(to, from)
    } else {
        slerp_direction(from, to, max_radians / angle)
    }
}

/// World direction of travel for a yaw on a surface whose normal is `up`.
#[inline]
pub fn movement_direction(yaw: f32, up: Vec3) -> Vec3 {
    let up = normalize_or(up, Vec3::Y);
    Quat::from_rotation_arc(Vec3::Y, up) * direction_from_yaw(yaw)
}
