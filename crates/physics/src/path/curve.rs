//! Baked spline curves addressed by arc length.
//!
//! Control points are interpolated with Catmull-Rom and baked into a dense
//! polyline once, so every query afterwards is a binary search by offset.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::{lerp, normalize_or, project_on_plane};

/// Samples baked per control-point segment.
const SUBDIVISIONS: usize = 16;

/// First and last control points closer than this make a closed loop.
const CLOSED_EPSILON: f32 = 0.01;

/// Errors raised while building a curve.
#[derive(Debug, Error, PartialEq)]
pub enum CurveError {
    #[error("curve {id:?} needs at least 2 control points, got {count}")]
    TooFewPoints { id: CurveId, count: usize },

    #[error("curve {0:?} has zero length")]
    ZeroLength(CurveId),
}

/// Identity of a curve; two followers bound to the same id share a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CurveId(pub u32);

/// A control point with an optional roll (radians) around the tangent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub position: Vec3,
    #[serde(default)]
    pub tilt: f32,
}

impl CurvePoint {
    pub fn new(position: Vec3) -> Self {
        Self { position, tilt: 0.0 }
    }

    pub fn tilted(position: Vec3, tilt: f32) -> Self {
        Self { position, tilt }
    }
}

#[derive(Debug, Clone, Copy)]
struct BakedSample {
    offset: f32,
    position: Vec3,
    tilt: f32,
}

/// A baked 3D curve.
#[derive(Debug, Clone)]
pub struct Curve {
    id: CurveId,
    points: Vec<CurvePoint>,
    samples: Vec<BakedSample>,
    closed: bool,
    length: f32,
}

impl Curve {
    /// Bake a curve from control points.
    pub fn new(id: CurveId, points: Vec<CurvePoint>) -> Result<Self, CurveError> {
        if points.len() < 2 {
            return Err(CurveError::TooFewPoints {
                id,
                count: points.len(),
            });
        }

        let closed = points[0].position.distance(points[points.len() - 1].position) < CLOSED_EPSILON;
        let samples = bake(&points, closed);
        let length = samples.last().map_or(0.0, |s| s.offset);

        if length <= f32::EPSILON {
            return Err(CurveError::ZeroLength(id));
        }

        Ok(Self {
            id,
            points,
            samples,
            closed,
            length,
        })
    }

    /// Convenience constructor for untilted curves.
    pub fn from_positions(id: CurveId, positions: &[Vec3]) -> Result<Self, CurveError> {
        Self::new(id, positions.iter().copied().map(CurvePoint::new).collect())
    }

    pub fn id(&self) -> CurveId {
        self.id
    }

    pub fn control_points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Whether the first and last control points coincide.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Total arc length (meters).
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Map any offset onto the curve: wrapped on loops, clamped otherwise.
    pub fn normalize_offset(&self, offset: f32) -> f32 {
        if self.closed {
            offset.rem_euclid(self.length)
        } else {
            offset.clamp(0.0, self.length)
        }
    }

    /// World position at an arc-length offset.
    pub fn sample_position(&self, offset: f32) -> Vec3 {
        let (i, t) = self.locate(offset);
        let a = &self.samples[i];
        let b = &self.samples[i + 1];
        a.position.lerp(b.position, t)
    }

    /// Unit tangent at an arc-length offset, in the direction of increasing offset.
    pub fn sample_tangent(&self, offset: f32) -> Vec3 {
        let (i, _) = self.locate(offset);
        let tangent = self.samples[i + 1].position - self.samples[i].position;
        if tangent.length_squared() > 1.0e-10 {
            return tangent.normalize();
        }
        // Coincident bake samples; fall back to the overall chord
        let chord = self.samples[self.samples.len() - 1].position - self.samples[0].position;
        normalize_or(chord, Vec3::Z)
    }

    /// Banked up vector: world up made orthogonal to the tangent, then rolled
    /// around the tangent by the interpolated tilt.
    pub fn sample_up(&self, offset: f32) -> Vec3 {
        let tangent = self.sample_tangent(offset);
        let (i, t) = self.locate(offset);
        let tilt = lerp(self.samples[i].tilt, self.samples[i + 1].tilt, t);

        let flat = project_on_plane(Vec3::Y, tangent);
        let up = if flat.length_squared() > 1.0e-8 {
            flat.normalize()
        } else {
            // Vertical tangent: world up is undefined, use world forward
            normalize_or(project_on_plane(Vec3::Z, tangent), Vec3::X)
        };

        if tilt.abs() > f32::EPSILON {
            Quat::from_axis_angle(tangent, tilt) * up
        } else {
            up
        }
    }

    /// Arc-length offset of the closest point on the curve.
    pub fn closest_offset(&self, point: Vec3) -> f32 {
        let mut best_offset = 0.0;
        let mut best_distance = f32::MAX;

        for pair in self.samples.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let segment = b.position - a.position;
            let segment_length_sq = segment.length_squared();
            let t = if segment_length_sq > 1.0e-10 {
                ((point - a.position).dot(segment) / segment_length_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let candidate = a.position + segment * t;
            let distance = candidate.distance_squared(point);
            if distance < best_distance {
                best_distance = distance;
                best_offset = lerp(a.offset, b.offset, t);
            }
        }

        best_offset
    }

    /// Find the bake segment holding `offset` and the fraction within it.
    fn locate(&self, offset: f32) -> (usize, f32) {
        let offset = self.normalize_offset(offset);
        let upper = self
            .samples
            .partition_point(|s| s.offset <= offset)
            .clamp(1, self.samples.len() - 1);
        let i = upper - 1;
        let span = self.samples[upper].offset - self.samples[i].offset;
        let t = if span > f32::EPSILON {
            ((offset - self.samples[i].offset) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (i, t)
    }
}

fn bake(points: &[CurvePoint], closed: bool) -> Vec<BakedSample> {
    let n = points.len();
    let neighbor = |i: isize| -> Vec3 {
        if closed {
            // Last point duplicates the first, so the ring has n - 1 entries
            let ring = (n - 1) as isize;
            points[i.rem_euclid(ring) as usize].position
        } else {
            points[i.clamp(0, n as isize - 1) as usize].position
        }
    };

    let mut samples = Vec::with_capacity((n - 1) * SUBDIVISIONS + 1);
    samples.push(BakedSample {
        offset: 0.0,
        position: points[0].position,
        tilt: points[0].tilt,
    });

    for segment in 0..n - 1 {
        let i = segment as isize;
        let (p0, p1, p2, p3) = (neighbor(i - 1), neighbor(i), neighbor(i + 1), neighbor(i + 2));
        let (tilt_a, tilt_b) = (points[segment].tilt, points[segment + 1].tilt);

        for step in 1..=SUBDIVISIONS {
            let t = step as f32 / SUBDIVISIONS as f32;
            let position = catmull_rom(p0, p1, p2, p3, t);
            let previous = samples[samples.len() - 1];
            samples.push(BakedSample {
                offset: previous.offset + previous.position.distance(position),
                position,
                tilt: lerp(tilt_a, tilt_b, t),
            });
        }
    }

    samples
}

/// Catmull-Rom spline interpolation for Vec3.
fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;

    let c0 = -0.5 * t3 + t2 - 0.5 * t;
    let c1 = 1.5 * t3 - 2.5 * t2 + 1.0;
    let c2 = -1.5 * t3 + 2.0 * t2 + 0.5 * t;
    let c3 = 0.5 * t3 - 0.5 * t2;

    p0 * c0 + p1 * c1 + p2 * c2 + p3 * c3
}
