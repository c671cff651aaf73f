//! Ray trace results.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::flags::{ContentFlags, SurfaceFlags};

/// Identifier of a brush inside a [`CollisionWorld`](super::CollisionWorld).
pub type BrushId = u32;

/// Result of a ray cast through the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceResult {
    /// How far along the ray we got before hitting something.
    ///
    /// - `1.0` = traveled the full distance (no collision)
    /// - `0.0` = hit something at the origin
    pub fraction: f32,

    /// Distance from the origin to the end position (meters).
    pub distance: f32,

    /// Impact point, or the ray end if nothing was hit.
    pub end_position: Vec3,

    /// Surface normal at the impact point, pointing away from the surface.
    pub hit_normal: Option<Vec3>,

    /// Content flags of what was hit.
    pub hit_contents: ContentFlags,

    /// Surface tags of what was hit.
    pub hit_surface: SurfaceFlags,

    /// Brush that was hit.
    pub hit_brush: Option<BrushId>,

    /// Material key of the hit brush, used for ground classification.
    pub material: Option<String>,
}

impl TraceResult {
    /// Create a trace result indicating no collision occurred.
    pub fn no_hit(end_position: Vec3, distance: f32) -> Self {
        Self {
            fraction: 1.0,
            distance,
            end_position,
            hit_normal: None,
            hit_contents: ContentFlags::EMPTY,
            hit_surface: SurfaceFlags::NONE,
            hit_brush: None,
            material: None,
        }
    }

    /// Check if this trace hit something.
    #[inline]
    pub fn hit_something(&self) -> bool {
        self.hit_normal.is_some()
    }

    /// Get the hit normal, defaulting to up if none.
    #[inline]
    pub fn normal_or_up(&self) -> Vec3 {
        self.hit_normal.unwrap_or(Vec3::Y)
    }
}
