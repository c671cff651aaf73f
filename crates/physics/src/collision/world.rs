//! Collision world containing the static level geometry.
//!
//! The world stores tagged brushes and answers ray queries against them.
//! Brushes can be added and removed between ticks; nothing moves on its own.

use glam::{Quat, Vec3};
use parry3d::math::{Isometry, Point, Real, Vector};
use parry3d::query::Ray;
use parry3d::shape::SharedShape;
use thiserror::Error;

use super::flags::{ContentFlags, SurfaceFlags};
use super::trace::{BrushId, TraceResult};

/// Errors raised while building collision geometry.
#[derive(Debug, Error)]
pub enum CollisionError {
    #[error("invalid triangle mesh: {0}")]
    InvalidMesh(String),

    #[error("triangle mesh has no triangles")]
    EmptyMesh,
}

/// A piece of collision geometry in the world.
#[derive(Debug, Clone)]
pub struct CollisionBrush {
    /// Unique identifier for this brush.
    pub id: BrushId,
    /// The collision shape.
    pub shape: SharedShape,
    /// Position and orientation in world space.
    pub transform: Isometry<Real>,
    /// Content flags (solid, clip).
    pub contents: ContentFlags,
    /// Surface tags (floor, wall, ceiling, crusher).
    pub surface: SurfaceFlags,
    /// Material key for ground classification (empty = unclassified).
    pub material: String,
}

/// The collision world containing all level geometry.
#[derive(Debug, Default)]
pub struct CollisionWorld {
    brushes: Vec<CollisionBrush>,
    next_id: BrushId,
}

impl CollisionWorld {
    /// Create an empty collision world.
    pub fn new() -> Self {
        Self {
            brushes: Vec::new(),
            next_id: 0,
        }
    }

    /// Add an axis-aligned box to the world.
    pub fn add_box(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        contents: ContentFlags,
        surface: SurfaceFlags,
    ) -> BrushId {
        self.add_oriented_box(center, half_extents, Quat::IDENTITY, contents, surface)
    }

    /// Add a rotated box, e.g. a ramp or a banked wall.
    pub fn add_oriented_box(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        contents: ContentFlags,
        surface: SurfaceFlags,
    ) -> BrushId {
        let shape = SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z);
        self.insert(shape, to_isometry(center, rotation), contents, surface)
    }

    /// Add a triangle mesh to the world.
    pub fn add_triangle_mesh(
        &mut self,
        vertices: &[Vec3],
        indices: &[[u32; 3]],
        contents: ContentFlags,
        surface: SurfaceFlags,
    ) -> Result<BrushId, CollisionError> {
        if indices.is_empty() {
            return Err(CollisionError::EmptyMesh);
        }

        // Out-of-range indices panic inside parry
        if let Some(index) = indices
            .iter()
            .flatten()
            .find(|&&index| index as usize >= vertices.len())
        {
            return Err(CollisionError::InvalidMesh(format!(
                "index {} out of range for {} vertices",
                index,
                vertices.len()
            )));
        }

        let parry_vertices: Vec<Point<Real>> = vertices
            .iter()
            .map(|v| Point::new(v.x, v.y, v.z))
            .collect();

        let shape = SharedShape::trimesh(parry_vertices, indices.to_vec());

        Ok(self.insert(shape, Isometry::identity(), contents, surface))
    }

    /// Tag a brush with a ground material key.
    pub fn set_material(&mut self, id: BrushId, material: &str) {
        if let Some(brush) = self.brushes.iter_mut().find(|b| b.id == id) {
            brush.material = material.to_string();
        }
    }

    /// Remove a brush. Returns whether it existed.
    pub fn remove_brush(&mut self, id: BrushId) -> bool {
        let before = self.brushes.len();
        self.brushes.retain(|b| b.id != id);
        before != self.brushes.len()
    }

    /// Get a brush by id.
    pub fn brush(&self, id: BrushId) -> Option<&CollisionBrush> {
        self.brushes.iter().find(|b| b.id == id)
    }

    /// Get the number of collision brushes.
    pub fn brush_count(&self) -> usize {
        self.brushes.len()
    }

    /// Perform a raycast through the world and return the closest hit.
    ///
    /// # Arguments
    ///
    /// * `origin` - Ray starting position
    /// * `direction` - Ray direction (will be normalized)
    /// * `max_distance` - Maximum trace distance
    /// * `mask` - Content flags to collide with
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: ContentFlags,
    ) -> TraceResult {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO || max_distance <= 0.0 {
            return TraceResult::no_hit(origin, 0.0);
        }

        let ray = Ray::new(
            Point::new(origin.x, origin.y, origin.z),
            Vector::new(dir.x, dir.y, dir.z),
        );

        let mut closest: Option<(f32, Vec3, &CollisionBrush)> = None;

        for brush in &self.brushes {
            if !mask.intersects(brush.contents) {
                continue;
            }

            let Some(intersection) =
                brush
                    .shape
                    .cast_ray_and_get_normal(&brush.transform, &ray, max_distance, true)
            else {
                continue;
            };

            let normal = Vec3::new(
                intersection.normal.x,
                intersection.normal.y,
                intersection.normal.z,
            );
            // Rays starting inside a brush report a zero normal; skip that brush
            if normal.length_squared() < 0.25 {
                continue;
            }

            let toi = intersection.time_of_impact;
            if closest.as_ref().is_some_and(|(best, _, _)| toi >= *best) {
                continue;
            }
            let normal = normal.normalize();

            closest = Some((toi, normal, brush));
        }

        match closest {
            Some((distance, normal, brush)) => TraceResult {
                fraction: distance / max_distance,
                distance,
                end_position: origin + dir * distance,
                hit_normal: Some(normal),
                hit_contents: brush.contents,
                hit_surface: brush.surface,
                hit_brush: Some(brush.id),
                material: (!brush.material.is_empty()).then(|| brush.material.clone()),
            },
            None => TraceResult::no_hit(origin + dir * max_distance, max_distance),
        }
    }

    /// Check whether the straight segment between two points is blocked.
    pub fn segment_blocked(&self, from: Vec3, to: Vec3, mask: ContentFlags) -> bool {
        let delta = to - from;
        let distance = delta.length();
        if distance < 1.0e-4 {
            return false;
        }
        self.raycast(from, delta, distance, mask).hit_something()
    }

    fn insert(
        &mut self,
        shape: SharedShape,
        transform: Isometry<Real>,
        contents: ContentFlags,
        surface: SurfaceFlags,
    ) -> BrushId {
        let id = self.next_id;
        self.next_id += 1;

        self.brushes.push(CollisionBrush {
            id,
            shape,
            transform,
            contents,
            surface,
            material: String::new(),
        });

        id
    }
}

fn to_isometry(center: Vec3, rotation: Quat) -> Isometry<Real> {
    let (axis, angle) = rotation.to_axis_angle();
    let axis_angle = axis * angle;
    Isometry::new(
        Vector::new(center.x, center.y, center.z),
        Vector::new(axis_angle.x, axis_angle.y, axis_angle.z),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_world() -> CollisionWorld {
        let mut world = CollisionWorld::new();

        // Floor at y=0
        world.add_box(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(50.0, 0.5, 50.0),
            ContentFlags::SOLID,
            SurfaceFlags::FLOOR,
        );

        // Wall at x=10
        world.add_box(
            Vec3::new(10.0, 2.5, 0.0),
            Vec3::new(0.5, 2.5, 10.0),
            ContentFlags::SOLID,
            SurfaceFlags::WALL,
        );

        world
    }

    #[test]
    fn test_raycast_hit_reports_surface() {
        let world = create_test_world();

        let result = world.raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::X, 100.0, ContentFlags::SOLID);

        assert!(result.hit_something());
        assert!((result.end_position.x - 9.5).abs() < 0.01);
        assert!(result.hit_surface.is_wall());
        assert!((result.normal_or_up() - Vec3::NEG_X).length() < 0.01);
        assert_eq!(result.hit_brush, Some(1));
    }

    #[test]
    fn test_raycast_miss() {
        let world = create_test_world();

        let result = world.raycast(Vec3::new(0.0, 1.0, 0.0), -Vec3::X, 100.0, ContentFlags::SOLID);

        assert!(!result.hit_something());
        assert_eq!(result.fraction, 1.0);
    }

    #[test]
    fn test_down_ray_finds_floor_normal() {
        let world = create_test_world();

        let result = world.raycast(Vec3::new(3.0, 0.5, 3.0), Vec3::NEG_Y, 1.0, ContentFlags::SOLID);

        assert!(result.hit_surface.is_floor());
        assert!((result.distance - 0.5).abs() < 1.0e-3);
        assert!((result.normal_or_up() - Vec3::Y).length() < 1.0e-3);
    }

    #[test]
    fn test_oriented_box_normal() {
        let mut world = CollisionWorld::new();
        let rotation = Quat::from_rotation_x(-std::f32::consts::FRAC_PI_4);
        world.add_oriented_box(
            Vec3::ZERO,
            Vec3::new(5.0, 0.5, 5.0),
            rotation,
            ContentFlags::SOLID,
            SurfaceFlags::FLOOR,
        );

        let result = world.raycast(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y, 10.0, ContentFlags::SOLID);
        let expected = rotation * Vec3::Y;
        assert!((result.normal_or_up() - expected).length() < 1.0e-3);
    }

    #[test]
    fn test_content_mask_filtering() {
        let mut world = CollisionWorld::new();

        world.add_box(
            Vec3::new(5.0, 1.0, 0.0),
            Vec3::new(0.5, 1.0, 5.0),
            ContentFlags::SOLID,
            SurfaceFlags::WALL,
        );
        world.add_box(
            Vec3::new(3.0, 1.0, 0.0),
            Vec3::new(0.5, 1.0, 5.0),
            ContentFlags::SIGHT_CLIP,
            SurfaceFlags::NONE,
        );

        let result = world.raycast(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::X,
            100.0,
            ContentFlags::MASK_CHARACTER,
        );
        assert!((result.end_position.x - 4.5).abs() < 0.1);

        assert!(world.segment_blocked(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(4.0, 1.0, 0.0),
            ContentFlags::MASK_SIGHT,
        ));
    }

    #[test]
    fn test_material_and_removal() {
        let mut world = create_test_world();
        world.set_material(0, "grass");

        let result = world.raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y, 2.0, ContentFlags::SOLID);
        assert_eq!(result.material.as_deref(), Some("grass"));

        assert!(world.remove_brush(0));
        assert!(!world.remove_brush(0));
        let result = world.raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y, 2.0, ContentFlags::SOLID);
        assert!(!result.hit_something());
    }

    #[test]
    fn test_ray_starting_inside_brush_ignores_it() {
        let world = create_test_world();

        // Starts inside the wall, must reach the floor below
        let result = world.raycast(Vec3::new(10.0, 1.0, 0.0), Vec3::NEG_Y, 5.0, ContentFlags::SOLID);
        assert_eq!(result.hit_brush, Some(0));
        assert!((result.end_position.y).abs() < 1.0e-3);
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let mut world = CollisionWorld::new();
        let result = world.add_triangle_mesh(&[Vec3::ZERO], &[], ContentFlags::SOLID, SurfaceFlags::FLOOR);
        assert!(matches!(result, Err(CollisionError::EmptyMesh)));
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut world = CollisionWorld::new();
        let vertices = [Vec3::ZERO, Vec3::X, Vec3::Z];
        let result = world.add_triangle_mesh(
            &vertices,
            &[[0, 1, 3]],
            ContentFlags::SOLID,
            SurfaceFlags::FLOOR,
        );
        assert!(matches!(result, Err(CollisionError::InvalidMesh(_))));
        assert_eq!(world.brush_count(), 0);
    }

    #[test]
    fn test_triangle_mesh_floor_is_hit() {
        let mut world = CollisionWorld::new();
        let vertices = [
            Vec3::new(-5.0, 0.0, -5.0),
            Vec3::new(5.0, 0.0, -5.0),
            Vec3::new(5.0, 0.0, 5.0),
            Vec3::new(-5.0, 0.0, 5.0),
        ];
        let id = world
            .add_triangle_mesh(
                &vertices,
                &[[0, 2, 1], [0, 3, 2]],
                ContentFlags::SOLID,
                SurfaceFlags::FLOOR,
            )
            .expect("valid mesh");

        let trace = world.raycast(Vec3::new(1.0, 2.0, 1.0), Vec3::NEG_Y, 5.0, ContentFlags::SOLID);
        assert_eq!(trace.hit_brush, Some(id));
        assert!((trace.distance - 2.0).abs() < 1.0e-4);
    }
}
