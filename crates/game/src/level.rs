//! Level description: geometry, paths, rails and trigger volumes.

use std::collections::HashSet;
use std::sync::Arc;

use glam::Vec3;

use railrunner_physics::{CollisionWorld, ContentFlags, Curve, CurveError, CurveId, SurfaceFlags};

use crate::launcher::LaunchSettings;
use crate::lockout::{LockoutResource, ResetFlags};

/// A rail the character can grind on.
#[derive(Debug, Clone)]
pub struct GrindRail {
    pub id: u32,
    pub curve: Arc<Curve>,
}

/// Something the homing attack can lock onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockonTarget {
    pub id: u32,
    pub position: Vec3,
}

/// A light-dash ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    pub id: u32,
    pub position: Vec3,
}

/// What a trigger volume does when the character enters (or leaves) it.
#[derive(Debug, Clone)]
pub enum TriggerKind {
    Launcher(LaunchSettings),
    Teleporter { destination: Vec3, angle: f32 },
    Petrify { duration: f32 },
    Automation { curve: Arc<Curve>, speed: f32 },
    Zipline { curve: Arc<Curve> },
    /// Narrow ledge: inside the volume the character sidles.
    Sidle,
    /// Opens a drift window while inside.
    Drift { window: f32 },
    Damage,
    /// Pushed on enter, removed on exit.
    Lockout(Arc<LockoutResource>),
    PathSwitch { curve: Arc<Curve>, reversed: bool },
    /// Makes a lockon target a candidate while inside.
    LockonTarget(u32),
}

/// An axis-aligned trigger box.
#[derive(Debug, Clone)]
pub struct TriggerVolume {
    pub id: u32,
    pub center: Vec3,
    pub half_extents: Vec3,
    pub kind: TriggerKind,
    /// Whether this trigger can fire more than once.
    pub repeatable: bool,
    /// Set once it has fired.
    pub activated: bool,
}

impl TriggerVolume {
    pub fn new(id: u32, center: Vec3, half_extents: Vec3, kind: TriggerKind) -> Self {
        Self {
            id,
            center,
            half_extents,
            kind,
            repeatable: true,
            activated: false,
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        let d = (point - self.center).abs();
        d.x <= self.half_extents.x && d.y <= self.half_extents.y && d.z <= self.half_extents.z
    }
}

/// Edge of a trigger volume crossed this tick.
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    pub volume_id: u32,
    pub kind: TriggerKind,
    /// `true` on enter, `false` on exit.
    pub entered: bool,
}

/// A game level.
#[derive(Debug)]
pub struct Level {
    pub id: String,
    pub name: String,
    pub collision: CollisionWorld,

    /// The level's primary traversal route.
    pub main_path: Option<Arc<Curve>>,
    pub main_path_reversed: bool,
    /// Airborne orientation follows the path's banking instead of world up.
    pub tilt_follow: bool,

    pub spawn_position: Vec3,
    pub spawn_angle: f32,

    pub rails: Vec<GrindRail>,
    pub targets: Vec<LockonTarget>,
    pub rings: Vec<Ring>,
    pub triggers: Vec<TriggerVolume>,

    /// Volumes the character was inside last check.
    occupied: HashSet<u32>,
}

impl Level {
    /// Create an empty level.
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            collision: CollisionWorld::new(),
            main_path: None,
            main_path_reversed: false,
            tilt_follow: false,
            spawn_position: Vec3::ZERO,
            spawn_angle: 0.0,
            rails: Vec::new(),
            targets: Vec::new(),
            rings: Vec::new(),
            triggers: Vec::new(),
            occupied: HashSet::new(),
        }
    }

    /// A straight course along `+Z`: flat floor, a side rail, a launcher, a
    /// wall at the far end and a few homing targets.
    pub fn test_course() -> Result<Self, CurveError> {
        let mut level = Self::new("test_course", "Test Course");

        let floor = level.collision.add_box(
            Vec3::new(0.0, -0.5, 100.0),
            Vec3::new(30.0, 0.5, 110.0),
            ContentFlags::SOLID,
            SurfaceFlags::TERRAIN,
        );
        level.collision.set_material(floor, "grass");

        // End wall
        level.collision.add_box(
            Vec3::new(0.0, 5.0, 210.0),
            Vec3::new(30.0, 5.0, 0.5),
            ContentFlags::SOLID,
            SurfaceFlags::WALL,
        );

        // Low overhang to duck under
        level.collision.add_box(
            Vec3::new(-15.0, 2.0, 60.0),
            Vec3::new(5.0, 0.5, 5.0),
            ContentFlags::SOLID,
            SurfaceFlags::CEILING | SurfaceFlags::FLOOR,
        );

        let path = Curve::from_positions(
            CurveId(0),
            &[Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 200.0)],
        )?;
        level.main_path = Some(Arc::new(path));

        let rail = Curve::from_positions(
            CurveId(100),
            &[Vec3::new(8.0, 1.0, 20.0), Vec3::new(8.0, 1.0, 50.0)],
        )?;
        level.rails.push(GrindRail {
            id: 1,
            curve: Arc::new(rail),
        });

        level.targets.push(LockonTarget {
            id: 1,
            position: Vec3::new(0.0, 4.0, 140.0),
        });
        level.targets.push(LockonTarget {
            id: 2,
            position: Vec3::new(0.0, 6.0, 150.0),
        });
        level.triggers.push(TriggerVolume::new(
            10,
            Vec3::new(0.0, 3.0, 135.0),
            Vec3::new(10.0, 6.0, 20.0),
            TriggerKind::LockonTarget(1),
        ));
        level.triggers.push(TriggerVolume::new(
            11,
            Vec3::new(0.0, 3.0, 145.0),
            Vec3::new(10.0, 6.0, 20.0),
            TriggerKind::LockonTarget(2),
        ));

        for (i, z) in [80.0, 84.0, 88.0].into_iter().enumerate() {
            level.rings.push(Ring {
                id: i as u32,
                position: Vec3::new(-6.0, 1.0, z),
            });
        }

        level.triggers.push(TriggerVolume::new(
            20,
            Vec3::new(0.0, 1.0, 100.0),
            Vec3::new(2.0, 1.0, 1.0),
            TriggerKind::Launcher(LaunchSettings::new(
                Vec3::new(0.0, 0.0, 100.0),
                Vec3::new(0.0, 0.0, 125.0),
                8.0,
                1.2,
            )),
        ));

        let boost = LockoutResource::path_boost(1, 0.0, 1.0).with_reset_flags(ResetFlags::ON_JUMP);
        level.triggers.push(TriggerVolume::new(
            30,
            Vec3::new(0.0, 1.0, 170.0),
            Vec3::new(30.0, 2.0, 10.0),
            TriggerKind::Lockout(Arc::new(boost)),
        ));

        Ok(level)
    }

    pub fn rail(&self, id: u32) -> Option<&GrindRail> {
        self.rails.iter().find(|rail| rail.id == id)
    }

    pub fn remove_rail(&mut self, id: u32) -> bool {
        let before = self.rails.len();
        self.rails.retain(|rail| rail.id != id);
        before != self.rails.len()
    }

    pub fn target(&self, id: u32) -> Option<&LockonTarget> {
        self.targets.iter().find(|target| target.id == id)
    }

    pub fn remove_target(&mut self, id: u32) -> bool {
        let before = self.targets.len();
        self.targets.retain(|target| target.id != id);
        before != self.targets.len()
    }

    /// Enter / exit edges for every trigger volume at `position`.
    pub fn update_triggers(&mut self, position: Vec3) -> Vec<TriggerEvent> {
        let mut events = Vec::new();

        for trigger in &mut self.triggers {
            let inside = trigger.contains(position);
            let was_inside = self.occupied.contains(&trigger.id);

            if inside && !was_inside {
                self.occupied.insert(trigger.id);
                if trigger.activated && !trigger.repeatable {
                    continue;
                }
                trigger.activated = true;
                events.push(TriggerEvent {
                    volume_id: trigger.id,
                    kind: trigger.kind.clone(),
                    entered: true,
                });
            } else if !inside && was_inside {
                self.occupied.remove(&trigger.id);
                events.push(TriggerEvent {
                    volume_id: trigger.id,
                    kind: trigger.kind.clone(),
                    entered: false,
                });
            }
        }

        events
    }

    /// Forget which volumes were occupied (after a respawn or teleport).
    pub fn reset_occupancy(&mut self) {
        self.occupied.clear();
    }
}
