//! Homing-attack target selection.
//!
//! Trigger volumes feed candidates in and out; each tick the nearest visible,
//! unobstructed candidate in front of the character becomes current.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use railrunner_physics::math::angle_between;
use railrunner_physics::ContentFlags;

use crate::level::{Level, LockonTarget};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockonConfig {
    /// Half-angle of the cone around the travel direction (radians).
    pub view_cone: f32,
    pub max_distance: f32,
    /// Candidates within this much extra distance of the nearest one win if
    /// they sit higher.
    pub height_fudge: f32,
    /// Height of the eye ray origin above the feet.
    pub eye_height: f32,
}

impl Default for LockonConfig {
    fn default() -> Self {
        Self {
            view_cone: 60f32.to_radians(),
            max_distance: 25.0,
            height_fudge: 2.0,
            eye_height: 1.0,
        }
    }
}

/// Where the character is looking from.
#[derive(Debug, Clone, Copy)]
pub struct ViewPose {
    pub position: Vec3,
    pub up: Vec3,
    /// Direction of travel.
    pub forward: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct LockonTargeting {
    config: LockonConfig,
    candidates: Vec<u32>,
    current: Option<u32>,
}

impl LockonTargeting {
    pub fn new(config: LockonConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn add_candidate(&mut self, id: u32) {
        if !self.candidates.contains(&id) {
            self.candidates.push(id);
        }
    }

    pub fn remove_candidate(&mut self, id: u32) {
        self.candidates.retain(|c| *c != id);
        if self.current == Some(id) {
            self.current = None;
        }
    }

    pub fn candidates(&self) -> &[u32] {
        &self.candidates
    }

    pub fn current(&self) -> Option<u32> {
        self.current
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
        self.current = None;
    }

    /// Whether a target still exists, is in range, inside the view cone and
    /// not hidden behind solid geometry.
    pub fn is_target_valid(&self, id: u32, pose: &ViewPose, level: &Level) -> bool {
        level
            .target(id)
            .is_some_and(|target| self.distance_if_visible(target, pose, level).is_some())
    }

    /// Re-pick the current target. Returns whether it changed.
    pub fn update(&mut self, pose: &ViewPose, level: &Level) -> bool {
        // Targets destroyed since they became candidates
        self.candidates.retain(|id| level.target(*id).is_some());

        let mut visible: Vec<(f32, &LockonTarget)> = self
            .candidates
            .iter()
            .filter_map(|id| level.target(*id))
            .filter_map(|target| {
                self.distance_if_visible(target, pose, level)
                    .map(|distance| (distance, target))
            })
            .collect();
        visible.sort_by(|a, b| a.0.total_cmp(&b.0));

        let best = visible.first().map(|&(nearest, first)| {
            visible
                .iter()
                .skip(1)
                .take_while(|(distance, _)| *distance - nearest <= self.config.height_fudge)
                .fold(first, |best, (_, candidate)| {
                    if candidate.position.dot(pose.up) > best.position.dot(pose.up) {
                        *candidate
                    } else {
                        best
                    }
                })
                .id
        });

        let changed = best != self.current;
        if changed {
            log::debug!("lockon target {:?} -> {:?}", self.current, best);
        }
        self.current = best;
        changed
    }

    fn distance_if_visible(&self, target: &LockonTarget, pose: &ViewPose, level: &Level) -> Option<f32> {
        let eye = pose.position + pose.up * self.config.eye_height;
        let to_target = target.position - eye;
        let distance = to_target.length();
        if distance > self.config.max_distance {
            return None;
        }
        if angle_between(pose.forward, to_target) > self.config.view_cone {
            return None;
        }
        if level
            .collision
            .segment_blocked(eye, target.position, ContentFlags::MASK_SIGHT)
        {
            return None;
        }
        Some(distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railrunner_physics::SurfaceFlags;

    fn pose() -> ViewPose {
        ViewPose {
            position: Vec3::ZERO,
            up: Vec3::Y,
            forward: Vec3::Z,
        }
    }

    fn level_with_targets(targets: &[(u32, Vec3)]) -> Level {
        let mut level = Level::new("lockon", "Lockon");
        for &(id, position) in targets {
            level.targets.push(LockonTarget { id, position });
        }
        level
    }

    #[test]
    fn test_nearest_visible_wins() {
        let level = level_with_targets(&[(1, Vec3::new(0.0, 1.0, 15.0)), (2, Vec3::new(0.0, 1.0, 6.0))]);
        let mut lockon = LockonTargeting::new(LockonConfig::default());
        lockon.add_candidate(1);
        lockon.add_candidate(2);

        assert!(lockon.update(&pose(), &level));
        assert_eq!(lockon.current(), Some(2));
        assert!(!lockon.update(&pose(), &level));
    }

    #[test]
    fn test_higher_target_wins_inside_fudge_window() {
        let level = level_with_targets(&[(1, Vec3::new(0.0, 1.0, 8.0)), (2, Vec3::new(0.0, 3.0, 8.5))]);
        let mut lockon = LockonTargeting::new(LockonConfig::default());
        lockon.add_candidate(1);
        lockon.add_candidate(2);
        lockon.update(&pose(), &level);
        assert_eq!(lockon.current(), Some(2));
    }

    #[test]
    fn test_behind_and_obstructed_rejected() {
        let mut level =
            level_with_targets(&[(1, Vec3::new(0.0, 1.0, -5.0)), (2, Vec3::new(0.0, 1.0, 10.0))]);
        level.collision.add_box(
            Vec3::new(0.0, 1.0, 5.0),
            Vec3::new(3.0, 3.0, 0.5),
            ContentFlags::SOLID,
            SurfaceFlags::WALL,
        );
        let lockon = LockonTargeting::new(LockonConfig::default());
        assert!(!lockon.is_target_valid(1, &pose(), &level));
        assert!(!lockon.is_target_valid(2, &pose(), &level));
        assert!(!lockon.is_target_valid(99, &pose(), &level));
    }

    #[test]
    fn test_destroyed_target_is_dropped() {
        let mut level = level_with_targets(&[(1, Vec3::new(0.0, 1.0, 5.0))]);
        let mut lockon = LockonTargeting::new(LockonConfig::default());
        lockon.add_candidate(1);
        lockon.update(&pose(), &level);
        assert_eq!(lockon.current(), Some(1));

        level.remove_target(1);
        lockon.update(&pose(), &level);
        assert_eq!(lockon.current(), None);
        assert!(lockon.candidates().is_empty());
    }
}
