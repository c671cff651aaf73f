//! Control lockouts: temporary overrides of input-driven movement.
//!
//! A lockout can pin the speed, replace the direction, force strafing or pull
//! the character back to the path's centerline. Several may be queued; only
//! the top of the [`LockoutStack`] applies.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Priority value that preempts every other lockout.
pub const IMMEDIATE_PRIORITY: i32 = -1;

/// How the lockout treats movement input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementMode {
    /// Input steers as usual.
    #[default]
    Free,
    /// Direction comes from the lockout, input is ignored.
    Replace,
    /// Forward is locked to the lockout direction, the stick strafes.
    Strafe,
}

/// What the lockout's `movement_angle` is relative to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpaceMode {
    /// The character's own movement angle.
    Local,
    /// The camera's forward angle.
    #[default]
    Camera,
    /// The active path's forward angle.
    PathFollower,
}

/// Events that can clear lockouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTrigger {
    Land,
    Jump,
}

/// Which [`ResetTrigger`]s remove a lockout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResetFlags(pub u8);

impl ResetFlags {
    pub const NONE: Self = Self(0);
    pub const ON_LAND: Self = Self(1 << 0);
    pub const ON_JUMP: Self = Self(1 << 1);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0 && other.0 != 0
    }

    /// Whether a reset event should remove a lockout carrying these flags.
    pub fn matches(self, trigger: ResetTrigger) -> bool {
        match trigger {
            ResetTrigger::Land => self.contains(Self::ON_LAND),
            ResetTrigger::Jump => self.contains(Self::ON_JUMP),
        }
    }
}

impl std::ops::BitOr for ResetFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A control override descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutResource {
    /// Higher wins; [`IMMEDIATE_PRIORITY`] beats everything.
    pub priority: i32,
    /// Seconds until auto-removal; `0` = removed explicitly or by reset flags.
    pub duration: f32,
    pub movement_mode: MovementMode,
    pub space_mode: SpaceMode,
    /// Direction (radians) relative to `space_mode`, for Replace / Strafe.
    pub movement_angle: f32,
    /// Pins move speed to this fraction of the state's cap.
    pub speed_ratio: Option<f32>,
    pub traction_multiplier: f32,
    pub friction_multiplier: f32,
    /// Pull the character back toward the path centerline after moving.
    pub recenter_player: bool,
    pub reset_flags: ResetFlags,
    /// Suppress jump / attack / action transitions while active.
    pub disable_actions: bool,
}

impl Default for LockoutResource {
    fn default() -> Self {
        Self {
            priority: 0,
            duration: 0.0,
            movement_mode: MovementMode::Free,
            space_mode: SpaceMode::Camera,
            movement_angle: 0.0,
            speed_ratio: None,
            traction_multiplier: 1.0,
            friction_multiplier: 1.0,
            recenter_player: false,
            reset_flags: ResetFlags::NONE,
            disable_actions: false,
        }
    }
}

impl LockoutResource {
    pub fn new(priority: i32, duration: f32) -> Self {
        Self {
            priority,
            duration,
            ..Default::default()
        }
    }

    /// Forward-along-the-path boost at a fixed speed ratio.
    pub fn path_boost(priority: i32, duration: f32, speed_ratio: f32) -> Self {
        Self {
            movement_mode: MovementMode::Replace,
            space_mode: SpaceMode::PathFollower,
            speed_ratio: Some(speed_ratio),
            recenter_player: true,
            ..Self::new(priority, duration)
        }
    }

    pub fn with_reset_flags(mut self, flags: ResetFlags) -> Self {
        self.reset_flags = flags;
        self
    }

    pub fn with_recenter(mut self) -> Self {
        self.recenter_player = true;
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn sort_key(&self) -> i32 {
        if self.priority == IMMEDIATE_PRIORITY {
            i32::MAX
        } else {
            self.priority
        }
    }
}

/// Priority-ordered set of lockouts. The last entry is the active one.
#[derive(Debug, Clone, Default)]
pub struct LockoutStack {
    entries: Vec<Arc<LockoutResource>>,
    /// Seconds the current top has been active.
    elapsed: f32,
}

impl LockoutStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The authoritative lockout, if any.
    pub fn active(&self) -> Option<&Arc<LockoutResource>> {
        self.entries.last()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, lockout: &Arc<LockoutResource>) -> bool {
        self.entries.iter().any(|entry| Arc::ptr_eq(entry, lockout))
    }

    /// Add a lockout. Ties go to the newest entry. An immediate lockout
    /// evicts any previous immediate lockout.
    pub fn add(&mut self, lockout: Arc<LockoutResource>) {
        if self.contains(&lockout) {
            return;
        }

        let top = self.active().cloned();

        if lockout.priority == IMMEDIATE_PRIORITY {
            self.entries
                .retain(|entry| entry.priority != IMMEDIATE_PRIORITY);
        }

        self.entries.push(lockout);
        self.entries.sort_by_key(|entry| entry.sort_key());
        self.on_stack_changed(top);
    }

    /// Remove a lockout. Returns whether it was present.
    pub fn remove(&mut self, lockout: &Arc<LockoutResource>) -> bool {
        let top = self.active().cloned();
        let before = self.entries.len();
        self.entries.retain(|entry| !Arc::ptr_eq(entry, lockout));
        let removed = self.entries.len() != before;
        if removed {
            self.on_stack_changed(top);
        }
        removed
    }

    /// Remove every lockout whose reset flags match the event.
    pub fn reset(&mut self, trigger: ResetTrigger) {
        let top = self.active().cloned();
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.reset_flags.matches(trigger));
        if self.entries.len() != before {
            log::debug!(
                "{:?} reset cleared {} lockout(s)",
                trigger,
                before - self.entries.len()
            );
            self.on_stack_changed(top);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.elapsed = 0.0;
    }

    /// Age the active lockout; remove it once its duration has elapsed.
    pub fn update(&mut self, dt: f32) {
        let Some(active) = self.active().cloned() else {
            return;
        };
        if active.duration <= 0.0 {
            return;
        }

        self.elapsed += dt;
        if self.elapsed >= active.duration {
            log::debug!("lockout (priority {}) expired", active.priority);
            self.remove(&active);
        }
    }

    /// Seconds the active lockout has been on top.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn speed_override(&self) -> Option<(f32, &LockoutResource)> {
        let active = self.active()?;
        active.speed_ratio.map(|ratio| (ratio, active.as_ref()))
    }

    pub fn actions_disabled(&self) -> bool {
        self.active().is_some_and(|active| active.disable_actions)
    }

    pub fn wants_recenter(&self) -> bool {
        self.active().is_some_and(|active| active.recenter_player)
    }

    fn on_stack_changed(&mut self, previous_top: Option<Arc<LockoutResource>>) {
        let changed = match (&previous_top, self.active()) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        };
        if changed {
            self.elapsed = 0.0;
            match self.active() {
                Some(top) => log::debug!("lockout active: priority {}", top.priority),
                None => log::debug!("lockout stack empty, control returned"),
            }
        }
    }
}
