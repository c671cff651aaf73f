//! Content and surface flags for collision filtering.
//!
//! Content flags decide what a ray can hit at all. Surface flags are the
//! gameplay tags the solver reads off whatever was hit ("is this a floor",
//! "is this a crusher").

use serde::{Deserialize, Serialize};

/// Content flags describe what type of volume a brush is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ContentFlags(pub u32);

impl ContentFlags {
    /// Empty space - nothing here.
    pub const EMPTY: Self = Self(0);

    /// Solid level geometry.
    pub const SOLID: Self = Self(1 << 0);

    /// Blocks the character but not line-of-sight queries.
    pub const PLAYER_CLIP: Self = Self(1 << 1);

    /// Blocks line-of-sight but not the character (glass, grates).
    pub const SIGHT_CLIP: Self = Self(1 << 2);

    /// Mask for character probes.
    pub const MASK_CHARACTER: Self = Self(Self::SOLID.0 | Self::PLAYER_CLIP.0);

    /// Mask for visibility / obstruction rays.
    pub const MASK_SIGHT: Self = Self(Self::SOLID.0 | Self::SIGHT_CLIP.0);

    /// Check if these flags contain a specific flag.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any of the given flags are set.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl std::ops::BitOr for ContentFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Surface tags the solver keys its decisions on.
///
/// A brush can carry several tags: a box that is both walkable on top and a
/// wall on its sides is `FLOOR | WALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SurfaceFlags(pub u32);

impl SurfaceFlags {
    /// No special properties.
    pub const NONE: Self = Self(0);

    /// The character may stand on this surface.
    pub const FLOOR: Self = Self(1 << 0);

    /// Blocks horizontal travel.
    pub const WALL: Self = Self(1 << 1);

    /// Blocks upward travel.
    pub const CEILING: Self = Self(1 << 2);

    /// Knocks the character back when pressing down on a grounded character.
    pub const CRUSHER: Self = Self(1 << 3);

    /// Standard level geometry: floor, wall and ceiling at once.
    pub const TERRAIN: Self = Self(Self::FLOOR.0 | Self::WALL.0 | Self::CEILING.0);

    /// Check if these flags contain a specific flag.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn is_floor(self) -> bool {
        self.contains(Self::FLOOR)
    }

    #[inline]
    pub fn is_wall(self) -> bool {
        self.contains(Self::WALL)
    }

    #[inline]
    pub fn is_ceiling(self) -> bool {
        self.contains(Self::CEILING)
    }

    #[inline]
    pub fn is_crusher(self) -> bool {
        self.contains(Self::CRUSHER)
    }
}

impl std::ops::BitOr for SurfaceFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_masks() {
        let mask = ContentFlags::MASK_CHARACTER;
        assert!(mask.contains(ContentFlags::SOLID));
        assert!(mask.contains(ContentFlags::PLAYER_CLIP));
        assert!(!mask.intersects(ContentFlags::SIGHT_CLIP));
        assert!(ContentFlags::MASK_SIGHT.intersects(ContentFlags::SIGHT_CLIP));
    }

    #[test]
    fn test_terrain_is_every_solver_tag() {
        let terrain = SurfaceFlags::TERRAIN;
        assert!(terrain.is_floor());
        assert!(terrain.is_wall());
        assert!(terrain.is_ceiling());
        assert!(!terrain.is_crusher());
        assert!((SurfaceFlags::CEILING | SurfaceFlags::CRUSHER).is_crusher());
    }
}
