//! Ground material classification for footstep and trail effects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Effect class of a floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroundType {
    #[default]
    Default,
    Grass,
    Stone,
    Metal,
    Wood,
    Water,
    Sand,
}

/// Material name to [`GroundType`] table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroundTypeTable {
    materials: HashMap<String, GroundType>,
}

impl Default for GroundTypeTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert("grass", GroundType::Grass);
        table.insert("stone", GroundType::Stone);
        table.insert("concrete", GroundType::Stone);
        table.insert("metal", GroundType::Metal);
        table.insert("wood", GroundType::Wood);
        table.insert("water", GroundType::Water);
        table.insert("sand", GroundType::Sand);
        table
    }
}

impl GroundTypeTable {
    pub fn empty() -> Self {
        Self {
            materials: HashMap::new(),
        }
    }

    pub fn insert(&mut self, material: &str, ground: GroundType) {
        self.materials.insert(material.to_string(), ground);
    }

    /// Classify a brush material. Untagged brushes are `Default` silently,
    /// unknown names warn and fall back to `Default`.
    pub fn classify(&self, material: Option<&str>) -> GroundType {
        let Some(material) = material.filter(|m| !m.is_empty()) else {
            return GroundType::Default;
        };
        match self.materials.get(material) {
            Some(ground) => *ground,
            None => {
                log::warn!("ground material '{}' not in table, using default", material);
                GroundType::Default
            }
        }
    }
}
