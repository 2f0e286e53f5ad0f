//! Contents of a single grid cell.

use rpg_component::ObjectId;
use rpg_math::Vec2;
use serde::{Deserialize, Serialize};

use crate::trigger::Trigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    /// Outside the level. Not walkable and blocks sight.
    #[default]
    Void,
    Floor,
    Wall,
}

/// Renderable tile descriptor. The simulation never looks inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TileSprite {
    pub sheet: u16,
    pub frame: u16,
}

/// A purely visual object drawn on top of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Decoration {
    pub sprite: TileSprite,
    /// Offset from the cell's top-left corner, in cells.
    pub offset: Vec2,
}

/// One grid location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub terrain: Terrain,
    pub tile: TileSprite,
    pub trigger: Option<Trigger>,
    pub decorations: Vec<Decoration>,
    /// Entities whose position lies in this cell.
    pub entities: Vec<ObjectId>,
}

impl Cell {
    #[must_use]
    pub fn floor() -> Self {
        Self {
            terrain: Terrain::Floor,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn wall() -> Self {
        Self {
            terrain: Terrain::Wall,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_walkable(&self) -> bool {
        self.terrain == Terrain::Floor
    }

    /// Returns `true` if sight passes through this cell.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.terrain == Terrain::Floor
    }
}
