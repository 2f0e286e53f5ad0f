//! Dungeon scenes and their container.

use std::ops::{Index, IndexMut};

use rpg_component::{ObjectId, SceneId};
use rpg_math::{IVec2, IntRect, UVec2, Vec2};
use tracing::{debug, trace};

use crate::cell::{Cell, Terrain};
use crate::error::SceneError;
use crate::scene::{SpatialScene, traverse};
use crate::trigger::Trigger;

/// One dungeon instance: a grid of [`Cell`]s plus the bookkeeping needed to
/// age its timed triggers.
#[derive(Debug, Clone)]
pub struct Dungeon {
    id: SceneId,
    grid: SpatialScene<Cell>,
    /// Cells holding a timed trigger.
    timed: Vec<IVec2>,
}

impl Dungeon {
    /// Create a dungeon where every cell is [`Terrain::Void`].
    #[must_use]
    pub fn new(id: SceneId, width: u32, height: u32, tile_size: UVec2) -> Self {
        Self {
            id,
            grid: SpatialScene::new(width, height, tile_size),
            timed: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SceneId {
        self.id
    }

    #[must_use]
    pub fn grid(&self) -> &SpatialScene<Cell> {
        &self.grid
    }

    /// Direct cell access. Triggers placed through this handle do not age;
    /// use [`set_trigger`](Self::set_trigger) for timed ones.
    pub fn grid_mut(&mut self) -> &mut SpatialScene<Cell> {
        &mut self.grid
    }

    /// Returns `true` if `pos` is inside the grid and its terrain is floor.
    #[must_use]
    pub fn is_walkable(&self, pos: IVec2) -> bool {
        self.grid.get(pos).is_ok_and(Cell::is_walkable)
    }

    /// Returns `true` if `pos` is inside the grid and sight passes through.
    #[must_use]
    pub fn is_transparent(&self, pos: IVec2) -> bool {
        self.grid.get(pos).is_ok_and(Cell::is_transparent)
    }

    /// # Errors
    ///
    /// Returns [`SceneError::OutOfRange`] if `pos` is outside the grid.
    pub fn set_terrain(&mut self, pos: IVec2, terrain: Terrain) -> Result<(), SceneError> {
        self.grid.get_mut(pos)?.terrain = terrain;
        Ok(())
    }

    /// Set the terrain of every in-bounds cell of `rect`.
    pub fn fill(&mut self, rect: IntRect, terrain: Terrain) {
        for pos in self.grid.cells_in(rect) {
            if let Ok(cell) = self.grid.get_mut(pos) {
                cell.terrain = terrain;
            }
        }
    }

    // ── Occupancy ───────────────────────────────────────────────────────────

    /// Record that `id` stands in `pos`. Placing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::OutOfRange`] if `pos` is outside the grid.
    pub fn place(&mut self, id: ObjectId, pos: IVec2) -> Result<(), SceneError> {
        let cell = self.grid.get_mut(pos)?;
        if !cell.entities.contains(&id) {
            cell.entities.push(id);
        }
        Ok(())
    }

    /// Remove `id` from `pos`. Returns `false` if it was not there.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::OutOfRange`] if `pos` is outside the grid.
    pub fn remove(&mut self, id: ObjectId, pos: IVec2) -> Result<bool, SceneError> {
        let cell = self.grid.get_mut(pos)?;
        let found = cell.entities.iter().position(|e| *e == id);
        if let Some(index) = found {
            cell.entities.remove(index);
        }
        Ok(found.is_some())
    }

    /// Move `id` from one cell to another. Nothing changes if either cell is
    /// out of range.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::OutOfRange`] for the first position outside the
    /// grid.
    pub fn move_entity(&mut self, id: ObjectId, from: IVec2, to: IVec2) -> Result<(), SceneError> {
        self.grid.get(from)?;
        self.grid.get(to)?;
        if from == to {
            return self.place(id, to);
        }
        self.remove(id, from)?;
        self.place(id, to)?;
        trace!(scene = %self.id, entity = %id, ?from, ?to, "entity moved");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SceneError::OutOfRange`] if `pos` is outside the grid.
    pub fn entities_at(&self, pos: IVec2) -> Result<&[ObjectId], SceneError> {
        self.grid.get(pos).map(|cell| cell.entities.as_slice())
    }

    /// Every entity standing in the in-bounds part of `rect`.
    #[must_use]
    pub fn entities_in(&self, rect: IntRect) -> Vec<ObjectId> {
        let mut found = Vec::new();
        for pos in self.grid.cells_in(rect) {
            if let Ok(cell) = self.grid.get(pos) {
                found.extend_from_slice(&cell.entities);
            }
        }
        found
    }

    /// Returns `true` if no opaque or out-of-range cell lies on the segment
    /// between the two world positions. The end cells are not checked.
    #[must_use]
    pub fn has_line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        let cells = traverse(from, to);
        match cells.as_slice() {
            [_, between @ .., _] => between.iter().all(|pos| self.is_transparent(*pos)),
            _ => true,
        }
    }

    // ── Triggers ────────────────────────────────────────────────────────────

    /// Install a trigger, returning the one it replaces.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::OutOfRange`] if `pos` is outside the grid.
    pub fn set_trigger(&mut self, pos: IVec2, trigger: Trigger) -> Result<Option<Trigger>, SceneError> {
        let cell = self.grid.get_mut(pos)?;
        let previous = cell.trigger.replace(trigger);
        if trigger.is_timed() && !self.timed.contains(&pos) {
            self.timed.push(pos);
        }
        Ok(previous)
    }

    /// Remove and return the trigger of `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::OutOfRange`] if `pos` is outside the grid.
    pub fn take_trigger(&mut self, pos: IVec2) -> Result<Option<Trigger>, SceneError> {
        let taken = self.grid.get_mut(pos)?.trigger.take();
        self.timed.retain(|p| *p != pos);
        Ok(taken)
    }

    /// # Errors
    ///
    /// Returns [`SceneError::OutOfRange`] if `pos` is outside the grid.
    pub fn trigger_mut(&mut self, pos: IVec2) -> Result<Option<&mut Trigger>, SceneError> {
        Ok(self.grid.get_mut(pos)?.trigger.as_mut())
    }

    /// Age every timed trigger and drop the ones that expired. Returns how
    /// many were dropped.
    pub fn tick_triggers(&mut self, elapsed_ms: u32) -> usize {
        let mut expired = 0;
        let grid = &mut self.grid;
        self.timed.retain(|pos| {
            let Ok(cell) = grid.get_mut(*pos) else {
                return false;
            };
            match cell.trigger.as_mut() {
                Some(trigger) if trigger.is_timed() => {
                    trigger.tick(elapsed_ms);
                    if trigger.is_expired() {
                        cell.trigger = None;
                        expired += 1;
                        false
                    } else {
                        true
                    }
                }
                _ => false,
            }
        });
        if expired > 0 {
            debug!(scene = %self.id, expired, "timed triggers expired");
        }
        expired
    }
}

/// All dungeon instances, addressed by 1-based [`SceneId`].
#[derive(Debug, Clone, Default)]
pub struct DungeonSystem {
    dungeons: Vec<Dungeon>,
}

impl DungeonSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new all-void dungeon and return its id.
    pub fn create(&mut self, width: u32, height: u32, tile_size: UVec2) -> SceneId {
        let id = SceneId(self.dungeons.len() as u32 + 1);
        self.dungeons.push(Dungeon::new(id, width, height, tile_size));
        debug!(scene = %id, width, height, "dungeon created");
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dungeons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dungeons.is_empty()
    }

    /// Returns `true` if `id` addresses an existing dungeon.
    #[must_use]
    pub fn has(&self, id: SceneId) -> bool {
        id.is_valid() && (id.0 as usize) <= self.dungeons.len()
    }

    #[must_use]
    pub fn get(&self, id: SceneId) -> Option<&Dungeon> {
        if self.has(id) {
            self.dungeons.get(id.index())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: SceneId) -> Option<&mut Dungeon> {
        if self.has(id) {
            self.dungeons.get_mut(id.index())
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dungeon> {
        self.dungeons.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Dungeon> {
        self.dungeons.iter_mut()
    }

    fn checked_index(&self, id: SceneId) -> usize {
        assert!(
            self.has(id),
            "{id} out of range 1..={}",
            self.dungeons.len()
        );
        id.index()
    }
}

impl Index<SceneId> for DungeonSystem {
    type Output = Dungeon;

    fn index(&self, id: SceneId) -> &Dungeon {
        &self.dungeons[self.checked_index(id)]
    }
}

impl IndexMut<SceneId> for DungeonSystem {
    fn index_mut(&mut self, id: SceneId) -> &mut Dungeon {
        let index = self.checked_index(id);
        &mut self.dungeons[index]
    }
}
