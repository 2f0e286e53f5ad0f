//! # rpg_dungeon
//!
//! World partitioning for the dungeon simulation.
//!
//! This crate provides:
//!
//! - [`SpatialScene`]: a fixed-size 2D grid with bounds-checked cell access
//!   and world/cell rectangle conversion for broad-phase queries.
//! - [`Cell`]: terrain, tile, trigger, decorations and occupancy of one
//!   grid location.
//! - [`Trigger`]: the closed set of cell behaviours.
//! - [`Dungeon`] / [`DungeonSystem`]: scene instances addressed by
//!   [`SceneId`](rpg_component::SceneId).
//! - [`navigation`]: region clustering and A* pathfinding over a dungeon.
//! - [`SceneError`]: the recoverable out-of-range error.

pub mod cell;
pub mod dungeon;
pub mod error;
pub mod navigation;
pub mod scene;
pub mod trigger;

pub use cell::{Cell, Decoration, Terrain, TileSprite};
pub use dungeon::{Dungeon, DungeonSystem};
pub use error::SceneError;
pub use navigation::{Navigator, RegionMap, find_path};
pub use scene::{SpatialScene, traverse};
pub use trigger::Trigger;
