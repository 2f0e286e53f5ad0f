//! # rpg_math
//!
//! Math types for the dungeon simulation. Re-exports [`glam`] for vector
//! algebra and defines the grid-specific types: world/cell rectangles and the
//! eight compass directions.
//!
//! World positions are measured in cell units: cell `(x, y)` covers
//! `[x, x + 1) × [y, y + 1)` and its centre is `(x + 0.5, y + 0.5)`. The `y`
//! axis points south.

pub mod direction;
pub mod rect;

// Re-export glam types for convenience.
pub use glam::{IVec2, UVec2, Vec2};

pub use direction::{Direction, fix_direction, rotate, try_rotate};
pub use rect::{FloatRect, IntRect, cell_center, cell_of, to_int_rect, to_int_rect_circle};
