//! The eight compass directions.
//!
//! Move and look vectors in the simulation are always one of the eight
//! compass vectors (components in `-1..=1`, not both zero) or zero for
//! "none". [`rotate`] only accepts compass vectors; [`fix_direction`] snaps
//! arbitrary input onto one first.

use glam::{IVec2, Vec2};
use rpg_component::EnumIndex;
use serde::{Deserialize, Serialize};

/// A compass direction, in clockwise order starting at north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// All directions, clockwise from north.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// The unit grid step of this direction (`y` points south).
    #[must_use]
    pub const fn to_vector(self) -> IVec2 {
        match self {
            Direction::North => IVec2::new(0, -1),
            Direction::NorthEast => IVec2::new(1, -1),
            Direction::East => IVec2::new(1, 0),
            Direction::SouthEast => IVec2::new(1, 1),
            Direction::South => IVec2::new(0, 1),
            Direction::SouthWest => IVec2::new(-1, 1),
            Direction::West => IVec2::new(-1, 0),
            Direction::NorthWest => IVec2::new(-1, -1),
        }
    }

    /// The direction whose vector is exactly `v`.
    #[must_use]
    pub fn from_vector(v: IVec2) -> Option<Direction> {
        Self::ALL.into_iter().find(|d| d.to_vector() == v)
    }

    /// The neighbouring direction, clockwise or counter-clockwise.
    #[must_use]
    pub const fn rotated(self, clockwise: bool) -> Direction {
        let step = if clockwise { 1 } else { 7 };
        Self::ALL[(self as usize + step) % 8]
    }

    #[must_use]
    pub const fn opposite(self) -> Direction {
        Self::ALL[(self as usize + 4) % 8]
    }

    /// Returns `true` for the four diagonal directions.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        (self as usize) % 2 == 1
    }
}

impl EnumIndex for Direction {
    const COUNT: usize = 8;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Rotate a compass vector by 45 degrees.
///
/// # Panics
///
/// Panics if `v` is not one of the eight compass vectors.
#[must_use]
pub fn rotate(v: IVec2, clockwise: bool) -> IVec2 {
    match try_rotate(v, clockwise) {
        Some(rotated) => rotated,
        None => panic!("cannot rotate {v}: not a compass vector"),
    }
}

/// Rotate a compass vector by 45 degrees, or `None` for any other vector.
#[must_use]
pub fn try_rotate(v: IVec2, clockwise: bool) -> Option<IVec2> {
    Direction::from_vector(v).map(|d| d.rotated(clockwise).to_vector())
}

/// Snap `v` onto the nearest compass vector. Zero (and non-finite input)
/// maps to zero.
#[must_use]
pub fn fix_direction(v: Vec2) -> IVec2 {
    if v == Vec2::ZERO || !v.is_finite() {
        return IVec2::ZERO;
    }
    // octants counted clockwise from east, since y points south
    const BY_OCTANT: [Direction; 8] = [
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
        Direction::North,
        Direction::NorthEast,
    ];
    let octant = (v.y.atan2(v.x) / std::f32::consts::FRAC_PI_4).round() as i32;
    BY_OCTANT[octant.rem_euclid(8) as usize].to_vector()
}
