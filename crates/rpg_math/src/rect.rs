//! World-space and cell-space rectangles.
//!
//! [`FloatRect`] describes a region in world units, [`IntRect`] a block of
//! grid cells. [`to_int_rect`] converts the former into the latter for
//! broad-phase grid queries: the minimum corner is floored and the maximum
//! corner ceiled, so the cell block always covers the input region.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FloatRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl FloatRect {
    #[must_use]
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Bounding box of the circle around `center`. Negative radii count as zero.
    #[must_use]
    pub fn from_circle(center: Vec2, radius: f32) -> Self {
        let radius = radius.max(0.0);
        Self {
            left: center.x - radius,
            top: center.y - radius,
            width: 2.0 * radius,
            height: 2.0 * radius,
        }
    }

    /// Bounding box of two points.
    #[must_use]
    pub fn spanning(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Grow the rectangle by `margin` on every side.
    #[must_use]
    pub fn inflated(&self, margin: f32) -> Self {
        Self::new(
            self.left - margin,
            self.top - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Boundary-inclusive point test.
    #[must_use]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.left && p.x <= self.right() && p.y >= self.top && p.y <= self.bottom()
    }
}

/// A block of grid cells: `left..left + width` by `top..top + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl IntRect {
    #[must_use]
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// One past the last column.
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.left + self.width
    }

    /// One past the last row.
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.top + self.height
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Returns `true` if the cell `pos` lies inside the block.
    #[must_use]
    pub const fn contains(&self, pos: IVec2) -> bool {
        pos.x >= self.left && pos.x < self.right() && pos.y >= self.top && pos.y < self.bottom()
    }

    /// Returns `true` if the block's continuous extent covers `rect`,
    /// boundary inclusive.
    #[must_use]
    pub fn covers(&self, rect: &FloatRect) -> bool {
        self.left as f32 <= rect.left
            && self.top as f32 <= rect.top
            && self.right() as f32 >= rect.right()
            && self.bottom() as f32 >= rect.bottom()
    }

    /// Overlapping block, or `None` if the blocks are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &IntRect) -> Option<IntRect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (left < right && top < bottom).then(|| IntRect::new(left, top, right - left, bottom - top))
    }

    /// Iterate over the cells of the block, row by row.
    pub fn cells(&self) -> impl Iterator<Item = IVec2> + use<> {
        let (left, right) = (self.left, self.right());
        (self.top..self.bottom()).flat_map(move |y| (left..right).map(move |x| IVec2::new(x, y)))
    }
}

/// Smallest cell block covering `rect`.
#[must_use]
pub fn to_int_rect(rect: &FloatRect) -> IntRect {
    let left = rect.left.floor() as i32;
    let top = rect.top.floor() as i32;
    let right = rect.right().ceil() as i32;
    let bottom = rect.bottom().ceil() as i32;
    IntRect::new(left, top, right - left, bottom - top)
}

/// Smallest cell block covering the circle of `radius` around `center`.
#[must_use]
pub fn to_int_rect_circle(center: Vec2, radius: f32) -> IntRect {
    to_int_rect(&FloatRect::from_circle(center, radius))
}

/// The cell containing world position `pos`.
#[must_use]
pub fn cell_of(pos: Vec2) -> IVec2 {
    pos.floor().as_ivec2()
}

/// World position of the centre of cell `pos`.
#[must_use]
pub fn cell_center(pos: IVec2) -> Vec2 {
    pos.as_vec2() + Vec2::splat(0.5)
}
