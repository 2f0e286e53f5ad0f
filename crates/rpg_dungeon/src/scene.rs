//! Fixed-size cell grids.
//!
//! A [`SpatialScene`] allocates all of its cells once at construction and
//! never resizes. Every region query works on the cells the region covers, so
//! its cost depends on the region size and not on how many entities exist.

use rpg_math::{FloatRect, IVec2, IntRect, UVec2, Vec2, cell_of, to_int_rect, to_int_rect_circle};

use crate::error::SceneError;

/// A `width × height` grid of `C`, stored row by row.
#[derive(Debug, Clone)]
pub struct SpatialScene<C> {
    width: u32,
    height: u32,
    tile_size: UVec2,
    cells: Vec<C>,
}

impl<C: Default> SpatialScene<C> {
    /// Allocate a grid of default cells. `tile_size` is the rendered size of
    /// one cell in pixels.
    #[must_use]
    pub fn new(width: u32, height: u32, tile_size: UVec2) -> Self {
        let count = width as usize * height as usize;
        let mut cells = Vec::with_capacity(count);
        cells.resize_with(count, C::default);
        Self {
            width,
            height,
            tile_size,
            cells,
        }
    }
}

impl<C> SpatialScene<C> {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` in cells.
    #[must_use]
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    #[must_use]
    pub fn tile_size(&self) -> UVec2 {
        self.tile_size
    }

    /// The whole grid as a cell block.
    #[must_use]
    pub fn bounds(&self) -> IntRect {
        IntRect::new(0, 0, self.width as i32, self.height as i32)
    }

    /// Returns `true` if `pos` lies inside the grid.
    #[must_use]
    pub fn has(&self, pos: IVec2) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn slot(&self, pos: IVec2) -> Result<usize, SceneError> {
        if self.has(pos) {
            Ok(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            Err(SceneError::OutOfRange {
                pos,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Borrow the cell at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::OutOfRange`] if `pos` is outside the grid.
    pub fn get(&self, pos: IVec2) -> Result<&C, SceneError> {
        self.slot(pos).map(|slot| &self.cells[slot])
    }

    /// Mutably borrow the cell at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::OutOfRange`] if `pos` is outside the grid.
    pub fn get_mut(&mut self, pos: IVec2) -> Result<&mut C, SceneError> {
        let slot = self.slot(pos)?;
        Ok(&mut self.cells[slot])
    }

    /// Cell block covering a world-space rectangle.
    #[must_use]
    pub fn to_int_rect(&self, rect: &FloatRect) -> IntRect {
        to_int_rect(rect)
    }

    /// Cell block covering a world-space circle.
    #[must_use]
    pub fn to_int_rect_circle(&self, center: Vec2, radius: f32) -> IntRect {
        to_int_rect_circle(center, radius)
    }

    /// Clip a cell block to the grid. The result may be empty.
    #[must_use]
    pub fn clamp_rect(&self, rect: IntRect) -> IntRect {
        rect.intersection(&self.bounds()).unwrap_or_default()
    }

    /// In-bounds cells of a block, row by row.
    pub fn cells_in(&self, rect: IntRect) -> impl Iterator<Item = IVec2> + use<C> {
        self.clamp_rect(rect).cells()
    }

    /// In-bounds cells among the eight neighbours of `pos`.
    pub fn neighbors(&self, pos: IVec2) -> impl Iterator<Item = IVec2> + '_ {
        rpg_math::Direction::ALL
            .into_iter()
            .map(move |d| pos + d.to_vector())
            .filter(|p| self.has(*p))
    }

    /// The cell containing world position `pos`.
    #[must_use]
    pub fn cell_at(&self, pos: Vec2) -> IVec2 {
        cell_of(pos)
    }

    /// Pixel position of a world position, for renderers.
    #[must_use]
    pub fn to_pixel(&self, pos: Vec2) -> Vec2 {
        pos * self.tile_size.as_vec2()
    }

    /// Iterate over every cell with its position, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (IVec2, &C)> {
        let width = self.width.max(1) as usize;
        self.cells.iter().enumerate().map(move |(i, cell)| {
            let pos = IVec2::new((i % width) as i32, (i / width) as i32);
            (pos, cell)
        })
    }
}

/// Cells touched by the segment from `a` to `b`, in order, both end cells
/// included.
///
/// Where the segment passes exactly through a cell corner both side cells are
/// reported before the diagonal one.
#[must_use]
pub fn traverse(a: Vec2, b: Vec2) -> Vec<IVec2> {
    const EPSILON: f32 = 1e-6;

    let mut cell = cell_of(a);
    let end = cell_of(b);
    let mut cells = vec![cell];
    if cell == end {
        return cells;
    }

    let d = b - a;
    let axis = |delta: f32, origin: f32, index: i32| -> (i32, f32, f32) {
        if delta > 0.0 {
            (1, ((index + 1) as f32 - origin) / delta, 1.0 / delta)
        } else if delta < 0.0 {
            (-1, (origin - index as f32) / -delta, -1.0 / delta)
        } else {
            (0, f32::INFINITY, f32::INFINITY)
        }
    };
    let (step_x, mut t_max_x, t_delta_x) = axis(d.x, a.x, cell.x);
    let (step_y, mut t_max_y, t_delta_y) = axis(d.y, a.y, cell.y);

    // every iteration closes at least one cell of manhattan distance
    let budget = (end - cell).abs().element_sum();
    for _ in 0..budget {
        if (t_max_x - t_max_y).abs() < EPSILON && step_x != 0 && step_y != 0 {
            cells.push(cell + IVec2::new(step_x, 0));
            cells.push(cell + IVec2::new(0, step_y));
            cell += IVec2::new(step_x, step_y);
            t_max_x += t_delta_x;
            t_max_y += t_delta_y;
        } else if t_max_x < t_max_y {
            cell.x += step_x;
            t_max_x += t_delta_x;
        } else {
            cell.y += step_y;
            t_max_y += t_delta_y;
        }
        cells.push(cell);
        if cell == end {
            break;
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SpatialScene<u8> {
        SpatialScene::new(10, 8, UVec2::new(32, 32))
    }

    #[test]
    fn test_ten_by_eight_bounds() {
        let scene = grid();
        assert!(scene.has(IVec2::new(5, 7)));
        assert!(!scene.has(IVec2::new(10, 0)));
        assert!(!scene.has(IVec2::new(0, 8)));
        assert!(scene.get(IVec2::new(7, 12)).is_err());
    }

    #[test]
    fn test_has_matches_get_everywhere() {
        let scene = grid();
        for y in -3..12 {
            for x in -3..14 {
                let pos = IVec2::new(x, y);
                let inside = (0..10).contains(&x) && (0..8).contains(&y);
                assert_eq!(scene.has(pos), inside);
                assert_eq!(scene.get(pos).is_ok(), inside);
            }
        }
    }

    #[test]
    fn test_out_of_range_error_reports_position() {
        let scene = grid();
        let err = scene.get(IVec2::new(-1, 3)).unwrap_err();
        assert_eq!(
            err,
            SceneError::OutOfRange {
                pos: IVec2::new(-1, 3),
                width: 10,
                height: 8
            }
        );
        assert!(err.to_string().contains("10x8"));
    }

    #[test]
    fn test_get_mut_writes_the_right_cell() {
        let mut scene = grid();
        *scene.get_mut(IVec2::new(3, 2)).unwrap() = 9;
        assert_eq!(*scene.get(IVec2::new(3, 2)).unwrap(), 9);
        assert_eq!(*scene.get(IVec2::new(2, 3)).unwrap(), 0);
        let (pos, _) = scene.iter().find(|(_, c)| **c == 9).unwrap();
        assert_eq!(pos, IVec2::new(3, 2));
    }

    #[test]
    fn test_cells_in_clips_to_grid() {
        let scene = grid();
        let cells: Vec<IVec2> = scene.cells_in(IntRect::new(8, 6, 5, 5)).collect();
        assert_eq!(
            cells,
            vec![
                IVec2::new(8, 6),
                IVec2::new(9, 6),
                IVec2::new(8, 7),
                IVec2::new(9, 7)
            ]
        );
        assert_eq!(scene.cells_in(IntRect::new(20, 20, 2, 2)).count(), 0);
    }

    #[test]
    fn test_neighbors_at_corner() {
        let scene = grid();
        let mut around: Vec<IVec2> = scene.neighbors(IVec2::ZERO).collect();
        around.sort_by_key(|p| (p.y, p.x));
        assert_eq!(
            around,
            vec![IVec2::new(1, 0), IVec2::new(0, 1), IVec2::new(1, 1)]
        );
        assert_eq!(scene.neighbors(IVec2::new(4, 4)).count(), 8);
    }

    #[test]
    fn test_to_pixel_uses_tile_size() {
        let scene = grid();
        assert_eq!(scene.to_pixel(Vec2::new(1.5, 2.0)), Vec2::new(48.0, 64.0));
    }

    #[test]
    fn test_traverse_straight_and_diagonal() {
        let cells = traverse(Vec2::new(0.5, 0.5), Vec2::new(3.5, 0.5));
        assert_eq!(
            cells,
            vec![
                IVec2::new(0, 0),
                IVec2::new(1, 0),
                IVec2::new(2, 0),
                IVec2::new(3, 0)
            ]
        );

        let cells = traverse(Vec2::new(0.2, 0.5), Vec2::new(2.7, 1.6));
        assert_eq!(cells.first(), Some(&IVec2::new(0, 0)));
        assert_eq!(cells.last(), Some(&IVec2::new(2, 1)));
        // consecutive cells always share an edge
        for pair in cells.windows(2) {
            assert_eq!((pair[1] - pair[0]).abs().element_sum(), 1);
        }
    }

    #[test]
    fn test_traverse_through_corner_touches_both_sides() {
        let cells = traverse(Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5));
        assert_eq!(
            cells,
            vec![
                IVec2::new(0, 0),
                IVec2::new(1, 0),
                IVec2::new(0, 1),
                IVec2::new(1, 1)
            ]
        );
    }

    #[test]
    fn test_traverse_same_cell() {
        assert_eq!(
            traverse(Vec2::new(4.1, 4.1), Vec2::new(4.9, 4.8)),
            vec![IVec2::new(4, 4)]
        );
    }
}
