//! Grid navigation.
//!
//! [`RegionMap`] clusters walkable cells into connected regions so that
//! unreachable goals are rejected without a search. [`find_path`] runs an
//! 8-way A* over the walkable cells of one dungeon.
//!
//! Diagonal steps are only allowed when both orthogonal neighbours are
//! walkable, so every diagonal move is also reachable orthogonally and
//! 4-connected regions describe reachability exactly.

use rpg_algo::{PriorityQueue, UnionFind};
use rpg_math::{Direction, IVec2};
use tracing::debug;

use crate::dungeon::Dungeon;

const STRAIGHT_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

/// Connected walkable regions of a dungeon.
#[derive(Debug, Clone)]
pub struct RegionMap {
    width: u32,
    height: u32,
    labels: Vec<Option<u32>>,
    count: usize,
}

impl RegionMap {
    /// Label every walkable cell of `dungeon` with its region.
    #[must_use]
    pub fn build(dungeon: &Dungeon) -> Self {
        let width = dungeon.grid().width();
        let height = dungeon.grid().height();
        let slot = |x: u32, y: u32| (y * width + x) as usize;
        let walkable = |x: u32, y: u32| dungeon.is_walkable(IVec2::new(x as i32, y as i32));

        let mut sets = UnionFind::new(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                if !walkable(x, y) {
                    continue;
                }
                if x + 1 < width && walkable(x + 1, y) {
                    sets.union(slot(x, y), slot(x + 1, y));
                }
                if y + 1 < height && walkable(x, y + 1) {
                    sets.union(slot(x, y), slot(x, y + 1));
                }
            }
        }

        // compact the roots into 0..count
        let mut roots: Vec<Option<u32>> = vec![None; sets.len()];
        let mut labels = vec![None; sets.len()];
        let mut count = 0;
        for y in 0..height {
            for x in 0..width {
                if !walkable(x, y) {
                    continue;
                }
                let root = sets.find(slot(x, y));
                let label = *roots[root].get_or_insert_with(|| {
                    count += 1;
                    count as u32 - 1
                });
                labels[slot(x, y)] = Some(label);
            }
        }

        Self {
            width,
            height,
            labels,
            count,
        }
    }

    /// Number of regions.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.count
    }

    /// Region label of `pos`, or `None` if it is not walkable.
    #[must_use]
    pub fn region(&self, pos: IVec2) -> Option<u32> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return None;
        }
        self.labels[pos.y as usize * self.width as usize + pos.x as usize]
    }

    /// Returns `true` if a walk between `a` and `b` exists.
    #[must_use]
    pub fn same_region(&self, a: IVec2, b: IVec2) -> bool {
        matches!((self.region(a), self.region(b)), (Some(ra), Some(rb)) if ra == rb)
    }
}

/// A dungeon's region map, kept for repeated path queries.
///
/// Call [`refresh`](Self::refresh) after changing terrain.
#[derive(Debug, Clone)]
pub struct Navigator {
    regions: RegionMap,
}

impl Navigator {
    #[must_use]
    pub fn new(dungeon: &Dungeon) -> Self {
        Self {
            regions: RegionMap::build(dungeon),
        }
    }

    pub fn refresh(&mut self, dungeon: &Dungeon) {
        self.regions = RegionMap::build(dungeon);
    }

    #[must_use]
    pub fn regions(&self) -> &RegionMap {
        &self.regions
    }

    /// Like [`find_path`], but disconnected endpoints fail without searching.
    #[must_use]
    pub fn find_path(
        &self,
        dungeon: &Dungeon,
        start: IVec2,
        goal: IVec2,
        max_expansions: usize,
    ) -> Option<Vec<IVec2>> {
        if !self.regions.same_region(start, goal) {
            debug!(scene = %dungeon.id(), ?start, ?goal, "no path: disconnected regions");
            return None;
        }
        find_path(dungeon, start, goal, max_expansions)
    }
}

fn octile(a: IVec2, b: IVec2) -> u32 {
    let d = (a - b).abs();
    let (lo, hi) = (d.x.min(d.y) as u32, d.x.max(d.y) as u32);
    STRAIGHT_COST * hi + (DIAGONAL_COST - STRAIGHT_COST) * lo
}

/// Shortest 8-way path from `start` to `goal`, both included.
///
/// Returns `None` if either end is not walkable, no path exists, or the
/// search expands more than `max_expansions` cells.
#[must_use]
pub fn find_path(dungeon: &Dungeon, start: IVec2, goal: IVec2, max_expansions: usize) -> Option<Vec<IVec2>> {
    if !dungeon.is_walkable(start) || !dungeon.is_walkable(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let width = dungeon.grid().width() as usize;
    let count = width * dungeon.grid().height() as usize;
    let slot = |pos: IVec2| pos.y as usize * width + pos.x as usize;

    let mut cost = vec![u32::MAX; count];
    let mut came_from: Vec<Option<IVec2>> = vec![None; count];
    let mut closed = vec![false; count];
    let mut open = PriorityQueue::new();

    cost[slot(start)] = 0;
    open.push(start, octile(start, goal));
    let mut expansions = 0;

    while let Some((pos, _)) = open.pop() {
        if closed[slot(pos)] {
            continue;
        }
        if pos == goal {
            let mut path = vec![goal];
            let mut cursor = goal;
            while let Some(prev) = came_from[slot(cursor)] {
                path.push(prev);
                cursor = prev;
            }
            path.reverse();
            return Some(path);
        }
        closed[slot(pos)] = true;
        expansions += 1;
        if expansions > max_expansions {
            debug!(scene = %dungeon.id(), ?start, ?goal, max_expansions, "no path: search budget exhausted");
            return None;
        }

        for dir in Direction::ALL {
            let step = dir.to_vector();
            let next = pos + step;
            if !dungeon.is_walkable(next) || closed[slot(next)] {
                continue;
            }
            let step_cost = if dir.is_diagonal() {
                let side_a = pos + IVec2::new(step.x, 0);
                let side_b = pos + IVec2::new(0, step.y);
                if !dungeon.is_walkable(side_a) || !dungeon.is_walkable(side_b) {
                    continue;
                }
                DIAGONAL_COST
            } else {
                STRAIGHT_COST
            };
            let tentative = cost[slot(pos)] + step_cost;
            if tentative < cost[slot(next)] {
                cost[slot(next)] = tentative;
                came_from[slot(next)] = Some(pos);
                open.push(next, tentative + octile(next, goal));
            }
        }
    }

    debug!(scene = %dungeon.id(), ?start, ?goal, "no path");
    None
}
