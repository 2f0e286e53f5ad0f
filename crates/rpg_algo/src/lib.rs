//! # rpg_algo
//!
//! Generic data structures used by navigation and clustering:
//!
//! - [`PriorityQueue`]: min-priority queue with FIFO tie-breaking.
//! - [`UnionFind`]: disjoint sets with path compression and union by rank.

pub mod priority_queue;
pub mod union_find;

pub use priority_queue::PriorityQueue;
pub use union_find::UnionFind;
