//! Min-priority queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Entry<T, P> {
    priority: P,
    seq: u64,
    item: T,
}

impl<T, P: Ord> PartialEq for Entry<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T, P: Ord> Eq for Entry<T, P> {}

impl<T, P: Ord> PartialOrd for Entry<T, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, P: Ord> Ord for Entry<T, P> {
    // BinaryHeap is a max-heap: reverse both keys so the lowest priority and
    // the oldest entry come out first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A queue that pops the item with the lowest priority first. Items with
/// equal priority pop in insertion order.
#[derive(Debug)]
pub struct PriorityQueue<T, P> {
    heap: BinaryHeap<Entry<T, P>>,
    next_seq: u64,
}

impl<T, P: Ord> PriorityQueue<T, P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, item: T, priority: P) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            priority,
            seq,
            item,
        });
    }

    /// Remove and return the item with the lowest priority.
    pub fn pop(&mut self) -> Option<(T, P)> {
        self.heap.pop().map(|e| (e.item, e.priority))
    }

    /// The item that [`pop`](Self::pop) would return next.
    #[must_use]
    pub fn peek(&self) -> Option<(&T, &P)> {
        self.heap.peek().map(|e| (&e.item, &e.priority))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<T, P: Ord> Default for PriorityQueue<T, P> {
    fn default() -> Self {
        Self::new()
    }
}
