//! Object and scene identifiers, and the id allocator.
//!
//! An [`ObjectId`] is a lightweight `u64` identifier with no inherent data.
//! All object ids are handed out by an [`IdManager`], which guarantees that no
//! id is live twice at the same time.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// A unique simulated-object identifier.
///
/// Objects are pure identifiers. Components are attached to them to give
/// them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl ObjectId {
    /// The null / invalid object sentinel.
    pub const INVALID: ObjectId = ObjectId(0);

    /// Create an object id from a raw `u64` identifier.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) object.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Object({})", self.0)
    }
}

/// Identifier of one dungeon instance. Scene ids are 1-based; `0` is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SceneId(pub u32);

impl SceneId {
    /// The null / invalid scene sentinel.
    pub const INVALID: SceneId = SceneId(0);

    /// Returns `true` if this is a valid (non-zero) scene.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Zero-based slot of this scene inside its owning collection.
    ///
    /// # Panics
    ///
    /// Panics on [`SceneId::INVALID`].
    #[must_use]
    pub fn index(self) -> usize {
        assert!(self.is_valid(), "invalid scene id");
        self.0 as usize - 1
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Scene({})", self.0)
    }
}

/// Allocates and recycles object ids.
///
/// Fresh ids come from a monotonically growing high-water mark. Released ids
/// go to the back of a FIFO free list and are handed out again only once all
/// ids released before them have been reused.
#[derive(Debug)]
pub struct IdManager {
    next_id: u64,
    free: VecDeque<ObjectId>,
    live: Vec<bool>,
    live_count: usize,
}

impl IdManager {
    /// Creates a new manager. Ids start at 1 (0 is reserved for [`ObjectId::INVALID`]).
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            free: VecDeque::new(),
            // slot 0 stands for INVALID and is never live
            live: vec![false],
            live_count: 0,
        }
    }

    /// Returns an unused id and marks it live.
    pub fn acquire(&mut self) -> ObjectId {
        let id = match self.free.pop_front() {
            Some(id) => id,
            None => {
                let id = ObjectId(self.next_id);
                self.next_id += 1;
                self.live.push(false);
                id
            }
        };
        self.live[id.0 as usize] = true;
        self.live_count += 1;
        id
    }

    /// Marks a live id as free for future reuse.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not currently live.
    pub fn release(&mut self, id: ObjectId) {
        assert!(self.has(id), "cannot release {id}: id is not live");
        self.live[id.0 as usize] = false;
        self.live_count -= 1;
        self.free.push_back(id);
    }

    /// Returns `true` if `id` is currently live.
    #[must_use]
    pub fn has(&self, id: ObjectId) -> bool {
        self.live.get(id.0 as usize).copied().unwrap_or(false)
    }

    /// Returns the number of live ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns `true` if no id is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Returns the highest id ever handed out.
    #[must_use]
    pub fn high_water_mark(&self) -> u64 {
        self.next_id - 1
    }
}

impl Default for IdManager {
    fn default() -> Self {
        Self::new()
    }
}
