//! Core [`Component`] trait and the per-type [`ComponentManager`].
//!
//! Every piece of per-object state in the simulation implements [`Component`].
//! A [`ComponentManager`] owns all records of one component type and keeps at
//! most one record per [`ObjectId`].
//!
//! Contract violations (acquiring twice, touching an absent record) are
//! programming errors and panic. Use [`ComponentManager::get`] when absence
//! is an expected outcome.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use crate::entity::ObjectId;

/// The core component trait.
///
/// Each record carries a back-reference to its owning object; the manager
/// sets it when the record is acquired.
///
/// # Examples
///
/// ```rust
/// use rpg_component::{Component, ComponentManager, ObjectId};
///
/// #[derive(Debug, Default)]
/// struct Health {
///     id: ObjectId,
///     current: u32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
///     fn object_id(&self) -> ObjectId { self.id }
///     fn set_object_id(&mut self, id: ObjectId) { self.id = id }
/// }
///
/// let mut health = ComponentManager::<Health>::new();
/// health.acquire(ObjectId(1)).current = 10;
/// assert_eq!(health[ObjectId(1)].current, 10);
/// ```
pub trait Component: Default + 'static {
    /// A human-readable name for this component type, used in diagnostics.
    fn type_name() -> &'static str;

    /// The object that owns this record.
    fn object_id(&self) -> ObjectId;

    /// Rebind the record to its owning object.
    fn set_object_id(&mut self, id: ObjectId);
}

/// Dense storage for one component type, keyed by [`ObjectId`].
///
/// Records live in a contiguous vector in insertion order; a side index maps
/// object ids to vector slots. Releasing a record keeps the relative order of
/// the remaining records.
#[derive(Debug)]
pub struct ComponentManager<T> {
    records: Vec<T>,
    slots: HashMap<ObjectId, usize>,
}

impl<T: Component> ComponentManager<T> {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Create a default record for `id` and return it for initialisation.
    ///
    /// # Panics
    ///
    /// Panics if `id` is invalid or already owns a `T`.
    pub fn acquire(&mut self, id: ObjectId) -> &mut T {
        assert!(id.is_valid(), "cannot acquire {} for {id}", T::type_name());
        assert!(
            !self.slots.contains_key(&id),
            "{} already acquired for {id}",
            T::type_name()
        );
        let mut record = T::default();
        record.set_object_id(id);
        let slot = self.records.len();
        self.records.push(record);
        self.slots.insert(id, slot);
        &mut self.records[slot]
    }

    /// Destroy the record owned by `id` and return it.
    ///
    /// The remaining records keep their insertion order, so this shifts every
    /// later record down one slot: O(n) in the number of records.
    ///
    /// # Panics
    ///
    /// Panics if `id` owns no `T`.
    pub fn release(&mut self, id: ObjectId) -> T {
        let Some(slot) = self.slots.remove(&id) else {
            panic!("{} not acquired for {id}", T::type_name());
        };
        let record = self.records.remove(slot);
        for later in self.slots.values_mut() {
            if *later > slot {
                *later -= 1;
            }
        }
        record
    }

    /// Returns `true` if `id` owns a record.
    #[must_use]
    pub fn has(&self, id: ObjectId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Try to borrow the record owned by `id`.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.slots.get(&id).map(|&slot| &self.records[slot])
    }

    /// Try to mutably borrow the record owned by `id`.
    #[must_use]
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut T> {
        self.slots.get(&id).map(|&slot| &mut self.records[slot])
    }

    /// Iterate over all live records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &T)> {
        self.records.iter().map(|r| (r.object_id(), r))
    }

    /// Mutably iterate over all live records in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjectId, &mut T)> {
        self.records.iter_mut().map(|r| (r.object_id(), r))
    }

    /// Ids of all live records, in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<ObjectId> {
        self.records.iter().map(Component::object_id).collect()
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no record is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Destroy every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.slots.clear();
    }
}

impl<T: Component> Default for ComponentManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> Index<ObjectId> for ComponentManager<T> {
    type Output = T;

    fn index(&self, id: ObjectId) -> &T {
        match self.get(id) {
            Some(record) => record,
            None => panic!("{} not acquired for {id}", T::type_name()),
        }
    }
}

impl<T: Component> IndexMut<ObjectId> for ComponentManager<T> {
    fn index_mut(&mut self, id: ObjectId) -> &mut T {
        match self.slots.get(&id) {
            Some(&slot) => &mut self.records[slot],
            None => panic!("{} not acquired for {id}", T::type_name()),
        }
    }
}
