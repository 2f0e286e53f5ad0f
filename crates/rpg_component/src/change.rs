//! Deferred structural changes.
//!
//! A [`ComponentManager`] cannot gain or lose records while it is being
//! iterated. Systems that decide to spawn or remove records during a pass
//! record the change in a [`ChangeBuffer`] and apply it once the pass is over.

use tracing::trace;

use crate::component::{Component, ComponentManager};
use crate::entity::ObjectId;

#[derive(Debug)]
enum Change<T> {
    Acquire(ObjectId, T),
    Release(ObjectId),
}

/// Buffered acquire/release operations for one component type.
#[derive(Debug)]
pub struct ChangeBuffer<T> {
    changes: Vec<Change<T>>,
}

impl<T: Component> ChangeBuffer<T> {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            changes: Vec::new(),
        }
    }

    /// Record that `id` should gain `record` once the buffer is applied.
    pub fn acquire(&mut self, id: ObjectId, record: T) {
        self.changes.push(Change::Acquire(id, record));
    }

    /// Record that `id` should lose its record once the buffer is applied.
    pub fn release(&mut self, id: ObjectId) {
        self.changes.push(Change::Release(id));
    }

    /// Number of buffered changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Apply every buffered change in recording order and empty the buffer.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`ComponentManager::acquire`] and
    /// [`ComponentManager::release`].
    pub fn apply(&mut self, manager: &mut ComponentManager<T>) {
        if self.changes.is_empty() {
            return;
        }
        trace!(
            component = T::type_name(),
            changes = self.changes.len(),
            "applying deferred changes"
        );
        for change in self.changes.drain(..) {
            match change {
                Change::Acquire(id, record) => {
                    let slot = manager.acquire(id);
                    *slot = record;
                    slot.set_object_id(id);
                }
                Change::Release(id) => {
                    manager.release(id);
                }
            }
        }
    }
}

impl<T: Component> Default for ChangeBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
