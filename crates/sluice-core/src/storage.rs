//! Storage seams: generic id-addressed containers and storage factories.
//!
//! Operators never name a concrete storage type. They allocate bags and
//! queues through [`BagFactory`]/[`QueueFactory`] closures, and
//! container-backed bags store their elements through the [`Container`]
//! trait. Swapping in an external-memory implementation is a matter of
//! handing different factories to the operator; the operator logic is
//! untouched.

use sluice_common::collections::{sluice_map, SluiceMap};

use crate::bag::Bag;
use crate::queue::Queue;

/// Identifier generated by a [`Container`] for an inserted element.
pub type ContainerId = u64;

/// Generic id→value store with generated ids.
///
/// The in-memory reference implementation is [`MapContainer`];
/// external-memory implementations plug in behind the same trait.
pub trait Container<T> {
    /// Stores `item` and returns its generated id.
    fn insert(&mut self, item: T) -> ContainerId;

    /// The element stored under `id`, if present.
    fn get(&self, id: ContainerId) -> Option<&T>;

    /// Removes and returns the element stored under `id`.
    fn remove(&mut self, id: ContainerId) -> Option<T>;

    /// Whether an element is stored under `id`.
    fn contains(&self, id: ContainerId) -> bool;

    /// Number of stored elements.
    fn len(&self) -> usize;

    /// Whether no elements are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all stored elements.
    fn clear(&mut self);
}

/// In-memory [`Container`] over a hash map.
pub struct MapContainer<T> {
    items: SluiceMap<ContainerId, T>,
    next_id: ContainerId,
}

impl<T> Default for MapContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MapContainer<T> {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: sluice_map(),
            next_id: 0,
        }
    }
}

impl<T> Container<T> for MapContainer<T> {
    fn insert(&mut self, item: T) -> ContainerId {
        let id = self.next_id;
        self.next_id += 1;
        self.items.insert(id, item);
        id
    }

    fn get(&self, id: ContainerId) -> Option<&T> {
        self.items.get(&id)
    }

    fn remove(&mut self, id: ContainerId) -> Option<T> {
        self.items.remove(&id)
    }

    fn contains(&self, id: ContainerId) -> bool {
        self.items.contains_key(&id)
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

/// Factory producing the per-group bags a grouping operator allocates.
pub type BagFactory<T> = Box<dyn FnMut() -> Box<dyn Bag<T>>>;

/// Factory producing the overflow/run queues an operator allocates.
pub type QueueFactory<T> = Box<dyn FnMut() -> Box<dyn Queue<T>>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_container_roundtrip() {
        let mut c = MapContainer::new();
        let a = c.insert("alpha");
        let b = c.insert("beta");
        assert_ne!(a, b);
        assert_eq!(c.get(a), Some(&"alpha"));
        assert!(c.contains(b));
        assert_eq!(c.len(), 2);
        assert_eq!(c.remove(a), Some("alpha"));
        assert!(!c.contains(a));
        assert_eq!(c.remove(a), None);
    }

    #[test]
    fn test_map_container_clear() {
        let mut c = MapContainer::new();
        let _ = c.insert(1);
        let _ = c.insert(2);
        c.clear();
        assert!(c.is_empty());
    }
}
