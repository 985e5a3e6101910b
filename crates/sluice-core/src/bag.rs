//! Bags: unordered multisets used as per-group storage.
//!
//! A [`Bag`] collects elements without order or duplicate detection and
//! hands them back exactly once as a cursor. Grouping operators allocate
//! bags through a factory, so the storage can be in-memory
//! ([`ListBag`]) or behind a generic container ([`ContainerBag`]) without
//! the operator noticing.

use smallvec::SmallVec;

use crate::cursor::{BoxCursor, IterCursor};
use crate::storage::{Container, ContainerId, MapContainer};

/// Unordered multiset with single-shot cursor extraction.
pub trait Bag<T> {
    /// Adds an element. Duplicates are kept.
    fn insert(&mut self, item: T);

    /// Number of stored elements.
    fn len(&self) -> usize;

    /// Whether no elements are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all stored elements.
    fn clear(&mut self);

    /// Consumes the bag, yielding its elements in unspecified order.
    fn into_cursor(self: Box<Self>) -> BoxCursor<T>;
}

/// In-memory bag; small groups stay inline without a heap allocation.
pub struct ListBag<T> {
    items: SmallVec<[T; 4]>,
}

impl<T> Default for ListBag<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListBag<T> {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: SmallVec::new(),
        }
    }
}

impl<T: 'static> Bag<T> for ListBag<T> {
    fn insert(&mut self, item: T) {
        self.items.push(item);
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn into_cursor(self: Box<Self>) -> BoxCursor<T> {
        Box::new(IterCursor::new(self.items.into_iter()))
    }
}

/// Bag backed by a generic id→value [`Container`].
///
/// The bag remembers the ids it inserted; extraction removes them from the
/// container lazily as the cursor is pulled. With an external-memory
/// container this keeps only ids resident.
pub struct ContainerBag<T> {
    container: Box<dyn Container<T>>,
    ids: Vec<ContainerId>,
}

impl<T: 'static> ContainerBag<T> {
    /// Creates a bag over the given container.
    pub fn new(container: Box<dyn Container<T>>) -> Self {
        Self {
            container,
            ids: Vec::new(),
        }
    }

    /// Creates a bag over a fresh in-memory [`MapContainer`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MapContainer::new()))
    }
}

impl<T: 'static> Bag<T> for ContainerBag<T> {
    fn insert(&mut self, item: T) {
        let id = self.container.insert(item);
        self.ids.push(id);
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn clear(&mut self) {
        for id in self.ids.drain(..) {
            let _ = self.container.remove(id);
        }
    }

    fn into_cursor(self: Box<Self>) -> BoxCursor<T> {
        let mut container = self.container;
        let iter = self
            .ids
            .into_iter()
            .filter_map(move |id| container.remove(id));
        Box::new(IterCursor::new(iter))
    }
}
