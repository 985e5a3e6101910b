//! Fixed-capacity slot buffer with pinning, dirty tracking, and pluggable
//! eviction.
//!
//! A [`Buffer`] caches up to `capacity` elements keyed by an `(owner, id)`
//! pair (ids are unique only within an owner). Fixed slots are pinned
//! against eviction; dirty slots carry a flush callback that runs before the
//! slot is displaced. When an insert finds the buffer full, the injected
//! [`EvictionPolicy`] picks the victim; if every slot is fixed the insert
//! fails with [`BufferError::Overflow`] and the caller may unfix and retry.
//!
//! Occupied slots stay contiguous at the front of the backing array:
//! eviction and removal swap the vacated slot with the highest-indexed
//! occupied one, an O(1) compaction.

mod policy;

pub use policy::{ClockPolicy, EvictionPolicy, LruPolicy, SlotMeta};

use std::hash::Hash;

use thiserror::Error;
use tracing::trace;

use sluice_common::collections::{sluice_map, SluiceMap};

/// Error from buffer operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// The buffer is full and every slot is fixed, so no victim exists.
    #[error("all {0} buffer slots are fixed; cannot evict")]
    Overflow(usize),
    /// No slot exists for the given `(owner, id)` pair.
    #[error("no buffer slot for the given owner and id")]
    UnknownSlot,
}

/// Callback invoked with `(id, element)` when a dirty slot is flushed.
pub type FlushFn<I, E> = Box<dyn FnMut(&I, &E)>;

struct Slot<O, I, E> {
    owner: O,
    id: I,
    element: E,
    fixed: bool,
    flush: Option<FlushFn<I, E>>,
}

/// Fixed-capacity cache of `(owner, id)`-addressed elements.
///
/// # Example
///
/// ```
/// use sluice_core::buffer::{Buffer, LruPolicy};
///
/// let mut buffer: Buffer<&str, u32, String> = Buffer::new(2, LruPolicy);
/// let value = buffer
///     .get("file", 1, |id| format!("block {id}"), true)
///     .unwrap();
/// assert_eq!(value, "block 1");
/// assert_eq!(buffer.len(), 1);
/// ```
pub struct Buffer<O, I, E> {
    slots: Vec<Slot<O, I, E>>,
    metas: Vec<SlotMeta>,
    index: SluiceMap<O, SluiceMap<I, usize>>,
    capacity: usize,
    policy: Box<dyn EvictionPolicy>,
    tick: u64,
    fixed_count: usize,
}

impl<O, I, E> Buffer<O, I, E>
where
    O: Eq + Hash + Clone,
    I: Eq + Hash + Clone,
{
    /// Creates a buffer of `capacity` slots with the given eviction policy.
    pub fn new(capacity: usize, policy: impl EvictionPolicy + 'static) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            metas: Vec::with_capacity(capacity),
            index: sluice_map(),
            capacity,
            policy: Box::new(policy),
            tick: 0,
            fixed_count: 0,
        }
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Total number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of fixed slots. Never exceeds [`capacity`](Self::capacity).
    #[must_use]
    pub fn fixed_count(&self) -> usize {
        self.fixed_count
    }

    /// Whether a slot exists for `(owner, id)`.
    #[must_use]
    pub fn contains(&self, owner: &O, id: &I) -> bool {
        self.lookup(owner, id).is_some()
    }

    /// Whether the slot for `(owner, id)` exists and is fixed.
    #[must_use]
    pub fn is_fixed(&self, owner: &O, id: &I) -> bool {
        self.lookup(owner, id)
            .is_some_and(|pos| self.slots[pos].fixed)
    }

    /// Whether the slot for `(owner, id)` exists and has an unflushed
    /// element.
    #[must_use]
    pub fn is_dirty(&self, owner: &O, id: &I) -> bool {
        self.lookup(owner, id)
            .is_some_and(|pos| self.slots[pos].flush.is_some())
    }

    /// Looks up or materializes the slot for `(owner, id)` and fixes it.
    ///
    /// A missing element is produced by `obtain(&id)`. Returns a reference
    /// to the cached element; the slot stays fixed until
    /// [`unfix`](Self::unfix).
    ///
    /// # Errors
    ///
    /// [`BufferError::Overflow`] if the buffer is full and every slot is
    /// fixed.
    pub fn fix(&mut self, owner: O, id: I, obtain: impl FnOnce(&I) -> E) -> Result<&E, BufferError> {
        let pos = self.fix_pos(owner, id, obtain)?;
        Ok(&self.slots[pos].element)
    }

    /// Fixes the slot, reads the element, and optionally unfixes again.
    ///
    /// # Errors
    ///
    /// [`BufferError::Overflow`] if the buffer is full and every slot is
    /// fixed.
    pub fn get(
        &mut self,
        owner: O,
        id: I,
        obtain: impl FnOnce(&I) -> E,
        unfix_after: bool,
    ) -> Result<&E, BufferError> {
        let pos = self.fix_pos(owner, id, obtain)?;
        if unfix_after {
            self.unfix_pos(pos);
        }
        Ok(&self.slots[pos].element)
    }

    /// Overwrites (or inserts) the element for `(owner, id)`, registers the
    /// flush callback (marking the slot dirty), and optionally unfixes.
    ///
    /// # Errors
    ///
    /// [`BufferError::Overflow`] if the buffer is full and every slot is
    /// fixed.
    pub fn update(
        &mut self,
        owner: O,
        id: I,
        element: E,
        flush: FlushFn<I, E>,
        unfix_after: bool,
    ) -> Result<(), BufferError> {
        let pos = match self.lookup(&owner, &id) {
            Some(pos) => {
                self.touch(pos);
                self.fix_slot(pos);
                self.slots[pos].element = element;
                pos
            }
            None => {
                let mut element = Some(element);
                // The element is on hand, so the obtain hook just yields it.
                self.fix_pos(owner, id, |_| {
                    element.take().expect("obtain called once for a new slot")
                })?
            }
        };
        self.slots[pos].flush = Some(flush);
        if unfix_after {
            self.unfix_pos(pos);
        }
        Ok(())
    }

    /// Releases the pin on the slot for `(owner, id)`.
    ///
    /// # Errors
    ///
    /// [`BufferError::UnknownSlot`] if no such slot exists.
    pub fn unfix(&mut self, owner: &O, id: &I) -> Result<(), BufferError> {
        let pos = self.lookup(owner, id).ok_or(BufferError::UnknownSlot)?;
        self.unfix_pos(pos);
        Ok(())
    }

    /// Runs the flush callback of the slot for `(owner, id)` and clears its
    /// dirty state. No-op on a clean slot.
    ///
    /// # Errors
    ///
    /// [`BufferError::UnknownSlot`] if no such slot exists.
    pub fn flush(&mut self, owner: &O, id: &I) -> Result<(), BufferError> {
        let pos = self.lookup(owner, id).ok_or(BufferError::UnknownSlot)?;
        Self::flush_slot(&mut self.slots[pos]);
        Ok(())
    }

    /// Flushes every dirty slot of `owner`.
    pub fn flush_all(&mut self, owner: &O) {
        let positions: Vec<usize> = match self.index.get(owner) {
            Some(ids) => ids.values().copied().collect(),
            None => return,
        };
        for pos in positions {
            Self::flush_slot(&mut self.slots[pos]);
        }
    }

    /// Removes the slot for `(owner, id)` and returns its element,
    /// discarding any pending flush.
    ///
    /// # Errors
    ///
    /// [`BufferError::UnknownSlot`] if no such slot exists.
    pub fn remove(&mut self, owner: &O, id: &I) -> Result<E, BufferError> {
        let pos = self.lookup(owner, id).ok_or(BufferError::UnknownSlot)?;
        Ok(self.evict_pos(pos, false))
    }

    /// Removes every slot of `owner`, discarding pending flushes.
    pub fn remove_all(&mut self, owner: &O) {
        while let Some(ids) = self.index.get(owner) {
            let Some(pos) = ids.values().next().copied() else {
                break;
            };
            let _ = self.evict_pos(pos, false);
        }
        self.index.remove(owner);
    }

    fn lookup(&self, owner: &O, id: &I) -> Option<usize> {
        self.index.get(owner)?.get(id).copied()
    }

    fn touch(&mut self, pos: usize) {
        self.tick += 1;
        self.metas[pos].tick = self.tick;
        self.metas[pos].accessed = true;
    }

    fn fix_slot(&mut self, pos: usize) {
        if !self.slots[pos].fixed {
            self.slots[pos].fixed = true;
            self.metas[pos].fixed = true;
            self.fixed_count += 1;
        }
    }

    fn unfix_pos(&mut self, pos: usize) {
        if self.slots[pos].fixed {
            self.slots[pos].fixed = false;
            self.metas[pos].fixed = false;
            self.fixed_count -= 1;
        }
    }

    fn flush_slot(slot: &mut Slot<O, I, E>) {
        if let Some(flush) = slot.flush.as_mut() {
            flush(&slot.id, &slot.element);
            slot.flush = None;
        }
    }

    fn fix_pos(
        &mut self,
        owner: O,
        id: I,
        obtain: impl FnOnce(&I) -> E,
    ) -> Result<usize, BufferError> {
        if let Some(pos) = self.lookup(&owner, &id) {
            self.touch(pos);
            self.fix_slot(pos);
            return Ok(pos);
        }
        if self.slots.len() == self.capacity {
            if self.fixed_count == self.capacity {
                return Err(BufferError::Overflow(self.capacity));
            }
            let victim = self
                .policy
                .victim(&mut self.metas)
                .ok_or(BufferError::Overflow(self.capacity))?;
            trace!(position = victim, "displacing buffer slot");
            let _ = self.evict_pos(victim, true);
        }
        let element = obtain(&id);
        let pos = self.slots.len();
        self.slots.push(Slot {
            owner: owner.clone(),
            id: id.clone(),
            element,
            fixed: true,
            flush: None,
        });
        self.tick += 1;
        self.metas.push(SlotMeta {
            fixed: true,
            tick: self.tick,
            accessed: false,
        });
        self.fixed_count += 1;
        self.index.entry(owner).or_insert_with(sluice_map).insert(id, pos);
        Ok(pos)
    }

    /// Clears the slot at `pos` (flushing first when displacing), keeping
    /// occupied slots contiguous by swapping in the highest-indexed one.
    fn evict_pos(&mut self, pos: usize, displace: bool) -> E {
        if displace {
            Self::flush_slot(&mut self.slots[pos]);
        }
        if self.slots[pos].fixed {
            self.fixed_count -= 1;
        }
        let slot = self.slots.swap_remove(pos);
        self.metas.swap_remove(pos);
        if let Some(ids) = self.index.get_mut(&slot.owner) {
            ids.remove(&slot.id);
            if ids.is_empty() {
                self.index.remove(&slot.owner);
            }
        }
        // The former last slot now lives at `pos`; re-point its index entry.
        if pos < self.slots.len() {
            let moved = &self.slots[pos];
            if let Some(ids) = self.index.get_mut(&moved.owner) {
                if let Some(entry) = ids.get_mut(&moved.id) {
                    *entry = pos;
                }
            }
        }
        slot.element
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn buffer(capacity: usize) -> Buffer<&'static str, u32, String> {
        Buffer::new(capacity, LruPolicy)
    }

    // --- fix / get tests ---

    #[test]
    fn test_fix_then_get_obtains_once() {
        let mut buf = buffer(4);
        let calls = Rc::new(RefCell::new(0));
        {
            let calls = Rc::clone(&calls);
            buf.fix("o", 1, move |id| {
                *calls.borrow_mut() += 1;
                format!("v{id}")
            })
            .unwrap();
        }
        let value = buf
            .get("o", 1, |_| unreachable!("cached element must be reused"), true)
            .unwrap();
        assert_eq!(value, "v1");
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_get_with_unfix_leaves_slot_unpinned() {
        let mut buf = buffer(2);
        let _ = buf.get("o", 1, |id| format!("v{id}"), true).unwrap();
        assert!(buf.contains(&"o", &1));
        assert!(!buf.is_fixed(&"o", &1));
        assert_eq!(buf.fixed_count(), 0);
    }

    #[test]
    fn test_fix_pins_slot() {
        let mut buf = buffer(2);
        let _ = buf.fix("o", 1, |id| format!("v{id}")).unwrap();
        assert!(buf.is_fixed(&"o", &1));
        assert_eq!(buf.fixed_count(), 1);
        buf.unfix(&"o", &1).unwrap();
        assert!(!buf.is_fixed(&"o", &1));
        assert_eq!(buf.fixed_count(), 0);
    }

    #[test]
    fn test_ids_unique_per_owner() {
        let mut buf = buffer(4);
        let _ = buf.get("a", 1, |_| "a1".into(), true).unwrap();
        let _ = buf.get("b", 1, |_| "b1".into(), true).unwrap();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.get("a", 1, |_| unreachable!(), true).unwrap(), "a1");
        assert_eq!(buf.get("b", 1, |_| unreachable!(), true).unwrap(), "b1");
    }

    // --- eviction tests ---

    #[test]
    fn test_eviction_when_full() {
        let mut buf = buffer(2);
        let _ = buf.get("o", 1, |_| "1".into(), true).unwrap();
        let _ = buf.get("o", 2, |_| "2".into(), true).unwrap();
        let _ = buf.get("o", 3, |_| "3".into(), true).unwrap();
        assert_eq!(buf.len(), 2);
        // LRU: id 1 was the oldest access, so it was displaced.
        assert!(!buf.contains(&"o", &1));
        assert!(buf.contains(&"o", &2));
        assert!(buf.contains(&"o", &3));
    }

    #[test]
    fn test_fixed_slot_survives_eviction() {
        let mut buf = buffer(2);
        let _ = buf.fix("o", 1, |_| "1".into()).unwrap();
        let _ = buf.get("o", 2, |_| "2".into(), true).unwrap();
        let _ = buf.get("o", 3, |_| "3".into(), true).unwrap();
        assert!(buf.contains(&"o", &1), "fixed slot must not be evicted");
        assert!(!buf.contains(&"o", &2));
    }

    #[test]
    fn test_overflow_when_all_fixed() {
        let mut buf = buffer(2);
        let _ = buf.fix("o", 1, |_| "1".into()).unwrap();
        let _ = buf.fix("o", 2, |_| "2".into()).unwrap();
        assert_eq!(
            buf.fix("o", 3, |_| "3".into()).err(),
            Some(BufferError::Overflow(2))
        );
        // Unfixing makes room again; the caller may retry.
        buf.unfix(&"o", &1).unwrap();
        assert!(buf.fix("o", 3, |_| "3".into()).is_ok());
    }

    #[test]
    fn test_index_consistent_after_compaction() {
        let mut buf = buffer(3);
        let _ = buf.get("o", 1, |_| "1".into(), true).unwrap();
        let _ = buf.get("o", 2, |_| "2".into(), true).unwrap();
        let _ = buf.get("o", 3, |_| "3".into(), true).unwrap();
        // Remove the first slot: the last one is swapped into its place.
        let removed = buf.remove(&"o", &1).unwrap();
        assert_eq!(removed, "1");
        assert_eq!(buf.get("o", 2, |_| unreachable!(), true).unwrap(), "2");
        assert_eq!(buf.get("o", 3, |_| unreachable!(), true).unwrap(), "3");
    }

    // --- dirty / flush tests ---

    #[test]
    fn test_update_marks_dirty_and_flush_clears() {
        let mut buf = buffer(2);
        let flushed: Rc<RefCell<Vec<(u32, String)>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&flushed);
        buf.update(
            "o",
            1,
            "hello".into(),
            Box::new(move |id, element| sink.borrow_mut().push((*id, element.clone()))),
            true,
        )
        .unwrap();
        assert!(buf.is_dirty(&"o", &1));

        buf.flush(&"o", &1).unwrap();
        assert!(!buf.is_dirty(&"o", &1));
        assert_eq!(flushed.borrow().as_slice(), &[(1, "hello".to_string())]);

        // Clean flush is a no-op.
        buf.flush(&"o", &1).unwrap();
        assert_eq!(flushed.borrow().len(), 1);
    }

    #[test]
    fn test_eviction_flushes_dirty_victim() {
        let mut buf = buffer(1);
        let flushed: Rc<RefCell<Vec<(u32, String)>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&flushed);
        buf.update(
            "o",
            1,
            "dirty".into(),
            Box::new(move |id, element| sink.borrow_mut().push((*id, element.clone()))),
            true,
        )
        .unwrap();
        let _ = buf.get("o", 2, |_| "2".into(), true).unwrap();
        assert_eq!(flushed.borrow().as_slice(), &[(1, "dirty".to_string())]);
        assert!(!buf.contains(&"o", &1));
    }

    #[test]
    fn test_flush_all_owner() {
        let mut buf = buffer(4);
        let flushed: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
        for id in [1, 2] {
            let sink = Rc::clone(&flushed);
            buf.update(
                "o",
                id,
                format!("v{id}"),
                Box::new(move |id, _| sink.borrow_mut().push(*id)),
                true,
            )
            .unwrap();
        }
        let _ = buf.get("other", 9, |_| "x".into(), true).unwrap();
        buf.flush_all(&"o");
        let mut seen = flushed.borrow().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_remove_discards_pending_flush() {
        let mut buf = buffer(2);
        let flushed = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&flushed);
        buf.update(
            "o",
            1,
            "v".into(),
            Box::new(move |_, _| *sink.borrow_mut() += 1),
            true,
        )
        .unwrap();
        let element = buf.remove(&"o", &1).unwrap();
        assert_eq!(element, "v");
        assert_eq!(*flushed.borrow(), 0);
        assert!(!buf.contains(&"o", &1));
    }

    #[test]
    fn test_remove_all_owner() {
        let mut buf = buffer(4);
        let _ = buf.get("o", 1, |_| "1".into(), true).unwrap();
        let _ = buf.get("o", 2, |_| "2".into(), true).unwrap();
        let _ = buf.get("keep", 1, |_| "k".into(), true).unwrap();
        buf.remove_all(&"o");
        assert_eq!(buf.len(), 1);
        assert!(buf.contains(&"keep", &1));
    }

    #[test]
    fn test_unknown_slot_errors() {
        let mut buf = buffer(2);
        assert_eq!(buf.unfix(&"o", &1).err(), Some(BufferError::UnknownSlot));
        assert_eq!(buf.flush(&"o", &1).err(), Some(BufferError::UnknownSlot));
        assert_eq!(buf.remove(&"o", &1).err(), Some(BufferError::UnknownSlot));
    }

    #[test]
    fn test_fixed_count_never_exceeds_capacity() {
        let mut buf = buffer(3);
        for id in 0..3 {
            let _ = buf.fix("o", id, |id| format!("v{id}")).unwrap();
            assert!(buf.fixed_count() <= buf.capacity());
        }
        // Re-fixing an already fixed slot must not inflate the count.
        let _ = buf.fix("o", 0, |_| unreachable!()).unwrap();
        assert_eq!(buf.fixed_count(), 3);
    }

    #[test]
    fn test_clock_policy_in_buffer() {
        let mut buf: Buffer<&str, u32, String> = Buffer::new(2, ClockPolicy::default());
        let _ = buf.get("o", 1, |_| "1".into(), true).unwrap();
        let _ = buf.get("o", 2, |_| "2".into(), true).unwrap();
        // Touch id 1 so it holds an accessed bit.
        let _ = buf.get("o", 1, |_| unreachable!(), true).unwrap();
        let _ = buf.get("o", 3, |_| "3".into(), true).unwrap();
        // Clock clears 1's bit and passes over it; 2 is the victim.
        assert!(buf.contains(&"o", &1));
        assert!(!buf.contains(&"o", &2));
        assert!(buf.contains(&"o", &3));
    }
}
