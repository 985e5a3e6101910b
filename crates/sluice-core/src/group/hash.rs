//! Strict in-memory hash grouping.

use std::hash::Hash;

use sluice_common::collections::{sluice_map, SluiceMap};

use super::Group;
use crate::cursor::{Cursor, CursorResult, IterCursor, Lookahead};

/// Partitions its input by a key function, eagerly and entirely in memory.
///
/// The whole input is consumed into a `key -> bucket` hash map the first
/// time the grouper is pulled. No memory bound applies: this is the
/// deliberate strict baseline, and inputs whose key cardinality exceeds
/// memory belong in [`NestedLoopsGrouper`](super::NestedLoopsGrouper)
/// instead.
///
/// Bucket emission order is whatever the hash map yields; callers must not
/// rely on it.
///
/// # Example
///
/// ```
/// use sluice_core::cursor::{Cursor, IterCursor};
/// use sluice_core::group::HashGrouper;
///
/// let input = IterCursor::new(0..10);
/// let mut grouper = HashGrouper::new(input, |x| x % 2);
/// let mut sizes = Vec::new();
/// while grouper.has_next() {
///     let (key, mut group) = grouper.next().unwrap();
///     sizes.push((key, group.iter().count()));
/// }
/// sizes.sort_unstable();
/// assert_eq!(sizes, vec![(0, 5), (1, 5)]);
/// ```
pub struct HashGrouper<C, F, K>
where
    C: Cursor,
    K: Eq + Hash,
{
    core: Lookahead<Group<K, C::Item>>,
    input: C,
    key_fn: F,
    buckets: Option<hashbrown::hash_map::IntoIter<K, Vec<C::Item>>>,
}

impl<C, F, K> HashGrouper<C, F, K>
where
    C: Cursor,
    C::Item: 'static,
    F: Fn(&C::Item) -> K,
    K: Eq + Hash + 'static,
{
    /// Creates a grouper over `input` keyed by `key_fn`.
    pub fn new(input: C, key_fn: F) -> Self {
        Self {
            core: Lookahead::new(),
            input,
            key_fn,
            buckets: None,
        }
    }

    /// Consumes the entire input into the bucket map. Runs once.
    fn prepare(&mut self) {
        if self.buckets.is_some() || self.core.is_closed() {
            return;
        }
        let mut map: SluiceMap<K, Vec<C::Item>> = sluice_map();
        while self.input.has_next() {
            let Ok(item) = self.input.next() else {
                break;
            };
            let key = (self.key_fn)(&item);
            map.entry(key).or_default().push(item);
        }
        self.buckets = Some(map.into_iter());
    }

    fn produce(&mut self) -> Option<Group<K, C::Item>> {
        self.prepare();
        let (key, items) = self.buckets.as_mut()?.next()?;
        Some((key, Box::new(IterCursor::new(items.into_iter()))))
    }
}

impl<C, F, K> Cursor for HashGrouper<C, F, K>
where
    C: Cursor,
    C::Item: 'static,
    F: Fn(&C::Item) -> K,
    K: Eq + Hash + 'static,
{
    type Item = Group<K, C::Item>;

    fn open(&mut self) {
        if self.core.open() {
            self.input.open();
        }
    }

    fn close(&mut self) {
        if self.core.close() {
            self.input.close();
            self.buckets = None;
        }
    }

    fn has_next(&mut self) -> bool {
        self.open();
        if self.core.is_closed() || self.core.is_exhausted() {
            return self.core.has_next_with(|| None);
        }
        if self.core.has_pending() {
            return true;
        }
        let group = self.produce();
        self.core.has_next_with(|| group)
    }

    fn next(&mut self) -> CursorResult<Self::Item> {
        self.open();
        if self.core.is_closed() || self.core.has_pending() || self.core.is_exhausted() {
            return self.core.next_with(|| None);
        }
        let group = self.produce();
        self.core.next_with(|| group)
    }

    fn peek(&mut self) -> CursorResult<&Self::Item> {
        self.open();
        if self.core.is_closed() || self.core.has_pending() || self.core.is_exhausted() {
            return self.core.peek_with(|| None);
        }
        let group = self.produce();
        self.core.peek_with(|| group)
    }

    fn supports_peek(&self) -> bool {
        true
    }

    fn reset(&mut self) -> CursorResult<()> {
        self.input.reset()?;
        self.buckets = None;
        self.core.reset();
        Ok(())
    }

    fn supports_reset(&self) -> bool {
        self.input.supports_reset()
    }
}
