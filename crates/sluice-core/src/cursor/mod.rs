//! The pull-based cursor contract.
//!
//! A [`Cursor`] is an iterator with an explicit lifecycle and lookahead:
//!
//! - `open` / `close` bracket the traversal; `close` releases owned
//!   resources and is idempotent and terminal.
//! - `has_next` computes the next element once and memoizes it until `next`
//!   or `peek` consumes it. A `false` answer latches: the cursor stays
//!   exhausted even if its source gains elements later.
//! - `peek`, `remove`, `update`, and `reset` are optional capabilities,
//!   advertised through the matching `supports_*` methods.
//!
//! Concrete cursors embed a [`Lookahead`] to get the lifecycle state
//! machine, and implement the computation itself. Composite operators
//! ([`Mapper`], [`Filter`], [`NestedLoopsJoin`], the groupers and sorters)
//! own their child cursors and propagate `close` to them.

mod join;
mod sources;
mod transform;

pub use join::NestedLoopsJoin;
pub use sources::{EmptyCursor, IterCursor, VecCursor};
pub use transform::{Filter, Mapper};

use thiserror::Error;

/// Result of a fallible cursor operation.
pub type CursorResult<T> = Result<T, CursorError>;

/// A boxed cursor, the form in which groupers hand out their partitions.
pub type BoxCursor<T> = Box<dyn Cursor<Item = T>>;

/// Error during cursor traversal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    /// An optional operation was invoked on a cursor that does not support it.
    #[error("operation `{0}` is not supported by this cursor")]
    Unsupported(&'static str),
    /// An operation was invoked outside its lifecycle window.
    #[error("invalid cursor state: {0}")]
    InvalidState(&'static str),
    /// `next` or `peek` was called with no element available.
    #[error("cursor is exhausted")]
    Exhausted,
    /// The collection under an index-based view was structurally modified
    /// since the view last touched it.
    #[error("underlying collection was structurally modified during iteration")]
    ConcurrentModification,
}

/// The core trait for pull-based traversal with lookahead.
///
/// Call [`has_next`](Self::has_next) and [`next`](Self::next) repeatedly;
/// `open` is implicit on first use and `close` must be called (or the
/// cursor dropped) when done. Optional capabilities default to
/// [`CursorError::Unsupported`].
pub trait Cursor {
    /// Element type produced by this cursor.
    type Item;

    /// Opens the cursor. Idempotent; called implicitly by the first
    /// `has_next`/`next`/`peek`. Has no effect on a closed cursor.
    fn open(&mut self);

    /// Closes the cursor and everything it owns. Idempotent and terminal:
    /// a closed cursor never reopens.
    fn close(&mut self);

    /// Returns true if another element is available, computing and
    /// memoizing it if necessary. Once false, always false.
    fn has_next(&mut self) -> bool;

    /// Consumes and returns the next element.
    ///
    /// # Errors
    ///
    /// [`CursorError::Exhausted`] if no element remains,
    /// [`CursorError::InvalidState`] after `close`.
    fn next(&mut self) -> CursorResult<Self::Item>;

    /// Returns the next element without consuming it.
    ///
    /// # Errors
    ///
    /// [`CursorError::Unsupported`] unless [`supports_peek`](Self::supports_peek).
    fn peek(&mut self) -> CursorResult<&Self::Item> {
        Err(CursorError::Unsupported("peek"))
    }

    /// Whether [`peek`](Self::peek) is available.
    fn supports_peek(&self) -> bool {
        false
    }

    /// Removes the element most recently returned by `next`/`peek` from the
    /// underlying collection.
    ///
    /// # Errors
    ///
    /// [`CursorError::Unsupported`] unless [`supports_remove`](Self::supports_remove);
    /// [`CursorError::InvalidState`] without a valid preceding `next`/`peek`.
    fn remove(&mut self) -> CursorResult<()> {
        Err(CursorError::Unsupported("remove"))
    }

    /// Whether [`remove`](Self::remove) is available.
    fn supports_remove(&self) -> bool {
        false
    }

    /// Replaces the element most recently returned by `next`/`peek` in the
    /// underlying collection.
    ///
    /// # Errors
    ///
    /// [`CursorError::Unsupported`] unless [`supports_update`](Self::supports_update);
    /// [`CursorError::InvalidState`] without a valid preceding `next`/`peek`.
    fn update(&mut self, replacement: Self::Item) -> CursorResult<()> {
        let _ = replacement;
        Err(CursorError::Unsupported("update"))
    }

    /// Whether [`update`](Self::update) is available.
    fn supports_update(&self) -> bool {
        false
    }

    /// Restores the cursor to the start of its traversal, reconstructing
    /// any derived state, so a fresh traversal is indistinguishable from a
    /// new instance.
    ///
    /// # Errors
    ///
    /// [`CursorError::Unsupported`] unless [`supports_reset`](Self::supports_reset).
    fn reset(&mut self) -> CursorResult<()> {
        Err(CursorError::Unsupported("reset"))
    }

    /// Whether [`reset`](Self::reset) is available.
    fn supports_reset(&self) -> bool {
        false
    }

    /// Bridges this cursor to a standard [`Iterator`] for consumption.
    fn iter(&mut self) -> Iter<'_, Self>
    where
        Self: Sized,
    {
        Iter { cursor: self }
    }
}

impl<C: Cursor + ?Sized> Cursor for &mut C {
    type Item = C::Item;

    fn open(&mut self) {
        (**self).open();
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn has_next(&mut self) -> bool {
        (**self).has_next()
    }

    fn next(&mut self) -> CursorResult<Self::Item> {
        (**self).next()
    }

    fn peek(&mut self) -> CursorResult<&Self::Item> {
        (**self).peek()
    }

    fn supports_peek(&self) -> bool {
        (**self).supports_peek()
    }

    fn remove(&mut self) -> CursorResult<()> {
        (**self).remove()
    }

    fn supports_remove(&self) -> bool {
        (**self).supports_remove()
    }

    fn update(&mut self, replacement: Self::Item) -> CursorResult<()> {
        (**self).update(replacement)
    }

    fn supports_update(&self) -> bool {
        (**self).supports_update()
    }

    fn reset(&mut self) -> CursorResult<()> {
        (**self).reset()
    }

    fn supports_reset(&self) -> bool {
        (**self).supports_reset()
    }
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Item = C::Item;

    fn open(&mut self) {
        (**self).open();
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn has_next(&mut self) -> bool {
        (**self).has_next()
    }

    fn next(&mut self) -> CursorResult<Self::Item> {
        (**self).next()
    }

    fn peek(&mut self) -> CursorResult<&Self::Item> {
        (**self).peek()
    }

    fn supports_peek(&self) -> bool {
        (**self).supports_peek()
    }

    fn remove(&mut self) -> CursorResult<()> {
        (**self).remove()
    }

    fn supports_remove(&self) -> bool {
        (**self).supports_remove()
    }

    fn update(&mut self, replacement: Self::Item) -> CursorResult<()> {
        (**self).update(replacement)
    }

    fn supports_update(&self) -> bool {
        (**self).supports_update()
    }

    fn reset(&mut self) -> CursorResult<()> {
        (**self).reset()
    }

    fn supports_reset(&self) -> bool {
        (**self).supports_reset()
    }
}

/// Iterator adapter over a mutable cursor borrow.
///
/// Yields elements until the cursor exhausts; does not close it.
pub struct Iter<'a, C: Cursor> {
    cursor: &'a mut C,
}

impl<C: Cursor> Iterator for Iter<'_, C> {
    type Item = C::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.has_next() {
            self.cursor.next().ok()
        } else {
            None
        }
    }
}

/// Lifecycle state of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unopened,
    Opened,
    Closed,
}

/// The shared lifecycle state machine concrete cursors embed.
///
/// `Lookahead` owns the memoized pending element, the exhaustion latch, and
/// the valid-element flag behind `remove`/`update`. A cursor implementation
/// routes its trait methods through the `*_with` helpers, supplying the
/// element computation as a closure over its own fields:
///
/// ```
/// use sluice_core::cursor::{Cursor, CursorResult, Lookahead};
///
/// struct Counter {
///     core: Lookahead<u32>,
///     state: u32,
///     limit: u32,
/// }
///
/// impl Cursor for Counter {
///     type Item = u32;
///
///     fn open(&mut self) {
///         self.core.open();
///     }
///
///     fn close(&mut self) {
///         self.core.close();
///     }
///
///     fn has_next(&mut self) -> bool {
///         let (state, limit) = (&mut self.state, self.limit);
///         self.core.has_next_with(|| {
///             (*state < limit).then(|| {
///                 *state += 1;
///                 *state
///             })
///         })
///     }
///
///     fn next(&mut self) -> CursorResult<u32> {
///         let (state, limit) = (&mut self.state, self.limit);
///         self.core.next_with(|| {
///             (*state < limit).then(|| {
///                 *state += 1;
///                 *state
///             })
///         })
///     }
/// }
///
/// let mut c = Counter { core: Lookahead::new(), state: 0, limit: 2 };
/// assert!(c.has_next());
/// assert_eq!(c.next().unwrap(), 1);
/// assert_eq!(c.next().unwrap(), 2);
/// assert!(!c.has_next());
/// ```
#[derive(Debug)]
pub struct Lookahead<T> {
    state: State,
    pending: Option<T>,
    exhausted: bool,
    valid: bool,
}

impl<T> Default for Lookahead<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Lookahead<T> {
    /// Creates an unopened state machine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Unopened,
            pending: None,
            exhausted: false,
            valid: false,
        }
    }

    /// Transitions to opened. Returns true exactly once, so the caller can
    /// run its own open hook on the first transition. No effect when closed.
    pub fn open(&mut self) -> bool {
        if self.state == State::Unopened {
            self.state = State::Opened;
            true
        } else {
            false
        }
    }

    /// Transitions to closed, dropping any pending element. Returns true
    /// exactly once, so the caller can close its children on the first
    /// transition.
    pub fn close(&mut self) -> bool {
        if self.state == State::Closed {
            return false;
        }
        self.state = State::Closed;
        self.pending = None;
        self.valid = false;
        true
    }

    /// Whether the cursor has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Whether exhaustion has latched.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// `has_next` semantics: memoize one element from `compute`, latch
    /// exhaustion when `compute` yields nothing.
    pub fn has_next_with(&mut self, compute: impl FnOnce() -> Option<T>) -> bool {
        if self.state == State::Closed {
            return false;
        }
        if self.pending.is_some() {
            return true;
        }
        if self.exhausted {
            return false;
        }
        match compute() {
            Some(item) => {
                self.pending = Some(item);
                true
            }
            None => {
                self.exhausted = true;
                false
            }
        }
    }

    /// `next` semantics: consume the pending element or compute one, and
    /// mark it valid for one `remove`/`update`.
    ///
    /// # Errors
    ///
    /// [`CursorError::InvalidState`] when closed, [`CursorError::Exhausted`]
    /// when no element remains.
    pub fn next_with(&mut self, compute: impl FnOnce() -> Option<T>) -> CursorResult<T> {
        if self.state == State::Closed {
            return Err(CursorError::InvalidState("cursor is closed"));
        }
        if let Some(item) = self.pending.take() {
            self.valid = true;
            return Ok(item);
        }
        if self.exhausted {
            return Err(CursorError::Exhausted);
        }
        match compute() {
            Some(item) => {
                self.valid = true;
                Ok(item)
            }
            None => {
                self.exhausted = true;
                Err(CursorError::Exhausted)
            }
        }
    }

    /// `peek` semantics: compute-but-do-not-consume; the peeked element is
    /// valid for one `remove`/`update`.
    ///
    /// # Errors
    ///
    /// [`CursorError::InvalidState`] when closed, [`CursorError::Exhausted`]
    /// when no element remains.
    pub fn peek_with(&mut self, compute: impl FnOnce() -> Option<T>) -> CursorResult<&T> {
        if self.state == State::Closed {
            return Err(CursorError::InvalidState("cursor is closed"));
        }
        if self.pending.is_none() {
            if self.exhausted {
                return Err(CursorError::Exhausted);
            }
            match compute() {
                Some(item) => self.pending = Some(item),
                None => {
                    self.exhausted = true;
                    return Err(CursorError::Exhausted);
                }
            }
        }
        self.valid = true;
        // pending was just filled above
        self.pending
            .as_ref()
            .ok_or(CursorError::InvalidState("lookahead slot empty"))
    }

    /// Consumes the valid-element flag ahead of a `remove`/`update`.
    ///
    /// # Errors
    ///
    /// [`CursorError::InvalidState`] when closed or when no `next`/`peek`
    /// established a valid element.
    pub fn take_valid(&mut self) -> CursorResult<()> {
        if self.state == State::Closed {
            return Err(CursorError::InvalidState("cursor is closed"));
        }
        if !self.valid {
            return Err(CursorError::InvalidState(
                "no valid element; call `next` or `peek` first",
            ));
        }
        self.valid = false;
        Ok(())
    }

    /// Drops the memoized element, if any. Used by `remove` implementations
    /// that discard a peeked-but-unconsumed element.
    pub fn clear_pending(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Whether a memoized element is waiting to be consumed.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Clears lookahead state for a `reset`. Leaves the lifecycle state
    /// untouched; a closed cursor stays closed.
    pub fn reset(&mut self) {
        self.pending = None;
        self.exhausted = false;
        self.valid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookahead_memoizes_until_consumed() {
        let mut core: Lookahead<u32> = Lookahead::new();
        core.open();
        let mut calls = 0;
        assert!(core.has_next_with(|| {
            calls += 1;
            Some(7)
        }));
        // Memoized: the second has_next must not recompute.
        assert!(core.has_next_with(|| {
            calls += 1;
            Some(8)
        }));
        assert_eq!(calls, 1);
        assert_eq!(core.next_with(|| None).unwrap(), 7);
    }

    #[test]
    fn test_lookahead_exhaustion_latches() {
        let mut core: Lookahead<u32> = Lookahead::new();
        core.open();
        assert!(!core.has_next_with(|| None));
        // The source "gains" an element, but exhaustion is sticky.
        assert!(!core.has_next_with(|| Some(1)));
        assert_eq!(core.next_with(|| Some(1)), Err(CursorError::Exhausted));
    }

    #[test]
    fn test_lookahead_open_close_once() {
        let mut core: Lookahead<u32> = Lookahead::new();
        assert!(core.open());
        assert!(!core.open());
        assert!(core.close());
        assert!(!core.close());
        assert!(!core.open(), "closed is terminal");
    }

    #[test]
    fn test_lookahead_next_after_close_is_invalid_state() {
        let mut core: Lookahead<u32> = Lookahead::new();
        core.open();
        core.close();
        assert!(matches!(
            core.next_with(|| Some(1)),
            Err(CursorError::InvalidState(_))
        ));
        assert!(!core.has_next_with(|| Some(1)));
    }

    #[test]
    fn test_lookahead_valid_consumed_exactly_once() {
        let mut core: Lookahead<u32> = Lookahead::new();
        core.open();
        assert!(matches!(
            core.take_valid(),
            Err(CursorError::InvalidState(_))
        ));
        let _ = core.next_with(|| Some(1)).unwrap();
        assert!(core.take_valid().is_ok());
        assert!(matches!(
            core.take_valid(),
            Err(CursorError::InvalidState(_))
        ));
    }

    #[test]
    fn test_lookahead_peek_marks_valid() {
        let mut core: Lookahead<u32> = Lookahead::new();
        core.open();
        assert_eq!(*core.peek_with(|| Some(3)).unwrap(), 3);
        assert!(core.take_valid().is_ok());
        // Peek did not consume: next returns the same element.
        assert_eq!(core.next_with(|| None).unwrap(), 3);
    }

    #[test]
    fn test_lookahead_reset_clears_latch() {
        let mut core: Lookahead<u32> = Lookahead::new();
        core.open();
        assert!(!core.has_next_with(|| None));
        core.reset();
        assert!(core.has_next_with(|| Some(2)));
    }
}
