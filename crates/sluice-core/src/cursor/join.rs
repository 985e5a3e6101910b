//! Nested-loops join over two cursors.

use super::transform::pull;
use super::{Cursor, CursorError, CursorResult, Lookahead};

/// Joins two cursors by rescanning the inner cursor for every element of
/// the outer one.
///
/// The inner cursor must support `reset`, since it is traversed once per
/// outer element; construction fails otherwise. Pairs passing the predicate
/// are combined into output elements. Both children are owned and closed
/// with the join.
pub struct NestedLoopsJoin<L, R, P, F, T>
where
    L: Cursor,
    R: Cursor,
{
    core: Lookahead<T>,
    outer: L,
    inner: R,
    predicate: P,
    combine: F,
    current: Option<L::Item>,
}

impl<L, R, P, F, T> NestedLoopsJoin<L, R, P, F, T>
where
    L: Cursor,
    R: Cursor,
    P: FnMut(&L::Item, &R::Item) -> bool,
    F: FnMut(&L::Item, &R::Item) -> T,
{
    /// Creates a join of `outer` and `inner`.
    ///
    /// # Errors
    ///
    /// [`CursorError::Unsupported`] if `inner` cannot be reset.
    pub fn new(outer: L, inner: R, predicate: P, combine: F) -> CursorResult<Self> {
        if !inner.supports_reset() {
            return Err(CursorError::Unsupported("reset"));
        }
        Ok(Self {
            core: Lookahead::new(),
            outer,
            inner,
            predicate,
            combine,
            current: None,
        })
    }

    fn compute(&mut self) -> Option<T> {
        loop {
            if self.current.is_none() {
                self.current = Some(pull(&mut self.outer)?);
            }
            // current was just filled; borrow it for the inner scan
            while let Some(right) = pull(&mut self.inner) {
                let left = self.current.as_ref()?;
                if (self.predicate)(left, &right) {
                    return Some((self.combine)(left, &right));
                }
            }
            // Inner exhausted for this outer element: advance and rescan.
            self.current = None;
            if self.inner.reset().is_err() {
                return None;
            }
        }
    }
}

impl<L, R, P, F, T> Cursor for NestedLoopsJoin<L, R, P, F, T>
where
    L: Cursor,
    R: Cursor,
    P: FnMut(&L::Item, &R::Item) -> bool,
    F: FnMut(&L::Item, &R::Item) -> T,
{
    type Item = T;

    fn open(&mut self) {
        if self.core.open() {
            self.outer.open();
            self.inner.open();
        }
    }

    fn close(&mut self) {
        if self.core.close() {
            self.outer.close();
            self.inner.close();
            self.current = None;
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
        let item = self.compute();
        self.core.has_next_with(|| item)
    }

    fn next(&mut self) -> CursorResult<Self::Item> {
        self.open();
        if self.core.is_closed() {
            return self.core.next_with(|| None);
        }
        if self.core.has_pending() || self.core.is_exhausted() {
            return self.core.next_with(|| None);
        }
        let item = self.compute();
        self.core.next_with(|| item)
    }

    fn peek(&mut self) -> CursorResult<&Self::Item> {
        self.open();
        if self.core.is_closed() {
            return self.core.peek_with(|| None);
        }
        if self.core.has_pending() || self.core.is_exhausted() {
            return self.core.peek_with(|| None);
        }
        let item = self.compute();
        self.core.peek_with(|| item)
    }

    fn supports_peek(&self) -> bool {
        true
    }

    fn reset(&mut self) -> CursorResult<()> {
        self.outer.reset()?;
        self.inner.reset()?;
        self.current = None;
        self.core.reset();
        Ok(())
    }

    fn supports_reset(&self) -> bool {
        self.outer.supports_reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{IterCursor, VecCursor};

    #[test]
    fn test_join_matching_pairs() {
        let outer = IterCursor::new(vec![1, 2, 3].into_iter());
        let inner = VecCursor::new(vec![2, 3, 4]);
        let mut join =
            NestedLoopsJoin::new(outer, inner, |l, r| l == r, |l, r| (*l, *r)).unwrap();
        assert_eq!(join.iter().collect::<Vec<_>>(), vec![(2, 2), (3, 3)]);
    }

    #[test]
    fn test_join_cross_product() {
        let outer = IterCursor::new(vec!['a', 'b'].into_iter());
        let inner = VecCursor::new(vec![1, 2]);
        let mut join =
            NestedLoopsJoin::new(outer, inner, |_, _| true, |l, r| (*l, *r)).unwrap();
        assert_eq!(
            join.iter().collect::<Vec<_>>(),
            vec![('a', 1), ('a', 2), ('b', 1), ('b', 2)]
        );
    }

    #[test]
    fn test_join_requires_resettable_inner() {
        let outer = VecCursor::new(vec![1]);
        let inner = IterCursor::new(std::iter::once(1));
        let result = NestedLoopsJoin::new(outer, inner, |l, r| l == r, |l, r| (*l, *r));
        assert!(matches!(result, Err(CursorError::Unsupported("reset"))));
    }

    #[test]
    fn test_join_empty_outer() {
        let outer = IterCursor::new(std::iter::empty::<i32>());
        let inner = VecCursor::new(vec![1, 2]);
        let mut join =
            NestedLoopsJoin::new(outer, inner, |_, _| true, |l, r| (*l, *r)).unwrap();
        assert!(!join.has_next());
    }
}
