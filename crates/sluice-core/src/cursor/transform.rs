//! Element-wise transform operators: map and filter.

use super::{Cursor, CursorResult, Lookahead};

/// Applies a function to every element of a child cursor.
///
/// Owns the child; `close` and (when the child supports it) `reset`
/// propagate down.
pub struct Mapper<C: Cursor, F, U> {
    core: Lookahead<U>,
    input: C,
    f: F,
}

impl<C, F, U> Mapper<C, F, U>
where
    C: Cursor,
    F: FnMut(C::Item) -> U,
{
    /// Creates a mapper over `input`.
    pub fn new(input: C, f: F) -> Self {
        Self {
            core: Lookahead::new(),
            input,
            f,
        }
    }
}

impl<C, F, U> Cursor for Mapper<C, F, U>
where
    C: Cursor,
    F: FnMut(C::Item) -> U,
{
    type Item = U;

    fn open(&mut self) {
        if self.core.open() {
            self.input.open();
        }
    }

    fn close(&mut self) {
        if self.core.close() {
            self.input.close();
        }
    }

    fn has_next(&mut self) -> bool {
        self.open();
        let (input, f) = (&mut self.input, &mut self.f);
        self.core
            .has_next_with(|| pull(input).map(f))
    }

    fn next(&mut self) -> CursorResult<Self::Item> {
        self.open();
        let (input, f) = (&mut self.input, &mut self.f);
        self.core.next_with(|| pull(input).map(f))
    }

    fn peek(&mut self) -> CursorResult<&Self::Item> {
        self.open();
        let (input, f) = (&mut self.input, &mut self.f);
        self.core.peek_with(|| pull(input).map(f))
    }

    fn supports_peek(&self) -> bool {
        true
    }

    fn reset(&mut self) -> CursorResult<()> {
        self.input.reset()?;
        self.core.reset();
        Ok(())
    }

    fn supports_reset(&self) -> bool {
        self.input.supports_reset()
    }
}

/// Retains the elements of a child cursor that satisfy a predicate.
pub struct Filter<C: Cursor, P> {
    core: Lookahead<C::Item>,
    input: C,
    predicate: P,
}

impl<C, P> Filter<C, P>
where
    C: Cursor,
    P: FnMut(&C::Item) -> bool,
{
    /// Creates a filter over `input`.
    pub fn new(input: C, predicate: P) -> Self {
        Self {
            core: Lookahead::new(),
            input,
            predicate,
        }
    }
}

impl<C, P> Cursor for Filter<C, P>
where
    C: Cursor,
    P: FnMut(&C::Item) -> bool,
{
    type Item = C::Item;

    fn open(&mut self) {
        if self.core.open() {
            self.input.open();
        }
    }

    fn close(&mut self) {
        if self.core.close() {
            self.input.close();
        }
    }

    fn has_next(&mut self) -> bool {
        self.open();
        let (input, predicate) = (&mut self.input, &mut self.predicate);
        self.core
            .has_next_with(|| pull_matching(input, predicate))
    }

    fn next(&mut self) -> CursorResult<Self::Item> {
        self.open();
        let (input, predicate) = (&mut self.input, &mut self.predicate);
        self.core.next_with(|| pull_matching(input, predicate))
    }

    fn peek(&mut self) -> CursorResult<&Self::Item> {
        self.open();
        let (input, predicate) = (&mut self.input, &mut self.predicate);
        self.core.peek_with(|| pull_matching(input, predicate))
    }

    fn supports_peek(&self) -> bool {
        true
    }

    fn reset(&mut self) -> CursorResult<()> {
        self.input.reset()?;
        self.core.reset();
        Ok(())
    }

    fn supports_reset(&self) -> bool {
        self.input.supports_reset()
    }
}

/// Pulls one element from a child cursor, mapping exhaustion to `None`.
pub(crate) fn pull<C: Cursor>(input: &mut C) -> Option<C::Item> {
    if input.has_next() {
        input.next().ok()
    } else {
        None
    }
}

fn pull_matching<C, P>(input: &mut C, predicate: &mut P) -> Option<C::Item>
where
    C: Cursor,
    P: FnMut(&C::Item) -> bool,
{
    while let Some(item) = pull(input) {
        if predicate(&item) {
            return Some(item);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{CursorError, IterCursor, VecCursor};

    #[test]
    fn test_mapper_applies_function() {
        let mut m = Mapper::new(IterCursor::new(1..=3), |x| x * 2);
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![2, 4, 6]);
    }

    #[test]
    fn test_mapper_peek_does_not_consume() {
        let mut m = Mapper::new(IterCursor::new(1..=2), |x| x + 10);
        assert_eq!(*m.peek().unwrap(), 11);
        assert_eq!(m.next().unwrap(), 11);
    }

    #[test]
    fn test_mapper_reset_delegates() {
        let mut m = Mapper::new(VecCursor::new(vec![1, 2]), |x| x * 3);
        assert!(m.supports_reset());
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![3, 6]);
        m.reset().unwrap();
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![3, 6]);
    }

    #[test]
    fn test_mapper_reset_unsupported_when_child_cannot() {
        let mut m = Mapper::new(IterCursor::new(1..=2), |x| x);
        assert!(!m.supports_reset());
        assert_eq!(m.reset(), Err(CursorError::Unsupported("reset")));
    }

    #[test]
    fn test_filter_retains_matching() {
        let mut f = Filter::new(IterCursor::new(0..10), |x| x % 3 == 0);
        assert_eq!(f.iter().collect::<Vec<_>>(), vec![0, 3, 6, 9]);
    }

    #[test]
    fn test_filter_all_rejected_is_exhausted() {
        let mut f = Filter::new(IterCursor::new(0..10), |_| false);
        assert!(!f.has_next());
        assert_eq!(f.next(), Err(CursorError::Exhausted));
    }

    #[test]
    fn test_transform_close_propagates() {
        let mut f = Filter::new(VecCursor::new(vec![1, 2, 3]), |_| true);
        let _ = f.next().unwrap();
        f.close();
        f.close();
        assert!(!f.has_next());
    }
}
