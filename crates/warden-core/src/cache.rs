//! Lazily computed, explicitly invalidated values.

use parking_lot::RwLock;

#[derive(Debug)]
struct MemoState<T> {
    value: Option<T>,
    generation: u64,
}

/// A memoized value co-located with its owner.
///
/// The owner calls [`Memo::invalidate`] on the same path that performs the
/// mutation the value depends on. A value computed concurrently with an
/// invalidation is returned to its caller but not stored.
#[derive(Debug)]
pub struct Memo<T> {
    state: RwLock<MemoState<T>>,
}

impl<T: Clone> Memo<T> {
    /// Create an empty memo.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoState {
                value: None,
                generation: 0,
            }),
        }
    }

    /// Return the cached value, computing and storing it if absent.
    pub fn get_or_compute(&self, compute: impl FnOnce() -> T) -> T {
        let generation = {
            let state = self.state.read();
            if let Some(value) = &state.value {
                return value.clone();
            }
            state.generation
        };

        let value = compute();

        let mut state = self.state.write();
        if state.generation == generation && state.value.is_none() {
            state.value = Some(value.clone());
        }
        value
    }

    /// The cached value, if one is present.
    pub fn peek(&self) -> Option<T> {
        self.state.read().value.clone()
    }

    /// Drop the cached value.
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        state.value = None;
        state.generation = state.generation.wrapping_add(1);
    }
}

impl<T: Clone> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_memo_computes_once() {
        let memo = Memo::new();
        let calls = Cell::new(0);

        let compute = || {
            calls.set(calls.get() + 1);
            42
        };
        assert_eq!(memo.get_or_compute(compute), 42);
        assert_eq!(memo.get_or_compute(compute), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_memo_invalidate_recomputes() {
        let memo = Memo::new();
        assert_eq!(memo.get_or_compute(|| 1), 1);
        memo.invalidate();
        assert_eq!(memo.peek(), None);
        assert_eq!(memo.get_or_compute(|| 2), 2);
        assert_eq!(memo.peek(), Some(2));
    }

    #[test]
    fn test_memo_discards_value_raced_by_invalidation() {
        let memo = Memo::new();
        let value = memo.get_or_compute(|| {
            memo.invalidate();
            7
        });
        assert_eq!(value, 7);
        assert_eq!(memo.peek(), None);
    }
}
