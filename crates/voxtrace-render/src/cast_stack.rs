//! Fixed-capacity work stack for AABB traversal.

use std::fmt;

use voxtrace_core::constants::CAST_STACK_CAPACITY;

/// Push onto a full [`CastStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackOverflow {
    /// Limit that was hit.
    pub limit: usize,
}

impl fmt::Display for StackOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cast stack overflow at {} entries", self.limit)
    }
}

impl std::error::Error for StackOverflow {}

/// LIFO of `(node_index, t_entry)` pairs backed by an inline array.
///
/// The stack never grows; pushing past its limit fails instead.
#[derive(Clone)]
pub struct CastStack {
    entries: [(u32, f32); CAST_STACK_CAPACITY],
    top: usize,
    limit: usize,
}

impl Default for CastStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CastStack {
    /// Empty stack with the full capacity.
    pub const fn new() -> Self {
        Self::with_limit(CAST_STACK_CAPACITY)
    }

    /// Empty stack holding at most `limit` entries, capped at the capacity.
    pub const fn with_limit(limit: usize) -> Self {
        Self {
            entries: [(0, 0.0); CAST_STACK_CAPACITY],
            top: 0,
            limit: if limit < CAST_STACK_CAPACITY {
                limit
            } else {
                CAST_STACK_CAPACITY
            },
        }
    }

    /// Push an entry.
    #[inline]
    pub fn push(&mut self, node: u32, t_entry: f32) -> Result<(), StackOverflow> {
        if self.top >= self.limit {
            return Err(StackOverflow { limit: self.limit });
        }
        self.entries[self.top] = (node, t_entry);
        self.top += 1;
        Ok(())
    }

    /// Pop the most recent entry.
    #[inline]
    pub fn pop(&mut self) -> Option<(u32, f32)> {
        if self.top == 0 {
            return None;
        }
        self.top -= 1;
        Some(self.entries[self.top])
    }

    /// Most recent entry without removing it.
    #[inline]
    pub fn peek(&self) -> Option<(u32, f32)> {
        self.top.checked_sub(1).map(|i| self.entries[i])
    }

    /// Number of entries.
    #[inline]
    pub const fn len(&self) -> usize {
        self.top
    }

    /// Whether the stack is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.top == 0
    }

    /// Maximum number of entries.
    #[inline]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Drop all entries.
    #[inline]
    pub fn clear(&mut self) {
        self.top = 0;
    }
}

impl fmt::Debug for CastStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CastStack")
            .field("entries", &&self.entries[..self.top])
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifo_order() {
        let mut stack = CastStack::new();
        stack.push(1, 0.5).unwrap();
        stack.push(2, 1.5).unwrap();
        assert_eq!(stack.peek(), Some((2, 1.5)));
        assert_eq!(stack.pop(), Some((2, 1.5)));
        assert_eq!(stack.pop(), Some((1, 0.5)));
        assert!(stack.is_empty());
    }

    #[test]
    fn underflow_is_none() {
        let mut stack = CastStack::new();
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.peek(), None);
    }

    #[test]
    fn overflow_at_capacity() {
        let mut stack = CastStack::new();
        for i in 0..CAST_STACK_CAPACITY as u32 {
            stack.push(i, i as f32).unwrap();
        }
        assert_eq!(stack.len(), CAST_STACK_CAPACITY);
        assert_eq!(
            stack.push(999, 0.0),
            Err(StackOverflow {
                limit: CAST_STACK_CAPACITY
            })
        );
        assert_eq!(stack.pop(), Some((127, 127.0)));
    }

    #[test]
    fn limit_is_capped() {
        assert_eq!(CastStack::with_limit(4).limit(), 4);
        assert_eq!(CastStack::with_limit(10_000).limit(), CAST_STACK_CAPACITY);

        let mut stack = CastStack::with_limit(1);
        stack.push(0, 0.0).unwrap();
        assert!(stack.push(1, 0.0).is_err());
        stack.clear();
        assert!(stack.push(1, 0.0).is_ok());
    }
}
