//! Modulus-aware index arithmetic for circular buffers.

use std::ops::Range;

/// A position inside a circular buffer of fixed length.
///
/// All arithmetic wraps at the modulus, so the index is always a valid slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingIndex {
    pos: usize,
    modulus: usize,
}

impl RingIndex {
    /// Creates an index at `pos` (reduced modulo `modulus`).
    ///
    /// A zero modulus is treated as one so the index stays usable.
    pub fn new(pos: usize, modulus: usize) -> Self {
        let modulus = modulus.max(1);
        Self {
            pos: pos % modulus,
            modulus,
        }
    }

    /// Returns the slot this index points at.
    #[inline]
    pub fn get(self) -> usize {
        self.pos
    }

    /// Returns the buffer length the index wraps at.
    #[inline]
    pub fn modulus(self) -> usize {
        self.modulus
    }

    /// Returns the index moved forward by `n` slots.
    #[inline]
    pub fn wrapping_add(self, n: usize) -> Self {
        let n = n % self.modulus;
        let pos = if n >= self.modulus - self.pos {
            n - (self.modulus - self.pos)
        } else {
            self.pos + n
        };
        Self { pos, ..self }
    }

    /// Moves the index forward by `n` slots in place.
    #[inline]
    pub fn advance(&mut self, n: usize) {
        *self = self.wrapping_add(n);
    }

    /// Number of forward steps needed to get from `self` to `other`.
    #[inline]
    pub fn distance_to(self, other: RingIndex) -> usize {
        if other.pos >= self.pos {
            other.pos - self.pos
        } else {
            other.pos + self.modulus - self.pos
        }
    }

    /// Splits `len` consecutive slots starting at this index into the part
    /// before the wrap point and the part after it.
    ///
    /// The second range starts at slot 0 and is empty when no wrap occurs.
    /// `len` must not exceed the modulus.
    #[inline]
    pub fn spans(self, len: usize) -> (Range<usize>, Range<usize>) {
        let len = len.min(self.modulus);
        let first = len.min(self.modulus - self.pos);
        (self.pos..self.pos + first, 0..len - first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reduces_position() {
        assert_eq!(RingIndex::new(13, 5).get(), 3);
        assert_eq!(RingIndex::new(0, 0).modulus(), 1);
    }

    #[test]
    fn test_wrapping_add() {
        let idx = RingIndex::new(3, 5);
        assert_eq!(idx.wrapping_add(1).get(), 4);
        assert_eq!(idx.wrapping_add(2).get(), 0);
        assert_eq!(idx.wrapping_add(7).get(), 0);
        assert_eq!(idx.wrapping_add(5).get(), 3);
        assert_eq!(idx.wrapping_add(usize::MAX).get(), (3 + usize::MAX % 5) % 5);
    }

    #[test]
    fn test_distance() {
        let a = RingIndex::new(1, 8);
        let b = RingIndex::new(6, 8);
        assert_eq!(a.distance_to(b), 5);
        assert_eq!(b.distance_to(a), 3);
        assert_eq!(a.distance_to(a), 0);
    }

    #[test]
    fn test_distance_after_advance() {
        let start = RingIndex::new(6, 8);
        let mut end = start;
        end.advance(5);
        assert_eq!(end.get(), 3);
        assert_eq!(start.distance_to(end), 5);
    }

    #[test]
    fn test_spans_without_wrap() {
        let (a, b) = RingIndex::new(2, 10).spans(5);
        assert_eq!(a, 2..7);
        assert!(b.is_empty());
    }

    #[test]
    fn test_spans_with_wrap() {
        let (a, b) = RingIndex::new(7, 10).spans(5);
        assert_eq!(a, 7..10);
        assert_eq!(b, 0..2);
        assert_eq!(a.len() + b.len(), 5);
    }

    #[test]
    fn test_spans_exact_end() {
        let (a, b) = RingIndex::new(7, 10).spans(3);
        assert_eq!(a, 7..10);
        assert_eq!(b, 0..0);
    }
}
