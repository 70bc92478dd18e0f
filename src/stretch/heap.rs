//! Max-heap of bin indices ordered by a borrowed magnitude array.
//!
//! The heap owns only its key storage. The magnitudes are bound for the
//! duration of one integration pass through [`MagnitudeHeap::bind`], so the
//! caller is free to rotate its history buffers between frames.

/// Reusable key storage for a magnitude-ordered max-heap.
#[derive(Debug, Clone, Default)]
pub struct MagnitudeHeap {
    keys: Vec<usize>,
}

impl MagnitudeHeap {
    /// Creates an empty heap able to hold `capacity` keys without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
        }
    }

    /// Number of keys the heap holds without reallocating.
    pub fn capacity(&self) -> usize {
        self.keys.capacity()
    }

    /// Clears the heap and orders its keys by `magnitudes` until the returned
    /// handle is dropped.
    pub fn bind<'h, 's>(&'h mut self, magnitudes: &'s [f64]) -> BoundHeap<'h, 's> {
        self.keys.clear();
        BoundHeap {
            keys: &mut self.keys,
            s: magnitudes,
        }
    }
}

/// A [`MagnitudeHeap`] bound to the magnitudes of the current frame pair.
#[derive(Debug)]
pub struct BoundHeap<'h, 's> {
    keys: &'h mut Vec<usize>,
    s: &'s [f64],
}

impl BoundHeap<'_, '_> {
    /// Number of keys in the heap.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the heap holds no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the key with the largest magnitude without removing it.
    #[inline]
    pub fn peek(&self) -> Option<usize> {
        self.keys.first().copied()
    }

    /// Inserts `key`, an index into the bound magnitudes.
    pub fn push(&mut self, key: usize) {
        debug_check!(
            key < self.s.len(),
            "key {} out of range for {} magnitudes",
            key,
            self.s.len()
        );
        let val = self.value(key);
        let mut pos = self.keys.len();
        self.keys.push(key);

        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.value(self.keys[parent]) < val {
                self.keys[pos] = self.keys[parent];
                pos = parent;
            } else {
                break;
            }
        }
        self.keys[pos] = key;
    }

    /// Removes and returns the key with the largest magnitude.
    pub fn pop(&mut self) -> Option<usize> {
        let top = self.peek()?;
        let last = self.keys.pop()?;
        let len = self.keys.len();
        if len == 0 {
            return Some(top);
        }

        let val = self.value(last);
        let mut pos = 0;
        let mut child = 1;
        while child < len {
            if child + 1 < len && self.value(self.keys[child + 1]) > self.value(self.keys[child]) {
                child += 1;
            }
            if self.value(self.keys[child]) > val {
                self.keys[pos] = self.keys[child];
                pos = child;
                child = 2 * pos + 1;
            } else {
                break;
            }
        }
        self.keys[pos] = last;
        Some(top)
    }

    #[inline]
    fn value(&self, key: usize) -> f64 {
        self.s.get(key).copied().unwrap_or(f64::NEG_INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_descending_order() {
        let s = [0.5, 3.0, 1.0, 7.0, 2.0, 0.0, 4.5, 6.0];
        let mut heap = MagnitudeHeap::with_capacity(s.len());
        let mut bound = heap.bind(&s);
        for k in 0..s.len() {
            bound.push(k);
        }
        assert_eq!(bound.len(), 8);
        assert_eq!(bound.peek(), Some(3));

        let mut popped = Vec::new();
        while let Some(k) = bound.pop() {
            popped.push(s[k]);
        }
        assert_eq!(popped, vec![7.0, 6.0, 4.5, 3.0, 2.0, 1.0, 0.5, 0.0]);
        assert!(bound.is_empty());
        assert_eq!(bound.pop(), None);
    }

    #[test]
    fn test_interleaved_push_pop() {
        let s = [1.0, 9.0, 4.0, 8.0, 2.0, 5.0];
        let mut heap = MagnitudeHeap::with_capacity(6);
        let mut bound = heap.bind(&s);
        bound.push(0);
        bound.push(2);
        assert_eq!(bound.pop(), Some(2));
        bound.push(1);
        bound.push(4);
        bound.push(5);
        assert_eq!(bound.pop(), Some(1));
        bound.push(3);
        assert_eq!(bound.pop(), Some(3));
        assert_eq!(bound.pop(), Some(5));
        assert_eq!(bound.pop(), Some(4));
        assert_eq!(bound.pop(), Some(0));
        assert_eq!(bound.pop(), None);
    }

    #[test]
    fn test_rebinding_clears_keys_and_keeps_capacity() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [4.0, 3.0, 2.0, 1.0];
        let mut heap = MagnitudeHeap::with_capacity(4);
        {
            let mut bound = heap.bind(&a);
            for k in 0..4 {
                bound.push(k);
            }
            assert_eq!(bound.peek(), Some(3));
        }
        let capacity = heap.capacity();
        let mut bound = heap.bind(&b);
        assert!(bound.is_empty());
        bound.push(3);
        bound.push(0);
        assert_eq!(bound.pop(), Some(0));
        drop(bound);
        assert_eq!(heap.capacity(), capacity);
    }
}
