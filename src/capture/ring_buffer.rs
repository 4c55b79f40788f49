//! Fixed-Capacity Frame History
//!
//! Overwrite-oldest circular buffer holding the most recent frames of the
//! stream. The segmentor reads it to measure displacement over a candidate
//! span and the window front end slices trailing windows out of it.
//!
//! Indexing:
//! - non-negative indices count from the oldest element (`0` = oldest)
//! - negative indices count from the newest element (`-1` = most recent)
//!
//! Both forms wrap modulo the storage size. Indices beyond `len()` are not
//! checked against the logical count; callers must stay within it.

use std::ops::Index;

/// Default history capacity (frames)
pub const DEFAULT_CAPACITY: usize = 512;

/// Overwrite-oldest ring buffer
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// One spare slot separates head from tail when full
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
}

impl<T> RingBuffer<T> {
    /// Create a buffer with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer holding at most `capacity` elements
    ///
    /// # Panics
    /// Panics if capacity is zero
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "Ring buffer capacity must be non-zero");

        Self {
            slots: (0..=capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
        }
    }

    /// Maximum number of elements held
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Number of elements currently held
    #[inline]
    pub fn len(&self) -> usize {
        let storage = self.slots.len();
        (self.tail + storage - self.head) % storage
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.head == (self.tail + 1) % self.slots.len()
    }

    /// Insert an element, evicting the oldest one when full
    pub fn insert(&mut self, item: T) {
        let storage = self.slots.len();
        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % storage;

        if self.tail == self.head {
            self.slots[self.head] = None;
            self.head = (self.head + 1) % storage;
        }
    }

    /// Remove and return the oldest element
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        item
    }

    /// Drop all content, keeping capacity
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.tail = 0;
    }

    /// Change capacity. Content is dropped.
    pub fn resize(&mut self, capacity: usize) {
        *self = Self::with_capacity(capacity);
    }

    /// Element at a relative index (see module docs)
    pub fn get(&self, index: isize) -> Option<&T> {
        self.slots[self.slot_index(index)].as_ref()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i as isize))
    }

    fn slot_index(&self, index: isize) -> usize {
        let storage = self.slots.len() as isize;
        let raw = if index < 0 {
            self.tail as isize + index
        } else {
            self.head as isize + index
        };
        raw.rem_euclid(storage) as usize
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copy the logical range `[start, end)` (oldest-relative indices)
    pub fn range(&self, start: usize, end: usize) -> Vec<T> {
        let end = end.min(self.len());
        (start..end)
            .filter_map(|i| self.get(i as isize).cloned())
            .collect()
    }

    /// Copy the newest `count` elements, oldest first.
    ///
    /// Returns `None` when fewer than `count` elements are held.
    pub fn trailing(&self, count: usize) -> Option<Vec<T>> {
        let len = self.len();
        if count > len {
            return None;
        }
        Some(self.range(len - count, len))
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<isize> for RingBuffer<T> {
    type Output = T;

    fn index(&self, index: isize) -> &T {
        match self.get(index) {
            Some(item) => item,
            None => panic!(
                "ring buffer index {} outside of {} held elements",
                index,
                self.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_creation() {
        let buffer: RingBuffer<u32> = RingBuffer::new();
        assert_eq!(buffer.capacity(), DEFAULT_CAPACITY);
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    #[should_panic(expected = "Ring buffer capacity must be non-zero")]
    fn test_ring_buffer_invalid_capacity() {
        let _buffer: RingBuffer<u32> = RingBuffer::with_capacity(0);
    }

    #[test]
    fn test_insert_below_capacity() {
        let mut buffer = RingBuffer::with_capacity(4);
        buffer.insert(1);
        buffer.insert(2);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer[0], 1);
        assert_eq!(buffer[1], 2);
        assert_eq!(buffer[-1], 2);
        assert_eq!(buffer[-2], 1);
    }

    #[test]
    fn test_overwrite_keeps_last_n_in_order() {
        let capacity = 5;
        for extra in 1..=12 {
            let mut buffer = RingBuffer::with_capacity(capacity);
            let total = capacity + extra;
            for i in 0..total {
                buffer.insert(i);
            }

            assert_eq!(buffer.len(), capacity);
            assert!(buffer.is_full());
            let held: Vec<usize> = buffer.iter().copied().collect();
            let expected: Vec<usize> = (total - capacity..total).collect();
            assert_eq!(held, expected);
            assert_eq!(buffer[-1], total - 1);
        }
    }

    #[test]
    fn test_newest_is_always_minus_one() {
        let mut buffer = RingBuffer::with_capacity(3);
        for i in 0..20 {
            buffer.insert(i);
            assert_eq!(buffer[-1], i);
        }
    }

    #[test]
    fn test_pop_front() {
        let mut buffer = RingBuffer::with_capacity(3);
        buffer.insert('a');
        buffer.insert('b');

        assert_eq!(buffer.pop_front(), Some('a'));
        assert_eq!(buffer.pop_front(), Some('b'));
        assert_eq!(buffer.pop_front(), None);
    }

    #[test]
    fn test_clear_and_resize_drop_content() {
        let mut buffer = RingBuffer::with_capacity(3);
        buffer.insert(1);
        buffer.insert(2);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 3);

        buffer.insert(7);
        buffer.resize(10);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 10);
    }

    #[test]
    fn test_range_and_trailing() {
        let mut buffer = RingBuffer::with_capacity(4);
        for i in 0..6 {
            buffer.insert(i);
        }
        // holds 2, 3, 4, 5
        assert_eq!(buffer.range(1, 3), vec![3, 4]);
        assert_eq!(buffer.trailing(3), Some(vec![3, 4, 5]));
        assert_eq!(buffer.trailing(5), None);
    }

    #[test]
    fn test_get_on_empty_slot_is_none() {
        let buffer: RingBuffer<u8> = RingBuffer::with_capacity(2);
        assert!(buffer.get(0).is_none());
        assert!(buffer.get(-1).is_none());
    }
}
