// SPDX-License-Identifier: MPL-2.0
//! Bounded buffer implementation for recorder storage.
//!
//! This module provides a memory-bounded, newest-first list that evicts the
//! oldest entry when capacity is reached.

use std::collections::VecDeque;

pub use crate::domain::diagnostics::{BufferCapacity, SliceSize};

/// A generic bounded buffer with fixed capacity.
///
/// When the buffer is full, pushing a new element evicts the oldest one.
/// Elements are stored newest first.
///
/// # Example
///
/// ```
/// use preview_probe::diagnostics::{BoundedBuffer, BufferCapacity};
///
/// let mut buffer: BoundedBuffer<i32> = BoundedBuffer::new(BufferCapacity::new(2));
///
/// buffer.push(1);
/// buffer.push(2);
/// buffer.push(3);
///
/// assert_eq!(buffer.all(), vec![3, 2]);
/// assert_eq!(buffer.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct BoundedBuffer<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedBuffer<T> {
    /// Creates a new buffer with the specified capacity.
    #[must_use]
    pub fn new(capacity: BufferCapacity) -> Self {
        Self::with_raw_capacity(capacity.value())
    }

    /// Creates a new buffer with a raw capacity value.
    ///
    /// This is useful for testing with small capacities.
    /// For production use, prefer [`BoundedBuffer::new`] with [`BufferCapacity`].
    #[must_use]
    pub fn with_raw_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts an element at the front, evicting the oldest if at capacity.
    pub fn push(&mut self, item: T) {
        if self.data.len() >= self.capacity {
            self.data.pop_back();
        }
        self.data.push_front(item);
    }

    /// Returns an iterator over the elements, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// Returns the number of elements in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the maximum capacity of the buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clears all elements from the buffer.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl<T: Clone> BoundedBuffer<T> {
    /// Returns a copy of every element, newest first.
    #[must_use]
    pub fn all(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }

    /// Returns a copy of the `n` newest elements (fewer if not enough stored).
    #[must_use]
    pub fn head(&self, n: usize) -> Vec<T> {
        self.data.iter().take(n).cloned().collect()
    }

    /// Returns a copy of the newest elements allowed by `slice`.
    #[must_use]
    pub fn slice(&self, slice: SliceSize) -> Vec<T> {
        self.head(slice.value())
    }
}
