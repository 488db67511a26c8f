// SPDX-License-Identifier: MPL-2.0
//! Diagnostics newtypes.
//!
//! This module provides type-safe wrappers for diagnostics values,
//! ensuring they are always within valid ranges.

// =============================================================================
// Buffer Capacity Bounds
// =============================================================================

/// Buffer capacity bounds (1 to 10000 records).
pub mod buffer_capacity_bounds {
    /// Minimum buffer capacity.
    pub const MIN: usize = 1;
    /// Maximum buffer capacity.
    pub const MAX: usize = 10_000;
    /// Default buffer capacity.
    pub const DEFAULT: usize = 50;
}

// =============================================================================
// BufferCapacity
// =============================================================================

/// Storage capacity for one recorder buffer.
///
/// This newtype enforces validity at the type level, ensuring the value
/// is always within the valid range (1–10000 records).
///
/// # Example
///
/// ```
/// use preview_probe::domain::diagnostics::BufferCapacity;
///
/// let capacity = BufferCapacity::new(30);
/// assert_eq!(capacity.value(), 30);
///
/// // Values outside range are clamped
/// let too_low = BufferCapacity::new(0);
/// assert_eq!(too_low.value(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCapacity(usize);

impl BufferCapacity {
    /// Creates a new buffer capacity, clamping to valid range.
    #[must_use]
    pub fn new(value: usize) -> Self {
        Self(value.clamp(buffer_capacity_bounds::MIN, buffer_capacity_bounds::MAX))
    }

    /// Returns the value as usize.
    #[must_use]
    pub fn value(self) -> usize {
        self.0
    }

    /// Returns true if this is the minimum value.
    #[must_use]
    pub fn is_min(self) -> bool {
        self.0 <= buffer_capacity_bounds::MIN
    }

    /// Returns true if this is the maximum value.
    #[must_use]
    pub fn is_max(self) -> bool {
        self.0 >= buffer_capacity_bounds::MAX
    }
}

impl Default for BufferCapacity {
    fn default() -> Self {
        Self(buffer_capacity_bounds::DEFAULT)
    }
}

// =============================================================================
// SliceSize
// =============================================================================

/// Number of newest records copied out of a buffer for one bundle.
///
/// A slice never exceeds the capacity it reads from; [`SliceSize::within`]
/// clamps it to that capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceSize(usize);

impl SliceSize {
    /// Creates a slice size, clamping to the maximum buffer capacity.
    #[must_use]
    pub fn new(value: usize) -> Self {
        Self(value.min(buffer_capacity_bounds::MAX))
    }

    /// Returns the value as usize.
    #[must_use]
    pub fn value(self) -> usize {
        self.0
    }

    /// Clamps this slice so it never asks for more than `capacity` holds.
    #[must_use]
    pub fn within(self, capacity: BufferCapacity) -> Self {
        Self(self.0.min(capacity.value()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_capacity_clamps() {
        assert_eq!(BufferCapacity::new(0).value(), buffer_capacity_bounds::MIN);
        assert_eq!(
            BufferCapacity::new(100_000).value(),
            buffer_capacity_bounds::MAX
        );
    }

    #[test]
    fn buffer_capacity_default() {
        assert_eq!(
            BufferCapacity::default().value(),
            buffer_capacity_bounds::DEFAULT
        );
    }

    #[test]
    fn buffer_capacity_accepts_valid_values() {
        assert_eq!(BufferCapacity::new(20).value(), 20);
        assert_eq!(BufferCapacity::new(50).value(), 50);
        assert_eq!(BufferCapacity::new(5000).value(), 5000);
    }

    #[test]
    fn buffer_capacity_min_max() {
        assert!(BufferCapacity::new(buffer_capacity_bounds::MIN).is_min());
        assert!(BufferCapacity::new(buffer_capacity_bounds::MAX).is_max());
        assert!(!BufferCapacity::new(50).is_min());
        assert!(!BufferCapacity::new(50).is_max());
    }

    #[test]
    fn slice_size_within_capacity_clamps() {
        let capacity = BufferCapacity::new(20);
        assert_eq!(SliceSize::new(5).within(capacity).value(), 5);
        assert_eq!(SliceSize::new(25).within(capacity).value(), 20);
    }

    #[test]
    fn slice_size_allows_zero() {
        assert_eq!(SliceSize::new(0).value(), 0);
    }
}
