// SPDX-License-Identifier: MPL-2.0
//! Diagnostics domain types.
//!
//! This module provides pure domain types for diagnostics:
//! - [`BufferCapacity`]: Storage capacity of a recorder buffer
//! - [`SliceSize`]: Number of records copied into a bundle

mod newtypes;

pub use newtypes::{buffer_capacity_bounds, BufferCapacity, SliceSize};
