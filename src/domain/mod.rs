// SPDX-License-Identifier: MPL-2.0
//! Domain layer - Core value types with ZERO external dependencies.
//!
//! This module contains pure domain types and business rules. It has no
//! dependencies on external crates (except `std`) to ensure testability.
//!
//! # Modules
//!
//! - [`diagnostics`]: Diagnostics types ([`BufferCapacity`](diagnostics::BufferCapacity),
//!   [`SliceSize`](diagnostics::SliceSize))

pub mod diagnostics;
