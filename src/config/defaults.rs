// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for all configuration constants.
//!
//! This module serves as the single source of truth for default values
//! used across the collector. Constants are organized by category.
//!
//! # Categories
//!
//! - **Buffers**: Storage capacity bounds and per-recorder defaults
//! - **Transmission**: Slice sizes used when building a feedback bundle
//! - **Preview**: Embedded page defaults
//! - **Collection**: Capture detail limits

// ==========================================================================
// Buffer Defaults
// ==========================================================================

/// Smallest capacity a recorder buffer may have.
pub const MIN_BUFFER_CAPACITY: usize = 1;

/// Largest capacity a recorder buffer may have.
pub const MAX_BUFFER_CAPACITY: usize = 10_000;

/// Default number of console records kept in memory.
pub const DEFAULT_MAX_CONSOLE_LOGS: usize = 50;

/// Default number of error records kept in memory.
pub const DEFAULT_MAX_ERRORS: usize = 20;

/// Default number of network records kept in memory.
pub const DEFAULT_MAX_NETWORK_REQUESTS: usize = 30;

/// Default number of interaction records kept in memory.
pub const DEFAULT_MAX_USER_INTERACTIONS: usize = 50;

// ==========================================================================
// Transmission Defaults
// ==========================================================================

/// Console records included in a transmitted bundle.
pub const DEFAULT_SEND_CONSOLE_LOGS: usize = 20;

/// Error records included in a transmitted bundle.
pub const DEFAULT_SEND_ERRORS: usize = 5;

/// Network records included in a transmitted bundle.
pub const DEFAULT_SEND_NETWORK_REQUESTS: usize = 10;

/// Interaction records included in a transmitted bundle.
pub const DEFAULT_SEND_USER_INTERACTIONS: usize = 10;

/// Delay applied by the simulated feedback transport (in milliseconds).
pub const DEFAULT_TRANSPORT_DELAY_MS: u64 = 2_000;

// ==========================================================================
// Preview Defaults
// ==========================================================================

/// Page embedded by the shell when no URL is given.
pub const DEFAULT_PREVIEW_URL: &str = "https://preview.auv.spark.xd.com/p/md3z7hor";

/// Time allowed for the embedded page to load (in milliseconds).
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 15_000;

// ==========================================================================
// Collection Defaults
// ==========================================================================

/// Retention window advertised to consumers (30 minutes). Eviction is
/// capacity-based only.
pub const DEFAULT_DATA_EXPIRATION_MS: u64 = 30 * 60 * 1000;

/// Ancestor levels walked when building an element path.
pub const ELEMENT_PATH_MAX_DEPTH: usize = 5;

/// Longest stack trace kept on an error record (16 KiB).
pub const MAX_STACK_TRACE_LEN: usize = 16 * 1024;

/// Host events buffered between the embedded page and the collector.
pub const HOST_EVENT_CHANNEL_CAPACITY: usize = 100;
