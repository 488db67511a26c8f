// SPDX-License-Identifier: MPL-2.0
//! `preview_probe` collects debug context inside a mobile-web preview shell.
//!
//! It captures console output, runtime errors, outbound HTTP calls and UI
//! interactions into bounded buffers, and assembles them with environment
//! and UI snapshots into diagnostic bundles for feedback messages.

#![doc(html_root_url = "https://docs.rs/preview_probe/0.3.0")]

pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod feedback;
