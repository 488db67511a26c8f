// SPDX-License-Identifier: MPL-2.0
//! Scrubbing applied to outgoing bundles.
//!
//! This module provides:
//! - Message sanitization to remove filesystem paths
//! - URL query anonymization with a session-unique salt

use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

// =============================================================================
// Message Sanitization
// =============================================================================

/// Compiled regex patterns for path detection.
static PATH_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    // Path continues until whitespace or common delimiters (quotes, parens, brackets)
    Regex::new(concat!(
        r#"("#,
        r#"file:///[^\s"'()\[\]]+"#,     // file URLs
        r#"|/home/[^\s"'()\[\]]+"#,      // Linux home
        r#"|/Users/[^\s"'()\[\]]+"#,     // macOS home
        r#"|/tmp/[^\s"'()\[\]]+"#,       // Temp directory
        r#"|/var/[^\s"'()\[\]]+"#,       // Variable data (Android app data too)
        r#"|/data/[^\s"'()\[\]]+"#,      // Android internal storage
        r#"|/private/[^\s"'()\[\]]+"#,   // iOS sandbox
        r#"|~/[^\s"'()\[\]]+"#,          // Home shortcut
        r#"|[A-Za-z]:\\[^\s"'()\[\]]+"#, // Windows drive paths
        r#"|\\\\[^\s"'()\[\]]+"#,        // Windows UNC paths
        r#")"#,
    ))
    .expect("path regex should compile")
});

/// Replaces filesystem paths in `message` with `<path>`.
///
/// # Examples
///
/// ```
/// use preview_probe::diagnostics::sanitize_message;
///
/// let msg = "Failed to open /home/user/notes.txt";
/// assert_eq!(sanitize_message(msg), "Failed to open <path>");
///
/// let msg = "Invalid format";
/// assert_eq!(sanitize_message(msg), "Invalid format");
/// ```
#[must_use]
pub fn sanitize_message(message: &str) -> String {
    PATH_PATTERNS.replace_all(message, "<path>").into_owned()
}

// =============================================================================
// URL Anonymization
// =============================================================================

/// Replaces URL query strings with a salted digest.
///
/// The same query always maps to the same digest within one session, so
/// repeated calls stay correlated without exposing tokens or identifiers.
#[derive(Debug, Clone)]
pub struct UrlAnonymizer {
    salt: [u8; 32],
}

impl UrlAnonymizer {
    /// Creates an anonymizer with a random session salt.
    ///
    /// Falls back to a salt derived from the clock and process id if the
    /// operating system cannot provide random bytes.
    #[must_use]
    pub fn new() -> Self {
        let mut salt = [0u8; 32];
        if let Err(err) = getrandom::fill(&mut salt) {
            log::warn!("random salt unavailable ({err}), using time-derived salt");
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| elapsed.as_nanos());
            let mut hasher = blake3::Hasher::new();
            hasher.update(&nanos.to_le_bytes());
            hasher.update(&std::process::id().to_le_bytes());
            salt.copy_from_slice(hasher.finalize().as_bytes());
        }
        Self { salt }
    }

    /// Creates an anonymizer with a deterministic seed, for tests.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&seed.to_le_bytes());
        hasher.update(b"preview_probe_url_anonymizer_seed");

        let mut salt = [0u8; 32];
        salt.copy_from_slice(hasher.finalize().as_bytes());
        Self { salt }
    }

    fn hash(&self, value: &str) -> String {
        let mut hasher = blake3::Hasher::new_keyed(&self.salt);
        hasher.update(value.as_bytes());
        hasher.finalize().to_hex()[..8].to_string()
    }

    /// Replaces everything after the first `?` with `<q:xxxxxxxx>`.
    ///
    /// URLs without a query are returned unchanged.
    #[must_use]
    pub fn anonymize_url(&self, url: &str) -> String {
        match url.split_once('?') {
            Some((base, query)) if !query.is_empty() => {
                format!("{base}?<q:{}>", self.hash(query))
            }
            _ => url.to_string(),
        }
    }
}

impl Default for UrlAnonymizer {
    fn default() -> Self {
        Self::new()
    }
}
