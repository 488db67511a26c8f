// SPDX-License-Identifier: MPL-2.0
//! File export for diagnostic bundles.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;

use super::bundle::DiagnosticBundle;
use crate::error::Result;

// =============================================================================
// Filename Generation
// =============================================================================

/// Generates a default filename for exported bundles.
///
/// Format: `preview_probe_diagnostics_YYYYMMDD_HHMMSS.json`
///
/// Uses local time for user-friendly filenames.
#[must_use]
pub fn generate_default_filename() -> String {
    let now = Local::now();
    format!(
        "preview_probe_diagnostics_{}.json",
        now.format("%Y%m%d_%H%M%S")
    )
}

/// Returns the default directory for exported bundles.
///
/// Uses the user's Documents folder if available, otherwise falls back
/// to the current directory.
#[must_use]
pub fn default_export_directory() -> PathBuf {
    dirs::document_dir().unwrap_or_else(|| std::env::current_dir().unwrap_or_default())
}

// =============================================================================
// Atomic File Write
// =============================================================================

/// Writes content to a file atomically.
///
/// Uses a temporary file with `.tmp` extension, then renames to the final path.
/// This prevents partial writes from corrupting the target file.
///
/// # Errors
///
/// Returns an error if writing or renaming fails.
pub fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let temp_path = path.with_extension("json.tmp");

    fs::write(&temp_path, content)?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}

/// Writes `bundle` as pretty JSON to `path`, creating parent directories.
///
/// # Errors
///
/// Returns `Error::Serialization` if encoding fails or `Error::Io` if the
/// file cannot be written.
pub fn export_bundle_to_file(bundle: &DiagnosticBundle, path: &Path) -> Result<()> {
    let json = bundle.to_json()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_atomic(path, &json)?;
    log::info!("diagnostic bundle exported ({} bytes)", json.len());
    Ok(())
}
