// SPDX-License-Identifier: MPL-2.0
//! Build script stamping build facts into the binary.
//!
//! Sets `PREVIEW_PROBE_BUILD_DATE` (seconds since the Unix epoch, honoring
//! `SOURCE_DATE_EPOCH`) and `PREVIEW_PROBE_BUILD_HASH` (short git commit)
//! when they can be determined. Bundles report `unknown` otherwise.

use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-changed=.git/HEAD");

    let build_date = std::env::var("SOURCE_DATE_EPOCH").ok().or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|elapsed| elapsed.as_secs().to_string())
    });
    if let Some(date) = build_date {
        println!("cargo:rustc-env=PREVIEW_PROBE_BUILD_DATE={date}");
    }

    let hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty());
    if let Some(hash) = hash {
        println!("cargo:rustc-env=PREVIEW_PROBE_BUILD_HASH={hash}");
    }
}
