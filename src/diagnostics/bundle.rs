// SPDX-License-Identifier: MPL-2.0
//! Diagnostic bundle structures and JSON export.
//!
//! A bundle is assembled on demand from copies of recorder data; it is never
//! retained by the collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::console::LogRecord;
use super::environment::EnvironmentSnapshot;
use super::errors::ErrorRecord;
use super::interaction::InteractionRecord;
use super::network::NetworkRecord;
use super::ui_state::{StorageState, Theme, ToolbarState, UiState};
use crate::config::{AppConfig, FeatureConfig};
use crate::error::Result;

// =============================================================================
// Bundle Metadata
// =============================================================================

/// Which slice sizes a bundle was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleScope {
    /// Send slices, for the outgoing feedback payload.
    Transmission,
    /// Everything stored, for the log viewer and debug panel.
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleMetadata {
    /// Unique identifier for this bundle (UUID v4)
    pub bundle_id: String,
    /// When the bundle was assembled (ISO 8601)
    pub generated_at: String,
    /// Version of `preview_probe` that assembled the bundle
    pub collector_version: String,
    /// When the session started (ISO 8601)
    pub session_started_at: String,
    pub scope: BundleScope,
}

impl BundleMetadata {
    #[must_use]
    pub fn new(session_started_at: DateTime<Utc>, scope: BundleScope) -> Self {
        Self {
            bundle_id: Uuid::new_v4().to_string(),
            generated_at: Utc::now().to_rfc3339(),
            collector_version: env!("CARGO_PKG_VERSION").to_string(),
            session_started_at: session_started_at.to_rfc3339(),
            scope,
        }
    }
}

// =============================================================================
// DOM Snapshot
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub src: String,
    pub loaded: bool,
    pub ready_state: String,
    pub has_content: bool,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverlaySnapshot {
    pub toolbar: ToolbarState,
    pub menu_open: bool,
    pub feedback_open: bool,
    pub console_open: bool,
    pub theme: Theme,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppSnapshot {
    pub current_url: String,
    pub version: String,
}

/// Point-in-time UI state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomSnapshot {
    pub frame: FrameSnapshot,
    pub ui: OverlaySnapshot,
    pub app: AppSnapshot,
    pub storage: StorageState,
}

impl DomSnapshot {
    #[must_use]
    pub fn capture(state: UiState, app: &AppConfig) -> Self {
        Self {
            frame: FrameSnapshot {
                loaded: state.frame.loaded(),
                src: state.frame.src,
                ready_state: state.frame.ready_state,
                has_content: state.frame.has_content,
                url: state.frame.url,
            },
            ui: OverlaySnapshot {
                toolbar: state.toolbar,
                menu_open: state.menu_open,
                feedback_open: state.feedback_open,
                console_open: state.console_open,
                theme: state.theme,
            },
            app: AppSnapshot {
                current_url: app.preview_url.clone(),
                version: app.version.clone(),
            },
            storage: state.storage,
        }
    }
}

// =============================================================================
// Project Metadata
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub target_platform: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfiguration {
    pub features: FeatureConfig,
    pub preview_url: String,
    pub load_timeout_ms: u64,
}

/// Build facts stamped at compile time, `unknown` when not provided.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildInfo {
    pub build_date: String,
    pub build_hash: String,
    pub environment: String,
}

impl BuildInfo {
    #[must_use]
    pub fn current() -> Self {
        let environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        };
        Self {
            build_date: option_env!("PREVIEW_PROBE_BUILD_DATE")
                .unwrap_or("unknown")
                .to_string(),
            build_hash: option_env!("PREVIEW_PROBE_BUILD_HASH")
                .unwrap_or("unknown")
                .to_string(),
            environment: environment.to_string(),
        }
    }
}

/// Static facts about the previewed project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectMetadata {
    pub project: ProjectInfo,
    pub configuration: ProjectConfiguration,
    pub build_info: BuildInfo,
}

impl ProjectMetadata {
    #[must_use]
    pub fn from_config(app: &AppConfig, features: &FeatureConfig) -> Self {
        Self {
            project: ProjectInfo {
                name: app.name.clone(),
                version: app.version.clone(),
                description: app.description.clone(),
                author: app.author.clone(),
                target_platform: "mobile-web".to_string(),
            },
            configuration: ProjectConfiguration {
                features: features.clone(),
                preview_url: app.preview_url.clone(),
                load_timeout_ms: app.load_timeout_ms,
            },
            build_info: BuildInfo::current(),
        }
    }
}

// =============================================================================
// Debug Info
// =============================================================================

/// Derived counters over the whole session, not just the included slices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DebugInfo {
    pub session_duration_ms: u64,
    pub total_console_logs: usize,
    pub total_errors: usize,
    pub total_network_requests: usize,
    pub total_interactions: usize,
}

// =============================================================================
// Diagnostic Bundle
// =============================================================================

/// Bounded, point-in-time aggregate of recorder data and snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticBundle {
    pub metadata: BundleMetadata,
    pub console_logs: Vec<LogRecord>,
    pub errors: Vec<ErrorRecord>,
    pub network_requests: Vec<NetworkRecord>,
    pub interactions: Vec<InteractionRecord>,
    pub environment: EnvironmentSnapshot,
    /// Absent when DOM snapshot collection is off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_snapshot: Option<DomSnapshot>,
    pub project: ProjectMetadata,
    pub debug_info: DebugInfo,
}

impl DiagnosticBundle {
    /// Serializes the bundle to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
