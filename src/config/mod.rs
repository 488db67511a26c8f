// SPDX-License-Identifier: MPL-2.0
//! This module handles the collector's configuration, including loading and saving
//! it to a `collector.toml` file.
//!
//! # Configuration Sections
//!
//! The configuration is organized into logical sections:
//! - `[app]` - Project metadata and the embedded preview page
//! - `[features]` - Independent on/off switches for each recorder
//! - `[limits]` - Storage capacities and transmission slice sizes
//! - `[collection]` - Capture detail options
//! - `[privacy]` - Scrubbing applied to outgoing bundles
//!
//! # Path Resolution
//!
//! 1. Use `load_from_path()`/`save_to_path()` with explicit path
//! 2. Set `PREVIEW_PROBE_CONFIG_DIR` environment variable
//! 3. Falls back to platform-specific config directory
//!
//! # Examples
//!
//! ```no_run
//! use preview_probe::config::{self, CollectorConfig};
//!
//! // Load existing configuration (returns tuple with optional warning)
//! let (mut config, _warning) = config::load();
//!
//! // Keep more console records around
//! config.limits.max_console_logs = 100;
//! config.validate().expect("limits should be consistent");
//!
//! config::save(&config).expect("Failed to save config");
//! ```

pub mod defaults;

pub use defaults::*;

use crate::domain::diagnostics::{BufferCapacity, SliceSize};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "collector.toml";

/// Application name used for directory naming.
const APP_NAME: &str = "PreviewProbe";

/// Environment variable to override the config directory.
pub const ENV_CONFIG_DIR: &str = "PREVIEW_PROBE_CONFIG_DIR";

// =============================================================================
// Section Structs
// =============================================================================

/// Project metadata and preview page settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Project name reported in bundles.
    pub name: String,
    /// Project version reported in bundles.
    pub version: String,
    /// Short project description.
    pub description: String,
    /// Project author.
    pub author: String,
    /// Page embedded by the shell.
    pub preview_url: String,
    /// Time allowed for the embedded page to load.
    pub load_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "TapCode Preview".to_string(),
            version: "1.0.0".to_string(),
            description: "Mobile debugging tool".to_string(),
            author: "TapCode Team".to_string(),
            preview_url: DEFAULT_PREVIEW_URL.to_string(),
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
        }
    }
}

/// Independent switches for each recorder.
///
/// `enhanced_debugging` is the master switch for error and network capture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    /// Master switch for error and network capture.
    pub enhanced_debugging: bool,
    /// Capture console channel calls.
    pub console_capture: bool,
    /// Capture panics and unhandled task failures.
    pub error_collection: bool,
    /// Capture outbound HTTP calls.
    pub network_request_tracking: bool,
    /// Record UI interactions.
    pub user_interaction_tracking: bool,
    /// Include the UI/DOM snapshot in bundles.
    pub dom_snapshot_collection: bool,
    /// Include memory and timing figures in bundles.
    pub performance_monitoring: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            enhanced_debugging: true,
            console_capture: true,
            error_collection: true,
            network_request_tracking: true,
            user_interaction_tracking: true,
            dom_snapshot_collection: true,
            performance_monitoring: true,
        }
    }
}

impl FeatureConfig {
    /// Whether the error recorder should be wired.
    #[must_use]
    pub fn errors_enabled(&self) -> bool {
        self.enhanced_debugging && self.error_collection
    }

    /// Whether the network recorder should observe calls.
    #[must_use]
    pub fn network_enabled(&self) -> bool {
        self.enhanced_debugging && self.network_request_tracking
    }
}

/// Storage capacities and transmission slice sizes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_console_logs: usize,
    pub max_errors: usize,
    pub max_network_requests: usize,
    pub max_user_interactions: usize,
    pub send_console_logs: usize,
    pub send_errors: usize,
    pub send_network_requests: usize,
    pub send_user_interactions: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_console_logs: DEFAULT_MAX_CONSOLE_LOGS,
            max_errors: DEFAULT_MAX_ERRORS,
            max_network_requests: DEFAULT_MAX_NETWORK_REQUESTS,
            max_user_interactions: DEFAULT_MAX_USER_INTERACTIONS,
            send_console_logs: DEFAULT_SEND_CONSOLE_LOGS,
            send_errors: DEFAULT_SEND_ERRORS,
            send_network_requests: DEFAULT_SEND_NETWORK_REQUESTS,
            send_user_interactions: DEFAULT_SEND_USER_INTERACTIONS,
        }
    }
}

/// Capacity and slice pair for one recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderLimits {
    pub capacity: BufferCapacity,
    pub send: SliceSize,
}

impl LimitsConfig {
    #[must_use]
    pub fn console(&self) -> RecorderLimits {
        Self::pair(self.max_console_logs, self.send_console_logs)
    }

    #[must_use]
    pub fn errors(&self) -> RecorderLimits {
        Self::pair(self.max_errors, self.send_errors)
    }

    #[must_use]
    pub fn network(&self) -> RecorderLimits {
        Self::pair(self.max_network_requests, self.send_network_requests)
    }

    #[must_use]
    pub fn interactions(&self) -> RecorderLimits {
        Self::pair(self.max_user_interactions, self.send_user_interactions)
    }

    fn pair(max: usize, send: usize) -> RecorderLimits {
        let capacity = BufferCapacity::new(max);
        RecorderLimits {
            capacity,
            send: SliceSize::new(send).within(capacity),
        }
    }

    /// Checks that every send slice fits inside its storage capacity.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first inconsistent pair.
    pub fn validate(&self) -> Result<()> {
        let pairs = [
            ("console_logs", self.max_console_logs, self.send_console_logs),
            ("errors", self.max_errors, self.send_errors),
            (
                "network_requests",
                self.max_network_requests,
                self.send_network_requests,
            ),
            (
                "user_interactions",
                self.max_user_interactions,
                self.send_user_interactions,
            ),
        ];

        for (name, max, send) in pairs {
            if max < MIN_BUFFER_CAPACITY || max > MAX_BUFFER_CAPACITY {
                return Err(Error::Config(format!(
                    "max_{name} must be between {MIN_BUFFER_CAPACITY} and {MAX_BUFFER_CAPACITY}, got {max}"
                )));
            }
            if send > max {
                return Err(Error::Config(format!(
                    "send_{name} ({send}) exceeds max_{name} ({max})"
                )));
            }
        }
        Ok(())
    }
}

/// Capture detail options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectionConfig {
    /// Attach backtraces to runtime error records.
    pub collect_stack_traces: bool,
    /// Also write each error as a raw `error` console record.
    pub mirror_errors_to_console: bool,
    /// Advertised retention window; not enforced beyond capacity eviction.
    pub data_expiration_ms: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            collect_stack_traces: true,
            mirror_errors_to_console: true,
            data_expiration_ms: DEFAULT_DATA_EXPIRATION_MS,
        }
    }
}

/// Scrubbing applied to outgoing bundles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Replace filesystem paths in messages with `<path>`.
    pub exclude_personal_data: bool,
    /// Replace URL query strings with a session-salted digest.
    pub hash_sensitive_urls: bool,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            exclude_personal_data: true,
            hash_sensitive_urls: true,
        }
    }
}

// =============================================================================
// Main Config Struct (Sectioned)
// =============================================================================

/// Collector configuration with logical sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CollectorConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub privacy: PrivacyConfig,
}

impl CollectorConfig {
    /// Fails fast on configurations the collector cannot honor.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a send slice exceeds its capacity or a
    /// capacity is out of range.
    pub fn validate(&self) -> Result<()> {
        self.limits.validate()
    }
}

// =============================================================================
// Config Path Resolution
// =============================================================================

/// Returns the config directory, honoring an explicit override first.
fn get_config_dir_with_override(base_dir: Option<PathBuf>) -> Option<PathBuf> {
    base_dir
        .or_else(|| std::env::var_os(ENV_CONFIG_DIR).map(PathBuf::from))
        .or_else(|| {
            dirs::config_dir().map(|mut path| {
                path.push(APP_NAME);
                path
            })
        })
}

fn get_config_path_with_override(base_dir: Option<PathBuf>) -> Option<PathBuf> {
    get_config_dir_with_override(base_dir).map(|mut path| {
        path.push(CONFIG_FILE);
        path
    })
}

// =============================================================================
// Load / Save Functions
// =============================================================================

/// Loads the configuration from the default path.
///
/// Returns a tuple of (config, optional_warning). If loading fails, returns
/// default config with a warning message explaining what went wrong.
pub fn load() -> (CollectorConfig, Option<String>) {
    load_with_override(None)
}

/// Loads the configuration from a custom directory.
pub fn load_with_override(base_dir: Option<PathBuf>) -> (CollectorConfig, Option<String>) {
    if let Some(path) = get_config_path_with_override(base_dir) {
        if path.exists() {
            match load_from_path(&path) {
                Ok(config) => return (config, None),
                Err(err) => {
                    return (
                        CollectorConfig::default(),
                        Some(format!("config at {} ignored: {err}", path.display())),
                    );
                }
            }
        }
    }
    (CollectorConfig::default(), None)
}

/// Loads configuration from a specific path.
///
/// Unparseable TOML falls back to the defaults; a parseable file with
/// inconsistent limits is rejected.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read and `Error::Config` if
/// validation fails.
pub fn load_from_path(path: &Path) -> Result<CollectorConfig> {
    let content = fs::read_to_string(path)?;
    let config: CollectorConfig = toml::from_str(&content).unwrap_or_default();
    config.validate()?;
    Ok(config)
}

/// Saves the configuration to the default path.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save(config: &CollectorConfig) -> Result<()> {
    if let Some(path) = get_config_path_with_override(None) {
        return save_to_path(config, &path);
    }
    Ok(())
}

/// Saves configuration to a specific path, creating parent directories.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn save_to_path(config: &CollectorConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
