// SPDX-License-Identifier: MPL-2.0
//! Environment facts read at assembly time.
//!
//! Page-side facts (user agent, display geometry, capabilities, network
//! hints, page timing) are reported by the embedded page and kept as the
//! latest [`HostEnvironment`]. Machine facts come from `sysinfo`. Anything
//! unavailable stays `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use sysinfo::System;

// =============================================================================
// Page-reported facts
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    pub user_agent: Option<String>,
    pub platform: Option<String>,
    pub language: Option<String>,
    pub cookie_enabled: Option<bool>,
    pub on_line: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub avail_width: Option<u32>,
    pub avail_height: Option<u32>,
    pub color_depth: Option<u32>,
    pub pixel_depth: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Orientation {
    pub angle: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub outer_width: Option<u32>,
    pub outer_height: Option<u32>,
    pub device_pixel_ratio: Option<f64>,
    pub orientation: Option<Orientation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayInfo {
    pub screen: ScreenInfo,
    pub viewport: ViewportInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub touch: Option<bool>,
    pub webgl: Option<bool>,
    pub webgl2: Option<bool>,
    pub webrtc: Option<bool>,
    pub service_worker: Option<bool>,
    pub local_storage: Option<bool>,
    pub session_storage: Option<bool>,
    pub indexed_db: Option<bool>,
    pub web_worker: Option<bool>,
    pub geolocation: Option<bool>,
    pub notifications: Option<bool>,
    pub camera: Option<bool>,
    pub vibration: Option<bool>,
}

/// Network-quality hints, when the platform exposes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkQuality {
    pub effective_type: Option<String>,
    pub downlink: Option<f64>,
    pub rtt: Option<u32>,
    pub save_data: Option<bool>,
}

/// Heap figures in MiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryFigures {
    pub used_mb: Option<u64>,
    pub total_mb: Option<u64>,
    pub limit_mb: Option<u64>,
}

/// Milliseconds from navigation start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageTiming {
    pub dom_content_loaded_ms: Option<i64>,
    pub page_load_ms: Option<i64>,
    pub dom_complete_ms: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationInfo {
    #[serde(rename = "type")]
    pub kind: Option<u32>,
    pub redirect_count: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagePerformance {
    pub memory: Option<MemoryFigures>,
    pub timing: Option<PageTiming>,
    pub navigation: Option<NavigationInfo>,
}

/// Latest facts reported by the embedded page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostEnvironment {
    pub basic: BasicInfo,
    pub display: Option<DisplayInfo>,
    pub capabilities: Capabilities,
    pub network: Option<NetworkQuality>,
    pub performance: Option<PagePerformance>,
}

// =============================================================================
// Machine facts
// =============================================================================

/// System information for the machine running the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os_name: String,
    pub os_version: String,
    pub kernel_version: String,
    pub cpu_arch: String,
    pub cpu_brand: String,
    pub cpu_cores: usize,
    pub ram_total_mb: u64,
}

impl SystemInfo {
    /// Collects current system information.
    ///
    /// Gathering is slow, so the first result is cached for the session.
    #[must_use]
    pub fn collect() -> Self {
        static CACHE: OnceLock<SystemInfo> = OnceLock::new();
        CACHE.get_or_init(Self::collect_uncached).clone()
    }

    fn collect_uncached() -> Self {
        let sys = System::new_all();

        let cpu_brand = sys
            .cpus()
            .first()
            .map_or_else(|| "unknown".to_string(), |cpu| cpu.brand().to_string());

        Self {
            os_name: System::name().unwrap_or_else(|| "unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "unknown".to_string()),
            kernel_version: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            cpu_arch: std::env::consts::ARCH.to_string(),
            cpu_brand,
            cpu_cores: sys.cpus().len(),
            ram_total_mb: sys.total_memory() / (1024 * 1024),
        }
    }
}

/// Memory used by the shell process, in MiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessFigures {
    pub resident_mb: u64,
    pub virtual_mb: u64,
    pub system_used_mb: u64,
}

impl ProcessFigures {
    /// Samples the current process, or `None` if the platform hides it.
    #[must_use]
    pub fn sample() -> Option<Self> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
        let process = sys.process(pid)?;
        Some(Self {
            resident_mb: process.memory() / (1024 * 1024),
            virtual_mb: process.virtual_memory() / (1024 * 1024),
            system_used_mb: sys.used_memory() / (1024 * 1024),
        })
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time environment facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub captured_at: DateTime<Utc>,
    pub basic: BasicInfo,
    pub display: Option<DisplayInfo>,
    pub capabilities: Capabilities,
    pub network: Option<NetworkQuality>,
    /// Absent when performance monitoring is off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceInfo>,
    pub system: SystemInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceInfo {
    pub page: Option<PagePerformance>,
    pub process: Option<ProcessFigures>,
}

/// Holds the latest page-reported environment and builds snapshots.
#[derive(Clone)]
pub struct EnvironmentProbe {
    host: Arc<RwLock<HostEnvironment>>,
    performance_monitoring: bool,
}

impl fmt::Debug for EnvironmentProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentProbe")
            .field("performance_monitoring", &self.performance_monitoring)
            .finish_non_exhaustive()
    }
}

impl EnvironmentProbe {
    #[must_use]
    pub fn new(performance_monitoring: bool) -> Self {
        Self {
            host: Arc::new(RwLock::new(HostEnvironment::default())),
            performance_monitoring,
        }
    }

    /// Replaces the page-reported facts.
    pub fn update(&self, host: HostEnvironment) {
        *self.host.write().unwrap_or_else(PoisonError::into_inner) = host;
    }

    #[must_use]
    pub fn host(&self) -> HostEnvironment {
        self.host
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> EnvironmentSnapshot {
        let host = self.host();
        let performance = self.performance_monitoring.then(|| PerformanceInfo {
            page: host.performance,
            process: ProcessFigures::sample(),
        });
        EnvironmentSnapshot {
            captured_at: Utc::now(),
            basic: host.basic,
            display: host.display,
            capabilities: host.capabilities,
            network: host.network,
            performance,
            system: SystemInfo::collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_info_collect_returns_valid_data() {
        let info = SystemInfo::collect();
        assert!(!info.os_name.is_empty());
        assert!(!info.cpu_arch.is_empty());
        assert!(info.cpu_cores > 0);
    }

    #[test]
    fn host_environment_accepts_partial_reports() {
        let host: HostEnvironment = serde_json::from_value(json!({
            "basic": {"user_agent": "Mozilla/5.0 (iPhone)", "on_line": true},
            "display": {"viewport": {"width": 390, "device_pixel_ratio": 3.0}}
        }))
        .expect("partial report should parse");

        assert_eq!(host.basic.user_agent.as_deref(), Some("Mozilla/5.0 (iPhone)"));
        assert_eq!(host.basic.language, None);
        let viewport = host.display.expect("display present").viewport;
        assert_eq!(viewport.width, Some(390));
        assert_eq!(viewport.height, None);
        assert!(host.network.is_none());
    }

    #[test]
    fn snapshot_omits_performance_when_disabled() {
        let probe = EnvironmentProbe::new(false);
        probe.update(HostEnvironment {
            performance: Some(PagePerformance::default()),
            ..HostEnvironment::default()
        });

        let snapshot = probe.snapshot();
        assert!(snapshot.performance.is_none());

        let json = serde_json::to_value(&snapshot).expect("serializable");
        assert!(json.get("performance").is_none());
    }

    #[test]
    fn snapshot_includes_page_performance_when_enabled() {
        let probe = EnvironmentProbe::new(true);
        let page = PagePerformance {
            memory: Some(MemoryFigures {
                used_mb: Some(12),
                total_mb: Some(20),
                limit_mb: Some(2048),
            }),
            ..PagePerformance::default()
        };
        probe.update(HostEnvironment {
            performance: Some(page),
            ..HostEnvironment::default()
        });

        let performance = probe.snapshot().performance.expect("performance present");
        assert_eq!(performance.page, Some(page));
    }

    #[test]
    fn unreported_environment_degrades_to_none() {
        let snapshot = EnvironmentProbe::new(true).snapshot();
        assert!(snapshot.display.is_none());
        assert!(snapshot.network.is_none());
        assert_eq!(snapshot.capabilities, Capabilities::default());
    }
}
