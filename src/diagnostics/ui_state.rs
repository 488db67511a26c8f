// SPDX-License-Identifier: MPL-2.0
//! Shell UI state shared between the shell and the assembler.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Load state of the embedded preview frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameState {
    pub src: String,
    pub ready_state: String,
    pub has_content: bool,
    /// Location reported by the frame; `unknown` when cross-origin.
    pub url: String,
}

impl Default for FrameState {
    fn default() -> Self {
        Self {
            src: String::new(),
            ready_state: "unknown".to_string(),
            has_content: false,
            url: "unknown".to_string(),
        }
    }
}

impl FrameState {
    /// A frame counts as loaded once it has a source.
    #[must_use]
    pub fn loaded(&self) -> bool {
        !self.src.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarState {
    pub visible: bool,
    pub position: String,
}

impl Default for ToolbarState {
    fn default() -> Self {
        Self {
            visible: true,
            position: "unknown".to_string(),
        }
    }
}

/// Local key/value storage as seen by the shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageState {
    pub local_keys: Vec<String>,
    pub session_entries: usize,
    /// Stored theme flag, if any.
    pub dark_mode_setting: Option<String>,
}

/// Visibility of overlays, theme and frame state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiState {
    pub frame: FrameState,
    pub toolbar: ToolbarState,
    pub menu_open: bool,
    pub feedback_open: bool,
    pub console_open: bool,
    pub theme: Theme,
    pub storage: StorageState,
}

/// Shared handle to the current [`UiState`].
#[derive(Debug, Clone, Default)]
pub struct UiStateHandle {
    state: Arc<RwLock<UiState>>,
}

impl UiStateHandle {
    #[must_use]
    pub fn new(state: UiState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn get(&self) -> UiState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, state: UiState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn update(&self, f: impl FnOnce(&mut UiState)) {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_loaded_follows_src() {
        let mut frame = FrameState::default();
        assert!(!frame.loaded());
        frame.src = "https://preview.test/p/1".into();
        assert!(frame.loaded());
    }

    #[test]
    fn handle_updates_are_visible_to_clones() {
        let handle = UiStateHandle::default();
        let reader = handle.clone();

        handle.update(|state| {
            state.theme = Theme::Dark;
            state.menu_open = true;
        });

        let state = reader.get();
        assert_eq!(state.theme, Theme::Dark);
        assert!(state.menu_open);
    }

    #[test]
    fn theme_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Theme::Dark).expect("serializable"),
            serde_json::json!("dark")
        );
    }
}
