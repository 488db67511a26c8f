// SPDX-License-Identifier: MPL-2.0
//! Messages forwarded by the embedded page.
//!
//! The page posts JSON events from any thread through a [`HostEventHandle`].
//! Events are queued in a bounded channel and dispatched into the recorders
//! when the collector drains it.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use super::console::ConsoleChannel;
use super::environment::HostEnvironment;
use super::interaction::{ElementNode, Extra};
use super::ui_state::UiState;
use crate::config::HOST_EVENT_CHANNEL_CAPACITY;
use crate::error::Result;

/// One event reported by the embedded page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    Console {
        channel: ConsoleChannel,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },
    Error {
        message: String,
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        line: Option<u32>,
        #[serde(default)]
        column: Option<u32>,
        #[serde(default)]
        stack: Option<String>,
    },
    Rejection {
        message: String,
        #[serde(default)]
        stack: Option<String>,
    },
    Network {
        #[serde(default)]
        method: Option<String>,
        url: String,
        /// 0 when the call never completed.
        #[serde(default)]
        status_code: u16,
        #[serde(default)]
        duration_ms: u64,
        #[serde(default)]
        error_message: Option<String>,
    },
    Interaction {
        action: String,
        #[serde(default)]
        element: Option<ElementNode>,
        #[serde(default)]
        extra: Extra,
    },
    Environment(HostEnvironment),
    Ui(UiState),
}

/// Handle for posting host events to the collector.
///
/// This handle is cheap to clone and can be shared across threads.
/// Events are sent via a bounded channel so the page side never blocks.
#[derive(Clone, Debug)]
pub struct HostEventHandle {
    event_tx: Sender<HostEvent>,
}

impl HostEventHandle {
    /// Posts an event, dropping it if the channel is full.
    pub fn send(&self, event: HostEvent) {
        if let Err(TrySendError::Full(_)) = self.event_tx.try_send(event) {
            log::debug!("host event queue full, event dropped");
        }
    }

    /// Attempts to post an event, returning it if the channel is full or closed.
    ///
    /// # Errors
    ///
    /// Returns `TrySendError::Full` if the queue is full, or
    /// `TrySendError::Disconnected` if the collector has been dropped.
    pub fn try_send(&self, event: HostEvent) -> std::result::Result<(), TrySendError<HostEvent>> {
        self.event_tx.try_send(event)
    }

    /// Parses a JSON message from the page and posts it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the message is not a valid event.
    pub fn send_json(&self, message: &str) -> Result<()> {
        let event: HostEvent = serde_json::from_str(message)?;
        self.send(event);
        Ok(())
    }
}

/// Creates the bounded host event queue.
pub(crate) fn host_channel() -> (HostEventHandle, Receiver<HostEvent>) {
    let (event_tx, event_rx) = bounded(HOST_EVENT_CHANNEL_CAPACITY);
    (HostEventHandle { event_tx }, event_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_console_event() {
        let event: HostEvent = serde_json::from_value(json!({
            "type": "console",
            "channel": "warn",
            "args": ["low memory", {"free": 12}]
        }))
        .expect("valid console event");

        match event {
            HostEvent::Console { channel, args } => {
                assert_eq!(channel, ConsoleChannel::Warn);
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn parses_error_with_location() {
        let event: HostEvent = serde_json::from_value(json!({
            "type": "error",
            "message": "x is undefined",
            "file": "app.js",
            "line": 10,
            "column": 4
        }))
        .expect("valid error event");

        assert_eq!(
            event,
            HostEvent::Error {
                message: "x is undefined".into(),
                file: Some("app.js".into()),
                line: Some(10),
                column: Some(4),
                stack: None,
            }
        );
    }

    #[test]
    fn parses_environment_and_ui_payloads() {
        let env: HostEvent = serde_json::from_value(json!({
            "type": "environment",
            "basic": {"language": "en-US"}
        }))
        .expect("valid environment event");
        assert!(matches!(env, HostEvent::Environment(ref host)
            if host.basic.language.as_deref() == Some("en-US")));

        let ui: HostEvent = serde_json::from_value(json!({
            "type": "ui",
            "menu_open": true,
            "theme": "dark"
        }))
        .expect("valid ui event");
        assert!(matches!(ui, HostEvent::Ui(ref state) if state.menu_open));
    }

    #[test]
    fn send_json_rejects_unknown_type() {
        let (handle, _rx) = host_channel();
        assert!(handle.send_json(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn full_queue_drops_silently() {
        let (handle, rx) = host_channel();
        for i in 0..HOST_EVENT_CHANNEL_CAPACITY + 10 {
            handle.send(HostEvent::Rejection {
                message: format!("{i}"),
                stack: None,
            });
        }
        assert_eq!(rx.len(), HOST_EVENT_CHANNEL_CAPACITY);
    }

    #[test]
    fn try_send_reports_full() {
        let (handle, _rx) = host_channel();
        for _ in 0..HOST_EVENT_CHANNEL_CAPACITY {
            handle
                .try_send(HostEvent::Ui(UiState::default()))
                .expect("room left");
        }
        assert!(matches!(
            handle.try_send(HostEvent::Ui(UiState::default())),
            Err(TrySendError::Full(_))
        ));
    }
}
