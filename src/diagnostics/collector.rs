// SPDX-License-Identifier: MPL-2.0
//! Central debug collector.
//!
//! [`DebugCollector`] owns every recorder for one session and is the single
//! context the shell passes around. It wires interception at startup, ingests
//! host events and hands out bundles.

use std::future::Future;
use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

use super::assembler::{ContextAssembler, Recorders};
use super::bridge::{host_channel, HostEvent, HostEventHandle};
use super::bundle::DiagnosticBundle;
use super::clock::SessionClock;
use super::console::{
    without_capture, Console, ConsoleRecorder, ConsoleSink, LogArg, LogBridge, LogBridgeHandle,
};
use super::environment::EnvironmentProbe;
use super::errors::{ErrorOptions, ErrorRecorder, PanicHookGuard, SourceLocation};
use super::export::{default_export_directory, export_bundle_to_file, generate_default_filename};
use super::intercept::Interception;
use super::interaction::{DomElement, InteractionRecorder};
use super::network::{Fetch, NetworkRecord, NetworkRecorder, ObservedFetch};
use super::ui_state::UiStateHandle;
use super::xhr::{ObservedXhrFactory, XhrFactory};
use crate::config::CollectorConfig;
use crate::error::{Error, Result};

/// Record counts across the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorStats {
    pub console_logs: usize,
    pub errors: usize,
    pub network_requests: usize,
    pub interactions: usize,
    pub session_duration_ms: u64,
}

/// Debug-context collector for one preview session.
pub struct DebugCollector {
    config: CollectorConfig,
    clock: SessionClock,
    recorders: Recorders,
    environment: EnvironmentProbe,
    ui: UiStateHandle,
    assembler: ContextAssembler,
    page_console: Console,
    host_handle: HostEventHandle,
    event_rx: Receiver<HostEvent>,
}

impl std::fmt::Debug for DebugCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugCollector")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl DebugCollector {
    /// Validates `config` and builds every recorder.
    ///
    /// Nothing is intercepted until [`install`](Self::install) is called.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the limits are inconsistent.
    pub fn new(config: CollectorConfig) -> Result<Self> {
        config.validate()?;

        let clock = SessionClock::start();
        let limits = &config.limits;
        let features = &config.features;

        let console = ConsoleRecorder::new(limits.console().capacity, clock);
        let errors = ErrorRecorder::new(
            limits.errors().capacity,
            clock,
            ErrorOptions {
                enabled: features.errors_enabled(),
                collect_stack_traces: config.collection.collect_stack_traces,
                mirror_to_console: config.collection.mirror_errors_to_console,
            },
            Some(console.clone()),
        );
        let recorders = Recorders {
            console,
            errors,
            network: NetworkRecorder::new(limits.network().capacity, features.network_enabled()),
            interactions: InteractionRecorder::new(
                limits.interactions().capacity,
                features.user_interaction_tracking,
            ),
        };

        let environment = EnvironmentProbe::new(features.performance_monitoring);
        let ui = UiStateHandle::default();
        let assembler = ContextAssembler::new(
            &config,
            recorders.clone(),
            environment.clone(),
            ui.clone(),
            clock,
        );
        let (host_handle, event_rx) = host_channel();

        Ok(Self {
            config,
            clock,
            recorders,
            environment,
            ui,
            assembler,
            page_console: Console::stdio(),
            host_handle,
            event_rx,
        })
    }

    // =========================================================================
    // Wiring
    // =========================================================================

    /// Intercepts the page console and installs the panic hook, as enabled.
    #[must_use = "dropping the installation leaves interception in place for the session"]
    pub fn install(&self) -> Installation {
        let features = &self.config.features;

        let console = features
            .console_capture
            .then(|| self.recorders.console.intercept(&self.page_console));
        let panic_hook = features
            .errors_enabled()
            .then(|| self.recorders.errors.install_panic_hook());

        log::info!(
            "debug collector installed (console: {}, errors: {}, network: {})",
            console.is_some(),
            panic_hook.is_some(),
            features.network_enabled()
        );

        Installation {
            console,
            log_bridge: None,
            panic_hook,
        }
    }

    /// Like [`install`](Self::install), and also makes `original` the global
    /// logger, wrapped in a [`LogBridge`] when console capture is on.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a global logger is already set.
    pub fn install_with_logger(
        &self,
        original: Box<dyn log::Log>,
        max_level: log::LevelFilter,
    ) -> Result<Installation> {
        let log_bridge = if self.config.features.console_capture {
            Some(LogBridge::new(original, &self.recorders.console).install(max_level)?)
        } else {
            log::set_boxed_logger(original).map_err(|err| Error::Config(err.to_string()))?;
            log::set_max_level(max_level);
            None
        };

        let mut installation = self.install();
        installation.log_bridge = log_bridge;
        Ok(installation)
    }

    /// Wraps `client` so its calls are recorded.
    pub fn observe_fetch<C: Fetch>(&self, client: C) -> ObservedFetch<C> {
        self.recorders.network.observe(client)
    }

    /// Wraps `factory` so every request it creates is recorded.
    pub fn observe_xhr<F: XhrFactory>(&self, factory: F) -> ObservedXhrFactory<F> {
        ObservedXhrFactory::new(factory, self.recorders.network.clone())
    }

    /// Spawns a fire-and-forget task whose failure is recorded as an
    /// unhandled rejection.
    pub fn spawn_detached<F, T, E>(
        &self,
        handle: &tokio::runtime::Handle,
        future: F,
    ) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = std::result::Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        self.recorders.errors.spawn_detached(handle, future)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Console entry point for shell code; captured once installed.
    #[must_use]
    pub fn page_console(&self) -> &Console {
        &self.page_console
    }

    #[must_use]
    pub fn console(&self) -> &ConsoleRecorder {
        &self.recorders.console
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorRecorder {
        &self.recorders.errors
    }

    #[must_use]
    pub fn network(&self) -> &NetworkRecorder {
        &self.recorders.network
    }

    #[must_use]
    pub fn interactions(&self) -> &InteractionRecorder {
        &self.recorders.interactions
    }

    #[must_use]
    pub fn environment(&self) -> &EnvironmentProbe {
        &self.environment
    }

    #[must_use]
    pub fn ui(&self) -> &UiStateHandle {
        &self.ui
    }

    #[must_use]
    pub fn assembler(&self) -> &ContextAssembler {
        &self.assembler
    }

    // =========================================================================
    // Host events
    // =========================================================================

    /// Returns a handle the page bridge can post events through.
    #[must_use]
    pub fn host_handle(&self) -> HostEventHandle {
        self.host_handle.clone()
    }

    /// Drains queued host events into the recorders.
    ///
    /// Returns the number of events dispatched.
    pub fn process_pending(&self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            self.dispatch(event);
            processed += 1;
        }
        processed
    }

    fn dispatch(&self, event: HostEvent) {
        match event {
            HostEvent::Console { channel, args } => {
                if self.config.features.console_capture {
                    let args: Vec<LogArg> = args.into_iter().map(LogArg::from_json).collect();
                    self.recorders.console.capture(channel, &args);
                }
            }
            HostEvent::Error {
                message,
                file,
                line,
                column,
                stack,
            } => {
                let location = file.map(|file| SourceLocation {
                    file,
                    line: line.unwrap_or(0),
                    column: column.unwrap_or(0),
                });
                self.recorders
                    .errors
                    .report_runtime_error(message, location, stack);
            }
            HostEvent::Rejection { message, stack } => {
                self.recorders
                    .errors
                    .report_unhandled_rejection(message, stack);
            }
            HostEvent::Network {
                method,
                url,
                status_code,
                duration_ms,
                error_message,
            } => {
                self.recorders.network.push(NetworkRecord {
                    method: method.unwrap_or_else(|| "GET".to_string()),
                    url,
                    status_code,
                    duration_ms,
                    succeeded: error_message.is_none() && (200..300).contains(&status_code),
                    error_message,
                    captured_at: self.clock.now(),
                });
            }
            HostEvent::Interaction {
                action,
                element,
                extra,
            } => {
                self.recorders.interactions.record(
                    action,
                    element.as_ref().map(|node| node as &dyn DomElement),
                    extra,
                );
            }
            HostEvent::Environment(host) => self.environment.update(host),
            HostEvent::Ui(state) => self.ui.replace(state),
        }
    }

    // =========================================================================
    // Reads and maintenance
    // =========================================================================

    #[must_use]
    pub fn stats(&self) -> CollectorStats {
        CollectorStats {
            console_logs: self.recorders.console.len(),
            errors: self.recorders.errors.count(),
            network_requests: self.recorders.network.count(),
            interactions: self.recorders.interactions.count(),
            session_duration_ms: self.clock.elapsed_ms(),
        }
    }

    /// Empties every recorder.
    pub fn clear_all(&self) {
        self.recorders.errors.clear();
        self.recorders.network.clear();
        self.recorders.interactions.clear();
        self.recorders.console.clear();
        without_capture(|| log::info!("all diagnostic data cleared"));
    }

    /// Short plain-text summary used to prefill the feedback box.
    #[must_use]
    pub fn summary(&self) -> String {
        let stats = self.stats();
        let app = &self.config.app;
        format!(
            "Debug summary:\n\
             App: {} v{}\n\
             Session: {}s\n\
             Errors: {}\n\
             Console logs: {}\n\
             Network requests: {}",
            app.name,
            app.version,
            stats.session_duration_ms / 1000,
            stats.errors,
            stats.console_logs,
            stats.network_requests,
        )
    }

    #[must_use]
    pub fn assemble_for_transmission(&self) -> DiagnosticBundle {
        self.assembler.assemble_for_transmission()
    }

    #[must_use]
    pub fn assemble_full(&self) -> DiagnosticBundle {
        self.assembler.assemble_full()
    }

    /// Exports a full bundle as JSON.
    ///
    /// Without an explicit path the file goes to the default export
    /// directory under a timestamped name. Returns the written path.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn export_to_file(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = path.map_or_else(
            || default_export_directory().join(generate_default_filename()),
            Path::to_path_buf,
        );
        export_bundle_to_file(&self.assemble_full(), &path)?;
        Ok(path)
    }
}

/// Interceptors installed by [`DebugCollector::install`].
pub struct Installation {
    console: Option<Interception<dyn ConsoleSink>>,
    log_bridge: Option<LogBridgeHandle>,
    panic_hook: Option<PanicHookGuard>,
}

impl std::fmt::Debug for Installation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installation")
            .field("console", &self.console.is_some())
            .field("log_bridge", &self.log_bridge.is_some())
            .field("panic_hook", &self.panic_hook.is_some())
            .finish()
    }
}

impl Installation {
    /// Returns true while the page console is being captured.
    #[must_use]
    pub fn is_console_captured(&self) -> bool {
        self.console
            .as_ref()
            .is_some_and(Interception::is_active)
    }

    /// Detaches every interceptor and puts the originals back.
    pub fn restore(self) {
        if let Some(console) = self.console {
            console.restore();
        }
        if let Some(bridge) = self.log_bridge {
            bridge.restore();
        }
        if let Some(hook) = self.panic_hook {
            hook.restore();
        }
        log::info!("debug collector restored");
    }
}
