// SPDX-License-Identifier: MPL-2.0
//! Builds [`DiagnosticBundle`]s from the recorders.
//!
//! Assembly is a pure read: recorders are copied, never drained.

use super::bundle::{
    BundleMetadata, BundleScope, DebugInfo, DiagnosticBundle, DomSnapshot, ProjectMetadata,
};
use super::clock::SessionClock;
use super::console::{ConsoleRecorder, LogRecord};
use super::environment::EnvironmentProbe;
use super::errors::{ErrorRecord, ErrorRecorder};
use super::interaction::{InteractionRecord, InteractionRecorder};
use super::network::{NetworkRecord, NetworkRecorder};
use super::sanitizer::{sanitize_message, UrlAnonymizer};
use super::ui_state::UiStateHandle;
use crate::config::{AppConfig, CollectorConfig, FeatureConfig, LimitsConfig, PrivacyConfig};

/// Handles to the four recorders.
#[derive(Debug, Clone)]
pub struct Recorders {
    pub console: ConsoleRecorder,
    pub errors: ErrorRecorder,
    pub network: NetworkRecorder,
    pub interactions: InteractionRecorder,
}

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    recorders: Recorders,
    environment: EnvironmentProbe,
    ui: UiStateHandle,
    clock: SessionClock,
    app: AppConfig,
    features: FeatureConfig,
    limits: LimitsConfig,
    privacy: PrivacyConfig,
    anonymizer: UrlAnonymizer,
}

impl ContextAssembler {
    #[must_use]
    pub fn new(
        config: &CollectorConfig,
        recorders: Recorders,
        environment: EnvironmentProbe,
        ui: UiStateHandle,
        clock: SessionClock,
    ) -> Self {
        Self {
            recorders,
            environment,
            ui,
            clock,
            app: config.app.clone(),
            features: config.features.clone(),
            limits: config.limits.clone(),
            privacy: config.privacy.clone(),
            anonymizer: UrlAnonymizer::new(),
        }
    }

    /// Replaces the URL anonymizer, e.g. with a seeded one in tests.
    #[must_use]
    pub fn with_anonymizer(mut self, anonymizer: UrlAnonymizer) -> Self {
        self.anonymizer = anonymizer;
        self
    }

    /// Bundle for the outgoing feedback payload, using the send slices.
    #[must_use]
    pub fn assemble_for_transmission(&self) -> DiagnosticBundle {
        let recorders = &self.recorders;
        self.assemble(
            BundleScope::Transmission,
            recorders.console.recent(self.limits.console().send.value()),
            recorders.errors.recent(self.limits.errors().send.value()),
            recorders.network.recent(self.limits.network().send.value()),
            recorders
                .interactions
                .recent(self.limits.interactions().send.value()),
        )
    }

    /// Bundle with everything currently stored, for the log viewer and
    /// debug panel.
    #[must_use]
    pub fn assemble_full(&self) -> DiagnosticBundle {
        let recorders = &self.recorders;
        self.assemble(
            BundleScope::Full,
            recorders.console.all(),
            recorders.errors.all(),
            recorders.network.all(),
            recorders.interactions.all(),
        )
    }

    /// Totals over the whole session.
    #[must_use]
    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            session_duration_ms: self.clock.elapsed_ms(),
            total_console_logs: self.recorders.console.len(),
            total_errors: self.recorders.errors.count(),
            total_network_requests: self.recorders.network.count(),
            total_interactions: self.recorders.interactions.count(),
        }
    }

    fn assemble(
        &self,
        scope: BundleScope,
        console_logs: Vec<LogRecord>,
        errors: Vec<ErrorRecord>,
        network_requests: Vec<NetworkRecord>,
        interactions: Vec<InteractionRecord>,
    ) -> DiagnosticBundle {
        let dom_snapshot = self
            .features
            .dom_snapshot_collection
            .then(|| DomSnapshot::capture(self.ui.get(), &self.app));

        DiagnosticBundle {
            metadata: BundleMetadata::new(self.clock.started_at(), scope),
            console_logs: console_logs
                .into_iter()
                .map(|record| self.scrub_log(record))
                .collect(),
            errors: errors
                .into_iter()
                .map(|record| self.scrub_error(record))
                .collect(),
            network_requests: network_requests
                .into_iter()
                .map(|record| self.scrub_network(record))
                .collect(),
            interactions,
            environment: self.environment.snapshot(),
            dom_snapshot,
            project: ProjectMetadata::from_config(&self.app, &self.features),
            debug_info: self.debug_info(),
        }
    }

    fn scrub_text(&self, text: String) -> String {
        if self.privacy.exclude_personal_data {
            sanitize_message(&text)
        } else {
            text
        }
    }

    fn scrub_log(&self, mut record: LogRecord) -> LogRecord {
        record.message = self.scrub_text(record.message);
        record
    }

    fn scrub_error(&self, mut record: ErrorRecord) -> ErrorRecord {
        record.message = self.scrub_text(record.message);
        record.stack_trace = record.stack_trace.map(|stack| self.scrub_text(stack));
        if let Some(location) = record.source_location.as_mut() {
            location.file = self.scrub_text(std::mem::take(&mut location.file));
        }
        record
    }

    fn scrub_network(&self, mut record: NetworkRecord) -> NetworkRecord {
        if self.privacy.hash_sensitive_urls {
            record.url = self.anonymizer.anonymize_url(&record.url);
        }
        record.error_message = record.error_message.map(|message| self.scrub_text(message));
        record
    }
}
