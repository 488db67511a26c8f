// SPDX-License-Identifier: MPL-2.0
//! Runtime error and unhandled rejection capture.
//!
//! Runtime errors come from the process panic hook or are reported by the
//! embedded page. Unhandled rejections come from detached tasks that finish
//! with an error. Existing reporting is never suppressed: the previous panic
//! hook always runs after capture.

use super::buffer::{BoundedBuffer, BufferCapacity};
use super::clock::SessionClock;
use super::console::{ConsoleChannel, ConsoleRecorder};
use crate::config::MAX_STACK_TRACE_LEN;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::future::Future;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Runtime,
    UnhandledRejection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub source_location: Option<SourceLocation>,
    pub stack_trace: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// Capture switches for the error recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorOptions {
    /// When false every report is ignored.
    pub enabled: bool,
    pub collect_stack_traces: bool,
    /// Also write `Global Error: <message>` into the console buffer.
    pub mirror_to_console: bool,
}

impl Default for ErrorOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            collect_stack_traces: true,
            mirror_to_console: true,
        }
    }
}

struct ErrorInner {
    buffer: Mutex<BoundedBuffer<ErrorRecord>>,
    clock: SessionClock,
    options: ErrorOptions,
    console: Option<ConsoleRecorder>,
}

/// Bounded store of error records.
#[derive(Clone)]
pub struct ErrorRecorder {
    inner: Arc<ErrorInner>,
}

impl fmt::Debug for ErrorRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRecorder")
            .field("count", &self.count())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl ErrorRecorder {
    /// `console` receives mirrored records when mirroring is enabled.
    #[must_use]
    pub fn new(
        capacity: BufferCapacity,
        clock: SessionClock,
        options: ErrorOptions,
        console: Option<ConsoleRecorder>,
    ) -> Self {
        Self {
            inner: Arc::new(ErrorInner {
                buffer: Mutex::new(BoundedBuffer::new(capacity)),
                clock,
                options,
                console,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoundedBuffer<ErrorRecord>> {
        self.inner
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn options(&self) -> ErrorOptions {
        self.inner.options
    }

    fn push(
        &self,
        kind: ErrorKind,
        message: String,
        source_location: Option<SourceLocation>,
        stack_trace: Option<String>,
    ) {
        let options = self.inner.options;
        if !options.enabled {
            return;
        }

        let stack_trace = if options.collect_stack_traces {
            stack_trace.map(truncate_stack)
        } else {
            None
        };
        let mirrored = options
            .mirror_to_console
            .then(|| format!("Global Error: {message}"));

        self.lock().push(ErrorRecord {
            kind,
            message,
            source_location,
            stack_trace,
            captured_at: self.inner.clock.now(),
        });

        if let (Some(console), Some(line)) = (&self.inner.console, mirrored) {
            console.record(ConsoleChannel::Error, line);
        }
    }

    /// Records an uncaught runtime error.
    pub fn report_runtime_error(
        &self,
        message: impl Into<String>,
        source_location: Option<SourceLocation>,
        stack_trace: Option<String>,
    ) {
        self.push(ErrorKind::Runtime, message.into(), source_location, stack_trace);
    }

    /// Records an unhandled rejection from its textual form.
    pub fn report_unhandled_rejection(
        &self,
        message: impl Into<String>,
        stack_trace: Option<String>,
    ) {
        self.push(ErrorKind::UnhandledRejection, message.into(), None, stack_trace);
    }

    /// Records an unhandled rejection carrying a Rust error value.
    ///
    /// The `source()` chain, when present, stands in for the stack trace.
    pub fn report_rejection_error(&self, err: &(dyn std::error::Error + 'static)) {
        self.report_unhandled_rejection(err.to_string(), source_chain(err));
    }

    /// Installs a panic hook that records each panic, then runs the previous hook.
    pub fn install_panic_hook(&self) -> PanicHookGuard {
        let previous: Arc<PanicHook> = Arc::new(panic::take_hook());
        let recorder = Arc::downgrade(&self.inner);
        let chained = Arc::clone(&previous);
        panic::set_hook(Box::new(move |info| {
            record_panic(&recorder, info);
            chained(info);
        }));
        log::debug!("panic hook installed");
        PanicHookGuard {
            previous: Some(previous),
        }
    }

    /// Spawns `future` on `handle` and records its error as an unhandled rejection.
    ///
    /// Panics inside the task are recorded as rejections with the panic message.
    /// Cancelled tasks are not recorded.
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
        let recorder = self.clone();
        let task = handle.spawn(future);
        handle.spawn(async move {
            match task.await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => recorder.report_rejection_error(&err),
                Err(join_err) if join_err.is_panic() => {
                    let payload = join_err.into_panic();
                    recorder.report_unhandled_rejection(panic_message(payload.as_ref()), None);
                }
                Err(_) => {}
            }
        })
    }

    /// Returns every record, newest first.
    #[must_use]
    pub fn all(&self) -> Vec<ErrorRecord> {
        self.lock().all()
    }

    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<ErrorRecord> {
        self.lock().head(n)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Keeps the panic hook that was active before [`ErrorRecorder::install_panic_hook`].
///
/// Dropping the guard leaves the recording hook installed.
pub struct PanicHookGuard {
    previous: Option<Arc<PanicHook>>,
}

impl fmt::Debug for PanicHookGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanicHookGuard").finish_non_exhaustive()
    }
}

impl PanicHookGuard {
    /// Puts the previous panic hook back.
    pub fn restore(mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        // Drops the recording hook and its reference to `previous`.
        drop(panic::take_hook());
        match Arc::try_unwrap(previous) {
            Ok(hook) => panic::set_hook(hook),
            Err(shared) => panic::set_hook(Box::new(move |info| shared(info))),
        }
        log::debug!("panic hook restored");
    }
}

fn record_panic(recorder: &Weak<ErrorInner>, info: &PanicHookInfo<'_>) {
    let Some(inner) = recorder.upgrade() else {
        return;
    };
    let recorder = ErrorRecorder { inner };
    let stack_trace = recorder
        .options()
        .collect_stack_traces
        .then(|| Backtrace::force_capture().to_string());
    let location = info.location().map(|loc| SourceLocation {
        file: loc.file().to_string(),
        line: loc.line(),
        column: loc.column(),
    });
    recorder.report_runtime_error(panic_message(info.payload()), location, stack_trace);
}

/// Extracts the message carried by a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn source_chain(err: &(dyn std::error::Error + 'static)) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        lines.push(format!("caused by: {cause}"));
        current = cause.source();
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn truncate_stack(mut stack: String) -> String {
    if stack.len() > MAX_STACK_TRACE_LEN {
        let mut end = MAX_STACK_TRACE_LEN;
        while !stack.is_char_boundary(end) {
            end -= 1;
        }
        stack.truncate(end);
        stack.push_str("\n... [truncated]");
    }
    stack
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Wrapped {
        message: &'static str,
        source: Option<Box<Wrapped>>,
    }

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.source
                .as_deref()
                .map(|source| source as &(dyn std::error::Error + 'static))
        }
    }

    fn recorder_with(options: ErrorOptions, console: Option<ConsoleRecorder>) -> ErrorRecorder {
        ErrorRecorder::new(BufferCapacity::new(20), SessionClock::start(), options, console)
    }

    #[test]
    fn runtime_error_keeps_location_and_stack() {
        let recorder = recorder_with(ErrorOptions::default(), None);
        recorder.report_runtime_error(
            "x is undefined",
            Some(SourceLocation {
                file: "app.js".into(),
                line: 10,
                column: 4,
            }),
            Some("at main (app.js:10:4)".into()),
        );

        let records = recorder.all();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ErrorKind::Runtime);
        assert_eq!(
            records[0].source_location.as_ref().map(ToString::to_string),
            Some("app.js:10:4".to_string())
        );
        assert!(records[0].stack_trace.is_some());
    }

    #[test]
    fn stack_traces_dropped_when_disabled() {
        let options = ErrorOptions {
            collect_stack_traces: false,
            ..ErrorOptions::default()
        };
        let recorder = recorder_with(options, None);
        recorder.report_unhandled_rejection("timeout", Some("stack".into()));

        assert_eq!(recorder.all()[0].stack_trace, None);
    }

    #[test]
    fn disabled_recorder_ignores_reports() {
        let options = ErrorOptions {
            enabled: false,
            ..ErrorOptions::default()
        };
        let recorder = recorder_with(options, None);
        recorder.report_runtime_error("ignored", None, None);

        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn mirror_writes_raw_console_record() {
        let console = ConsoleRecorder::new(BufferCapacity::new(10), SessionClock::start());
        let recorder = recorder_with(ErrorOptions::default(), Some(console.clone()));

        recorder.report_runtime_error("boom", None, None);

        let logs = console.all();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].channel, ConsoleChannel::Error);
        assert_eq!(logs[0].message, "Global Error: boom");
    }

    #[test]
    fn rejection_error_uses_source_chain_as_stack() {
        let recorder = recorder_with(ErrorOptions::default(), None);
        let err = Wrapped {
            message: "request failed",
            source: Some(Box::new(Wrapped {
                message: "connection reset",
                source: None,
            })),
        };

        recorder.report_rejection_error(&err);

        let record = &recorder.all()[0];
        assert_eq!(record.kind, ErrorKind::UnhandledRejection);
        assert_eq!(record.message, "request failed");
        assert_eq!(record.stack_trace.as_deref(), Some("caused by: connection reset"));
    }

    #[test]
    fn twenty_errors_keep_newest_first() {
        let recorder = recorder_with(ErrorOptions::default(), None);
        for i in 0..25 {
            recorder.report_runtime_error(format!("error {i}"), None, None);
        }

        assert_eq!(recorder.count(), 20);
        let recent: Vec<_> = recorder.recent(5).into_iter().map(|r| r.message).collect();
        assert_eq!(
            recent,
            vec!["error 24", "error 23", "error 22", "error 21", "error 20"]
        );
    }

    #[test]
    fn clear_resets_count() {
        let recorder = recorder_with(ErrorOptions::default(), None);
        recorder.report_runtime_error("a", None, None);
        recorder.clear();

        assert_eq!(recorder.count(), 0);
        assert!(recorder.all().is_empty());
    }

    #[test]
    fn long_stack_is_truncated() {
        let stack = "é".repeat(MAX_STACK_TRACE_LEN);
        let truncated = truncate_stack(stack);
        assert!(truncated.ends_with("[truncated]"));
        assert!(truncated.len() <= MAX_STACK_TRACE_LEN + 20);
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let text: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(42_u8);

        assert_eq!(panic_message(text.as_ref()), "static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "unknown panic payload");
    }

    #[tokio::test]
    async fn detached_task_error_becomes_rejection() {
        let recorder = recorder_with(ErrorOptions::default(), None);
        let handle = tokio::runtime::Handle::current();

        let watcher = recorder.spawn_detached(&handle, async {
            Err::<(), _>(std::io::Error::other("socket closed"))
        });
        watcher.await.expect("watcher should finish");

        let records = recorder.all();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ErrorKind::UnhandledRejection);
        assert_eq!(records[0].message, "socket closed");
    }

    #[tokio::test]
    async fn detached_task_success_records_nothing() {
        let recorder = recorder_with(ErrorOptions::default(), None);
        let handle = tokio::runtime::Handle::current();

        let watcher =
            recorder.spawn_detached(&handle, async { Ok::<_, std::io::Error>(5) });
        watcher.await.expect("watcher should finish");

        assert_eq!(recorder.count(), 0);
    }
}
