// SPDX-License-Identifier: MPL-2.0
//! Console capture.
//!
//! Two entry points are observed:
//! - [`Console`], the four-channel console used by shell code, whose sink lives
//!   in an interceptable [`Slot`]
//! - the `log` facade, through [`LogBridge`] wrapping the original logger
//!
//! Both forward every call to the wrapped sink unchanged and keep
//! a rendered copy in the [`ConsoleRecorder`] buffer.

use super::buffer::{BoundedBuffer, BufferCapacity};
use super::clock::SessionClock;
use super::intercept::{Interception, Slot};
use crate::error::{Error, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

// =============================================================================
// Channels
// =============================================================================

/// One of the four standard console channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleChannel {
    Log,
    Info,
    Warn,
    Error,
}

impl ConsoleChannel {
    pub const ALL: [Self; 4] = [Self::Log, Self::Info, Self::Warn, Self::Error];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Maps a `log` level onto a console channel.
    #[must_use]
    pub fn from_level(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug | log::Level::Trace => Self::Log,
        }
    }
}

impl fmt::Display for ConsoleChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Re-entrancy Guard
// =============================================================================

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
}

struct CaptureGuard {
    previous: bool,
}

impl CaptureGuard {
    /// Marks capture in progress, or returns `None` if it already is.
    fn enter() -> Option<Self> {
        CAPTURING.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(Self { previous: false })
            }
        })
    }

    fn force() -> Self {
        let previous = CAPTURING.with(|flag| flag.replace(true));
        Self { previous }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CAPTURING.with(|flag| flag.set(self.previous));
    }
}

/// Runs `f` with capture suppressed on the current thread.
///
/// Console and `log` calls made inside `f` are still forwarded to their
/// original destination but are not recorded.
pub fn without_capture<R>(f: impl FnOnce() -> R) -> R {
    let _guard = CaptureGuard::force();
    f()
}

// =============================================================================
// Arguments
// =============================================================================

/// One argument passed to a console channel.
#[derive(Debug, Clone, PartialEq)]
pub enum LogArg {
    /// Strings, numbers, booleans and null render as plain text.
    Scalar(String),
    /// Composite values render as indented JSON, or `fallback` when they
    /// could not be serialized.
    Object {
        json: Option<serde_json::Value>,
        fallback: String,
    },
}

impl LogArg {
    /// Wraps a composite value.
    pub fn object<T>(value: &T) -> Self
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        Self::Object {
            json: serde_json::to_value(value).ok(),
            fallback: format!("{value:?}"),
        }
    }

    /// Wraps a value forwarded as JSON by the embedded page.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Self::Scalar(text),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Self::Object {
                fallback: value.to_string(),
                json: Some(value),
            },
            other => Self::Scalar(other.to_string()),
        }
    }

    /// Renders this argument the way it is stored in a [`LogRecord`].
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Scalar(text) => text.clone(),
            Self::Object { json, fallback } => json
                .as_ref()
                .and_then(|value| serde_json::to_string_pretty(value).ok())
                .unwrap_or_else(|| fallback.clone()),
        }
    }
}

impl From<&str> for LogArg {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for LogArg {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<i64> for LogArg {
    fn from(value: i64) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<f64> for LogArg {
    fn from(value: f64) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<bool> for LogArg {
    fn from(value: bool) -> Self {
        Self::Scalar(value.to_string())
    }
}

/// Renders every argument and joins them with a single space.
#[must_use]
pub fn render_args(args: &[LogArg]) -> String {
    args.iter()
        .map(LogArg::render)
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Console Entry Point
// =============================================================================

/// Destination of console calls.
pub trait ConsoleSink: Send + Sync {
    fn write(&self, channel: ConsoleChannel, args: &[LogArg]);
}

/// Writes `log`/`info` to stdout and `warn`/`error` to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioSink;

impl ConsoleSink for StdioSink {
    fn write(&self, channel: ConsoleChannel, args: &[LogArg]) {
        let line = render_args(args);
        match channel {
            ConsoleChannel::Log | ConsoleChannel::Info => println!("{line}"),
            ConsoleChannel::Warn | ConsoleChannel::Error => eprintln!("{line}"),
        }
    }
}

/// Four-channel console whose sink can be intercepted.
#[derive(Debug, Clone)]
pub struct Console {
    slot: Arc<Slot<dyn ConsoleSink>>,
}

impl Console {
    #[must_use]
    pub fn new(sink: Arc<dyn ConsoleSink>) -> Self {
        Self {
            slot: Arc::new(Slot::new(sink)),
        }
    }

    /// Console writing to the process's standard streams.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(Arc::new(StdioSink))
    }

    pub fn emit(&self, channel: ConsoleChannel, args: &[LogArg]) {
        self.slot.get().write(channel, args);
    }

    pub fn log(&self, args: &[LogArg]) {
        self.emit(ConsoleChannel::Log, args);
    }

    pub fn info(&self, args: &[LogArg]) {
        self.emit(ConsoleChannel::Info, args);
    }

    pub fn warn(&self, args: &[LogArg]) {
        self.emit(ConsoleChannel::Warn, args);
    }

    pub fn error(&self, args: &[LogArg]) {
        self.emit(ConsoleChannel::Error, args);
    }

    #[must_use]
    pub fn slot(&self) -> &Arc<Slot<dyn ConsoleSink>> {
        &self.slot
    }
}

// =============================================================================
// Records
// =============================================================================

/// One captured console call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub channel: ConsoleChannel,
    pub message: String,
    pub captured_at: DateTime<Utc>,
    /// Milliseconds since session start.
    pub monotonic_ms: u64,
}

/// Per-channel record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleStats {
    pub total: usize,
    pub log: usize,
    pub info: usize,
    pub warn: usize,
    pub error: usize,
}

// =============================================================================
// ConsoleRecorder
// =============================================================================

/// Callback run after each capture with the current record count.
pub type ChangeCallback = Arc<dyn Fn(usize) + Send + Sync>;

struct ConsoleInner {
    buffer: Mutex<BoundedBuffer<LogRecord>>,
    clock: SessionClock,
    on_change: RwLock<Option<ChangeCallback>>,
}

/// Bounded store of console records.
///
/// Cloning is cheap; clones share the same buffer.
#[derive(Clone)]
pub struct ConsoleRecorder {
    inner: Arc<ConsoleInner>,
}

impl fmt::Debug for ConsoleRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleRecorder")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl ConsoleRecorder {
    #[must_use]
    pub fn new(capacity: BufferCapacity, clock: SessionClock) -> Self {
        Self {
            inner: Arc::new(ConsoleInner {
                buffer: Mutex::new(BoundedBuffer::new(capacity)),
                clock,
                on_change: RwLock::new(None),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoundedBuffer<LogRecord>> {
        self.inner
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores an already rendered message.
    ///
    /// Used directly by other recorders; never passes through an intercepted
    /// channel.
    pub fn record(&self, channel: ConsoleChannel, message: impl Into<String>) {
        let record = LogRecord {
            channel,
            message: message.into(),
            captured_at: self.inner.clock.now(),
            monotonic_ms: self.inner.clock.elapsed_ms(),
        };
        let count = {
            let mut buffer = self.lock();
            buffer.push(record);
            buffer.len()
        };
        self.notify(count);
    }

    fn notify(&self, count: usize) {
        // A refresh raised from inside the panic hook would panic twice and abort.
        if std::thread::panicking() {
            return;
        }
        let callback = self
            .inner
            .on_change
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            let _ = panic::catch_unwind(AssertUnwindSafe(|| without_capture(|| callback(count))));
        }
    }

    /// Captures a console call unless capture is already in progress on this thread.
    pub fn capture(&self, channel: ConsoleChannel, args: &[LogArg]) {
        let Some(_guard) = CaptureGuard::enter() else {
            return;
        };
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            self.record(channel, render_args(args));
        }));
    }

    fn capture_message(&self, channel: ConsoleChannel, message: impl FnOnce() -> String) {
        let Some(_guard) = CaptureGuard::enter() else {
            return;
        };
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            self.record(channel, message());
        }));
    }

    /// Wraps `console`'s sink so every call is captured, then forwarded.
    pub fn intercept(&self, console: &Console) -> Interception<dyn ConsoleSink> {
        let recorder = Arc::downgrade(&self.inner);
        Slot::intercept(console.slot(), move |original| {
            Arc::new(CapturingSink { recorder, original }) as Arc<dyn ConsoleSink>
        })
    }

    /// Registers the live viewer refresh hook.
    pub fn on_change(&self, callback: impl Fn(usize) + Send + Sync + 'static) {
        *self
            .inner
            .on_change
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    /// Returns every record, newest first.
    #[must_use]
    pub fn all(&self) -> Vec<LogRecord> {
        self.lock().all()
    }

    /// Returns at most `n` newest records.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<LogRecord> {
        self.lock().head(n)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
        without_capture(|| log::debug!("console records cleared"));
    }

    #[must_use]
    pub fn stats(&self) -> ConsoleStats {
        let buffer = self.lock();
        let mut stats = ConsoleStats {
            total: buffer.len(),
            ..ConsoleStats::default()
        };
        for record in buffer.iter() {
            match record.channel {
                ConsoleChannel::Log => stats.log += 1,
                ConsoleChannel::Info => stats.info += 1,
                ConsoleChannel::Warn => stats.warn += 1,
                ConsoleChannel::Error => stats.error += 1,
            }
        }
        stats
    }

    #[must_use]
    pub fn filter_by_channel(&self, channel: ConsoleChannel) -> Vec<LogRecord> {
        self.filtered(|record| record.channel == channel)
    }

    /// Records captured within `[start, end]`.
    #[must_use]
    pub fn filter_by_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<LogRecord> {
        self.filtered(|record| record.captured_at >= start && record.captured_at <= end)
    }

    /// Case-insensitive substring search over rendered messages.
    #[must_use]
    pub fn search(&self, keyword: &str) -> Vec<LogRecord> {
        let needle = keyword.to_lowercase();
        self.filtered(|record| record.message.to_lowercase().contains(&needle))
    }

    fn filtered(&self, keep: impl Fn(&LogRecord) -> bool) -> Vec<LogRecord> {
        self.lock()
            .iter()
            .filter(|record| keep(record))
            .cloned()
            .collect()
    }

    /// One `[HH:MM:SS] CHANNEL: message` line per record, newest first.
    #[must_use]
    pub fn export_text(&self) -> String {
        self.lock()
            .iter()
            .map(|record| {
                format!(
                    "[{}] {}: {}",
                    record.captured_at.with_timezone(&Local).format("%H:%M:%S"),
                    record.channel.as_str().to_uppercase(),
                    record.message
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Pretty JSON array of every record, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if encoding fails.
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.all()).map_err(Error::from)
    }
}

struct CapturingSink {
    recorder: Weak<ConsoleInner>,
    original: Arc<dyn ConsoleSink>,
}

impl ConsoleSink for CapturingSink {
    fn write(&self, channel: ConsoleChannel, args: &[LogArg]) {
        if let Some(inner) = self.recorder.upgrade() {
            ConsoleRecorder { inner }.capture(channel, args);
        }
        self.original.write(channel, args);
    }
}

// =============================================================================
// LogBridge
// =============================================================================

/// `log::Log` implementation that captures records before forwarding them
/// to the original logger.
///
/// Only records the original logger would emit are captured.
pub struct LogBridge {
    original: Box<dyn log::Log>,
    recorder: Weak<ConsoleInner>,
    capturing: Arc<AtomicBool>,
}

impl LogBridge {
    #[must_use]
    pub fn new(original: Box<dyn log::Log>, recorder: &ConsoleRecorder) -> Self {
        Self {
            original,
            recorder: Arc::downgrade(&recorder.inner),
            capturing: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub fn handle(&self) -> LogBridgeHandle {
        LogBridgeHandle {
            capturing: Arc::clone(&self.capturing),
        }
    }

    /// Installs this bridge as the global logger.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a global logger is already set.
    pub fn install(self, max_level: log::LevelFilter) -> Result<LogBridgeHandle> {
        let handle = self.handle();
        log::set_boxed_logger(Box::new(self)).map_err(|err| Error::Config(err.to_string()))?;
        log::set_max_level(max_level);
        Ok(handle)
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.original.enabled(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.capturing.load(Ordering::Relaxed) && self.original.enabled(record.metadata()) {
            if let Some(inner) = self.recorder.upgrade() {
                ConsoleRecorder { inner }.capture_message(
                    ConsoleChannel::from_level(record.level()),
                    || record.args().to_string(),
                );
            }
        }
        self.original.log(record);
    }

    fn flush(&self) {
        self.original.flush();
    }
}

/// Control handle for an installed [`LogBridge`].
#[derive(Debug, Clone)]
pub struct LogBridgeHandle {
    capturing: Arc<AtomicBool>,
}

impl LogBridgeHandle {
    /// Stops capture; the bridge keeps forwarding to the original logger.
    pub fn restore(&self) {
        self.capturing.store(false, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct MemorySink {
        calls: Mutex<Vec<(ConsoleChannel, Vec<LogArg>)>>,
    }

    impl ConsoleSink for MemorySink {
        fn write(&self, channel: ConsoleChannel, args: &[LogArg]) {
            self.calls.lock().unwrap().push((channel, args.to_vec()));
        }
    }

    struct MemoryLogger {
        level: log::LevelFilter,
        lines: Arc<Mutex<Vec<(log::Level, String)>>>,
    }

    impl log::Log for MemoryLogger {
        fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
            metadata.level() <= self.level
        }

        fn log(&self, record: &log::Record<'_>) {
            if self.enabled(record.metadata()) {
                self.lines
                    .lock()
                    .unwrap()
                    .push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    fn recorder(capacity: usize) -> ConsoleRecorder {
        ConsoleRecorder::new(BufferCapacity::new(capacity), SessionClock::start())
    }

    fn console_with_sink() -> (Console, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        (Console::new(sink.clone()), sink)
    }

    #[test]
    fn capture_is_transparent_to_original_sink() {
        let calls = vec![
            (ConsoleChannel::Log, vec![LogArg::from("a"), LogArg::from(1_i64)]),
            (ConsoleChannel::Warn, vec![LogArg::object(&vec![1, 2])]),
            (ConsoleChannel::Error, vec![]),
            (ConsoleChannel::Info, vec![LogArg::from(true)]),
        ];

        let (plain, plain_sink) = console_with_sink();
        for (channel, args) in &calls {
            plain.emit(*channel, args);
        }

        let (observed, observed_sink) = console_with_sink();
        let recorder = recorder(50);
        let _interception = recorder.intercept(&observed);
        for (channel, args) in &calls {
            observed.emit(*channel, args);
        }

        assert_eq!(
            *plain_sink.calls.lock().unwrap(),
            *observed_sink.calls.lock().unwrap()
        );
        assert_eq!(recorder.len(), 4);
    }

    #[test]
    fn capture_renders_and_joins_arguments() {
        let (console, _sink) = console_with_sink();
        let recorder = recorder(10);
        let _interception = recorder.intercept(&console);

        console.info(&[
            LogArg::from("user"),
            LogArg::object(&serde_json::json!({"id": 7})),
        ]);

        let records = recorder.all();
        assert_eq!(records[0].channel, ConsoleChannel::Info);
        assert_eq!(records[0].message, "user {\n  \"id\": 7\n}");
    }

    #[test]
    fn unserializable_object_falls_back_to_debug_text() {
        let mut map = HashMap::new();
        map.insert((1, 2), 3);

        let arg = LogArg::object(&map);
        assert_eq!(arg.render(), format!("{map:?}"));
    }

    #[test]
    fn from_json_keeps_scalars_plain() {
        assert_eq!(LogArg::from_json(serde_json::json!("hi")).render(), "hi");
        assert_eq!(LogArg::from_json(serde_json::json!(null)).render(), "null");
        assert_eq!(LogArg::from_json(serde_json::json!(2.5)).render(), "2.5");
        assert_eq!(
            LogArg::from_json(serde_json::json!([1])).render(),
            "[\n  1\n]"
        );
    }

    #[test]
    fn restore_detaches_capture() {
        let (console, sink) = console_with_sink();
        let recorder = recorder(10);
        let interception = recorder.intercept(&console);

        console.log(&[LogArg::from("before")]);
        interception.restore();
        console.log(&[LogArg::from("after")]);

        assert_eq!(recorder.len(), 1);
        assert_eq!(sink.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn sixty_calls_keep_fifty_most_recent() {
        let (console, _sink) = console_with_sink();
        let recorder = recorder(50);
        let _interception = recorder.intercept(&console);

        for i in 0..60 {
            console.log(&[LogArg::from(format!("line {i}"))]);
        }

        let records = recorder.all();
        assert_eq!(records.len(), 50);
        assert_eq!(records[0].message, "line 59");
        assert_eq!(records[49].message, "line 10");
    }

    #[test]
    fn change_callback_logging_is_not_recaptured() {
        let (console, sink) = console_with_sink();
        let recorder = recorder(10);
        let _interception = recorder.intercept(&console);

        let refreshes = Arc::new(AtomicUsize::new(0));
        let refresh_console = console.clone();
        let counter = Arc::clone(&refreshes);
        recorder.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            refresh_console.log(&[LogArg::from("viewer refreshed")]);
        });

        console.warn(&[LogArg::from("disk almost full")]);

        assert_eq!(recorder.len(), 1);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(sink.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn clear_resets_and_allows_new_records() {
        let recorder = recorder(5);
        recorder.record(ConsoleChannel::Log, "one");
        recorder.clear();

        assert_eq!(recorder.len(), 0);
        assert!(recorder.all().is_empty());

        recorder.record(ConsoleChannel::Error, "two");
        assert_eq!(recorder.all()[0].message, "two");
    }

    #[test]
    fn stats_count_each_channel() {
        let recorder = recorder(10);
        recorder.record(ConsoleChannel::Log, "a");
        recorder.record(ConsoleChannel::Error, "b");
        recorder.record(ConsoleChannel::Error, "c");
        recorder.record(ConsoleChannel::Warn, "d");

        assert_eq!(
            recorder.stats(),
            ConsoleStats {
                total: 4,
                log: 1,
                info: 0,
                warn: 1,
                error: 2,
            }
        );
    }

    #[test]
    fn filters_and_search() {
        let recorder = recorder(10);
        recorder.record(ConsoleChannel::Info, "Loading Preview");
        recorder.record(ConsoleChannel::Error, "preview failed");
        recorder.record(ConsoleChannel::Log, "unrelated");

        assert_eq!(recorder.filter_by_channel(ConsoleChannel::Error).len(), 1);
        assert_eq!(recorder.search("PREVIEW").len(), 2);
        assert!(recorder.search("missing").is_empty());

        let all = recorder.all();
        let newest = all[0].captured_at;
        let oldest = all[2].captured_at;
        assert_eq!(recorder.filter_by_time_range(oldest, newest).len(), 3);
        let later = newest + chrono::Duration::seconds(1);
        let much_later = newest + chrono::Duration::seconds(2);
        assert!(recorder.filter_by_time_range(later, much_later).is_empty());
    }

    #[test]
    fn recent_returns_newest_slice() {
        let recorder = recorder(10);
        for i in 0..4 {
            recorder.record(ConsoleChannel::Log, format!("{i}"));
        }

        let recent: Vec<_> = recorder.recent(2).into_iter().map(|r| r.message).collect();
        assert_eq!(recent, vec!["3", "2"]);
        assert_eq!(recorder.recent(100).len(), 4);
    }

    #[test]
    fn export_text_uses_uppercase_channel() {
        let recorder = recorder(10);
        recorder.record(ConsoleChannel::Warn, "slow frame");
        recorder.record(ConsoleChannel::Error, "boom");

        let text = recorder.export_text();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] ERROR: boom"));
        assert!(lines[1].ends_with("] WARN: slow frame"));
    }

    #[test]
    fn export_json_is_array_of_records() {
        let recorder = recorder(10);
        recorder.record(ConsoleChannel::Info, "hello");

        let json = recorder.export_json().expect("export should succeed");
        let parsed: Vec<LogRecord> = serde_json::from_str(&json).expect("valid json");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].channel, ConsoleChannel::Info);
    }

    #[test]
    fn log_bridge_forwards_and_captures_enabled_records() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let recorder = recorder(10);
        let bridge = LogBridge::new(
            Box::new(MemoryLogger {
                level: log::LevelFilter::Info,
                lines: Arc::clone(&lines),
            }),
            &recorder,
        );

        log::Log::log(
            &bridge,
            &log::Record::builder()
                .args(format_args!("cache miss {}", 3))
                .level(log::Level::Warn)
                .build(),
        );
        log::Log::log(
            &bridge,
            &log::Record::builder()
                .args(format_args!("noisy"))
                .level(log::Level::Debug)
                .build(),
        );

        assert_eq!(
            *lines.lock().unwrap(),
            vec![(log::Level::Warn, "cache miss 3".to_string())]
        );
        let records = recorder.all();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].channel, ConsoleChannel::Warn);
        assert_eq!(records[0].message, "cache miss 3");
    }

    #[test]
    fn log_bridge_restore_stops_capture_only() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let recorder = recorder(10);
        let bridge = LogBridge::new(
            Box::new(MemoryLogger {
                level: log::LevelFilter::Trace,
                lines: Arc::clone(&lines),
            }),
            &recorder,
        );
        let handle = bridge.handle();
        handle.restore();

        log::Log::log(
            &bridge,
            &log::Record::builder()
                .args(format_args!("after restore"))
                .level(log::Level::Trace)
                .build(),
        );

        assert!(!handle.is_capturing());
        assert!(recorder.is_empty());
        assert_eq!(lines.lock().unwrap().len(), 1);
    }

    #[test]
    fn debug_and_trace_map_to_log_channel() {
        assert_eq!(ConsoleChannel::from_level(log::Level::Debug), ConsoleChannel::Log);
        assert_eq!(ConsoleChannel::from_level(log::Level::Trace), ConsoleChannel::Log);
        assert_eq!(ConsoleChannel::from_level(log::Level::Info), ConsoleChannel::Info);
    }
}
