// SPDX-License-Identifier: MPL-2.0
//! Debug-context collection for the preview shell.
//!
//! Recorders observe the shell's console, error, network and interaction
//! channels, keep bounded newest-first buffers, and feed the assembler that
//! builds diagnostic bundles on demand.
//!
//! # Architecture
//!
//! - [`BoundedBuffer`]: newest-first storage with a fixed capacity
//! - [`ConsoleRecorder`], [`ErrorRecorder`], [`NetworkRecorder`],
//!   [`InteractionRecorder`]: one recorder per channel
//! - [`Slot`] / [`Interception`]: replaceable entry points and their restorable wrappers
//! - [`ContextAssembler`]: copies bounded slices into a [`DiagnosticBundle`]
//! - [`DebugCollector`]: owns all of the above for one session
//!
//! # Privacy
//!
//! Bundles can have filesystem paths stripped from messages and URL query
//! strings replaced by a salted digest before they leave the process.

mod assembler;
mod bridge;
mod buffer;
mod bundle;
mod clock;
mod collector;
mod console;
mod environment;
mod errors;
mod export;
mod interaction;
mod intercept;
mod network;
mod sanitizer;
mod ui_state;
mod xhr;

pub use assembler::{ContextAssembler, Recorders};
pub use bridge::{HostEvent, HostEventHandle};
pub use buffer::{BoundedBuffer, BufferCapacity, SliceSize};
pub use bundle::{
    AppSnapshot, BuildInfo, BundleMetadata, BundleScope, DebugInfo, DiagnosticBundle, DomSnapshot,
    FrameSnapshot, OverlaySnapshot, ProjectConfiguration, ProjectInfo, ProjectMetadata,
};
pub use clock::SessionClock;
pub use collector::{CollectorStats, DebugCollector, Installation};
pub use console::{
    render_args, without_capture, ChangeCallback, Console, ConsoleChannel, ConsoleRecorder,
    ConsoleSink, ConsoleStats, LogArg, LogBridge, LogBridgeHandle, LogRecord, StdioSink,
};
pub use environment::{
    BasicInfo, Capabilities, DisplayInfo, EnvironmentProbe, EnvironmentSnapshot, HostEnvironment,
    MemoryFigures, NavigationInfo, NetworkQuality, Orientation, PagePerformance, PageTiming,
    PerformanceInfo, ProcessFigures, ScreenInfo, SystemInfo, ViewportInfo,
};
pub use errors::{
    ErrorKind, ErrorOptions, ErrorRecord, ErrorRecorder, PanicHookGuard, SourceLocation,
};
pub use export::{
    default_export_directory, export_bundle_to_file, generate_default_filename, write_atomic,
};
pub use interaction::{
    element_path, DomElement, ElementNode, Extra, InteractionRecord, InteractionRecorder,
};
pub use intercept::{Interception, Slot};
pub use network::{
    Fetch, FetchRequest, FetchResponse, NetworkRecord, NetworkRecorder, ObservedFetch, PendingCall,
};
pub use sanitizer::{sanitize_message, UrlAnonymizer};
pub use ui_state::{FrameState, StorageState, Theme, ToolbarState, UiState, UiStateHandle};
pub use xhr::{
    ObservedXhr, ObservedXhrFactory, ReadyState, ReadyStateCallback, ReqwestXhr,
    ReqwestXhrFactory, Xhr, XhrFactory,
};
