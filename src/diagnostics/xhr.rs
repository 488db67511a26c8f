// SPDX-License-Identifier: MPL-2.0
//! Outbound HTTP call capture for callback-style calls.
//!
//! [`ObservedXhrFactory`] stands in for the original factory. Each
//! [`ObservedXhr`] it creates captures method and URL on `open` and keeps a
//! recording callback on the inner call, so the finalized record is pushed
//! before the caller's callback sees the terminal state. The caller's
//! callback still sees every transition, whenever it was registered.

use super::network::{NetworkRecorder, PendingCall};
use futures_util::StreamExt;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Progress of a callback-style call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadyState {
    Unsent,
    Opened,
    HeadersReceived,
    Loading,
    Done,
}

/// Invoked on every ready-state transition with the current status (0 until
/// headers arrive or when the call failed).
pub type ReadyStateCallback = Box<dyn FnMut(ReadyState, u16) + Send>;

/// Callback-style HTTP call.
pub trait Xhr: Send {
    fn open(&mut self, method: &str, url: &str);
    fn set_on_ready_state_change(&mut self, callback: ReadyStateCallback);
    fn send(&mut self, body: Option<Vec<u8>>);
    fn ready_state(&self) -> ReadyState;
    fn status(&self) -> u16;
}

/// Constructor for [`Xhr`] instances.
pub trait XhrFactory: Send + Sync {
    type Xhr: Xhr;

    fn create(&self) -> Self::Xhr;
}

// =============================================================================
// Observed wrappers
// =============================================================================

/// Factory producing observed calls.
#[derive(Debug, Clone)]
pub struct ObservedXhrFactory<F> {
    inner: F,
    recorder: NetworkRecorder,
}

impl<F: XhrFactory> ObservedXhrFactory<F> {
    #[must_use]
    pub fn new(inner: F, recorder: NetworkRecorder) -> Self {
        Self { inner, recorder }
    }

    /// Hands the original factory back.
    pub fn restore(self) -> F {
        self.inner
    }
}

impl<F: XhrFactory> XhrFactory for ObservedXhrFactory<F> {
    type Xhr = ObservedXhr<F::Xhr>;

    fn create(&self) -> Self::Xhr {
        let pending = Arc::new(Mutex::new(None));
        let callback = Arc::new(Mutex::new(None));
        let mut inner = self.inner.create();
        inner.set_on_ready_state_change(observing_callback(
            self.recorder.clone(),
            Arc::clone(&pending),
            Arc::clone(&callback),
        ));
        ObservedXhr {
            inner,
            pending,
            callback,
        }
    }
}

type SharedPending = Arc<Mutex<Option<PendingCall>>>;
type SharedCallback = Arc<Mutex<Option<ReadyStateCallback>>>;

/// Installed on the inner call once, for its whole life. Pushes the record
/// for the current request on `Done`, then hands the transition to whatever
/// callback the caller registered last.
fn observing_callback(
    recorder: NetworkRecorder,
    pending: SharedPending,
    callback: SharedCallback,
) -> ReadyStateCallback {
    Box::new(move |state, status| {
        if state == ReadyState::Done {
            let call = pending.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(call) = call {
                recorder.push(call.complete(status));
            }
        }
        if let Some(callback) = callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            callback(state, status);
        }
    })
}

/// Call wrapper that records the terminal state of each request.
pub struct ObservedXhr<X> {
    inner: X,
    pending: SharedPending,
    callback: SharedCallback,
}

impl<X: fmt::Debug> fmt::Debug for ObservedXhr<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedXhr")
            .field("inner", &self.inner)
            .field(
                "pending",
                &*self.pending.lock().unwrap_or_else(PoisonError::into_inner),
            )
            .finish_non_exhaustive()
    }
}

impl<X: Xhr> Xhr for ObservedXhr<X> {
    fn open(&mut self, method: &str, url: &str) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(PendingCall::open(Some(method), url));
        self.inner.open(method, url);
    }

    fn set_on_ready_state_change(&mut self, callback: ReadyStateCallback) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn send(&mut self, body: Option<Vec<u8>>) {
        self.inner.send(body);
    }

    fn ready_state(&self) -> ReadyState {
        self.inner.ready_state()
    }

    fn status(&self) -> u16 {
        self.inner.status()
    }
}

// =============================================================================
// reqwest-backed implementation
// =============================================================================

#[derive(Debug, Default)]
struct XhrShared {
    state: Option<ReadyState>,
    status: u16,
    response: Option<Vec<u8>>,
}

/// Callback-style call driven by a tokio task.
pub struct ReqwestXhr {
    client: reqwest::Client,
    runtime: tokio::runtime::Handle,
    request: Option<(reqwest::Method, String)>,
    callback: SharedCallback,
    shared: Arc<Mutex<XhrShared>>,
}

impl fmt::Debug for ReqwestXhr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestXhr")
            .field("request", &self.request)
            .field("ready_state", &self.ready_state())
            .finish_non_exhaustive()
    }
}

impl ReqwestXhr {
    #[must_use]
    pub fn new(client: reqwest::Client, runtime: tokio::runtime::Handle) -> Self {
        Self {
            client,
            runtime,
            request: None,
            callback: Arc::new(Mutex::new(None)),
            shared: Arc::new(Mutex::new(XhrShared::default())),
        }
    }

    /// Response body once the call is done.
    #[must_use]
    pub fn response_body(&self) -> Option<Vec<u8>> {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .response
            .clone()
    }

    fn transition(
        shared: &Mutex<XhrShared>,
        callback: &Mutex<Option<ReadyStateCallback>>,
        state: ReadyState,
        status: u16,
    ) {
        {
            let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
            guard.state = Some(state);
            guard.status = status;
        }
        if let Some(callback) = callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            callback(state, status);
        }
    }
}

impl Xhr for ReqwestXhr {
    fn open(&mut self, method: &str, url: &str) {
        let method = match reqwest::Method::from_bytes(method.as_bytes()) {
            Ok(method) => method,
            Err(err) => {
                log::warn!("ignoring open with invalid method {method:?}: {err}");
                return;
            }
        };
        self.request = Some((method, url.to_string()));
        Self::transition(&self.shared, &self.callback, ReadyState::Opened, 0);
    }

    fn set_on_ready_state_change(&mut self, callback: ReadyStateCallback) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn send(&mut self, body: Option<Vec<u8>>) {
        let Some((method, url)) = self.request.take() else {
            log::warn!("send called before open");
            return;
        };
        let mut builder = self.client.request(method, url);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let shared = Arc::clone(&self.shared);
        let callback = Arc::clone(&self.callback);
        self.runtime.spawn(async move {
            let transition = |state: ReadyState, status: u16| {
                Self::transition(&shared, &callback, state, status);
            };
            let response = match builder.send().await {
                Ok(response) => response,
                Err(_) => {
                    transition(ReadyState::Done, 0);
                    return;
                }
            };
            let status = response.status().as_u16();
            transition(ReadyState::HeadersReceived, status);

            let mut body = Vec::new();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(chunk) => {
                        body.extend_from_slice(&chunk);
                        transition(ReadyState::Loading, status);
                    }
                    Err(err) => {
                        log::debug!("response body interrupted: {err}");
                        break;
                    }
                }
            }
            shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .response = Some(body);
            transition(ReadyState::Done, status);
        });
    }

    fn ready_state(&self) -> ReadyState {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .unwrap_or(ReadyState::Unsent)
    }

    fn status(&self) -> u16 {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }
}

/// Factory for [`ReqwestXhr`].
#[derive(Debug, Clone)]
pub struct ReqwestXhrFactory {
    client: reqwest::Client,
    runtime: tokio::runtime::Handle,
}

impl ReqwestXhrFactory {
    #[must_use]
    pub fn new(client: reqwest::Client, runtime: tokio::runtime::Handle) -> Self {
        Self { client, runtime }
    }
}

impl XhrFactory for ReqwestXhrFactory {
    type Xhr = ReqwestXhr;

    fn create(&self) -> Self::Xhr {
        ReqwestXhr::new(self.client.clone(), self.runtime.clone())
    }
}
