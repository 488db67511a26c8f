// SPDX-License-Identifier: MPL-2.0
//! Outbound HTTP call capture for promise-style calls.
//!
//! [`ObservedFetch`] decorates any [`Fetch`] implementation. Each call opens a
//! [`PendingCall`] when dispatched and finalizes it into a [`NetworkRecord`]
//! when the call settles; the caller receives the inner result untouched.
//! Callback-style calls are covered in the `xhr` module.

use super::buffer::{BoundedBuffer, BufferCapacity};
use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

const DEFAULT_METHOD: &str = "GET";

/// One finalized outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub method: String,
    pub url: String,
    /// 0 when the call never completed.
    pub status_code: u16,
    pub duration_ms: u64,
    pub succeeded: bool,
    pub error_message: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// A dispatched call that has not settled yet.
///
/// Never stored; it travels with the call's continuation and becomes a
/// [`NetworkRecord`] through [`complete`](Self::complete) or
/// [`fail`](Self::fail).
#[derive(Debug)]
pub struct PendingCall {
    method: String,
    url: String,
    started: Instant,
}

impl PendingCall {
    /// Opens a call; a missing method defaults to `GET`.
    #[must_use]
    pub fn open(method: Option<&str>, url: impl Into<String>) -> Self {
        Self {
            method: method.unwrap_or(DEFAULT_METHOD).to_string(),
            url: url.into(),
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Finalizes a call that produced a status; 2xx counts as success.
    #[must_use]
    pub fn complete(self, status_code: u16) -> NetworkRecord {
        NetworkRecord {
            duration_ms: self.elapsed_ms(),
            succeeded: (200..300).contains(&status_code),
            status_code,
            error_message: None,
            captured_at: Utc::now(),
            method: self.method,
            url: self.url,
        }
    }

    /// Finalizes a call that failed before producing a status.
    #[must_use]
    pub fn fail(self, error: impl fmt::Display) -> NetworkRecord {
        NetworkRecord {
            duration_ms: self.elapsed_ms(),
            status_code: 0,
            succeeded: false,
            error_message: Some(error.to_string()),
            captured_at: Utc::now(),
            method: self.method,
            url: self.url,
        }
    }
}

// =============================================================================
// NetworkRecorder
// =============================================================================

struct NetworkInner {
    buffer: Mutex<BoundedBuffer<NetworkRecord>>,
    enabled: bool,
}

/// Bounded store of finalized network records.
#[derive(Clone)]
pub struct NetworkRecorder {
    inner: Arc<NetworkInner>,
}

impl fmt::Debug for NetworkRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkRecorder")
            .field("count", &self.count())
            .field("enabled", &self.inner.enabled)
            .finish()
    }
}

impl NetworkRecorder {
    /// A disabled recorder accepts calls but stores nothing.
    #[must_use]
    pub fn new(capacity: BufferCapacity, enabled: bool) -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                buffer: Mutex::new(BoundedBuffer::new(capacity)),
                enabled,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoundedBuffer<NetworkRecord>> {
        self.inner
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    pub fn push(&self, record: NetworkRecord) {
        if self.inner.enabled {
            self.lock().push(record);
        }
    }

    /// Wraps `client` so its calls are recorded here.
    #[must_use]
    pub fn observe<C: Fetch>(&self, client: C) -> ObservedFetch<C> {
        ObservedFetch {
            inner: client,
            recorder: self.clone(),
        }
    }

    #[must_use]
    pub fn all(&self) -> Vec<NetworkRecord> {
        self.lock().all()
    }

    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<NetworkRecord> {
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

// =============================================================================
// Fetch
// =============================================================================

/// Request handed to a [`Fetch`] implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    /// `None` means `GET`.
    pub method: Option<String>,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl FetchRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Some("POST".to_string()),
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body and the matching content type.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if `value` cannot be encoded.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> crate::error::Result<Self> {
        let body = serde_json::to_vec(value)?;
        let mut request = self.header("content-type", "application/json");
        request.body = Some(body);
        Ok(request)
    }
}

/// Status view of a response, the only part the recorder reads.
pub trait FetchResponse {
    fn status(&self) -> u16;
}

/// Promise-style HTTP call mechanism.
pub trait Fetch: Send + Sync {
    type Response: FetchResponse + Send;
    type Error: fmt::Display + Send;

    fn fetch(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send;
}

impl FetchResponse for reqwest::Response {
    fn status(&self) -> u16 {
        self.status().as_u16()
    }
}

impl Fetch for reqwest::Client {
    type Response = reqwest::Response;
    type Error = Error;

    fn fetch(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send {
        let method = request.method.as_deref().unwrap_or(DEFAULT_METHOD);
        let builder = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|err| Error::Transport(err.to_string()))
            .map(|method| {
                let mut builder = self.request(method, &request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                if let Some(body) = request.body {
                    builder = builder.body(body);
                }
                builder
            });
        async move {
            let response = builder?.send().await?;
            Ok::<_, Error>(response)
        }
    }
}

/// A [`Fetch`] decorator that records every call it forwards.
///
/// Results and errors are returned exactly as the inner client produced them.
#[derive(Debug, Clone)]
pub struct ObservedFetch<C> {
    inner: C,
    recorder: NetworkRecorder,
}

impl<C> ObservedFetch<C> {
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Detaches observation and hands the original client back.
    pub fn restore(self) -> C {
        self.inner
    }
}

impl<C: Fetch> Fetch for ObservedFetch<C> {
    type Response = C::Response;
    type Error = C::Error;

    fn fetch(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send {
        let pending = PendingCall::open(request.method.as_deref(), request.url.clone());
        let call = self.inner.fetch(request);
        let recorder = self.recorder.clone();
        async move {
            let result = call.await;
            match &result {
                Ok(response) => recorder.push(pending.complete(response.status())),
                Err(err) => recorder.push(pending.fail(err)),
            }
            result
        }
    }
}
