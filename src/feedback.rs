// SPDX-License-Identifier: MPL-2.0
//! Outgoing feedback: user message plus the transmission bundle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_TRANSPORT_DELAY_MS;
use crate::diagnostics::{DiagnosticBundle, Fetch, FetchRequest, FetchResponse, ObservedFetch};
use crate::error::{Error, Result};

/// Message handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    pub user_message: String,
    /// RFC 3339
    pub timestamp: String,
    /// Preview URL the feedback is about.
    pub url: String,
    #[serde(flatten)]
    pub context: DiagnosticBundle,
}

impl FeedbackPayload {
    /// Builds a payload from a user message.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyFeedback` if the message is blank.
    pub fn compose(
        message: &str,
        url: impl Into<String>,
        context: DiagnosticBundle,
    ) -> Result<Self> {
        let user_message = message.trim();
        if user_message.is_empty() {
            return Err(Error::EmptyFeedback);
        }
        Ok(Self {
            user_message: user_message.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            url: url.into(),
            context,
        })
    }
}

/// Delivery channel for feedback payloads.
pub trait Transport: Send + Sync {
    fn send<'a>(&'a self, payload: &'a FeedbackPayload) -> BoxFuture<'a, Result<()>>;
}

/// Waits a fixed delay and logs the payload instead of sending it.
#[derive(Debug)]
pub struct SimulatedTransport {
    delay: Duration,
    sent: AtomicUsize,
}

impl SimulatedTransport {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            sent: AtomicUsize::new(0),
        }
    }

    /// Number of payloads "delivered" so far.
    #[must_use]
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TRANSPORT_DELAY_MS))
    }
}

impl Transport for SimulatedTransport {
    fn send<'a>(&'a self, payload: &'a FeedbackPayload) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let json = serde_json::to_string_pretty(payload)?;
            tokio::time::sleep(self.delay).await;
            log::info!("feedback payload:\n{json}");
            self.sent.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }
}

/// POSTs payloads as JSON through an observed client.
#[derive(Debug)]
pub struct HttpTransport<C = reqwest::Client> {
    client: ObservedFetch<C>,
    endpoint: String,
}

impl<C> HttpTransport<C>
where
    C: Fetch<Error = Error>,
{
    #[must_use]
    pub fn new(client: ObservedFetch<C>, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl<C> Transport for HttpTransport<C>
where
    C: Fetch<Error = Error>,
{
    fn send<'a>(&'a self, payload: &'a FeedbackPayload) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let request = FetchRequest::post(self.endpoint.as_str()).json(payload)?;
            let response = self.client.fetch(request).await?;
            let status = response.status();
            if !(200..300).contains(&status) {
                return Err(Error::Transport(format!(
                    "feedback endpoint answered {status}"
                )));
            }
            log::info!("feedback delivered ({status})");
            Ok(())
        })
    }
}
