// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Issuing requests with an offline fallback.
//!
//! [`RequestClient::issue`] sends a request right away. If it fails and the
//! [`Classifier`] calls the failure a connectivity problem, a mutating
//! request is put in the [`RequestQueue`] instead of failing. Application
//! failures (any HTTP error status, malformed requests) are returned to the
//! caller and never queued.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tether_core::{QueuedRequest, RequestSpec};
use tracing::{debug, warn};

use super::queue::{DrainOutcome, QueueError, ReplayError, RequestQueue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// A request that never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("could not connect: {0}")]
    Connect(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("request failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestFailure {
    #[error(transparent)]
    Send(SendError),

    #[error("HTTP {}", .0.status)]
    Status(HttpResponse),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The backend could not be reached; worth retrying later.
    Connectivity,
    /// The backend answered and said no.
    Application,
}

/// Decides whether a failure is worth queueing.
pub type Classifier = Arc<dyn Fn(&RequestFailure) -> FailureClass + Send + Sync>;

/// Transport-level failures are connectivity; responses and malformed
/// requests are application failures.
pub fn classify(failure: &RequestFailure) -> FailureClass {
    match failure {
        RequestFailure::Status(_) | RequestFailure::Send(SendError::Invalid(_)) => {
            FailureClass::Application
        }
        RequestFailure::Send(_) => FailureClass::Connectivity,
    }
}

pub fn default_classifier() -> Classifier {
    Arc::new(classify)
}

pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse, SendError>> + Send + 'a>>;

/// Sends one HTTP request.
pub trait HttpSender: Send + Sync {
    fn send<'a>(&'a self, request: &'a RequestSpec) -> SendFuture<'a>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// [`HttpSender`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: reqwest::Client,
}

impl ReqwestSender {
    pub fn new(config: &HttpConfig) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| SendError::Other(e.to_string()))?;
        Ok(ReqwestSender { client })
    }
}

impl HttpSender for ReqwestSender {
    fn send<'a>(&'a self, request: &'a RequestSpec) -> SendFuture<'a> {
        Box::pin(async move {
            let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
                .map_err(|e| SendError::Invalid(e.to_string()))?;

            let mut builder = self.client.request(method, request.url.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }

            let response = builder.send().await.map_err(send_error)?;
            let status = response.status().as_u16();
            Ok(with_body(status, response.text().await))
        })
    }
}

/// The backend has answered once a status arrives, so a body that fails to
/// read is logged and left empty rather than reported as a send failure.
pub(crate) fn with_body<E>(status: u16, body: Result<String, E>) -> HttpResponse
where
    E: std::fmt::Display,
{
    let body = body.unwrap_or_else(|error| {
        warn!(status, %error, "could not read response body");
        String::new()
    });
    HttpResponse { status, body }
}

fn send_error(err: reqwest::Error) -> SendError {
    if err.is_builder() {
        SendError::Invalid(err.to_string())
    } else if err.is_timeout() {
        SendError::Timeout(err.to_string())
    } else if err.is_connect() {
        SendError::Connect(err.to_string())
    } else {
        SendError::Other(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    Completed(HttpResponse),
    /// Stored for replay once the backend is reachable.
    Queued(QueuedRequest),
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("request rejected: {0}")]
    Rejected(RequestFailure),

    #[error("backend unreachable: {0}\n  hint: only POST, PUT, PATCH and DELETE requests are queued while offline")]
    Unreachable(RequestFailure),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Issues requests and replays the ones queued while offline.
pub struct RequestClient {
    sender: Arc<dyn HttpSender>,
    queue: Arc<RequestQueue>,
    classifier: Classifier,
}

impl RequestClient {
    pub fn new(sender: Arc<dyn HttpSender>, queue: Arc<RequestQueue>) -> Self {
        RequestClient {
            sender,
            queue,
            classifier: default_classifier(),
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn queue(&self) -> &Arc<RequestQueue> {
        &self.queue
    }

    async fn attempt(&self, request: &RequestSpec) -> Result<HttpResponse, RequestFailure> {
        let response = self
            .sender
            .send(request)
            .await
            .map_err(RequestFailure::Send)?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(RequestFailure::Status(response))
        }
    }

    /// Sends `request`, queueing it if it is mutating and the backend is
    /// unreachable.
    pub async fn issue(&self, request: RequestSpec) -> Result<IssueOutcome, RequestError> {
        let failure = match self.attempt(&request).await {
            Ok(response) => {
                debug!(
                    method = %request.method,
                    url = %request.url,
                    status = response.status,
                    "request completed"
                );
                return Ok(IssueOutcome::Completed(response));
            }
            Err(failure) => failure,
        };

        match (self.classifier)(&failure) {
            FailureClass::Application => Err(RequestError::Rejected(failure)),
            FailureClass::Connectivity if request.method.is_mutating() => {
                warn!(
                    method = %request.method,
                    url = %request.url,
                    error = %failure,
                    "backend unreachable, queueing request"
                );
                Ok(IssueOutcome::Queued(self.queue.enqueue(request)?))
            }
            FailureClass::Connectivity => Err(RequestError::Unreachable(failure)),
        }
    }

    /// Replays one queued entry with its original method, URL, headers and
    /// body.
    pub async fn replay(&self, entry: &QueuedRequest) -> Result<(), ReplayError> {
        match self.attempt(&entry.request).await {
            Ok(_) => Ok(()),
            Err(failure) => match (self.classifier)(&failure) {
                FailureClass::Connectivity => Err(ReplayError::Connectivity(failure.to_string())),
                FailureClass::Application => Err(ReplayError::Rejected(failure.to_string())),
            },
        }
    }

    /// Drains the queue through [`RequestClient::replay`].
    pub async fn drain(&self) -> Result<DrainOutcome, QueueError> {
        self.queue
            .drain(|entry| async move { self.replay(&entry).await })
            .await
    }
}
