// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-topic push connections with automatic reconnection.
//!
//! Each topic owns at most one live transport. A session task drives the
//! transport: it opens it, forwards outbound frames, sends keep-alive pings
//! and decodes inbound frames. When a session ends without a `disconnect`
//! call, a reconnect is scheduled with exponential backoff until
//! `max_reconnect_attempts` consecutive failures, after which the topic is
//! marked exhausted and stays closed until `connect` is called again.
//!
//! Every session carries a generation number. Callbacks from a session whose
//! generation no longer matches the topic entry are ignored, so a stale task
//! can never resurrect a topic that was disconnected or restarted.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Url;
use tether_core::{ClientFrame, ServerFrame};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::{CloseEvent, CloseReason, ErrorEvent, OpenEvent, TopicMessage};
use super::transport::{Connector, Transport, WebSocketConnector};
use crate::listeners::{ListenerHandle, Listeners};
use crate::lock;
use crate::schedule::{Backoff, ScheduledTask};

/// Upper bound on waiting for a transport to close cleanly.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors reported by the connection manager.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("not connected to topic '{0}'")]
    NotConnected(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("topic must not be empty")]
    InvalidTopic,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("reconnect gave up after {attempts} attempts\n  hint: call connect again once the network is back")]
    ReconnectExhausted { attempts: u32 },
}

/// Settings for push connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Base URL (`ws://` or `wss://`).
    pub url: String,
    /// Data domain, the second path segment of every endpoint.
    pub domain: String,
    pub max_reconnect_attempts: u32,
    pub initial_reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    /// Keep-alive period. Zero disables pings.
    pub ping_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            url: "ws://localhost:8000".to_string(),
            domain: "weather".to_string(),
            max_reconnect_attempts: 5,
            initial_reconnect_delay: Duration::from_millis(1000),
            max_reconnect_delay: Duration::from_millis(30_000),
            ping_interval: Duration::from_millis(30_000),
        }
    }
}

impl ConnectionConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_reconnect_delay, self.max_reconnect_delay)
    }

    /// Builds `<url>/ws/<domain>/<topic>`, percent-encoding each segment.
    pub fn endpoint(&self, topic: &str) -> Result<String, ConnectionError> {
        if topic.is_empty() {
            return Err(ConnectionError::InvalidTopic);
        }

        let mut url = Url::parse(&self.url)
            .map_err(|e| ConnectionError::InvalidEndpoint(format!("{}: {e}", self.url)))?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(ConnectionError::InvalidEndpoint(format!(
                    "unsupported scheme '{other}' (expected ws or wss)"
                )))
            }
        }

        url.path_segments_mut()
            .map_err(|()| ConnectionError::InvalidEndpoint(self.url.clone()))?
            .pop_if_empty()
            .extend(["ws", self.domain.as_str(), topic]);
        Ok(url.to_string())
    }
}

/// Lifecycle of a topic connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only snapshot of a topic connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicStatus {
    pub state: ConnectionState,
    /// Consecutive failed attempts since the last `Open`.
    pub attempt: u32,
    pub reconnect_scheduled: bool,
    pub exhausted: bool,
}

impl TopicStatus {
    /// Short indicator for status displays.
    pub fn label(&self) -> &'static str {
        if self.exhausted {
            "offline"
        } else if self.reconnect_scheduled {
            "reconnecting"
        } else {
            match self.state {
                ConnectionState::Open => "live",
                state => state.as_str(),
            }
        }
    }
}

struct Session {
    cancel: CancellationToken,
    outbound: Option<mpsc::UnboundedSender<String>>,
    task: JoinHandle<()>,
}

struct TopicConnection {
    state: ConnectionState,
    generation: u64,
    attempt: u32,
    exhausted: bool,
    session: Option<Session>,
    reconnect: Option<ScheduledTask>,
}

impl TopicConnection {
    fn new() -> Self {
        TopicConnection {
            state: ConnectionState::Closed,
            generation: 0,
            attempt: 0,
            exhausted: false,
            session: None,
            reconnect: None,
        }
    }

    fn status(&self) -> TopicStatus {
        TopicStatus {
            state: self.state,
            attempt: self.attempt,
            reconnect_scheduled: self.reconnect.is_some(),
            exhausted: self.exhausted,
        }
    }
}

enum AfterClose {
    Reconnect { delay: Duration, attempt: u32 },
    Exhausted { attempts: u32 },
}

struct Inner<C: Connector> {
    config: ConnectionConfig,
    connector: C,
    topics: Mutex<HashMap<String, TopicConnection>>,
    generations: AtomicU64,
    on_open: Listeners<OpenEvent>,
    on_close: Listeners<CloseEvent>,
    on_error: Listeners<ErrorEvent>,
    on_message: Listeners<TopicMessage>,
}

/// Manages one push connection per topic.
pub struct ConnectionManager<C: Connector = WebSocketConnector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        ConnectionManager {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_connector(config, WebSocketConnector)
    }
}

impl<C: Connector> ConnectionManager<C> {
    pub fn with_connector(config: ConnectionConfig, connector: C) -> Self {
        ConnectionManager {
            inner: Arc::new(Inner {
                config,
                connector,
                topics: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
                on_open: Listeners::new(),
                on_close: Listeners::new(),
                on_error: Listeners::new(),
                on_message: Listeners::new(),
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Opens the connection for `topic`.
    ///
    /// No-op while the topic is `Open` or `Connecting`. Cancels a pending
    /// reconnect timer and attempts immediately. After reconnect exhaustion
    /// the attempt counter starts over.
    pub fn connect(&self, topic: &str) -> Result<(), ConnectionError> {
        let url = self.inner.config.endpoint(topic)?;

        let mut topics = lock(&self.inner.topics);
        let entry = topics
            .entry(topic.to_string())
            .or_insert_with(TopicConnection::new);

        if matches!(
            entry.state,
            ConnectionState::Open | ConnectionState::Connecting
        ) {
            return Ok(());
        }

        if let Some(timer) = entry.reconnect.take() {
            debug!(topic, "manual connect overrides pending reconnect");
            timer.cancel();
        }
        if entry.exhausted {
            entry.exhausted = false;
            entry.attempt = 0;
        }

        info!(topic, %url, "connecting");
        self.inner.start_session(topic, entry, url);
        Ok(())
    }

    /// Closes the connection for `topic` and cancels every timer it owns.
    ///
    /// Never followed by an automatic reconnect.
    pub async fn disconnect(&self, topic: &str) {
        let (generation, was_live, session) = {
            let mut topics = lock(&self.inner.topics);
            let Some(entry) = topics.get_mut(topic) else {
                return;
            };
            if let Some(timer) = entry.reconnect.take() {
                timer.cancel();
            }
            let was_live = entry.state != ConnectionState::Closed;
            entry.state = ConnectionState::Closing;
            (entry.generation, was_live, entry.session.take())
        };

        if let Some(session) = session {
            session.cancel.cancel();
            if let Err(e) = session.task.await {
                warn!(topic, error = %e, "session task failed");
            }
        }

        let removed = {
            let mut topics = lock(&self.inner.topics);
            let current = topics
                .get(topic)
                .is_some_and(|e| e.generation == generation && e.state == ConnectionState::Closing);
            if current {
                topics.remove(topic);
            }
            current
        };

        if removed && was_live {
            info!(topic, "disconnected");
            self.inner.on_close.emit(&CloseEvent {
                topic: topic.to_string(),
                reason: CloseReason::Manual,
            });
        }
    }

    /// Transmits `frame` on an open connection. Nothing is queued.
    pub fn send(&self, topic: &str, frame: &ClientFrame) -> Result<(), ConnectionError> {
        let json = frame
            .to_json()
            .map_err(|e| ConnectionError::Protocol(e.to_string()))?;

        let topics = lock(&self.inner.topics);
        let outbound = topics
            .get(topic)
            .filter(|e| e.state == ConnectionState::Open)
            .and_then(|e| e.session.as_ref())
            .and_then(|s| s.outbound.as_ref())
            .ok_or_else(|| ConnectionError::NotConnected(topic.to_string()))?;

        outbound
            .send(json)
            .map_err(|_| ConnectionError::NotConnected(topic.to_string()))
    }

    /// Asks the server to push the current state for `topic`.
    pub fn refresh(&self, topic: &str) -> Result<(), ConnectionError> {
        self.send(topic, &ClientFrame::Refresh)
    }

    pub fn status(&self, topic: &str) -> Option<TopicStatus> {
        lock(&self.inner.topics).get(topic).map(TopicConnection::status)
    }

    /// State of `topic`, `Closed` when unknown.
    pub fn state(&self, topic: &str) -> ConnectionState {
        self.status(topic)
            .map_or(ConnectionState::Closed, |status| status.state)
    }

    /// Topics with a connection entry, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = lock(&self.inner.topics).keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Disconnects every topic.
    pub async fn shutdown(&self) {
        for topic in self.topics() {
            self.disconnect(&topic).await;
        }
    }

    pub fn on_open<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&OpenEvent) + Send + Sync + 'static,
    {
        self.inner.on_open.add(listener)
    }

    pub fn on_close<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&CloseEvent) + Send + Sync + 'static,
    {
        self.inner.on_close.add(listener)
    }

    pub fn on_error<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        self.inner.on_error.add(listener)
    }

    pub fn on_message<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&TopicMessage) + Send + Sync + 'static,
    {
        self.inner.on_message.add(listener)
    }
}

impl<C: Connector> Inner<C> {
    /// Spawns a new session for `entry`. Caller holds the topics lock.
    fn start_session(self: &Arc<Self>, topic: &str, entry: &mut TopicConnection, url: String) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        entry.generation = generation;
        entry.state = ConnectionState::Connecting;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_session(
            Arc::clone(self),
            topic.to_string(),
            generation,
            url,
            cancel.clone(),
        ));
        entry.session = Some(Session {
            cancel,
            outbound: None,
            task,
        });
    }

    fn mark_open(
        &self,
        topic: &str,
        generation: u64,
        outbound: mpsc::UnboundedSender<String>,
    ) -> bool {
        let mut topics = lock(&self.topics);
        let Some(entry) = topics.get_mut(topic) else {
            return false;
        };
        if entry.generation != generation || entry.state != ConnectionState::Connecting {
            return false;
        }

        entry.state = ConnectionState::Open;
        entry.attempt = 0;
        entry.exhausted = false;
        if let Some(session) = entry.session.as_mut() {
            session.outbound = Some(outbound);
        }
        true
    }

    async fn pump<T: Transport>(
        &self,
        topic: &str,
        transport: &mut T,
        mut outbound: mpsc::UnboundedReceiver<String>,
        cancel: &CancellationToken,
    ) -> Option<String> {
        let mut keepalive = keepalive_timer(self.config.ping_interval);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => return None,

                Some(frame) = outbound.recv() => {
                    if let Err(e) = transport.send(frame).await {
                        self.emit_error(topic, ConnectionError::Transport(e.to_string()));
                        return Some(e.to_string());
                    }
                }

                _ = tick(&mut keepalive) => {
                    debug!(topic, "sending keep-alive ping");
                    let ping = match ClientFrame::Ping.to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(topic, error = %e, "failed to encode ping");
                            continue;
                        }
                    };
                    if let Err(e) = transport.send(ping).await {
                        self.emit_error(topic, ConnectionError::Transport(e.to_string()));
                        return Some(e.to_string());
                    }
                }

                received = transport.recv() => match received {
                    Ok(Some(text)) => self.handle_frame(topic, &text),
                    Ok(None) => return Some("closed by peer".to_string()),
                    Err(e) => {
                        self.emit_error(topic, ConnectionError::Transport(e.to_string()));
                        return Some(e.to_string());
                    }
                },
            }
        }
    }

    fn handle_frame(&self, topic: &str, text: &str) {
        match ServerFrame::from_json(text) {
            Ok(ServerFrame::Update(update)) => {
                debug!(topic, domain = %update.domain, "update received");
                self.on_message.emit(&TopicMessage {
                    topic: topic.to_string(),
                    update,
                });
            }
            Ok(ServerFrame::Error { message }) => {
                warn!(topic, %message, "server reported an error");
                self.emit_error(topic, ConnectionError::Server(message));
            }
            Ok(frame) => debug!(topic, kind = %frame.kind(), "frame ignored"),
            Err(e) => {
                warn!(topic, error = %e, "malformed frame");
                self.emit_error(topic, ConnectionError::Protocol(e.to_string()));
            }
        }
    }

    fn emit_error(&self, topic: &str, error: ConnectionError) {
        self.on_error.emit(&ErrorEvent {
            topic: topic.to_string(),
            error,
        });
    }

    /// Records a session ending without `disconnect` and schedules the next
    /// attempt, or marks the topic exhausted.
    fn handle_unexpected_close(self: &Arc<Self>, topic: &str, generation: u64, reason: String) {
        let after = {
            let mut topics = lock(&self.topics);
            let Some(entry) = topics.get_mut(topic) else {
                return;
            };
            if entry.generation != generation
                || !matches!(
                    entry.state,
                    ConnectionState::Connecting | ConnectionState::Open
                )
            {
                return;
            }

            entry.state = ConnectionState::Closed;
            entry.session = None;

            if entry.attempt >= self.config.max_reconnect_attempts {
                entry.exhausted = true;
                AfterClose::Exhausted {
                    attempts: entry.attempt,
                }
            } else {
                let delay = self.config.backoff().delay(entry.attempt);
                entry.attempt += 1;
                let inner = Arc::downgrade(self);
                let owned = topic.to_string();
                entry.reconnect = Some(ScheduledTask::spawn(delay, move || async move {
                    if let Some(inner) = inner.upgrade() {
                        inner.fire_reconnect(&owned, generation);
                    }
                }));
                AfterClose::Reconnect {
                    delay,
                    attempt: entry.attempt,
                }
            }
        };

        self.on_close.emit(&CloseEvent {
            topic: topic.to_string(),
            reason: CloseReason::Unexpected(reason.clone()),
        });

        match after {
            AfterClose::Reconnect { delay, attempt } => {
                info!(
                    topic,
                    %reason,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "connection lost, reconnect scheduled"
                );
            }
            AfterClose::Exhausted { attempts } => {
                warn!(topic, %reason, attempts, "reconnect attempts exhausted");
                self.emit_error(topic, ConnectionError::ReconnectExhausted { attempts });
            }
        }
    }

    fn fire_reconnect(self: &Arc<Self>, topic: &str, generation: u64) {
        let mut topics = lock(&self.topics);
        let Some(entry) = topics.get_mut(topic) else {
            return;
        };
        if entry.generation != generation
            || entry.state != ConnectionState::Closed
            || entry.reconnect.take().is_none()
        {
            return;
        }

        match self.config.endpoint(topic) {
            Ok(url) => {
                debug!(topic, attempt = entry.attempt, "reconnecting");
                self.start_session(topic, entry, url);
            }
            Err(e) => warn!(topic, error = %e, "cannot reconnect"),
        }
    }
}

async fn run_session<C: Connector>(
    inner: Arc<Inner<C>>,
    topic: String,
    generation: u64,
    url: String,
    cancel: CancellationToken,
) {
    let mut transport = inner.connector.transport();

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = transport.connect(&url) => result,
    };

    if let Err(e) = opened {
        warn!(topic = %topic, error = %e, "connection attempt failed");
        inner.emit_error(&topic, ConnectionError::Transport(e.to_string()));
        inner.handle_unexpected_close(&topic, generation, e.to_string());
        return;
    }

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    if !inner.mark_open(&topic, generation, outbound_tx) {
        close_transport(&mut transport).await;
        return;
    }

    info!(topic = %topic, "connection open");
    inner.on_open.emit(&OpenEvent {
        topic: topic.clone(),
    });

    let ended = inner
        .pump(&topic, &mut transport, outbound_rx, &cancel)
        .await;
    close_transport(&mut transport).await;

    if let Some(reason) = ended {
        inner.handle_unexpected_close(&topic, generation, reason);
    }
}

async fn close_transport<T: Transport>(transport: &mut T) {
    match tokio::time::timeout(CLOSE_TIMEOUT, transport.disconnect()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "transport close failed"),
        Err(_) => debug!("transport close timed out"),
    }
}

fn keepalive_timer(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(timer)
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
