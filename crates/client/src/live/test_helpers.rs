// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted mock transports for live connection tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tether_core::ServerFrame;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::connection::ConnectionConfig;
use super::transport::{Connector, Transport, TransportError, TransportFuture};

/// What the next connect attempt does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    Succeed,
    Fail,
    /// Never completes, leaving the topic in `Connecting`.
    Hang,
}

enum Inbound {
    Frame(String),
    Drop,
}

/// Server side of one successful mock connection.
#[derive(Clone)]
pub struct MockLink {
    inbound: mpsc::UnboundedSender<Inbound>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    url: String,
}

impl MockLink {
    /// Pushes a raw text frame to the client.
    pub fn push(&self, text: &str) {
        let _ = self.inbound.send(Inbound::Frame(text.to_string()));
    }

    pub fn push_update(&self, domain: &str, data: Value) {
        self.push(&ServerFrame::update(domain, data).to_json().unwrap());
    }

    /// Simulates the network dropping the connection.
    pub fn drop_connection(&self) {
        let _ = self.inbound.send(Inbound::Drop);
    }

    /// Frames the client has sent on this link.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Whether the client closed this link.
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

struct Script {
    upcoming: VecDeque<ConnectBehavior>,
    default: ConnectBehavior,
    attempts: Vec<(Instant, String)>,
    links: Vec<MockLink>,
}

/// Connector whose transports follow a script of connect outcomes.
#[derive(Clone)]
pub struct MockConnector {
    script: Arc<Mutex<Script>>,
}

impl MockConnector {
    /// Every connect succeeds unless scripted otherwise.
    pub fn new() -> Self {
        Self::with_default(ConnectBehavior::Succeed)
    }

    /// Every connect fails unless scripted otherwise.
    pub fn failing() -> Self {
        Self::with_default(ConnectBehavior::Fail)
    }

    pub fn with_default(default: ConnectBehavior) -> Self {
        MockConnector {
            script: Arc::new(Mutex::new(Script {
                upcoming: VecDeque::new(),
                default,
                attempts: Vec::new(),
                links: Vec::new(),
            })),
        }
    }

    /// Queues the outcome of the next unscripted attempt.
    pub fn then(&self, behavior: ConnectBehavior) -> &Self {
        self.script.lock().unwrap().upcoming.push_back(behavior);
        self
    }

    pub fn set_default(&self, behavior: ConnectBehavior) {
        self.script.lock().unwrap().default = behavior;
    }

    /// Instants at which connect was called.
    pub fn attempts(&self) -> Vec<Instant> {
        let script = self.script.lock().unwrap();
        script.attempts.iter().map(|(at, _)| *at).collect()
    }

    pub fn attempt_count(&self) -> usize {
        self.script.lock().unwrap().attempts.len()
    }

    pub fn urls(&self) -> Vec<String> {
        let script = self.script.lock().unwrap();
        script.attempts.iter().map(|(_, url)| url.clone()).collect()
    }

    pub fn links(&self) -> Vec<MockLink> {
        self.script.lock().unwrap().links.clone()
    }

    pub fn last_link(&self) -> MockLink {
        self.links().pop().unwrap()
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn transport(&self) -> MockTransport {
        MockTransport {
            script: Arc::clone(&self.script),
            link: None,
            inbound: None,
        }
    }
}

pub struct MockTransport {
    script: Arc<Mutex<Script>>,
    link: Option<MockLink>,
    inbound: Option<mpsc::UnboundedReceiver<Inbound>>,
}

impl Transport for MockTransport {
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_string();
        Box::pin(async move {
            let behavior = {
                let mut script = self.script.lock().unwrap();
                script.attempts.push((Instant::now(), url.clone()));
                let default = script.default;
                script.upcoming.pop_front().unwrap_or(default)
            };

            match behavior {
                ConnectBehavior::Succeed => {
                    let (tx, rx) = mpsc::unbounded_channel();
                    let link = MockLink {
                        inbound: tx,
                        sent: Arc::new(Mutex::new(Vec::new())),
                        closed: Arc::new(AtomicBool::new(false)),
                        url,
                    };
                    self.script.lock().unwrap().links.push(link.clone());
                    self.link = Some(link);
                    self.inbound = Some(rx);
                    Ok(())
                }
                ConnectBehavior::Fail => {
                    Err(TransportError::ConnectionFailed("connection refused".into()))
                }
                ConnectBehavior::Hang => std::future::pending().await,
            }
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(link) = self.link.take() {
                link.closed.store(true, Ordering::SeqCst);
            }
            self.inbound = None;
            Ok(())
        })
    }

    fn send(&mut self, frame: String) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let link = self.link.as_ref().ok_or(TransportError::ConnectionClosed)?;
            link.sent.lock().unwrap().push(frame);
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<String>> {
        Box::pin(async move {
            let inbound = self
                .inbound
                .as_mut()
                .ok_or(TransportError::ConnectionClosed)?;
            match inbound.recv().await {
                Some(Inbound::Frame(text)) => Ok(Some(text)),
                Some(Inbound::Drop) | None => {
                    self.inbound = None;
                    self.link = None;
                    Ok(None)
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}

/// Connection settings pointing at a fake host.
pub fn test_config() -> ConnectionConfig {
    ConnectionConfig {
        url: "ws://dashboard.test".to_string(),
        ..ConnectionConfig::default()
    }
}

/// Milliseconds between consecutive instants.
pub fn gaps_ms(instants: &[Instant]) -> Vec<u64> {
    instants
        .windows(2)
        .map(|pair| u64::try_from((pair[1] - pair[0]).as_millis()).unwrap())
        .collect()
}

/// Lets spawned tasks run without advancing far on the paused clock.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
