// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Deciding when to drain the request queue.
//!
//! The coordinator drains on every transition to online, and when the
//! platform's deferred-sync hook fires. Concurrent triggers collapse into a
//! single drain through the queue's single-flight guard.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::http::RequestClient;
use super::queue::{DrainOutcome, QueueError, QueueStats};
use crate::listeners::ListenerHandle;
use crate::live::{ConnectionManager, Connector};
use crate::lock;

/// Tag registered with the platform's deferred-sync hook.
pub const SYNC_TAG: &str = "tether-request-queue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
}

/// Shared online/offline flag that notifies on change.
#[derive(Clone)]
pub struct NetworkSignal {
    tx: Arc<watch::Sender<NetworkStatus>>,
}

impl NetworkSignal {
    pub fn new(initial: NetworkStatus) -> Self {
        let (tx, _) = watch::channel(initial);
        NetworkSignal { tx: Arc::new(tx) }
    }

    /// Sets the status. Returns true if it changed.
    pub fn set(&self, status: NetworkStatus) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        })
    }

    pub fn set_online(&self) -> bool {
        self.set(NetworkStatus::Online)
    }

    pub fn set_offline(&self) -> bool {
        self.set(NetworkStatus::Offline)
    }

    pub fn status(&self) -> NetworkStatus {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.tx.subscribe()
    }

    /// Derives the status from push connections: any open marks the network
    /// online, an unexpected close marks it offline.
    pub fn follow<C: Connector>(&self, manager: &ConnectionManager<C>) -> Vec<ListenerHandle> {
        let online = self.clone();
        let offline = self.clone();
        vec![
            manager.on_open(move |event| {
                if online.set_online() {
                    debug!(topic = %event.topic, "network online");
                }
            }),
            manager.on_close(move |event| {
                if !event.reason.is_manual() && offline.set_offline() {
                    debug!(topic = %event.topic, "network offline");
                }
            }),
        ]
    }
}

/// Platform hook for deferred background sync.
pub trait BackgroundSync: Send + Sync {
    /// Asks the platform to call back with `tag` later. Returns false when
    /// the platform cannot do that.
    fn register(&self, tag: &str) -> bool;
}

/// For platforms without deferred sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackgroundSync;

impl BackgroundSync for NoBackgroundSync {
    fn register(&self, _tag: &str) -> bool {
        false
    }
}

pub struct SyncCoordinator {
    requests: Arc<RequestClient>,
    signal: NetworkSignal,
    stop: CancellationToken,
    registration: Mutex<Option<ListenerHandle>>,
}

impl SyncCoordinator {
    pub fn new(
        requests: Arc<RequestClient>,
        signal: NetworkSignal,
        background: Arc<dyn BackgroundSync>,
    ) -> Arc<Self> {
        let registration = requests.queue().on_enqueued(move |entry| {
            if background.register(SYNC_TAG) {
                debug!(id = %entry.id, "background sync registered");
            }
        });

        Arc::new(SyncCoordinator {
            requests,
            signal,
            stop: CancellationToken::new(),
            registration: Mutex::new(Some(registration)),
        })
    }

    pub fn signal(&self) -> &NetworkSignal {
        &self.signal
    }

    pub fn requests(&self) -> &Arc<RequestClient> {
        &self.requests
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.requests.queue().stats()
    }

    pub async fn drain(&self) -> Result<DrainOutcome, QueueError> {
        self.requests.drain().await
    }

    /// Entry point for the platform's deferred-sync callback.
    ///
    /// Returns `None` for tags that belong to someone else.
    pub async fn handle_sync(&self, tag: &str) -> Result<Option<DrainOutcome>, QueueError> {
        if tag != SYNC_TAG {
            debug!(tag, "ignoring sync for unknown tag");
            return Ok(None);
        }
        info!("background sync fired, draining queue");
        self.drain().await.map(Some)
    }

    /// Watches the network signal until [`SyncCoordinator::stop`].
    ///
    /// Drains once at start if already online with work pending.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let changes = self.signal.subscribe();
        tokio::spawn(async move { coordinator.watch(changes).await })
    }

    async fn watch(&self, mut changes: watch::Receiver<NetworkStatus>) {
        let initial = *changes.borrow_and_update();
        if initial == NetworkStatus::Online && !self.requests.queue().is_empty() {
            self.drain_and_log().await;
        }

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let status = *changes.borrow_and_update();
                    if status == NetworkStatus::Online {
                        info!("back online, draining queue");
                        self.drain_and_log().await;
                    }
                }
            }
        }
    }

    async fn drain_and_log(&self) {
        match self.drain().await {
            Ok(DrainOutcome::Finished(report)) => {
                for dropped in &report.dropped {
                    warn!(
                        id = %dropped.request.id,
                        reason = ?dropped.reason,
                        "queued request dropped"
                    );
                }
            }
            Ok(DrainOutcome::InProgress) => debug!("drain already running"),
            Err(e) => warn!(error = %e, "drain failed"),
        }
    }

    /// Stops watching and unregisters the background-sync hook.
    pub fn stop(&self) {
        self.stop.cancel();
        if let Some(registration) = lock(&self.registration).take() {
            registration.unsubscribe();
        }
    }
}
