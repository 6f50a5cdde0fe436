// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The [`Client`] facade: push subscriptions plus offline-safe requests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tether_core::RequestSpec;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::listeners::ListenerHandle;
use crate::live::{
    ConnectionManager, Connector, SubscriptionHandle, SubscriptionRegistry, TopicMessage,
    TopicStatus, WebSocketConnector,
};
use crate::lock;
use crate::offline::{
    DrainOutcome, HttpSender, IssueOutcome, JsonlStore, NetworkSignal, NetworkStatus,
    NoBackgroundSync, QueueStats, ReqwestSender, RequestClient, RequestQueue, SyncCoordinator,
};

/// Everything a dashboard needs, wired together.
///
/// The network is considered offline until the first push connection opens;
/// from then on it follows the connections, and each return to online drains
/// the request queue.
///
/// Must be created inside a tokio runtime.
pub struct Client<C: Connector = WebSocketConnector> {
    registry: Arc<SubscriptionRegistry<C>>,
    requests: Arc<RequestClient>,
    coordinator: Arc<SyncCoordinator>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    network: Vec<ListenerHandle>,
}

impl Client {
    /// Builds a client from configuration, opening the queue in its data
    /// directory.
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let data_dir = config.data_dir()?;
        debug!(data_dir = %data_dir.display(), "opening request queue");

        let store = JsonlStore::open(&data_dir)?;
        let queue = RequestQueue::open(Box::new(store), config.queue_config())?;
        let sender = ReqwestSender::new(&config.http_config())?;

        Ok(Self::from_parts(
            ConnectionManager::new(config.connection_config()),
            config.grace(),
            Arc::new(sender),
            queue,
        ))
    }
}

impl<C: Connector> Client<C> {
    pub fn from_parts(
        manager: ConnectionManager<C>,
        grace: Duration,
        sender: Arc<dyn HttpSender>,
        queue: RequestQueue,
    ) -> Self {
        let signal = NetworkSignal::new(NetworkStatus::Offline);
        let network = signal.follow(&manager);

        let requests = Arc::new(RequestClient::new(sender, Arc::new(queue)));
        let coordinator =
            SyncCoordinator::new(Arc::clone(&requests), signal, Arc::new(NoBackgroundSync));
        let watcher = coordinator.spawn();

        Client {
            registry: SubscriptionRegistry::new(manager, grace),
            requests,
            coordinator,
            watcher: Mutex::new(Some(watcher)),
            network,
        }
    }

    /// Listens for updates on `topic`, connecting if needed.
    pub fn subscribe<F>(&self, topic: &str, listener: F) -> Result<SubscriptionHandle>
    where
        F: Fn(&TopicMessage) + Send + Sync + 'static,
    {
        Ok(self.registry.subscribe(topic, listener)?)
    }

    /// Sends a request, queueing it for later if the backend is unreachable.
    pub async fn issue(&self, request: RequestSpec) -> Result<IssueOutcome> {
        Ok(self.requests.issue(request).await?)
    }

    pub fn status(&self, topic: &str) -> Option<TopicStatus> {
        self.registry.manager().status(topic)
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.coordinator.queue_stats()
    }

    /// Drains the queue without waiting for a network change.
    pub async fn drain_now(&self) -> Result<DrainOutcome> {
        Ok(self.coordinator.drain().await?)
    }

    pub fn network(&self) -> &NetworkSignal {
        self.coordinator.signal()
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry<C>> {
        &self.registry
    }

    pub fn manager(&self) -> &ConnectionManager<C> {
        self.registry.manager()
    }

    pub fn queue(&self) -> &Arc<RequestQueue> {
        self.requests.queue()
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    /// Stops the coordinator and closes every connection.
    pub async fn shutdown(&self) {
        self.coordinator.stop();
        let watcher = lock(&self.watcher).take();
        if let Some(watcher) = watcher {
            let _ = watcher.await;
        }
        self.registry.manager().shutdown().await;
        info!("client shut down");
    }
}

impl<C: Connector> Drop for Client<C> {
    fn drop(&mut self) {
        self.coordinator.stop();
        for handle in self.network.drain(..) {
            handle.unsubscribe();
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
