// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Topic subscriptions on top of the connection manager.
//!
//! The registry owns listener sets; the manager never sees them. The first
//! listener on a topic opens its connection. When the last one leaves, the
//! connection is closed after a grace period, and a subscribe that arrives
//! within that window keeps the existing connection.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::{debug, info};

use super::connection::{ConnectionError, ConnectionManager};
use super::events::TopicMessage;
use super::transport::{Connector, WebSocketConnector};
use crate::listeners::ListenerHandle;
use crate::lock;
use crate::schedule::ScheduledTask;

/// Delay between the last unsubscribe and the disconnect.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(1000);

type Listener = Arc<dyn Fn(&TopicMessage) + Send + Sync>;

struct Subscription {
    listeners: Vec<(u64, Listener)>,
    /// A connection has been requested for the topic.
    active: bool,
    teardown: Option<ScheduledTask>,
}

impl Subscription {
    fn new() -> Self {
        Subscription {
            listeners: Vec::new(),
            active: false,
            teardown: None,
        }
    }
}

trait Detach: Send + Sync {
    fn detach(&self, topic: &str, id: u64);
}

/// Removes one listener. Dropping the handle keeps the listener registered.
pub struct SubscriptionHandle {
    registry: Weak<dyn Detach>,
    topic: String,
    id: u64,
}

impl SubscriptionHandle {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.detach(&self.topic, self.id);
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .finish()
    }
}

/// Topic to listener-set registry that routes inbound updates.
pub struct SubscriptionRegistry<C: Connector = WebSocketConnector> {
    manager: ConnectionManager<C>,
    grace: Duration,
    me: Weak<Self>,
    subscriptions: Mutex<HashMap<String, Subscription>>,
    next_id: AtomicU64,
    routing: Mutex<Option<ListenerHandle>>,
}

impl<C: Connector> SubscriptionRegistry<C> {
    /// Creates a registry and wires it to the manager's `on_message`.
    pub fn new(manager: ConnectionManager<C>, grace: Duration) -> Arc<Self> {
        let registry = Arc::new_cyclic(|me| SubscriptionRegistry {
            manager: manager.clone(),
            grace,
            me: me.clone(),
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            routing: Mutex::new(None),
        });

        let weak = Arc::downgrade(&registry);
        let routing = manager.on_message(move |message| {
            if let Some(registry) = weak.upgrade() {
                registry.dispatch(message);
            }
        });
        *lock(&registry.routing) = Some(routing);
        registry
    }

    pub fn manager(&self) -> &ConnectionManager<C> {
        &self.manager
    }

    /// Registers `listener` for `topic`, connecting on the first one.
    pub fn subscribe<F>(&self, topic: &str, listener: F) -> Result<SubscriptionHandle, ConnectionError>
    where
        F: Fn(&TopicMessage) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let needs_connect = {
            let mut subscriptions = lock(&self.subscriptions);
            let subscription = subscriptions
                .entry(topic.to_string())
                .or_insert_with(Subscription::new);
            if let Some(teardown) = subscription.teardown.take() {
                debug!(topic, "resubscribed within grace period, keeping connection");
                teardown.cancel();
            }
            subscription.listeners.push((id, Arc::new(listener)));
            let first = !subscription.active;
            subscription.active = true;
            first
        };

        if needs_connect {
            if let Err(e) = self.manager.connect(topic) {
                self.rollback(topic, id);
                return Err(e);
            }
        }

        let registry: Weak<dyn Detach> = self.me.clone();
        Ok(SubscriptionHandle {
            registry,
            topic: topic.to_string(),
            id,
        })
    }

    fn rollback(&self, topic: &str, id: u64) {
        let mut subscriptions = lock(&self.subscriptions);
        if let Some(subscription) = subscriptions.get_mut(topic) {
            subscription.listeners.retain(|(entry, _)| *entry != id);
            if subscription.listeners.is_empty() {
                subscriptions.remove(topic);
            }
        }
    }

    /// Delivers `message` to every listener registered for its topic when
    /// the call starts. Returns the number of listeners invoked.
    pub fn dispatch(&self, message: &TopicMessage) -> usize {
        let snapshot: Vec<Listener> = match lock(&self.subscriptions).get(&message.topic) {
            Some(subscription) => subscription
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect(),
            None => return 0,
        };

        for listener in &snapshot {
            listener(message);
        }
        snapshot.len()
    }

    /// Subscribed topics, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = lock(&self.subscriptions).keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn listener_count(&self, topic: &str) -> usize {
        lock(&self.subscriptions)
            .get(topic)
            .map_or(0, |subscription| subscription.listeners.len())
    }

    pub fn is_active(&self, topic: &str) -> bool {
        lock(&self.subscriptions)
            .get(topic)
            .is_some_and(|subscription| subscription.active)
    }

    /// Disconnects `topic` if it still has no listeners.
    async fn teardown(&self, topic: &str) {
        let idle = {
            let mut subscriptions = lock(&self.subscriptions);
            let idle = subscriptions
                .get(topic)
                .is_some_and(|subscription| subscription.listeners.is_empty());
            if idle {
                subscriptions.remove(topic);
            }
            idle
        };

        if idle {
            info!(topic, "no listeners left, closing connection");
            self.manager.disconnect(topic).await;
        }
    }
}

impl<C: Connector> Detach for SubscriptionRegistry<C> {
    fn detach(&self, topic: &str, id: u64) {
        let mut subscriptions = lock(&self.subscriptions);
        let Some(subscription) = subscriptions.get_mut(topic) else {
            return;
        };
        subscription.listeners.retain(|(entry, _)| *entry != id);
        if !subscription.listeners.is_empty() || subscription.teardown.is_some() {
            return;
        }

        debug!(topic, "last listener left, teardown scheduled");
        let registry = self.me.clone();
        let owned = topic.to_string();
        subscription.teardown = Some(ScheduledTask::spawn(self.grace, move || async move {
            if let Some(registry) = registry.upgrade() {
                registry.teardown(&owned).await;
            }
        }));
    }
}

impl<C: Connector> Drop for SubscriptionRegistry<C> {
    fn drop(&mut self) {
        if let Some(routing) = lock(&self.routing).take() {
            routing.unsubscribe();
        }
    }
}
