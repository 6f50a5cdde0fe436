// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable FIFO of requests waiting to be replayed.
//!
//! The store is the source of truth. Every operation reloads it under
//! [`Store::acquire`], so processes sharing a queue directory see each
//! other's changes, and every mutation is written through before it becomes
//! visible in memory. Draining replays entries strictly in enqueue order: an entry that
//! fails for connectivity reasons stays at the head and stops the drain, so a
//! later request is never sent ahead of an earlier one.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tether_core::{generate_unique_request_id, QueuedRequest, RequestSpec};
use tracing::{debug, info, warn};

use super::store::{Store, StoreError, StoreGuard};
use crate::listeners::{ListenerHandle, Listeners};
use crate::lock;

/// Store key holding the queue.
pub const QUEUE_KEY: &str = "request-queue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub max_queue_size: usize,
    /// Failed replays allowed before an entry is dropped.
    pub max_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            max_queue_size: 100,
            max_retries: 3,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("request queue is full ({capacity} entries)\n  hint: the request was not saved; drain or clear the queue and try again")]
    QueueFull { capacity: usize },

    #[error("no queued request with id '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type QueueResult<T> = Result<T, QueueError>;

/// Result of recording a failed replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The entry stays at the head of the queue.
    Retrying { retry_count: u32 },
    /// The entry used its last attempt and was removed.
    Exhausted(QueuedRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    RetriesExhausted,
    /// The backend refused the replayed request.
    Rejected(String),
}

/// A request removed from the queue without succeeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRequest {
    pub request: QueuedRequest,
    pub reason: DropReason,
}

/// Why a replay did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("unreachable: {0}")]
    Connectivity(String),

    #[error("rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// IDs replayed successfully, in order.
    pub replayed: Vec<String>,
    pub dropped: Vec<DroppedRequest>,
    /// Entry whose connectivity failure ended the drain.
    pub stopped_at: Option<String>,
    pub remaining: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain was already running; nothing was touched.
    InProgress,
    Finished(DrainReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub oldest_enqueued_at: Option<DateTime<Utc>>,
}

/// Persistent, bounded queue of requests awaiting replay.
pub struct RequestQueue {
    store: Box<dyn Store>,
    config: QueueConfig,
    entries: Mutex<Vec<QueuedRequest>>,
    draining: AtomicBool,
    on_enqueued: Listeners<QueuedRequest>,
    on_dropped: Listeners<DroppedRequest>,
}

struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RequestQueue {
    /// Opens the queue, loading any entries already in `store`.
    pub fn open(store: Box<dyn Store>, config: QueueConfig) -> QueueResult<Self> {
        let entries = {
            let _guard = store.acquire()?;
            store.load(QUEUE_KEY)?
        };
        if !entries.is_empty() {
            info!(pending = entries.len(), "loaded queued requests");
        }

        Ok(RequestQueue {
            store,
            config,
            entries: Mutex::new(entries),
            draining: AtomicBool::new(false),
            on_enqueued: Listeners::new(),
            on_dropped: Listeners::new(),
        })
    }

    pub fn config(&self) -> QueueConfig {
        self.config
    }

    /// Persists `request` at the tail of the queue.
    ///
    /// Fails with [`QueueError::QueueFull`] without writing anything when the
    /// queue is at capacity.
    pub fn enqueue(&self, request: RequestSpec) -> QueueResult<QueuedRequest> {
        let entry = {
            let (mut entries, _guard) = self.reload()?;
            if entries.len() >= self.config.max_queue_size {
                warn!(
                    method = %request.method,
                    url = %request.url,
                    capacity = self.config.max_queue_size,
                    "request queue full"
                );
                return Err(QueueError::QueueFull {
                    capacity: self.config.max_queue_size,
                });
            }

            let now = Utc::now();
            let id = generate_unique_request_id(&request, &now, |id| {
                entries.iter().any(|entry| entry.id == id)
            });
            let entry = QueuedRequest::new(id, request, now, self.config.max_retries);
            self.store.append(QUEUE_KEY, &entry)?;
            entries.push(entry.clone());
            entry
        };

        info!(
            id = %entry.id,
            method = %entry.request.method,
            url = %entry.request.url,
            "request queued for replay"
        );
        self.on_enqueued.emit(&entry);
        Ok(entry)
    }

    /// Oldest entry, left in place.
    pub fn peek_next(&self) -> Option<QueuedRequest> {
        self.current().first().cloned()
    }

    /// Removes a successfully replayed entry.
    pub fn mark_succeeded(&self, id: &str) -> QueueResult<QueuedRequest> {
        self.remove(id)
    }

    /// Counts a failed replay, dropping the entry once its retries are spent.
    pub fn mark_failed(&self, id: &str) -> QueueResult<FailureOutcome> {
        let outcome = {
            let (mut entries, _guard) = self.reload()?;
            let index = position(&entries, id)?;

            let mut next = entries.clone();
            next[index].retry_count += 1;
            let outcome = if next[index].is_exhausted() {
                FailureOutcome::Exhausted(next.remove(index))
            } else {
                FailureOutcome::Retrying {
                    retry_count: next[index].retry_count,
                }
            };

            self.store.replace(QUEUE_KEY, &next)?;
            *entries = next;
            outcome
        };

        if let FailureOutcome::Exhausted(request) = &outcome {
            warn!(
                id = %request.id,
                attempts = request.retry_count,
                "dropping request after exhausting retries"
            );
            self.on_dropped.emit(&DroppedRequest {
                request: request.clone(),
                reason: DropReason::RetriesExhausted,
            });
        }
        Ok(outcome)
    }

    /// Removes an entry the backend refused and reports it as dropped.
    pub fn drop_rejected(&self, id: &str, reason: &str) -> QueueResult<QueuedRequest> {
        let request = self.remove(id)?;
        warn!(id = %request.id, %reason, "dropping request rejected on replay");
        self.on_dropped.emit(&DroppedRequest {
            request: request.clone(),
            reason: DropReason::Rejected(reason.to_string()),
        });
        Ok(request)
    }

    fn remove(&self, id: &str) -> QueueResult<QueuedRequest> {
        let (mut entries, _guard) = self.reload()?;
        let index = position(&entries, id)?;

        let mut next = entries.clone();
        let removed = next.remove(index);
        self.store.replace(QUEUE_KEY, &next)?;
        *entries = next;
        Ok(removed)
    }

    /// Replays entries oldest first until the queue is empty or one fails.
    ///
    /// A connectivity failure keeps the entry at the head (or drops it when
    /// its retries are spent) and ends the drain. A rejected entry is dropped
    /// and the drain moves on. Only one drain runs at a time, across every
    /// process sharing the store; a concurrent call returns
    /// [`DrainOutcome::InProgress`].
    pub async fn drain<F, Fut>(&self, mut replay: F) -> QueueResult<DrainOutcome>
    where
        F: FnMut(QueuedRequest) -> Fut,
        Fut: Future<Output = Result<(), ReplayError>>,
    {
        if self.draining.swap(true, Ordering::AcqRel) {
            debug!("drain already in progress");
            return Ok(DrainOutcome::InProgress);
        }
        let _guard = DrainGuard(&self.draining);
        let Some(_claim) = self.store.try_claim_drain()? else {
            debug!("drain already in progress in another process");
            return Ok(DrainOutcome::InProgress);
        };

        let mut report = DrainReport::default();
        while let Some(entry) = self.peek_next() {
            let id = entry.id.clone();
            debug!(%id, retry_count = entry.retry_count, "replaying request");

            match replay(entry).await {
                Ok(()) => {
                    self.mark_succeeded(&id)?;
                    report.replayed.push(id);
                }
                Err(ReplayError::Rejected(reason)) => {
                    let request = self.drop_rejected(&id, &reason)?;
                    report.dropped.push(DroppedRequest {
                        request,
                        reason: DropReason::Rejected(reason),
                    });
                }
                Err(ReplayError::Connectivity(reason)) => {
                    match self.mark_failed(&id)? {
                        FailureOutcome::Retrying { retry_count } => {
                            info!(%id, retry_count, %reason, "replay failed, will retry");
                        }
                        FailureOutcome::Exhausted(request) => {
                            report.dropped.push(DroppedRequest {
                                request,
                                reason: DropReason::RetriesExhausted,
                            });
                        }
                    }
                    report.stopped_at = Some(id);
                    break;
                }
            }
        }

        report.remaining = self.len();
        info!(
            replayed = report.replayed.len(),
            dropped = report.dropped.len(),
            remaining = report.remaining,
            "drain finished"
        );
        Ok(DrainOutcome::Finished(report))
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> QueueStats {
        let entries = self.current();
        QueueStats {
            pending: entries.len(),
            oldest_enqueued_at: entries.iter().map(|entry| entry.enqueued_at).min(),
        }
    }

    /// Snapshot of every entry in queue order.
    pub fn entries(&self) -> Vec<QueuedRequest> {
        self.current().clone()
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards every entry. Returns how many were removed.
    pub fn clear(&self) -> QueueResult<usize> {
        let (mut entries, _guard) = self.reload()?;
        self.store.replace(QUEUE_KEY, &[])?;
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    /// Locks the store and refreshes the cached entries from it.
    fn reload(&self) -> QueueResult<(MutexGuard<'_, Vec<QueuedRequest>>, StoreGuard)> {
        let mut entries = lock(&self.entries);
        let guard = self.store.acquire()?;
        *entries = self.store.load(QUEUE_KEY)?;
        Ok((entries, guard))
    }

    /// Entries for read-only callers, falling back to the last known state
    /// when the store cannot be read.
    fn current(&self) -> MutexGuard<'_, Vec<QueuedRequest>> {
        match self.reload() {
            Ok((entries, _guard)) => entries,
            Err(error) => {
                warn!(%error, "could not reload request queue, using cached entries");
                lock(&self.entries)
            }
        }
    }

    pub fn on_enqueued<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&QueuedRequest) + Send + Sync + 'static,
    {
        self.on_enqueued.add(listener)
    }

    pub fn on_dropped<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&DroppedRequest) + Send + Sync + 'static,
    {
        self.on_dropped.add(listener)
    }
}

fn position(entries: &[QueuedRequest], id: &str) -> QueueResult<usize> {
    entries
        .iter()
        .position(|entry| entry.id == id)
        .ok_or_else(|| QueueError::NotFound(id.to_string()))
}
