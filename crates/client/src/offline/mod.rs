// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline request handling.
//!
//! ```text
//! issue ──► HttpSender ──ok──► caller
//!               │
//!          unreachable (mutating)
//!               ▼
//!         RequestQueue ──► Store (JSONL)
//!               ▲
//!      drain on online / sync tag
//!               │
//!        SyncCoordinator
//! ```

mod coordinator;
mod http;
mod queue;
mod store;

pub use coordinator::{
    BackgroundSync, NetworkSignal, NetworkStatus, NoBackgroundSync, SyncCoordinator, SYNC_TAG,
};
pub use http::{
    classify, default_classifier, Classifier, FailureClass, HttpConfig, HttpResponse, HttpSender,
    IssueOutcome, ReqwestSender, RequestClient, RequestError, RequestFailure, SendError,
    SendFuture,
};
pub use queue::{
    DrainOutcome, DrainReport, DropReason, DroppedRequest, FailureOutcome, QueueConfig,
    QueueError, QueueResult, QueueStats, ReplayError, RequestQueue, QUEUE_KEY,
};
pub use store::{
    JsonlStore, MemoryStore, Store, StoreError, StoreGuard, StoreResult, DEFAULT_LOCK_WAIT,
};

#[cfg(test)]
pub(crate) mod test_helpers;
