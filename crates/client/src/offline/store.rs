// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable storage for queued requests.
//!
//! Records are kept per key. [`JsonlStore`] writes one JSON Lines file per
//! key, fsynced on every append. Several processes may share a directory:
//! each load-modify-write runs under [`Store::acquire`], and only one of
//! them drains at a time through [`Store::try_claim_drain`].

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tether_core::{jsonl, QueuedRequest};
use tracing::warn;

use crate::lock;

const LOCK_FILE_NAME: &str = ".lock";
const DRAIN_LOCK_FILE_NAME: &str = ".drain.lock";

/// How long [`Store::acquire`] on a [`JsonlStore`] waits for another process by default.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);
const LOCK_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("queue directory {} is busy\n  hint: another tether process is holding the queue lock; try again", .0.display())]
    Locked(PathBuf),

    #[error(transparent)]
    Core(#[from] tether_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A held store lock, released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct StoreGuard {
    file: Option<File>,
}

impl StoreGuard {
    fn unlocked() -> Self {
        StoreGuard { file: None }
    }
}

impl Drop for StoreGuard {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            let _ = FileExt::unlock(file);
        }
    }
}

/// Key-value storage of ordered request records.
pub trait Store: Send + Sync {
    /// Excludes other users of the same store until the guard drops.
    ///
    /// Callers hold it across each load-modify-write.
    fn acquire(&self) -> StoreResult<StoreGuard>;

    /// Claims the right to drain, or `None` while someone else holds it.
    fn try_claim_drain(&self) -> StoreResult<Option<StoreGuard>>;

    /// All records under `key`, oldest first. Missing keys are empty.
    fn load(&self, key: &str) -> StoreResult<Vec<QueuedRequest>>;

    /// Adds one record at the end of `key`.
    fn append(&self, key: &str, record: &QueuedRequest) -> StoreResult<()>;

    /// Replaces every record under `key`.
    fn replace(&self, key: &str, records: &[QueuedRequest]) -> StoreResult<()>;
}

/// JSON Lines files in a directory shared between processes.
pub struct JsonlStore {
    dir: PathBuf,
    lock_wait: Duration,
}

impl JsonlStore {
    /// Opens `dir`, creating it if needed. Takes no lock.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(JsonlStore {
            dir: dir.to_path_buf(),
            lock_wait: DEFAULT_LOCK_WAIT,
        })
    }

    /// Sets how long [`Store::acquire`] waits before failing with
    /// [`StoreError::Locked`].
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.jsonl"))
    }

    fn lock_file(&self, name: &str) -> StoreResult<File> {
        Ok(fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(name))?)
    }
}

impl Store for JsonlStore {
    fn acquire(&self) -> StoreResult<StoreGuard> {
        let file = self.lock_file(LOCK_FILE_NAME)?;
        let deadline = Instant::now() + self.lock_wait;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(StoreGuard { file: Some(file) }),
                Err(e) if e.kind() != fs2::lock_contended_error().kind() => {
                    return Err(e.into())
                }
                Err(_) if Instant::now() < deadline => std::thread::sleep(LOCK_POLL),
                Err(_) => return Err(StoreError::Locked(self.dir.clone())),
            }
        }
    }

    fn try_claim_drain(&self) -> StoreResult<Option<StoreGuard>> {
        let file = self.lock_file(DRAIN_LOCK_FILE_NAME)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(StoreGuard { file: Some(file) })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads `key`, repairing a record torn by an interrupted append.
    fn load(&self, key: &str) -> StoreResult<Vec<QueuedRequest>> {
        let path = self.path_for(key);
        let recovered = jsonl::read_recovering(&path)?;
        if let Some(tail) = recovered.torn_tail {
            warn!(
                path = %path.display(),
                %tail,
                kept = recovered.records.len(),
                "dropping torn record left by an interrupted write"
            );
            jsonl::write_all(&path, &recovered.records)?;
        }
        Ok(recovered.records)
    }

    fn append(&self, key: &str, record: &QueuedRequest) -> StoreResult<()> {
        Ok(jsonl::append(&self.path_for(key), record)?)
    }

    fn replace(&self, key: &str, records: &[QueuedRequest]) -> StoreResult<()> {
        Ok(jsonl::write_all(&self.path_for(key), records)?)
    }
}

/// In-process store for tests and ephemeral clients.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Vec<QueuedRequest>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn acquire(&self) -> StoreResult<StoreGuard> {
        Ok(StoreGuard::unlocked())
    }

    fn try_claim_drain(&self) -> StoreResult<Option<StoreGuard>> {
        Ok(Some(StoreGuard::unlocked()))
    }

    fn load(&self, key: &str) -> StoreResult<Vec<QueuedRequest>> {
        Ok(lock(&self.records).get(key).cloned().unwrap_or_default())
    }

    fn append(&self, key: &str, record: &QueuedRequest) -> StoreResult<()> {
        lock(&self.records)
            .entry(key.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn replace(&self, key: &str, records: &[QueuedRequest]) -> StoreResult<()> {
        lock(&self.records).insert(key.to_string(), records.to_vec());
        Ok(())
    }
}
