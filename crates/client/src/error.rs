// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::live::ConnectionError;
use crate::offline::{QueueError, RequestError, SendError, StoreError};

/// All possible errors that can occur in the tether library.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("no data directory available\n  hint: pass --data-dir or set queue.data_dir in the config file")]
    NoDataDir,

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("http client error: {0}")]
    Http(#[from] SendError),

    #[error(transparent)]
    Core(#[from] tether_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tether operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
