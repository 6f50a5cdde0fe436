// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tether-core operations.

use thiserror::Error;

/// All possible errors that can occur in tether-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid method: '{0}'\n  hint: valid methods are: GET, HEAD, OPTIONS, POST, PUT, PATCH, DELETE")]
    InvalidMethod(String),

    #[error("invalid header: '{0}'\n  hint: headers are written as 'Name: value'")]
    InvalidHeader(String),

    #[error("corrupted record at line {line}: {reason}")]
    CorruptedRecord { line: usize, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tether-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
