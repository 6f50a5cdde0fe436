// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-core: Shared primitives for the tether connectivity layer.
//!
//! This crate provides the push-connection wire protocol, the request model
//! persisted by the offline queue, and the JSONL helpers that back durable
//! storage.

pub mod error;
pub mod jsonl;
pub mod protocol;
pub mod request;

pub use error::{Error, Result};
pub use protocol::{ClientFrame, ProtocolError, ServerFrame, Update};
pub use request::{
    generate_request_id, generate_unique_request_id, parse_header, Method, QueuedRequest,
    RequestSpec,
};
