// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Live push connections.
//!
//! ```text
//! ┌──────────────┐  on_message  ┌──────────────────┐     ┌───────────┐
//! │ Subscription │◄─────────────│ ConnectionManager │────►│ Transport │
//! │   Registry   │── connect ──►│  (one per topic)  │◄────│  (trait)  │
//! └──────────────┘  disconnect  └──────────────────┘     └───────────┘
//! ```
//!
//! - One WebSocket per topic at `<url>/ws/<domain>/<topic>`
//! - Reconnect with exponential backoff, capped attempts
//! - Keep-alive pings while open
//! - Injectable connector for testing

mod connection;
mod events;
mod subscription;
mod transport;

pub use connection::{
    ConnectionConfig, ConnectionError, ConnectionManager, ConnectionState, TopicStatus,
};
pub use events::{CloseEvent, CloseReason, ErrorEvent, OpenEvent, TopicMessage};
pub use subscription::{SubscriptionHandle, SubscriptionRegistry, DEFAULT_GRACE};
pub use transport::{
    Connector, Transport, TransportError, TransportFuture, TransportResult, WebSocketConnector,
    WebSocketTransport,
};

#[cfg(test)]
pub(crate) mod test_helpers;
