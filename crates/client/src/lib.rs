// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether - connectivity resilience for live-data dashboards.
//!
//! This crate keeps push connections alive while the network comes and goes,
//! and makes sure state-changing requests issued while offline are queued on
//! disk and replayed once connectivity returns.
//!
//! # Main Components
//!
//! - [`live::ConnectionManager`] - one WebSocket per topic, reconnect with backoff, keep-alive
//! - [`live::SubscriptionRegistry`] - topic listeners and message routing
//! - [`offline::RequestQueue`] - durable FIFO of requests awaiting replay
//! - [`offline::SyncCoordinator`] - decides when to drain the queue
//! - [`Client`] - wires all of the above together from a [`Config`]
//!
//! ```rust,ignore
//! use tether::{Client, Config};
//! use tether_core::{Method, RequestSpec};
//!
//! let client = Client::open(&Config::load_or_default(&path)?)?;
//! let sub = client.subscribe("Delhi", |msg| println!("{}", msg.update.data))?;
//! client
//!     .issue(RequestSpec::new(Method::Post, "https://api.example.com/favorites"))
//!     .await?;
//! ```

mod cli;
mod client;
mod commands;

pub mod config;
pub mod error;
pub mod listeners;
pub mod live;
pub mod offline;
pub mod schedule;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use cli::{Cli, Command, ConfigCommand, OutputFormat, QueueCommand};
pub use client::Client;
pub use config::Config;
pub use error::{Error, Result};

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    commands::run(cli).await
}

/// Locks a mutex, recovering the data if a listener panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
