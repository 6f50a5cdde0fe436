// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Events published by the connection manager.

use tether_core::Update;

use super::connection::ConnectionError;

/// A topic connection reached `Open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEvent {
    pub topic: String,
}

/// Why a topic connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `disconnect` was called.
    Manual,
    /// The transport closed, failed, or never opened.
    Unexpected(String),
}

impl CloseReason {
    pub fn is_manual(&self) -> bool {
        matches!(self, CloseReason::Manual)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub topic: String,
    pub reason: CloseReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub topic: String,
    pub error: ConnectionError,
}

/// A decoded update pushed on a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMessage {
    pub topic: String,
    pub update: Update,
}
