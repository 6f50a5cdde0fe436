// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol frames for the live-data push connection.
//!
//! The protocol is small:
//! - Client sends `{"action": "refresh"}` and `{"action": "ping"}`
//! - Server sends `connected`, `<domain>_update`, `error` and `pong` frames
//!
//! Server frame types are open-ended (`weather_update`, `aqi_update`, ...),
//! so [`ServerFrame`] is decoded by hand instead of through a serde tag.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Suffix that marks a data update frame type.
const UPDATE_SUFFIX: &str = "_update";

/// Error decoding an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame is not valid JSON.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The frame is JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// The frame has no `type` field.
    #[error("frame has no 'type' field")]
    MissingType,

    /// A known field has the wrong shape.
    #[error("invalid '{field}' field: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

/// Frames sent from client to server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Ask the server to push the current state immediately.
    Refresh,

    /// Keep-alive ping.
    Ping,
}

impl ClientFrame {
    /// Serializes the frame to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the frame from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// A data update pushed for a topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Update {
    /// Domain taken from the frame type (`weather` for `weather_update`).
    pub domain: String,
    /// Update payload, `null` when the frame carried none.
    pub data: Value,
}

/// Frames sent from server to client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    /// Connection acknowledged. Any extra fields are kept as-is.
    Connected { details: Map<String, Value> },

    /// A `<domain>_update` frame.
    Update(Update),

    /// Server-side error report.
    Error { message: String },

    /// Pong response to a client ping.
    Pong,

    /// A well-formed frame of a type this client does not handle.
    Other { kind: String },
}

impl ServerFrame {
    /// Creates an Update frame.
    pub fn update(domain: impl Into<String>, data: Value) -> Self {
        ServerFrame::Update(Update {
            domain: domain.into(),
            data,
        })
    }

    /// Creates an Error frame.
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }

    /// Returns the wire `type` value of this frame.
    pub fn kind(&self) -> String {
        match self {
            ServerFrame::Connected { .. } => "connected".to_string(),
            ServerFrame::Update(update) => format!("{}{}", update.domain, UPDATE_SUFFIX),
            ServerFrame::Error { .. } => "error".to_string(),
            ServerFrame::Pong => "pong".to_string(),
            ServerFrame::Other { kind } => kind.clone(),
        }
    }

    /// Serializes the frame to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let value = match self {
            ServerFrame::Connected { details } => {
                let mut map = details.clone();
                map.insert("type".to_string(), Value::String(self.kind()));
                Value::Object(map)
            }
            ServerFrame::Update(update) => json!({ "type": self.kind(), "data": update.data }),
            ServerFrame::Error { message } => json!({ "type": "error", "message": message }),
            ServerFrame::Pong | ServerFrame::Other { .. } => json!({ "type": self.kind() }),
        };
        serde_json::to_string(&value)
    }

    /// Deserializes the frame from JSON.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        let Value::Object(mut map) = serde_json::from_str::<Value>(s)? else {
            return Err(ProtocolError::NotAnObject);
        };

        let kind = match map.remove("type") {
            Some(Value::String(kind)) => kind,
            Some(_) => {
                return Err(ProtocolError::InvalidField {
                    field: "type",
                    reason: "expected a string",
                })
            }
            None => return Err(ProtocolError::MissingType),
        };

        match kind.as_str() {
            "connected" => Ok(ServerFrame::Connected { details: map }),
            "pong" => Ok(ServerFrame::Pong),
            "error" => match map.remove("message") {
                Some(Value::String(message)) => Ok(ServerFrame::Error { message }),
                None => Ok(ServerFrame::Error {
                    message: String::new(),
                }),
                Some(_) => Err(ProtocolError::InvalidField {
                    field: "message",
                    reason: "expected a string",
                }),
            },
            _ => match kind.strip_suffix(UPDATE_SUFFIX) {
                Some(domain) if !domain.is_empty() => Ok(ServerFrame::Update(Update {
                    domain: domain.to_string(),
                    data: map.remove("data").unwrap_or(Value::Null),
                })),
                _ => Ok(ServerFrame::Other { kind }),
            },
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
