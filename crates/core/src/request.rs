// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP request model shared by the request client and the offline queue.
//!
//! A [`RequestSpec`] is what a call site asks to send. When sending fails for
//! connectivity reasons it becomes a [`QueuedRequest`], which is what gets
//! persisted and later replayed byte-for-byte.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Returns true for methods that change server state.
    ///
    /// Only these are eligible for the offline queue.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Method::Post | Method::Put | Method::Patch | Method::Delete
        )
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }
}

/// A request as issued by a call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    /// Header name/value pairs in the order they were given.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        RequestSpec {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the request body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Parses a `Name: value` header line.
pub fn parse_header(line: &str) -> Result<(String, String)> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| Error::InvalidHeader(line.to_string()))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(Error::InvalidHeader(line.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// A mutating request waiting in the offline queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub id: String,
    #[serde(flatten)]
    pub request: RequestSpec,
    pub enqueued_at: DateTime<Utc>,
    /// Number of failed replay attempts so far.
    #[serde(default)]
    pub retry_count: u32,
    pub max_retries: u32,
}

impl QueuedRequest {
    pub fn new(
        id: String,
        request: RequestSpec,
        enqueued_at: DateTime<Utc>,
        max_retries: u32,
    ) -> Self {
        QueuedRequest {
            id,
            request,
            enqueued_at,
            retry_count: 0,
            max_retries,
        }
    }

    /// Returns true once the entry has used up its replay attempts.
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Generate a request ID from the request and the time it was queued.
/// Format: {method}-{hash} where hash is first 8 hex chars of
/// SHA256(method + url + body + timestamp)
pub fn generate_request_id(request: &RequestSpec, at: &DateTime<Utc>) -> String {
    let input = format!(
        "{}{}{}{}",
        request.method,
        request.url,
        request.body.as_deref().unwrap_or_default(),
        at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
    );
    let hash = Sha256::digest(input.as_bytes());
    let short_hash = hex::encode(&hash[..4]);
    format!("{}-{}", request.method.as_str().to_ascii_lowercase(), short_hash)
}

/// Generate a unique request ID, appending an incrementing suffix on collision.
pub fn generate_unique_request_id<F>(request: &RequestSpec, at: &DateTime<Utc>, exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    let base_id = generate_request_id(request, at);

    if !exists(&base_id) {
        return base_id;
    }

    let mut suffix = 2;
    loop {
        let id = format!("{}-{}", base_id, suffix);
        if !exists(&id) {
            return id;
        }
        suffix += 1;
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
