// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for offline module tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Mutex;

use tether_core::RequestSpec;

use super::http::{HttpResponse, HttpSender, SendError, SendFuture};

/// Replies from a script and records every request it sees.
#[derive(Default)]
pub struct MockSender {
    replies: Mutex<VecDeque<Result<HttpResponse, SendError>>>,
    seen: Mutex<Vec<RequestSpec>>,
}

impl MockSender {
    pub fn reply(&self, reply: Result<HttpResponse, SendError>) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn ok(&self, status: u16) -> &Self {
        self.reply(Ok(HttpResponse {
            status,
            body: String::new(),
        }))
    }

    pub fn refuse(&self) -> &Self {
        self.reply(Err(SendError::Connect("connection refused".to_string())))
    }

    pub fn seen(&self) -> Vec<RequestSpec> {
        self.seen.lock().unwrap().clone()
    }
}

impl HttpSender for MockSender {
    fn send<'a>(&'a self, request: &'a RequestSpec) -> SendFuture<'a> {
        self.seen.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SendError::Connect("no reply scripted".to_string())));
        Box::pin(std::future::ready(reply))
    }
}
