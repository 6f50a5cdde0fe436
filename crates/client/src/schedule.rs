// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff and cancellable one-shot timers.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Exponential backoff: `min(initial * 2^attempt, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Backoff { initial, max }
    }

    /// Delay before the reconnect that follows `attempt` prior failures.
    pub fn delay(&self, attempt: u32) -> Duration {
        let initial_ms = self.initial.as_millis();
        let max_ms = self.max.as_millis();
        if initial_ms == 0 {
            return Duration::ZERO;
        }
        let scaled = 1u128
            .checked_shl(attempt)
            .and_then(|factor| initial_ms.checked_mul(factor))
            .unwrap_or(u128::MAX);
        Duration::from_millis(u64::try_from(scaled.min(max_ms)).unwrap_or(u64::MAX))
    }
}

/// A task that runs once after a delay unless cancelled first.
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct ScheduledTask {
    cancel: CancellationToken,
}

impl ScheduledTask {
    /// Spawns `task` to run after `delay` on the current tokio runtime.
    pub fn spawn<F, Fut>(delay: Duration, task: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if !token.is_cancelled() {
                        task().await;
                    }
                }
            }
        });
        ScheduledTask { cancel }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
