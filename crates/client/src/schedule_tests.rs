// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use yare::parameterized;

fn backoff() -> Backoff {
    Backoff::new(Duration::from_millis(1000), Duration::from_millis(30_000))
}

#[parameterized(
    first = { 0, 1000 },
    second = { 1, 2000 },
    third = { 2, 4000 },
    fourth = { 3, 8000 },
    fifth = { 4, 16000 },
    capped = { 5, 30000 },
    far_out = { 40, 30000 },
    overflow = { 200, 30000 },
)]
fn delay_doubles_until_capped(attempt: u32, expected_ms: u64) {
    assert_eq!(backoff().delay(attempt), Duration::from_millis(expected_ms));
}

#[test]
fn zero_initial_stays_zero() {
    let backoff = Backoff::new(Duration::ZERO, Duration::from_secs(5));
    assert_eq!(backoff.delay(3), Duration::ZERO);
}

fn flag_task(flag: &Arc<AtomicBool>) -> impl FnOnce() -> std::future::Ready<()> + Send + 'static {
    let flag = Arc::clone(flag);
    move || {
        flag.store(true, Ordering::SeqCst);
        std::future::ready(())
    }
}

#[tokio::test(start_paused = true)]
async fn task_runs_after_delay() {
    let fired = Arc::new(AtomicBool::new(false));
    let task = ScheduledTask::spawn(Duration::from_millis(500), flag_task(&fired));

    tokio::time::sleep(Duration::from_millis(499)).await;
    assert!(!fired.load(Ordering::SeqCst));

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert!(fired.load(Ordering::SeqCst));
    assert!(!task.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn cancelled_task_never_runs() {
    let fired = Arc::new(AtomicBool::new(false));
    let task = ScheduledTask::spawn(Duration::from_millis(500), flag_task(&fired));

    task.cancel();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!fired.load(Ordering::SeqCst));
    assert!(task.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_cancels() {
    let fired = Arc::new(AtomicBool::new(false));
    drop(ScheduledTask::spawn(
        Duration::from_millis(500),
        flag_task(&fired),
    ));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!fired.load(Ordering::SeqCst));
}
