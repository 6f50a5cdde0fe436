// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Listener sets with unsubscribe handles.
//!
//! Every observable event in tether (connection open/close/error/message,
//! queued and dropped requests) is published through a [`Listeners`] set.
//! Registering returns a [`ListenerHandle`]; calling
//! [`ListenerHandle::unsubscribe`] removes exactly that listener.
//!
//! Emission takes a snapshot of the set before invoking anything, so a
//! listener may add or remove listeners (including itself) while an event is
//! being delivered without anyone being skipped.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::lock;

/// A registered callback.
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Slots<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// A set of callbacks interested in events of type `T`.
pub struct Listeners<T> {
    slots: Arc<Mutex<Slots<T>>>,
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Listeners {
            slots: Arc::new(Mutex::new(Slots {
                next_id: 1,
                entries: Vec::new(),
            })),
        }
    }

    /// Registers a listener and returns the handle that removes it.
    pub fn add<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut slots = lock(&self.slots);
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Slots<T>>> = Arc::downgrade(&self.slots);
        ListenerHandle {
            remove: Box::new(move || {
                if let Some(slots) = weak.upgrade() {
                    lock(&slots).entries.retain(|(entry_id, _)| *entry_id != id);
                }
            }),
        }
    }

    /// Delivers an event to every listener registered at call time.
    ///
    /// Returns the number of listeners invoked.
    pub fn emit(&self, event: &T) -> usize {
        let snapshot: Vec<Callback<T>> = lock(&self.slots)
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in &snapshot {
            callback(event);
        }
        snapshot.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes one listener from the set it was registered with.
///
/// Dropping the handle leaves the listener registered.
pub struct ListenerHandle {
    remove: Box<dyn FnOnce() + Send + Sync>,
}

impl ListenerHandle {
    pub fn unsubscribe(self) {
        (self.remove)();
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "listeners_tests.rs"]
mod tests;
