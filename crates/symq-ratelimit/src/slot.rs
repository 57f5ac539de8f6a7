// SPDX-License-Identifier: MIT OR Apache-2.0
//! One-shot broadcast slot: a stored value plus a notifier.
//!
//! Unlike a channel, the slot serves an unbounded number of waiters,
//! including waiters that arrive after publication — every one observes the
//! same value.

use std::sync::RwLock;
use tokio::sync::Notify;

pub(crate) struct OutcomeSlot<T> {
    value: RwLock<Option<T>>,
    notify: Notify,
}

impl<T: Clone> OutcomeSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: RwLock::new(None),
            notify: Notify::new(),
        }
    }

    /// Store the value and wake every pending waiter. The first publication
    /// wins; later calls are ignored.
    pub(crate) fn publish(&self, value: T) {
        {
            let mut guard = self.value.write().expect("slot lock poisoned");
            if guard.is_some() {
                return;
            }
            *guard = Some(value);
        }
        self.notify.notify_waiters();
    }

    pub(crate) fn get(&self) -> Option<T> {
        self.value.read().expect("slot lock poisoned").clone()
    }

    /// Wait until a value is published, then return a clone of it.
    ///
    /// The waiter registers with the notifier before re-checking the stored
    /// value, so a publication landing between the check and the wait is
    /// never missed.
    pub(crate) async fn wait(&self) -> T {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(value) = self.get() {
                return value;
            }
            notified.await;
        }
    }
}
