// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cancellation primitive for query fan-out.
//!
//! A query hands one [`CancellationToken`] to every task it spawns:
//! admission waits, coalesced waits, and backend calls all race against it.
//! Cancelling the token wakes every current and future waiter.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A cloneable, cheaply-shareable token used to signal cancellation.
///
/// All clones share the same underlying state; cancelling one immediately
/// makes every clone observe `is_cancelled() == true` and resolves every
/// pending [`cancelled`](Self::cancelled) future.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    /// Create a new token that is **not** cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes when the token is cancelled.
    ///
    /// Resolves immediately if the token is already cancelled. The waiter
    /// registers with the notifier before re-checking the flag, so a cancel
    /// landing between the check and the wait is never missed.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_not_cancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn cancel_flips_state_and_is_idempotent() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let a = CancellationToken::new();
        let b = a.clone();
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancelled().await;
    }

    #[tokio::test]
    async fn cancelled_wakes_a_pending_waiter() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::task::yield_now().await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_wakes_multiple_waiters() {
        let token = CancellationToken::new();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let waiter = token.clone();
            handles.push(tokio::spawn(async move { waiter.cancelled().await }));
        }
        tokio::task::yield_now().await;
        token.cancel();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("waiter should wake")
                .unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn uncancelled_token_keeps_waiting() {
        let token = CancellationToken::new();
        let waited =
            tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await;
        assert!(waited.is_err(), "cancelled() must not resolve on its own");
    }

    #[test]
    fn debug_shows_state() {
        let token = CancellationToken::new();
        assert!(format!("{token:?}").contains("false"));
        token.cancel();
        assert!(format!("{token:?}").contains("true"));
    }
}
