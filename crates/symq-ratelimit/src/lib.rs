// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-backend admission control and in-flight request coalescing.
//!
//! Two concerns live here. **Admission**: each backend with a configured
//! in-flight cap gets a counting semaphore; acquisition races the caller's
//! cancellation. **Coalescing**: identical concurrent requests (by
//! fingerprint) collapse into one underlying execution whose outcome every
//! waiter observes. A background sweeper bounds the coalescing table.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod fingerprint;
mod slot;

pub use fingerprint::fingerprint;

use slot::OutcomeSlot;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use symq_cancel::CancellationToken;
use symq_core::{QueryData, QueryRequest};
use symq_error::QueryError;
use symq_policy::QueryPolicy;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::debug;

/// How often the background sweeper scans for expired entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// The shared outcome of one coalesced execution.
pub type CoalesceOutcome = Result<QueryData, QueryError>;

/// A held admission slot. Dropping it releases the permit; for backends
/// without a configured cap the permit is empty and dropping is a no-op.
#[derive(Debug)]
pub struct AdmissionPermit {
    permit: Option<OwnedSemaphorePermit>,
}

impl AdmissionPermit {
    /// Whether this permit came from a capped backend.
    pub fn is_limited(&self) -> bool {
        self.permit.is_some()
    }
}

struct InFlight {
    slot: OutcomeSlot<CoalesceOutcome>,
    expires_at: Instant,
    waiters: AtomicUsize,
}

type InFlightTable = Arc<RwLock<HashMap<String, Arc<InFlight>>>>;

/// Admission semaphores plus the coalescing table and its sweeper.
pub struct RateLimiter {
    semaphores: HashMap<String, Arc<Semaphore>>,
    inflight: InFlightTable,
    window: Duration,
    shutdown: CancellationToken,
}

impl RateLimiter {
    /// Build the limiter from the policy and start the sweeper.
    ///
    /// Semaphores exist only for backends with an explicitly configured
    /// positive cap; every other backend is admitted without limit. Must be
    /// called within a tokio runtime.
    pub fn new(policy: &QueryPolicy) -> Self {
        let semaphores = policy
            .max_in_flight
            .iter()
            .filter(|(_, cap)| **cap > 0)
            .map(|(id, cap)| (id.clone(), Arc::new(Semaphore::new(*cap))))
            .collect();
        let inflight: InFlightTable = Arc::default();
        let shutdown = CancellationToken::new();

        let sweeper_table = Arc::clone(&inflight);
        let sweeper_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sweeper_shutdown.cancelled() => break,
                    _ = tokio::time::sleep(SWEEP_INTERVAL) => {
                        let now = Instant::now();
                        let mut table = sweeper_table.write().expect("inflight lock poisoned");
                        let before = table.len();
                        table.retain(|_, entry| entry.expires_at > now);
                        let evicted = before - table.len();
                        if evicted > 0 {
                            debug!(evicted, "swept expired coalescing entries");
                        }
                    }
                }
            }
            debug!("coalescing sweeper stopped");
        });

        Self {
            semaphores,
            inflight,
            window: policy.coalesce_window(),
            shutdown,
        }
    }

    /// Wait for an admission permit, losing to the caller's cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`rate-limited`](symq_error::ErrorKind::RateLimited) when the
    /// caller is cancelled before a permit frees up.
    pub async fn acquire(
        &self,
        token: &CancellationToken,
        backend_id: &str,
    ) -> Result<AdmissionPermit, QueryError> {
        let Some(semaphore) = self.semaphores.get(backend_id) else {
            return Ok(AdmissionPermit { permit: None });
        };
        tokio::select! {
            acquired = Arc::clone(semaphore).acquire_owned() => acquired
                .map(|permit| AdmissionPermit { permit: Some(permit) })
                .map_err(|_| QueryError::internal(format!("admission semaphore for {backend_id} closed"))),
            _ = token.cancelled() => Err(
                QueryError::rate_limited(format!(
                    "cancelled while waiting for admission to {backend_id}"
                ))
                .with_remediation("reduce concurrent queries or raise max_in_flight"),
            ),
        }
    }

    /// Whether `backend_id` has a configured in-flight cap.
    pub fn is_limited(&self, backend_id: &str) -> bool {
        self.semaphores.contains_key(backend_id)
    }

    /// Free permits for a capped backend, `None` for unlimited backends.
    pub fn available_permits(&self, backend_id: &str) -> Option<usize> {
        self.semaphores
            .get(backend_id)
            .map(|s| s.available_permits())
    }

    /// Number of live coalescing entries, for diagnostics and tests.
    pub fn in_flight_entries(&self) -> usize {
        self.inflight.read().expect("inflight lock poisoned").len()
    }

    /// How many callers joined the in-flight execution of `(backend,
    /// request)`, not counting the originator.
    pub fn coalesced_waiters(
        &self,
        backend_id: &str,
        request: &QueryRequest,
    ) -> Result<usize, QueryError> {
        let fp = fingerprint(backend_id, request)?;
        let table = self.inflight.read().expect("inflight lock poisoned");
        Ok(table
            .get(&fp)
            .map_or(0, |e| e.waiters.load(Ordering::SeqCst)))
    }

    /// Run `work` once per coalescing window for identical requests.
    ///
    /// A caller finding a live entry joins it and waits for the shared
    /// outcome (or its own cancellation — which never disturbs the entry).
    /// Otherwise the caller installs a fresh entry and the work runs on a
    /// detached task that publishes into the entry's slot whatever happens
    /// to the caller, then evicts the entry one window later. A caller
    /// cancelled before its work starts removes the entry so the next
    /// arrival executes afresh.
    pub async fn coalesce_or_execute<F, Fut>(
        &self,
        token: &CancellationToken,
        backend_id: &str,
        request: &QueryRequest,
        work: F,
    ) -> CoalesceOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CoalesceOutcome> + Send + 'static,
    {
        let fp = fingerprint(backend_id, request)?;

        if let Some(entry) = self.live_entry(&fp) {
            debug!(backend = backend_id, "joining coalesced execution");
            return self.join(token, &entry).await;
        }

        let entry = Arc::new(InFlight {
            slot: OutcomeSlot::new(),
            expires_at: Instant::now() + self.window,
            waiters: AtomicUsize::new(0),
        });
        let raced_existing = {
            let mut table = self.inflight.write().expect("inflight lock poisoned");
            // Someone may have installed an entry between the read and this
            // write; join theirs instead of double-executing.
            let now = Instant::now();
            let existing = table.get(&fp).filter(|e| e.expires_at > now).cloned();
            if existing.is_none() {
                table.insert(fp.clone(), Arc::clone(&entry));
            }
            existing
        };
        if let Some(existing) = raced_existing {
            debug!(backend = backend_id, "joining coalesced execution");
            return self.join(token, &existing).await;
        }

        if token.is_cancelled() {
            self.remove_entry(&fp, &entry);
            return Err(QueryError::timeout(format!(
                "query cancelled before dispatch to {backend_id}"
            )));
        }

        let fut = work();
        let publish_entry = Arc::clone(&entry);
        let table = Arc::clone(&self.inflight);
        let window = self.window;
        let shutdown = self.shutdown.clone();
        let eviction_fp = fp.clone();
        tokio::spawn(async move {
            let outcome = fut.await;
            publish_entry.slot.publish(outcome);
            // Stay joinable for one further window, then evict even when no
            // sweeper runs.
            tokio::select! {
                _ = tokio::time::sleep(window) => {}
                _ = shutdown.cancelled() => {}
            }
            let mut table = table.write().expect("inflight lock poisoned");
            let still_ours = table
                .get(&eviction_fp)
                .is_some_and(|current| Arc::ptr_eq(current, &publish_entry));
            if still_ours {
                table.remove(&eviction_fp);
            }
        });

        self.wait_for_outcome(token, &entry).await
    }

    /// Stop the sweeper and drop every coalescing entry. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.inflight
            .write()
            .expect("inflight lock poisoned")
            .clear();
    }

    fn live_entry(&self, fp: &str) -> Option<Arc<InFlight>> {
        let table = self.inflight.read().expect("inflight lock poisoned");
        let now = Instant::now();
        table.get(fp).filter(|e| e.expires_at > now).cloned()
    }

    fn remove_entry(&self, fp: &str, expected: &Arc<InFlight>) {
        let mut table = self.inflight.write().expect("inflight lock poisoned");
        let still_ours = table
            .get(fp)
            .is_some_and(|current| Arc::ptr_eq(current, expected));
        if still_ours {
            table.remove(fp);
        }
    }

    async fn join(&self, token: &CancellationToken, entry: &Arc<InFlight>) -> CoalesceOutcome {
        entry.waiters.fetch_add(1, Ordering::SeqCst);
        self.wait_for_outcome(token, entry).await
    }

    async fn wait_for_outcome(
        &self,
        token: &CancellationToken,
        entry: &Arc<InFlight>,
    ) -> CoalesceOutcome {
        tokio::select! {
            outcome = entry.slot.wait() => outcome,
            _ = token.cancelled() => Err(QueryError::timeout(
                "query cancelled while waiting for a coalesced result",
            )),
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
