// SPDX-License-Identifier: MIT OR Apache-2.0
//! The public entry point: registry, fan-out, merge.
//!
//! A query snapshots the registry, asks the ladder which backends to
//! consult, runs each on its own task under its own deadline (admission and
//! coalescing included), and hands the ordered results to the configured
//! merger. Backend failures never abort the fan-out; they surface as
//! contribution records on the final answer.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use symq_backend_core::{BackendDescriptor, BackendResult, SymbolBackend, dispatch};
use symq_cancel::CancellationToken;
use symq_core::{BackendContribution, QueryData, QueryRequest, QueryResult};
use symq_error::QueryError;
use symq_merge::{ResultMerger, merger_for};
use symq_policy::QueryPolicy;
use symq_ratelimit::RateLimiter;
use tracing::{debug, warn};

/// Owns the backend registry and drives the query pipeline.
pub struct Orchestrator {
    policy: Arc<QueryPolicy>,
    registry: RwLock<BTreeMap<String, Arc<dyn SymbolBackend>>>,
    limiter: Arc<RateLimiter>,
    merger: Box<dyn ResultMerger>,
    closed: AtomicBool,
}

impl Orchestrator {
    /// Build an orchestrator for the given policy.
    ///
    /// Starts the rate limiter's background sweeper; must be called within
    /// a tokio runtime.
    pub fn new(policy: QueryPolicy) -> Self {
        let limiter = Arc::new(RateLimiter::new(&policy));
        let merger = merger_for(policy.merge_mode);
        Self {
            policy: Arc::new(policy),
            registry: RwLock::new(BTreeMap::new()),
            limiter,
            merger,
            closed: AtomicBool::new(false),
        }
    }

    /// The policy this orchestrator runs under.
    pub fn policy(&self) -> &QueryPolicy {
        &self.policy
    }

    /// Register a backend, replacing any previous registration under the
    /// same id.
    pub fn register(&self, backend: Arc<dyn SymbolBackend>) {
        let id = backend.id().to_string();
        debug!(backend = %id, "registering backend");
        self.registry
            .write()
            .expect("registry lock poisoned")
            .insert(id, backend);
    }

    /// Remove a backend. Returns `true` if it was registered.
    ///
    /// An in-flight query that already snapshotted the registry may still
    /// send the removed backend one last call.
    pub fn unregister(&self, id: &str) -> bool {
        debug!(backend = %id, "unregistering backend");
        self.registry
            .write()
            .expect("registry lock poisoned")
            .remove(id)
            .is_some()
    }

    /// Ids of registered backends currently reporting themselves available.
    pub fn available_ids(&self) -> Vec<String> {
        self.registry
            .read()
            .expect("registry lock poisoned")
            .iter()
            .filter(|(_, b)| b.available())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// `true` iff every registered backend reports itself healthy.
    pub fn healthy(&self) -> bool {
        self.registry
            .read()
            .expect("registry lock poisoned")
            .values()
            .all(|b| b.healthy())
    }

    /// Answer one query.
    ///
    /// # Errors
    ///
    /// - [`backend-unavailable`](symq_error::ErrorKind::BackendUnavailable)
    ///   when no backend is available, none supports the request type, or
    ///   every consulted backend failed;
    /// - [`timeout`](symq_error::ErrorKind::Timeout) when the caller's
    ///   token was cancelled;
    /// - whatever the merger reports.
    pub async fn query(
        &self,
        token: &CancellationToken,
        request: &QueryRequest,
    ) -> Result<QueryResult, QueryError> {
        let started = Instant::now();

        let snapshot: BTreeMap<String, Arc<dyn SymbolBackend>> = {
            let registry = self.registry.read().expect("registry lock poisoned");
            registry
                .iter()
                .filter(|(_, b)| b.available())
                .map(|(id, b)| (id.clone(), Arc::clone(b)))
                .collect()
        };
        if snapshot.is_empty() {
            return Err(QueryError::backend_unavailable("no backend available")
                .with_remediation("register at least one available backend"));
        }

        let descriptors: Vec<BackendDescriptor> = snapshot
            .values()
            .map(|b| BackendDescriptor::for_backend(b.as_ref()))
            .collect();
        let selected = symq_ladder::select(&self.policy, &descriptors, request);
        if selected.is_empty() {
            return Err(QueryError::backend_unavailable(format!(
                "no available backend supports {} queries",
                request.kind()
            )));
        }
        debug!(?selected, kind = %request.kind(), "consulting backends");

        let mut handles = Vec::with_capacity(selected.len());
        for id in &selected {
            let Some(backend) = snapshot.get(id).cloned() else {
                continue;
            };
            let policy = Arc::clone(&self.policy);
            let limiter = Arc::clone(&self.limiter);
            let token = token.clone();
            let request = request.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                run_backend(&policy, &limiter, &token, backend, id, request).await
            }));
        }

        let joined = join_all(handles).await;
        let mut results = Vec::with_capacity(joined.len());
        for (id, outcome) in selected.iter().zip(joined) {
            match outcome {
                Ok(result) => results.push(result),
                Err(join_error) => results.push(BackendResult::failed(
                    id.clone(),
                    QueryError::internal(format!("backend task for {id} aborted"))
                        .with_source(join_error),
                    started.elapsed().as_millis() as u64,
                )),
            }
        }

        if token.is_cancelled() {
            return Err(QueryError::timeout("query cancelled"));
        }
        if results.iter().all(|r| !r.is_ok()) {
            return Err(QueryError::backend_unavailable("all backends failed"));
        }

        let merged = self.merger.merge(&results, &self.policy)?;
        let contributions = results
            .iter()
            .map(|r| BackendContribution {
                backend_id: r.backend_id.clone(),
                item_count: r.item_count(),
                duration_ms: r.duration_ms,
                was_used: r.is_ok(),
                error: r.error.as_ref().map(ToString::to_string).unwrap_or_default(),
            })
            .collect();

        Ok(QueryResult {
            data: merged.data,
            completeness: merged.completeness,
            contributions,
            provenance: merged.provenance,
            total_duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Close every backend, clear the registry, and stop the rate limiter's
    /// sweeper. Idempotent; returns the first close error after finishing
    /// the rest.
    pub async fn shutdown(&self) -> Result<(), QueryError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let backends: Vec<Arc<dyn SymbolBackend>> = {
            let mut registry = self.registry.write().expect("registry lock poisoned");
            let drained = registry.values().cloned().collect();
            registry.clear();
            drained
        };
        let mut first_error = None;
        for backend in backends {
            if let Err(error) = backend.close().await {
                warn!(backend = backend.id(), error = %error, "backend close failed");
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        self.limiter.shutdown();
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Consult one backend under its deadline, racing the caller's
/// cancellation. Failures are captured into the result, never propagated.
async fn run_backend(
    policy: &QueryPolicy,
    limiter: &RateLimiter,
    token: &CancellationToken,
    backend: Arc<dyn SymbolBackend>,
    backend_id: String,
    request: QueryRequest,
) -> BackendResult {
    let started = Instant::now();
    let deadline = policy.timeout(&backend_id);
    let outcome = tokio::select! {
        timed = tokio::time::timeout(deadline, consult(limiter, token, &backend, &backend_id, &request)) => {
            match timed {
                Ok(outcome) => outcome,
                Err(_) => Err(QueryError::timeout(format!(
                    "backend {backend_id} exceeded its {} ms deadline",
                    deadline.as_millis()
                ))),
            }
        }
        _ = token.cancelled() => Err(QueryError::timeout(format!(
            "query cancelled while consulting {backend_id}"
        ))),
    };
    let duration_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(data) => {
            debug!(backend = %backend_id, duration_ms, "backend answered");
            BackendResult::ok(backend_id, data, duration_ms)
        }
        Err(error) => {
            warn!(backend = %backend_id, error = %error, "backend failed");
            BackendResult::failed(backend_id, error, duration_ms)
        }
    }
}

/// Admission, then coalesced dispatch. The permit travels into the
/// coalesced execution so backend capacity stays claimed for as long as the
/// underlying call runs, and is released immediately when the call merely
/// joins an existing execution.
async fn consult(
    limiter: &RateLimiter,
    token: &CancellationToken,
    backend: &Arc<dyn SymbolBackend>,
    backend_id: &str,
    request: &QueryRequest,
) -> Result<QueryData, QueryError> {
    let permit = limiter.acquire(token, backend_id).await?;
    let dispatch_backend = Arc::clone(backend);
    let dispatch_request = request.clone();
    limiter
        .coalesce_or_execute(token, backend_id, request, move || async move {
            let _permit = permit;
            dispatch(dispatch_backend.as_ref(), &dispatch_request).await
        })
        .await
}
