// SPDX-License-Identifier: MIT OR Apache-2.0
//! Backend capability traits and the per-backend result envelope.
//!
//! A backend is modelled as a capability set rather than a class hierarchy:
//! [`Backend`] is the base capability every provider carries, and
//! [`SymbolBackend`] adds the three symbol operations. Health and close are
//! optional — a backend that does not care inherits the defaults.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use std::collections::BTreeSet;
use symq_core::{
    Capability, CompletenessInfo, CompletenessReason, QueryData, QueryRequest, ReferenceOptions,
    ReferencesResult, SearchOptions, SearchResult, SymbolResult,
};
use symq_error::{ErrorKind, QueryError};

/// Base capability shared by every information provider.
///
/// Implementations MUST be safe for concurrent calls; the orchestrator
/// serialises nothing.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Opaque identity (e.g. `"scip"`, `"lsp"`, `"git"`).
    fn id(&self) -> &str;

    /// Whether the backend can currently answer. Cheap; may change between
    /// calls.
    fn available(&self) -> bool;

    /// The query capabilities this backend advertises.
    fn capabilities(&self) -> BTreeSet<Capability>;

    /// Informational priority hint; the policy's preference order is
    /// authoritative.
    fn priority(&self) -> u32;

    /// Whether the backend considers itself healthy. Feeds the
    /// orchestrator's aggregate health; defaults to healthy.
    fn healthy(&self) -> bool {
        true
    }

    /// Release resources at shutdown. Defaults to a no-op.
    async fn close(&self) -> Result<(), QueryError> {
        Ok(())
    }
}

/// The three symbol operations, layered on top of [`Backend`].
#[async_trait]
pub trait SymbolBackend: Backend {
    /// Resolve one symbol by stable identifier.
    async fn get_symbol(&self, symbol_id: &str) -> Result<SymbolResult, QueryError>;

    /// Search symbols by textual query.
    async fn search_symbols(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, QueryError>;

    /// Find references to a symbol.
    async fn find_references(
        &self,
        symbol_id: &str,
        options: &ReferenceOptions,
    ) -> Result<ReferencesResult, QueryError>;
}

/// Dispatch a request to the matching [`SymbolBackend`] method.
pub async fn dispatch(
    backend: &dyn SymbolBackend,
    request: &QueryRequest,
) -> Result<QueryData, QueryError> {
    match request {
        QueryRequest::Symbol { symbol_id } => {
            backend.get_symbol(symbol_id).await.map(QueryData::Symbol)
        }
        QueryRequest::Search { query, options } => backend
            .search_symbols(query, options)
            .await
            .map(QueryData::Search),
        QueryRequest::References { symbol_id, options } => backend
            .find_references(symbol_id, options)
            .await
            .map(QueryData::References),
    }
}

/// A point-in-time view of one available backend, used by selection logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    /// The backend's identity.
    pub id: String,
    /// The capabilities it advertised at snapshot time.
    pub capabilities: BTreeSet<Capability>,
}

impl BackendDescriptor {
    /// Snapshot a backend's identity and capabilities.
    pub fn for_backend(backend: &dyn Backend) -> Self {
        Self {
            id: backend.id().to_string(),
            capabilities: backend.capabilities(),
        }
    }
}

/// The outcome of consulting one backend: data or error, never both.
#[derive(Debug, Clone)]
pub struct BackendResult {
    /// The backend consulted.
    pub backend_id: String,
    /// Its payload, absent on error.
    pub data: Option<QueryData>,
    /// Its self-reported completeness (zero with a derived reason on error).
    pub completeness: CompletenessInfo,
    /// How long the call took.
    pub duration_ms: u64,
    /// Its failure, absent on success.
    pub error: Option<QueryError>,
}

impl BackendResult {
    /// A successful result; completeness is lifted out of the payload.
    pub fn ok(backend_id: impl Into<String>, data: QueryData, duration_ms: u64) -> Self {
        let completeness = data.completeness().clone();
        Self {
            backend_id: backend_id.into(),
            data: Some(data),
            completeness,
            duration_ms,
            error: None,
        }
    }

    /// A failed result; completeness is zero with a reason derived from the
    /// error kind.
    pub fn failed(backend_id: impl Into<String>, error: QueryError, duration_ms: u64) -> Self {
        let reason = match error.kind {
            ErrorKind::Timeout => CompletenessReason::TimedOut,
            ErrorKind::IndexMissing => CompletenessReason::IndexStale,
            _ => CompletenessReason::Unknown,
        };
        Self {
            backend_id: backend_id.into(),
            data: None,
            completeness: CompletenessInfo::new(0.0, reason),
            duration_ms,
            error: Some(error),
        }
    }

    /// Whether the backend answered.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Items in the payload, 0 on error.
    pub fn item_count(&self) -> usize {
        self.data.as_ref().map_or(0, QueryData::item_count)
    }
}
