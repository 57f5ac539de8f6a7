//! Mock backend implementation used for local testing.
//!
//! The mock is scripted per operation and observable afterwards: tests
//! configure responses, errors, latency, and availability up front, then
//! assert on invocation counters and close tracking. Handles are cheap
//! clones sharing one state, so a test can keep one and register another.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use symq_backend_core::{Backend, SymbolBackend};
use symq_core::{
    Capability, CompletenessInfo, Location, Reference, ReferenceOptions, ReferencesResult,
    SearchOptions, SearchResult, SymbolInfo, SymbolResult,
};
use symq_error::QueryError;

struct MockState {
    id: String,
    priority: AtomicUsize,
    capabilities: RwLock<BTreeSet<Capability>>,
    available: AtomicBool,
    healthy: AtomicBool,
    closed: AtomicBool,
    latency: RwLock<Option<Duration>>,
    error: RwLock<Option<QueryError>>,
    symbol: RwLock<Option<SymbolResult>>,
    search: RwLock<Option<SearchResult>>,
    references: RwLock<Option<ReferencesResult>>,
    symbol_calls: AtomicUsize,
    search_calls: AtomicUsize,
    reference_calls: AtomicUsize,
}

/// A backend for unit and integration tests.
#[derive(Clone)]
pub struct MockSymbolBackend {
    state: Arc<MockState>,
}

impl MockSymbolBackend {
    /// A mock advertising every capability, available and healthy.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            state: Arc::new(MockState {
                id: id.into(),
                priority: AtomicUsize::new(0),
                capabilities: RwLock::new(BTreeSet::from([
                    Capability::SymbolInfo,
                    Capability::SymbolSearch,
                    Capability::FindReferences,
                ])),
                available: AtomicBool::new(true),
                healthy: AtomicBool::new(true),
                closed: AtomicBool::new(false),
                latency: RwLock::new(None),
                error: RwLock::new(None),
                symbol: RwLock::new(None),
                search: RwLock::new(None),
                references: RwLock::new(None),
                symbol_calls: AtomicUsize::new(0),
                search_calls: AtomicUsize::new(0),
                reference_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Replace the advertised capability set.
    pub fn with_capabilities(self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        *self.state.capabilities.write().expect("mock lock poisoned") =
            capabilities.into_iter().collect();
        self
    }

    /// Set the informational priority hint.
    pub fn with_priority(self, priority: u32) -> Self {
        self.state
            .priority
            .store(priority as usize, Ordering::SeqCst);
        self
    }

    /// Script the symbol-lookup response.
    pub fn with_symbol(self, symbol: SymbolInfo, completeness: CompletenessInfo) -> Self {
        *self.state.symbol.write().expect("mock lock poisoned") = Some(SymbolResult {
            symbol,
            completeness,
        });
        self
    }

    /// Script the search response.
    pub fn with_search(self, symbols: Vec<SymbolInfo>, completeness: CompletenessInfo) -> Self {
        *self.state.search.write().expect("mock lock poisoned") = Some(SearchResult {
            symbols,
            completeness,
        });
        self
    }

    /// Script the find-references response.
    pub fn with_references(
        self,
        references: Vec<Reference>,
        completeness: CompletenessInfo,
    ) -> Self {
        *self.state.references.write().expect("mock lock poisoned") = Some(ReferencesResult {
            references,
            completeness,
        });
        self
    }

    /// Make every operation fail with `error`.
    pub fn with_error(self, error: QueryError) -> Self {
        *self.state.error.write().expect("mock lock poisoned") = Some(error);
        self
    }

    /// Delay every operation by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.state.latency.write().expect("mock lock poisoned") = Some(latency);
        self
    }

    /// Mark the backend unavailable.
    pub fn unavailable(self) -> Self {
        self.state.available.store(false, Ordering::SeqCst);
        self
    }

    /// Flip availability at runtime.
    pub fn set_available(&self, available: bool) {
        self.state.available.store(available, Ordering::SeqCst);
    }

    /// Flip the health signal at runtime.
    pub fn set_healthy(&self, healthy: bool) {
        self.state.healthy.store(healthy, Ordering::SeqCst);
    }

    /// How often `get_symbol` ran.
    pub fn symbol_calls(&self) -> usize {
        self.state.symbol_calls.load(Ordering::SeqCst)
    }

    /// How often `search_symbols` ran.
    pub fn search_calls(&self) -> usize {
        self.state.search_calls.load(Ordering::SeqCst)
    }

    /// How often `find_references` ran.
    pub fn reference_calls(&self) -> usize {
        self.state.reference_calls.load(Ordering::SeqCst)
    }

    /// Total invocations across the three operations.
    pub fn total_calls(&self) -> usize {
        self.symbol_calls() + self.search_calls() + self.reference_calls()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    async fn simulate(&self) -> Result<(), QueryError> {
        let latency = *self.state.latency.read().expect("mock lock poisoned");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let error = self.state.error.read().expect("mock lock poisoned").clone();
        match error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for MockSymbolBackend {
    fn id(&self) -> &str {
        &self.state.id
    }

    fn available(&self) -> bool {
        self.state.available.load(Ordering::SeqCst)
    }

    fn capabilities(&self) -> BTreeSet<Capability> {
        self.state
            .capabilities
            .read()
            .expect("mock lock poisoned")
            .clone()
    }

    fn priority(&self) -> u32 {
        self.state.priority.load(Ordering::SeqCst) as u32
    }

    fn healthy(&self) -> bool {
        self.state.healthy.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), QueryError> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl SymbolBackend for MockSymbolBackend {
    async fn get_symbol(&self, symbol_id: &str) -> Result<SymbolResult, QueryError> {
        self.state.symbol_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        self.state
            .symbol
            .read()
            .expect("mock lock poisoned")
            .clone()
            .ok_or_else(|| {
                QueryError::symbol_not_found(format!(
                    "{} has no scripted symbol for '{symbol_id}'",
                    self.state.id
                ))
            })
    }

    async fn search_symbols(
        &self,
        query: &str,
        _options: &SearchOptions,
    ) -> Result<SearchResult, QueryError> {
        self.state.search_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        self.state
            .search
            .read()
            .expect("mock lock poisoned")
            .clone()
            .ok_or_else(|| {
                QueryError::symbol_not_found(format!(
                    "{} has no scripted search result for '{query}'",
                    self.state.id
                ))
            })
    }

    async fn find_references(
        &self,
        symbol_id: &str,
        _options: &ReferenceOptions,
    ) -> Result<ReferencesResult, QueryError> {
        self.state.reference_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        self.state
            .references
            .read()
            .expect("mock lock poisoned")
            .clone()
            .ok_or_else(|| {
                QueryError::symbol_not_found(format!(
                    "{} has no scripted references for '{symbol_id}'",
                    self.state.id
                ))
            })
    }
}

/// A reference at `path:line:1` with empty context, for terse test setup.
pub fn reference_at(path: &str, line: u32) -> Reference {
    Reference::new(Location::new(path, line, 1))
}
