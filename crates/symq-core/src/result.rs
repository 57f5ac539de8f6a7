// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-operation payloads and the assembled query result.

use crate::{CompletenessInfo, Provenance, Reference, SymbolInfo};
use serde::{Deserialize, Serialize};

/// A single symbol answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolResult {
    /// The resolved symbol.
    pub symbol: SymbolInfo,
    /// The backend's own assessment of this answer.
    pub completeness: CompletenessInfo,
}

/// A symbol-search answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matching symbols, backend order.
    pub symbols: Vec<SymbolInfo>,
    /// The backend's own assessment of this answer.
    pub completeness: CompletenessInfo,
}

/// A find-references answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencesResult {
    /// References found, backend order.
    pub references: Vec<Reference>,
    /// The backend's own assessment of this answer.
    pub completeness: CompletenessInfo,
}

/// The payload of a successful query, one variant per operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryData {
    /// A symbol lookup answer.
    Symbol(SymbolResult),
    /// A search answer.
    Search(SearchResult),
    /// A find-references answer.
    References(ReferencesResult),
}

impl QueryData {
    /// Number of items carried: 1 for a symbol, list length otherwise.
    pub fn item_count(&self) -> usize {
        match self {
            Self::Symbol(_) => 1,
            Self::Search(s) => s.symbols.len(),
            Self::References(r) => r.references.len(),
        }
    }

    /// The payload's embedded completeness.
    pub fn completeness(&self) -> &CompletenessInfo {
        match self {
            Self::Symbol(s) => &s.completeness,
            Self::Search(s) => &s.completeness,
            Self::References(r) => &r.completeness,
        }
    }

    /// Replace the payload's embedded completeness.
    pub fn set_completeness(&mut self, completeness: CompletenessInfo) {
        match self {
            Self::Symbol(s) => s.completeness = completeness,
            Self::Search(s) => s.completeness = completeness,
            Self::References(r) => r.completeness = completeness,
        }
    }
}

/// What one consulted backend contributed to a query.
///
/// Invariant: `was_used` exactly when `error` is empty — a failed backend
/// still appears, carrying its error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendContribution {
    /// The backend consulted.
    pub backend_id: String,
    /// Items it returned: 1 for a symbol, list length otherwise, 0 on error.
    pub item_count: usize,
    /// How long its call took.
    pub duration_ms: u64,
    /// Whether its result fed the merge.
    pub was_used: bool,
    /// Error text when the backend failed, empty otherwise.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// The merged, annotated answer handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// The merged payload.
    pub data: QueryData,
    /// Trustworthiness of the merged payload.
    pub completeness: CompletenessInfo,
    /// One record per consulted backend, selection order, failures included.
    pub contributions: Vec<BackendContribution>,
    /// Which backends shaped the answer and where they disagreed.
    pub provenance: Provenance,
    /// Wall-clock duration of the whole query.
    pub total_duration_ms: u64,
}
