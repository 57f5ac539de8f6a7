// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared data model for the symquery core.
//!
//! Everything that crosses a component boundary lives here: the query
//! request shapes, the symbol/search/reference payloads backends return, the
//! completeness calculus, and the provenance records attached to merged
//! answers. The crate is intentionally free of I/O and async code.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod canonical;
mod completeness;
mod provenance;
mod request;
mod result;
mod symbol;

pub use completeness::{
    BEST_EFFORT_THRESHOLD, COMPLETE_THRESHOLD, CompletenessInfo, CompletenessReason,
};
pub use provenance::{MetadataConflict, Provenance, UnionConflict};
pub use request::{QueryKind, QueryRequest, ReferenceOptions, SearchOptions};
pub use result::{
    BackendContribution, QueryData, QueryResult, ReferencesResult, SearchResult, SymbolResult,
};
pub use symbol::{Location, Reference, SymbolInfo};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// A query capability a backend may advertise.
///
/// Closed vocabulary; the kebab-case serialisation is part of the wire
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Resolve a single symbol by stable identifier.
    SymbolInfo,
    /// Search symbols by textual query.
    SymbolSearch,
    /// Enumerate symbols across the workspace.
    WorkspaceSymbols,
    /// Find references to a symbol.
    FindReferences,
    /// Resolve a symbol's defining location.
    GotoDefinition,
}

impl Capability {
    /// Stable string form of the capability (e.g. `"symbol-search"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SymbolInfo => "symbol-info",
            Self::SymbolSearch => "symbol-search",
            Self::WorkspaceSymbols => "workspace-symbols",
            Self::FindReferences => "find-references",
            Self::GotoDefinition => "goto-definition",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MergeMode
// ---------------------------------------------------------------------------

/// How results from multiple backends are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Return the highest-priority result, supplementing only select
    /// metadata fields from equal-or-higher-priority backends.
    #[default]
    PreferFirst,
    /// Collect every result, deduplicate by stable item key, and resolve
    /// per-field conflicts by backend precedence.
    Union,
}

impl MergeMode {
    /// Stable string form of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreferFirst => "prefer-first",
            Self::Union => "union",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
