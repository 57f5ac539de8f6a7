// SPDX-License-Identifier: MIT OR Apache-2.0
//! Query request shapes and per-type options.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Options applied to a symbol search.
///
/// Every field is integral or boolean: fingerprinting requires the request
/// to serialise deterministically, so floating-point options are forbidden.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Upper bound on returned symbols.
    #[serde(default = "SearchOptions::default_max_results")]
    pub max_results: usize,
    /// Include symbols defined in test code.
    #[serde(default)]
    pub include_tests: bool,
    /// Restrict matches to paths under this prefix.
    #[serde(default)]
    pub path_prefix: Option<String>,
    /// Restrict matches to symbols of this kind (e.g. `"function"`).
    #[serde(default)]
    pub kind_filter: Option<String>,
}

impl SearchOptions {
    fn default_max_results() -> usize {
        50
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: Self::default_max_results(),
            include_tests: false,
            path_prefix: None,
            kind_filter: None,
        }
    }
}

/// Options applied to a find-references query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceOptions {
    /// Upper bound on returned references.
    #[serde(default = "ReferenceOptions::default_max_results")]
    pub max_results: usize,
    /// Include references found in test code.
    #[serde(default)]
    pub include_tests: bool,
    /// Restrict references to paths under this prefix.
    #[serde(default)]
    pub path_prefix: Option<String>,
    /// Count the declaration site as a reference.
    #[serde(default = "ReferenceOptions::default_include_declaration")]
    pub include_declaration: bool,
}

impl ReferenceOptions {
    fn default_max_results() -> usize {
        200
    }

    fn default_include_declaration() -> bool {
        true
    }
}

impl Default for ReferenceOptions {
    fn default() -> Self {
        Self {
            max_results: Self::default_max_results(),
            include_tests: false,
            path_prefix: None,
            include_declaration: Self::default_include_declaration(),
        }
    }
}

/// The three query operations the core answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Look up one symbol by stable identifier.
    Symbol,
    /// Search symbols by textual query.
    Search,
    /// Find references to a symbol.
    References,
}

impl QueryKind {
    /// Stable string form of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::Search => "search",
            Self::References => "references",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query as submitted by a caller.
///
/// Value-comparable and hashable so identical in-flight requests can be
/// coalesced by fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryRequest {
    /// Look up one symbol by stable identifier.
    Symbol {
        /// Stable identifier, opaque to the core.
        symbol_id: String,
    },
    /// Search symbols by textual query.
    Search {
        /// The search text.
        query: String,
        /// Search options.
        #[serde(default)]
        options: SearchOptions,
    },
    /// Find references to a symbol.
    References {
        /// Stable identifier, opaque to the core.
        symbol_id: String,
        /// Reference options.
        #[serde(default)]
        options: ReferenceOptions,
    },
}

impl QueryRequest {
    /// Which of the three operations this request asks for.
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Symbol { .. } => QueryKind::Symbol,
            Self::Search { .. } => QueryKind::Search,
            Self::References { .. } => QueryKind::References,
        }
    }

    /// Convenience constructor for a symbol lookup.
    pub fn symbol(symbol_id: impl Into<String>) -> Self {
        Self::Symbol {
            symbol_id: symbol_id.into(),
        }
    }

    /// Convenience constructor for a search with default options.
    pub fn search(query: impl Into<String>) -> Self {
        Self::Search {
            query: query.into(),
            options: SearchOptions::default(),
        }
    }

    /// Convenience constructor for find-references with default options.
    pub fn references(symbol_id: impl Into<String>) -> Self {
        Self::References {
            symbol_id: symbol_id.into(),
            options: ReferenceOptions::default(),
        }
    }
}
