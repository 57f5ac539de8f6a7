// SPDX-License-Identifier: MIT OR Apache-2.0
//! Provenance: which backends contributed to a merged answer and where they
//! disagreed.

use crate::MergeMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A disagreement over a scalar metadata field during prefer-first merging.
///
/// The primary backend's value always wins; the alternatives are kept as
/// evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataConflict {
    /// Name of the disputed field.
    pub field: String,
    /// The value each backend offered, keyed by backend id.
    pub values: BTreeMap<String, String>,
    /// The value that was kept (the primary's).
    pub resolved: String,
}

/// A disagreement over a field of a deduplicated item during union merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionConflict {
    /// Stable identifier of the disputed item.
    pub stable_id: String,
    /// Name of the disputed field.
    pub field: String,
    /// The value each backend offered, keyed by backend id.
    pub values: BTreeMap<String, String>,
    /// Human-readable description of how the conflict was resolved.
    pub resolution: String,
}

/// Merge provenance attached to every successful query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// The backend whose result forms the spine of the answer.
    pub primary_backend: String,
    /// Backends whose results supplemented the primary.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplement_backends: Vec<String>,
    /// The strategy that produced the answer.
    pub merge_mode: MergeMode,
    /// Scalar-field disagreements recorded during prefer-first merging.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata_conflicts: Vec<MetadataConflict>,
    /// Per-item disagreements recorded during union merging.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub union_conflicts: Vec<UnionConflict>,
}

impl Provenance {
    /// Provenance for a merge with the given primary and mode, no
    /// supplements and no conflicts yet.
    pub fn new(primary_backend: impl Into<String>, merge_mode: MergeMode) -> Self {
        Self {
            primary_backend: primary_backend.into(),
            supplement_backends: Vec::new(),
            merge_mode,
            metadata_conflicts: Vec::new(),
            union_conflicts: Vec::new(),
        }
    }

    /// Whether any backend disagreed with the merged answer.
    pub fn has_conflicts(&self) -> bool {
        !self.metadata_conflicts.is_empty() || !self.union_conflicts.is_empty()
    }
}
