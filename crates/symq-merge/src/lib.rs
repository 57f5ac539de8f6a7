// SPDX-License-Identifier: MIT OR Apache-2.0
//! Merge strategies for fan-out results.
//!
//! Both mergers accept the per-backend results in the order the ladder
//! requested them (always-consult first, then preference order), so merger
//! output is deterministic given deterministic backend outputs.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod completeness;
mod fields;
mod prefer_first;
mod union;

pub use completeness::merge_completeness;
pub use prefer_first::PreferFirstMerger;
pub use union::UnionMerger;

use symq_backend_core::BackendResult;
use symq_core::{CompletenessInfo, MergeMode, Provenance, QueryData};
use symq_error::QueryError;
use symq_policy::QueryPolicy;

/// The output of a merge: payload, trustworthiness, and provenance.
#[derive(Debug, Clone)]
pub struct MergedResult {
    /// The merged payload.
    pub data: QueryData,
    /// The merged completeness.
    pub completeness: CompletenessInfo,
    /// Which backends shaped the answer and where they disagreed.
    pub provenance: Provenance,
}

/// A strategy for combining per-backend results into one answer.
pub trait ResultMerger: Send + Sync {
    /// Which mode this merger implements.
    fn mode(&self) -> MergeMode;

    /// Merge `results` (ladder order) into one answer.
    ///
    /// # Errors
    ///
    /// Returns [`backend-unavailable`](symq_error::ErrorKind::BackendUnavailable)
    /// when no result carries data — the orchestrator reports this as
    /// "all backends failed".
    fn merge(
        &self,
        results: &[BackendResult],
        policy: &QueryPolicy,
    ) -> Result<MergedResult, QueryError>;
}

/// The merger implementing the given mode.
pub fn merger_for(mode: MergeMode) -> Box<dyn ResultMerger> {
    match mode {
        MergeMode::PreferFirst => Box::new(PreferFirstMerger),
        MergeMode::Union => Box::new(UnionMerger),
    }
}

pub(crate) fn all_failed_error() -> QueryError {
    QueryError::backend_unavailable("all backends failed")
}
