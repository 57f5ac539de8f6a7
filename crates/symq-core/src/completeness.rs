// SPDX-License-Identifier: MIT OR Apache-2.0
//! Completeness scoring: how trustworthy is an answer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Score at or above which a result counts as complete.
pub const COMPLETE_THRESHOLD: f64 = 0.95;
/// Score at or above which a result counts as best-effort.
pub const BEST_EFFORT_THRESHOLD: f64 = 0.5;

/// Why a result has the completeness score it has.
///
/// Closed vocabulary; backends self-report and the core never overrides a
/// backend's own reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletenessReason {
    /// The backend answered from a full, current index.
    FullBackend,
    /// A live language server answered without a full workspace index.
    BestEffortLsp,
    /// The language server's workspace is still warming up.
    WorkspaceNotReady,
    /// The backend hit its deadline before finishing.
    TimedOut,
    /// The result list was cut off at a limit.
    Truncated,
    /// Only the current file was analysed.
    SingleFileOnly,
    /// No backend produced an answer.
    NoBackendAvailable,
    /// The index exists but is out of date.
    IndexStale,
    /// No better reason is known.
    #[default]
    Unknown,
}

impl CompletenessReason {
    /// Stable string form of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullBackend => "full-backend",
            Self::BestEffortLsp => "best-effort-lsp",
            Self::WorkspaceNotReady => "workspace-not-ready",
            Self::TimedOut => "timed-out",
            Self::Truncated => "truncated",
            Self::SingleFileOnly => "single-file-only",
            Self::NoBackendAvailable => "no-backend-available",
            Self::IndexStale => "index-stale",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CompletenessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A self-reported quality score in `[0, 1]` with its reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessInfo {
    /// Score in `[0, 1]`; construction clamps out-of-range values.
    pub score: f64,
    /// Why the score is what it is.
    pub reason: CompletenessReason,
    /// Free-form elaboration, empty when the reason says it all.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
}

impl CompletenessInfo {
    /// Create a completeness record, clamping the score into `[0, 1]`.
    pub fn new(score: f64, reason: CompletenessReason) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            reason,
            details: String::new(),
        }
    }

    /// A full answer from a complete backend.
    pub fn full() -> Self {
        Self::new(1.0, CompletenessReason::FullBackend)
    }

    /// The completeness of no answer at all.
    pub fn none() -> Self {
        Self::new(0.0, CompletenessReason::NoBackendAvailable)
    }

    /// Attach free-form details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Score at or above [`COMPLETE_THRESHOLD`].
    pub fn is_complete(&self) -> bool {
        self.score >= COMPLETE_THRESHOLD
    }

    /// Score at or above [`BEST_EFFORT_THRESHOLD`] but below
    /// [`COMPLETE_THRESHOLD`].
    pub fn is_best_effort(&self) -> bool {
        self.score >= BEST_EFFORT_THRESHOLD && self.score < COMPLETE_THRESHOLD
    }

    /// Score below [`BEST_EFFORT_THRESHOLD`].
    pub fn is_incomplete(&self) -> bool {
        self.score < BEST_EFFORT_THRESHOLD
    }
}

impl Default for CompletenessInfo {
    fn default() -> Self {
        Self::new(0.0, CompletenessReason::Unknown)
    }
}
