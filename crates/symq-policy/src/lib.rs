// SPDX-License-Identifier: MIT OR Apache-2.0
//! The query policy: a pure configuration value read by every component.
//!
//! The policy is immutable during query execution. Reconfiguration means
//! constructing a new policy (and the components that hold one) at a
//! quiescent point.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use symq_core::MergeMode;
use thiserror::Error;

/// In-flight cap assumed for backends without an explicit entry.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 5;
/// Per-backend timeout assumed for backends without an explicit entry.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Default coalescing window.
pub const DEFAULT_COALESCE_WINDOW_MS: u64 = 500;
/// Default completeness score below which supplements are consulted.
pub const DEFAULT_SUPPLEMENT_THRESHOLD: f64 = 0.8;
/// Priority assigned to backends absent from the preference order.
pub const UNKNOWN_PRIORITY: usize = usize::MAX;

/// Errors produced by [`QueryPolicy::validate`] and loading.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The supplement threshold must stay inside the score interval.
    #[error("supplement threshold {0} is outside [0, 1]")]
    ThresholdOutOfRange(f64),

    /// The preference order listed the same backend twice.
    #[error("backend '{0}' appears more than once in the preference order")]
    DuplicatePreference(String),

    /// A configured in-flight cap of zero would never admit anything.
    #[error("backend '{0}' has a max_in_flight of zero")]
    ZeroCap(String),

    /// The coalescing window must be positive.
    #[error("coalesce window must be positive")]
    ZeroWindow,

    /// The TOML source failed to parse.
    #[error("invalid policy TOML")]
    Toml(#[from] toml::de::Error),
}

/// Preference order, admission caps, timeouts, coalescing window, merge
/// mode, and supplementation threshold for one orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPolicy {
    /// Backend ids in descending priority; index 0 is the most trusted.
    #[serde(default)]
    pub preference_order: Vec<String>,
    /// Backends consulted on every query regardless of merge mode.
    #[serde(default)]
    pub always_consult: Vec<String>,
    /// Explicit per-backend in-flight caps; absent means unlimited
    /// admission.
    #[serde(default)]
    pub max_in_flight: BTreeMap<String, usize>,
    /// Explicit per-backend timeouts in milliseconds.
    #[serde(default)]
    pub timeouts_ms: BTreeMap<String, u64>,
    /// How long identical in-flight requests are coalesced, in
    /// milliseconds.
    #[serde(default = "default_coalesce_window_ms")]
    pub coalesce_window_ms: u64,
    /// The merge strategy applied to fan-out results.
    #[serde(default)]
    pub merge_mode: MergeMode,
    /// Completeness score at or above which no supplements are consulted.
    #[serde(default = "default_supplement_threshold")]
    pub supplement_threshold: f64,
}

fn default_coalesce_window_ms() -> u64 {
    DEFAULT_COALESCE_WINDOW_MS
}

fn default_supplement_threshold() -> f64 {
    DEFAULT_SUPPLEMENT_THRESHOLD
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            preference_order: Vec::new(),
            always_consult: Vec::new(),
            max_in_flight: BTreeMap::new(),
            timeouts_ms: BTreeMap::new(),
            coalesce_window_ms: DEFAULT_COALESCE_WINDOW_MS,
            merge_mode: MergeMode::default(),
            supplement_threshold: DEFAULT_SUPPLEMENT_THRESHOLD,
        }
    }
}

impl QueryPolicy {
    /// A policy with the given preference order and defaults elsewhere.
    pub fn with_preference<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            preference_order: order.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// The in-flight cap for `backend`, or [`DEFAULT_MAX_IN_FLIGHT`].
    pub fn max_in_flight(&self, backend: &str) -> usize {
        self.max_in_flight
            .get(backend)
            .copied()
            .unwrap_or(DEFAULT_MAX_IN_FLIGHT)
    }

    /// The explicitly configured cap for `backend`, if any.
    ///
    /// The rate limiter builds semaphores only for explicit entries;
    /// unconfigured backends are admitted without limit.
    pub fn configured_max_in_flight(&self, backend: &str) -> Option<usize> {
        self.max_in_flight.get(backend).copied()
    }

    /// The timeout for `backend`, or the 10 s default.
    pub fn timeout(&self, backend: &str) -> Duration {
        Duration::from_millis(
            self.timeouts_ms
                .get(backend)
                .copied()
                .unwrap_or(DEFAULT_TIMEOUT_MS),
        )
    }

    /// Zero-based position in the preference order, or
    /// [`UNKNOWN_PRIORITY`] for backends not listed (effectively last).
    pub fn priority(&self, backend: &str) -> usize {
        self.preference_order
            .iter()
            .position(|id| id == backend)
            .unwrap_or(UNKNOWN_PRIORITY)
    }

    /// Whether `backend` is consulted on every query.
    pub fn should_always_consult(&self, backend: &str) -> bool {
        self.always_consult.iter().any(|id| id == backend)
    }

    /// The coalescing window as a [`Duration`].
    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_window_ms)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if !(0.0..=1.0).contains(&self.supplement_threshold) {
            return Err(PolicyError::ThresholdOutOfRange(self.supplement_threshold));
        }
        if self.coalesce_window_ms == 0 {
            return Err(PolicyError::ZeroWindow);
        }
        let mut seen = BTreeSet::new();
        for id in &self.preference_order {
            if !seen.insert(id.as_str()) {
                return Err(PolicyError::DuplicatePreference(id.clone()));
            }
        }
        if let Some((id, _)) = self.max_in_flight.iter().find(|(_, cap)| **cap == 0) {
            return Err(PolicyError::ZeroCap(id.clone()));
        }
        Ok(())
    }

    /// Parse and validate a policy from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, PolicyError> {
        let policy: Self = toml::from_str(source)?;
        policy.validate()?;
        Ok(policy)
    }
}
