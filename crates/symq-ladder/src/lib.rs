// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stateless backend selection.
//!
//! Given the policy, a snapshot of the currently available backends, and a
//! request, the ladder decides which backends to consult and in what order.
//! Everything here is pure: no locks, no I/O, no async.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeSet;
use symq_backend_core::BackendDescriptor;
use symq_core::{Capability, CompletenessInfo, MergeMode, QueryKind, QueryRequest};
use symq_policy::QueryPolicy;

/// The capabilities that satisfy each request type.
pub fn required_capabilities(kind: QueryKind) -> &'static [Capability] {
    match kind {
        QueryKind::Symbol => &[Capability::SymbolInfo, Capability::GotoDefinition],
        QueryKind::Search => &[Capability::SymbolSearch, Capability::WorkspaceSymbols],
        QueryKind::References => &[Capability::FindReferences],
    }
}

/// Whether a capability set can answer the given request.
pub fn supports(capabilities: &BTreeSet<Capability>, request: &QueryRequest) -> bool {
    required_capabilities(request.kind())
        .iter()
        .any(|cap| capabilities.contains(cap))
}

fn find<'a>(available: &'a [BackendDescriptor], id: &str) -> Option<&'a BackendDescriptor> {
    available.iter().find(|d| d.id == id)
}

/// The ordered list of backend ids to consult for `request`.
///
/// Always-consult members come first; then, depending on the merge mode,
/// either the single highest-priority capable backend (prefer-first) or
/// every available preference entry (union). Duplicates are removed
/// preserving first-seen order.
pub fn select(
    policy: &QueryPolicy,
    available: &[BackendDescriptor],
    request: &QueryRequest,
) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();

    for id in &policy.always_consult {
        if find(available, id).is_some() {
            selected.push(id.clone());
        }
    }

    match policy.merge_mode {
        MergeMode::PreferFirst => {
            // At most one: the first preference entry that can answer.
            if let Some(id) = policy.preference_order.iter().find(|id| {
                find(available, id).is_some_and(|d| supports(&d.capabilities, request))
            }) {
                selected.push(id.clone());
            }
        }
        MergeMode::Union => {
            for id in &policy.preference_order {
                if find(available, id).is_some() {
                    selected.push(id.clone());
                }
            }
        }
    }

    let mut seen = BTreeSet::new();
    selected.retain(|id| seen.insert(id.clone()));
    selected
}

/// The next eligible backend after `failed` ones, in preference order.
///
/// Returns `None` when no remaining backend is available and capable.
pub fn fallback_next(
    policy: &QueryPolicy,
    available: &[BackendDescriptor],
    failed: &BTreeSet<String>,
    request: &QueryRequest,
) -> Option<String> {
    policy
        .preference_order
        .iter()
        .find(|id| {
            !failed.contains(id.as_str())
                && find(available, id).is_some_and(|d| supports(&d.capabilities, request))
        })
        .cloned()
}

/// Supplement candidates for a primary whose completeness fell short.
///
/// Empty when the primary's score already meets the policy threshold.
/// Otherwise the walk covers exactly the preference entries with
/// equal-or-higher priority than the primary (skipping the primary itself)
/// and stops at the first strictly-lower-priority entry, so supplements can
/// only tighten the primary's authority. Candidates must be available and
/// able to answer the request.
pub fn select_supplements(
    policy: &QueryPolicy,
    available: &[BackendDescriptor],
    primary: &str,
    primary_completeness: &CompletenessInfo,
    request: &QueryRequest,
) -> Vec<String> {
    if primary_completeness.score >= policy.supplement_threshold {
        return Vec::new();
    }

    let primary_priority = policy.priority(primary);
    let mut candidates = Vec::new();
    for (index, id) in policy.preference_order.iter().enumerate() {
        if index > primary_priority {
            break;
        }
        if id == primary {
            continue;
        }
        if find(available, id).is_some_and(|d| supports(&d.capabilities, request)) {
            candidates.push(id.clone());
        }
    }
    candidates
}
