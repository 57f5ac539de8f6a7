// SPDX-License-Identifier: MIT OR Apache-2.0
//! The completeness algebra applied to merged results.

use symq_core::CompletenessInfo;

/// Merge the completeness of every contributing result.
///
/// Rules, in order:
/// - no contributions: score 0 with reason `no-backend-available`;
/// - any complete contribution: the highest-scoring contribution verbatim;
/// - otherwise: the arithmetic mean of all scores, paired with the reason
///   (and details) of the highest-scoring contribution.
///
/// The merged score therefore never exceeds the maximum contributing score.
pub fn merge_completeness(contributions: &[CompletenessInfo]) -> CompletenessInfo {
    let Some(first) = contributions.first() else {
        return CompletenessInfo::none();
    };

    // First-seen wins ties so the outcome is independent of float quirks.
    let best = contributions
        .iter()
        .skip(1)
        .fold(first, |best, c| if c.score > best.score { c } else { best });

    if best.is_complete() {
        return best.clone();
    }

    let mean = contributions.iter().map(|c| c.score).sum::<f64>() / contributions.len() as f64;
    CompletenessInfo {
        score: mean.clamp(0.0, 1.0),
        reason: best.reason,
        details: best.details.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use symq_core::CompletenessReason;

    fn info(score: f64, reason: CompletenessReason) -> CompletenessInfo {
        CompletenessInfo::new(score, reason)
    }

    #[test]
    fn empty_input_yields_no_backend_available() {
        let merged = merge_completeness(&[]);
        assert_eq!(merged.score, 0.0);
        assert_eq!(merged.reason, CompletenessReason::NoBackendAvailable);
    }

    #[test]
    fn singleton_is_identity() {
        let one = info(0.7, CompletenessReason::BestEffortLsp).with_details("warming up");
        let merged = merge_completeness(&[one.clone()]);
        assert_eq!(merged, one);
    }

    #[test]
    fn complete_contribution_wins_verbatim() {
        let merged = merge_completeness(&[
            info(0.6, CompletenessReason::BestEffortLsp),
            info(0.98, CompletenessReason::FullBackend),
            info(0.2, CompletenessReason::SingleFileOnly),
        ]);
        assert_eq!(merged.score, 0.98);
        assert_eq!(merged.reason, CompletenessReason::FullBackend);
    }

    #[test]
    fn mean_with_reason_of_best() {
        let merged = merge_completeness(&[
            info(0.9, CompletenessReason::IndexStale),
            info(0.5, CompletenessReason::BestEffortLsp),
        ]);
        assert!((merged.score - 0.7).abs() < 1e-9);
        assert_eq!(merged.reason, CompletenessReason::IndexStale);
    }

    #[test]
    fn first_seen_wins_score_ties() {
        let merged = merge_completeness(&[
            info(0.6, CompletenessReason::BestEffortLsp),
            info(0.6, CompletenessReason::IndexStale),
        ]);
        assert_eq!(merged.reason, CompletenessReason::BestEffortLsp);
    }

    proptest! {
        #[test]
        fn merged_score_is_bounded_by_max(scores in prop::collection::vec(0.0f64..=1.0, 1..8)) {
            let contributions: Vec<CompletenessInfo> = scores
                .iter()
                .map(|s| info(*s, CompletenessReason::Unknown))
                .collect();
            let merged = merge_completeness(&contributions);
            let max = scores.iter().copied().fold(0.0f64, f64::max);
            prop_assert!(merged.score <= max + 1e-9);
            prop_assert!((0.0..=1.0).contains(&merged.score));
        }

        #[test]
        fn complete_contribution_is_used_verbatim(
            scores in prop::collection::vec(0.0f64..0.95, 0..6),
            complete in 0.95f64..=1.0,
        ) {
            let mut contributions: Vec<CompletenessInfo> = scores
                .iter()
                .map(|s| info(*s, CompletenessReason::Unknown))
                .collect();
            contributions.push(info(complete, CompletenessReason::FullBackend));
            let merged = merge_completeness(&contributions);
            prop_assert_eq!(merged.score, complete);
            prop_assert_eq!(merged.reason, CompletenessReason::FullBackend);
        }
    }
}
