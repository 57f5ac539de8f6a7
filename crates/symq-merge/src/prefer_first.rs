// SPDX-License-Identifier: MIT OR Apache-2.0
//! Prefer-first merging: the highest-priority result wins outright.

use crate::fields::{FieldSources, OfferedValues, field_value, supplement_symbol};
use crate::{MergedResult, ResultMerger, all_failed_error, merge_completeness};
use symq_backend_core::BackendResult;
use symq_core::{MergeMode, MetadataConflict, Provenance, QueryData, SymbolResult};
use symq_error::QueryError;
use symq_policy::QueryPolicy;

/// Returns the first successful result as the primary and treats the rest
/// purely as metadata sources.
///
/// Only the supplementable scalar fields of a symbol answer may be filled
/// in, only from successful results of equal-or-higher priority, and only
/// where the primary's value is empty. Search and references answers pass
/// through unchanged.
pub struct PreferFirstMerger;

impl ResultMerger for PreferFirstMerger {
    fn mode(&self) -> MergeMode {
        MergeMode::PreferFirst
    }

    fn merge(
        &self,
        results: &[BackendResult],
        policy: &QueryPolicy,
    ) -> Result<MergedResult, QueryError> {
        let primary = results
            .iter()
            .find(|r| r.is_ok() && r.data.is_some())
            .ok_or_else(all_failed_error)?;
        let Some(primary_data) = primary.data.as_ref() else {
            return Err(all_failed_error());
        };
        let mut provenance = Provenance::new(&primary.backend_id, MergeMode::PreferFirst);

        let QueryData::Symbol(primary_symbol) = primary_data else {
            // Search and reference lists are not merged across backends in
            // this mode.
            return Ok(MergedResult {
                data: primary_data.clone(),
                completeness: primary.completeness.clone(),
                provenance,
            });
        };

        let primary_priority = policy.priority(&primary.backend_id);
        let mut merged = primary_symbol.symbol.clone();
        let mut contributing = vec![primary.completeness.clone()];
        let mut sources = FieldSources::new();
        let mut offered = OfferedValues::new();

        for other in results {
            if !other.is_ok() || other.backend_id == primary.backend_id {
                continue;
            }
            if policy.priority(&other.backend_id) > primary_priority {
                continue;
            }
            let Some(QueryData::Symbol(other_symbol)) = other.data.as_ref() else {
                continue;
            };
            let adopted = supplement_symbol(
                &mut merged,
                &other_symbol.symbol,
                &other.backend_id,
                &primary.backend_id,
                &mut sources,
                &mut offered,
            );
            if adopted {
                provenance
                    .supplement_backends
                    .push(other.backend_id.clone());
                contributing.push(other.completeness.clone());
            }
        }

        provenance.metadata_conflicts = offered
            .into_iter()
            .map(|(field, values)| MetadataConflict {
                field: field.to_string(),
                resolved: field_value(&merged, field),
                values,
            })
            .collect();

        let completeness = merge_completeness(&contributing);
        let data = QueryData::Symbol(SymbolResult {
            symbol: merged,
            completeness: completeness.clone(),
        });
        Ok(MergedResult {
            data,
            completeness,
            provenance,
        })
    }
}
