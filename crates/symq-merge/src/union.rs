// SPDX-License-Identifier: MIT OR Apache-2.0
//! Union merging: every successful result contributes.

use crate::fields::{FieldSources, OfferedValues, union_symbol};
use crate::{MergedResult, ResultMerger, all_failed_error, merge_completeness};
use std::collections::{HashMap, HashSet};
use symq_backend_core::BackendResult;
use symq_core::{
    CompletenessInfo, MergeMode, Provenance, QueryData, Reference, ReferencesResult, SearchResult,
    SymbolInfo, SymbolResult, UnionConflict,
};
use symq_error::QueryError;
use symq_policy::QueryPolicy;

/// Collects every successful result, deduplicates by stable item key, and
/// resolves per-field conflicts by backend precedence (earlier in the
/// results, which is ladder order, wins).
pub struct UnionMerger;

/// One accumulated symbol plus the bookkeeping needed for conflicts.
struct MergedEntry {
    symbol: SymbolInfo,
    /// Backend that first provided this stable id.
    origin: String,
    sources: FieldSources,
    offered: OfferedValues,
}

fn accumulate(
    entries: &mut Vec<MergedEntry>,
    index: &mut HashMap<String, usize>,
    incoming: &SymbolInfo,
    owner: &str,
) {
    match index.get(&incoming.stable_id) {
        Some(&at) => {
            let entry = &mut entries[at];
            let origin = entry.origin.clone();
            union_symbol(
                &mut entry.symbol,
                incoming,
                owner,
                &origin,
                &mut entry.sources,
                &mut entry.offered,
            );
        }
        None => {
            index.insert(incoming.stable_id.clone(), entries.len());
            entries.push(MergedEntry {
                symbol: incoming.clone(),
                origin: owner.to_string(),
                sources: FieldSources::new(),
                offered: OfferedValues::new(),
            });
        }
    }
}

fn collect_conflicts(entries: &[MergedEntry]) -> Vec<UnionConflict> {
    let mut conflicts = Vec::new();
    for entry in entries {
        for (field, values) in &entry.offered {
            let owner = entry
                .sources
                .get(field)
                .cloned()
                .unwrap_or_else(|| entry.origin.clone());
            conflicts.push(UnionConflict {
                stable_id: entry.symbol.stable_id.clone(),
                field: (*field).to_string(),
                values: values.clone(),
                resolution: format!("kept {field} from {owner}"),
            });
        }
    }
    conflicts
}

impl ResultMerger for UnionMerger {
    fn mode(&self) -> MergeMode {
        MergeMode::Union
    }

    fn merge(
        &self,
        results: &[BackendResult],
        _policy: &QueryPolicy,
    ) -> Result<MergedResult, QueryError> {
        let successful: Vec<&BackendResult> = results
            .iter()
            .filter(|r| r.is_ok() && r.data.is_some())
            .collect();
        let Some(primary) = successful.first() else {
            return Err(all_failed_error());
        };

        let mut provenance = Provenance::new(&primary.backend_id, MergeMode::Union);
        provenance.supplement_backends = successful[1..]
            .iter()
            .map(|r| r.backend_id.clone())
            .collect();

        let contributions: Vec<CompletenessInfo> =
            successful.iter().map(|r| r.completeness.clone()).collect();
        let completeness = merge_completeness(&contributions);

        let data = match primary.data.as_ref() {
            Some(QueryData::Symbol(primary_symbol)) => {
                let mut entries = Vec::new();
                let mut index = HashMap::new();
                for result in &successful {
                    if let Some(QueryData::Symbol(s)) = result.data.as_ref() {
                        accumulate(&mut entries, &mut index, &s.symbol, &result.backend_id);
                    }
                }
                provenance.union_conflicts = collect_conflicts(&entries);
                let wanted = primary_symbol.symbol.stable_id.as_str();
                let merged = entries
                    .into_iter()
                    .find(|e| e.symbol.stable_id == wanted)
                    .map(|e| e.symbol)
                    .ok_or_else(|| {
                        QueryError::internal("union merge lost the primary's symbol")
                    })?;
                QueryData::Symbol(SymbolResult {
                    symbol: merged,
                    completeness: completeness.clone(),
                })
            }
            Some(QueryData::Search(_)) => {
                let mut entries = Vec::new();
                let mut index = HashMap::new();
                for result in &successful {
                    if let Some(QueryData::Search(s)) = result.data.as_ref() {
                        for symbol in &s.symbols {
                            accumulate(&mut entries, &mut index, symbol, &result.backend_id);
                        }
                    }
                }
                provenance.union_conflicts = collect_conflicts(&entries);
                QueryData::Search(SearchResult {
                    symbols: entries.into_iter().map(|e| e.symbol).collect(),
                    completeness: completeness.clone(),
                })
            }
            Some(QueryData::References(_)) => {
                let mut seen = HashSet::new();
                let mut references: Vec<Reference> = Vec::new();
                for result in &successful {
                    if let Some(QueryData::References(r)) = result.data.as_ref() {
                        for reference in &r.references {
                            let key = (
                                reference.location.path.clone(),
                                reference.location.line,
                                reference.location.column,
                            );
                            if seen.insert(key) {
                                references.push(reference.clone());
                            }
                        }
                    }
                }
                QueryData::References(ReferencesResult {
                    references,
                    completeness: completeness.clone(),
                })
            }
            None => return Err(all_failed_error()),
        };

        Ok(MergedResult {
            data,
            completeness,
            provenance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use symq_core::{CompletenessReason, Location};
    use symq_error::ErrorKind;

    fn policy() -> QueryPolicy {
        QueryPolicy::with_preference(["scip", "lsp", "git"])
    }

    fn symbol_result(backend: &str, symbol: SymbolInfo, score: f64) -> BackendResult {
        BackendResult::ok(
            backend,
            QueryData::Symbol(SymbolResult {
                symbol,
                completeness: CompletenessInfo::new(score, CompletenessReason::FullBackend),
            }),
            5,
        )
    }

    fn search_result(backend: &str, symbols: Vec<SymbolInfo>, score: f64) -> BackendResult {
        BackendResult::ok(
            backend,
            QueryData::Search(SearchResult {
                symbols,
                completeness: CompletenessInfo::new(score, CompletenessReason::Truncated),
            }),
            5,
        )
    }

    #[test]
    fn union_survives_a_failed_higher_priority_backend() {
        let results = vec![
            BackendResult::failed("scip", QueryError::index_missing("no index"), 2),
            symbol_result("lsp", SymbolInfo::new("repo::x", "FallbackFunc"), 0.7),
        ];
        let merged = UnionMerger.merge(&results, &policy()).unwrap();
        let QueryData::Symbol(out) = &merged.data else {
            panic!("expected symbol");
        };
        assert_eq!(out.symbol.name, "FallbackFunc");
        assert_eq!(merged.provenance.primary_backend, "lsp");
        assert_eq!(merged.provenance.merge_mode, MergeMode::Union);
    }

    #[test]
    fn symbol_fields_accumulate_across_backends() {
        let scip = SymbolInfo {
            kind: "function".into(),
            ..SymbolInfo::new("repo::f", "f")
        };
        let lsp = SymbolInfo {
            signature_full: "pub fn f()".into(),
            documentation: "Does f.".into(),
            ..SymbolInfo::new("repo::f", "f")
        };
        let results = vec![
            symbol_result("scip", scip, 0.8),
            symbol_result("lsp", lsp, 0.6),
        ];
        let merged = UnionMerger.merge(&results, &policy()).unwrap();
        let QueryData::Symbol(out) = &merged.data else {
            panic!("expected symbol");
        };
        assert_eq!(out.symbol.kind, "function");
        assert_eq!(out.symbol.signature_full, "pub fn f()");
        assert_eq!(out.symbol.documentation, "Does f.");
        assert_eq!(merged.provenance.supplement_backends, vec!["lsp"]);
        assert!(merged.provenance.union_conflicts.is_empty());
    }

    #[test]
    fn earlier_backend_wins_disagreements() {
        let scip = SymbolInfo {
            kind: "function".into(),
            ..SymbolInfo::new("repo::f", "f")
        };
        let lsp = SymbolInfo {
            kind: "method".into(),
            ..SymbolInfo::new("repo::f", "f")
        };
        let results = vec![
            symbol_result("scip", scip, 0.8),
            symbol_result("lsp", lsp, 0.6),
        ];
        let merged = UnionMerger.merge(&results, &policy()).unwrap();
        let QueryData::Symbol(out) = &merged.data else {
            panic!("expected symbol");
        };
        assert_eq!(out.symbol.kind, "function");
        assert_eq!(merged.provenance.union_conflicts.len(), 1);
        let conflict = &merged.provenance.union_conflicts[0];
        assert_eq!(conflict.stable_id, "repo::f");
        assert_eq!(conflict.field, "kind");
        assert_eq!(
            conflict.values.get("scip").map(String::as_str),
            Some("function")
        );
        assert_eq!(
            conflict.values.get("lsp").map(String::as_str),
            Some("method")
        );
        assert!(conflict.resolution.contains("scip"));
    }

    #[test]
    fn location_difference_is_recorded_but_not_overwritten() {
        let scip = SymbolInfo {
            location: Some(Location::new("src/f.rs", 10, 1)),
            ..SymbolInfo::new("repo::f", "f")
        };
        let lsp = SymbolInfo {
            location: Some(Location::new("src/f.rs", 12, 1)),
            ..SymbolInfo::new("repo::f", "f")
        };
        let results = vec![
            symbol_result("scip", scip, 0.8),
            symbol_result("lsp", lsp, 0.6),
        ];
        let merged = UnionMerger.merge(&results, &policy()).unwrap();
        let QueryData::Symbol(out) = &merged.data else {
            panic!("expected symbol");
        };
        assert_eq!(out.symbol.location, Some(Location::new("src/f.rs", 10, 1)));
        assert_eq!(merged.provenance.union_conflicts.len(), 1);
        assert_eq!(merged.provenance.union_conflicts[0].field, "location");
    }

    #[test]
    fn search_union_covers_every_stable_id_exactly_once() {
        let results = vec![
            search_result(
                "scip",
                vec![SymbolInfo::new("a", "a"), SymbolInfo::new("b", "b")],
                0.8,
            ),
            search_result(
                "lsp",
                vec![SymbolInfo::new("b", "b"), SymbolInfo::new("c", "c")],
                0.6,
            ),
        ];
        let merged = UnionMerger.merge(&results, &policy()).unwrap();
        let QueryData::Search(out) = &merged.data else {
            panic!("expected search");
        };
        let ids: Vec<&str> = out.symbols.iter().map(|s| s.stable_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let unique: BTreeSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn references_dedupe_by_location_keeping_first_seen() {
        let first = Reference {
            location: Location::new("src/a.rs", 5, 9),
            context: "from scip".into(),
            is_declaration: false,
        };
        let duplicate = Reference {
            location: Location::new("src/a.rs", 5, 9),
            context: "from lsp".into(),
            is_declaration: true,
        };
        let extra = Reference::new(Location::new("src/b.rs", 1, 1));
        let results = vec![
            BackendResult::ok(
                "scip",
                QueryData::References(ReferencesResult {
                    references: vec![first.clone()],
                    completeness: CompletenessInfo::new(0.9, CompletenessReason::FullBackend),
                }),
                2,
            ),
            BackendResult::ok(
                "lsp",
                QueryData::References(ReferencesResult {
                    references: vec![duplicate, extra.clone()],
                    completeness: CompletenessInfo::new(0.5, CompletenessReason::BestEffortLsp),
                }),
                2,
            ),
        ];
        let merged = UnionMerger.merge(&results, &policy()).unwrap();
        let QueryData::References(out) = &merged.data else {
            panic!("expected references");
        };
        assert_eq!(out.references.len(), 2);
        assert_eq!(out.references[0].context, "from scip");
        assert!(!out.references[0].is_declaration);
        assert_eq!(out.references[1], extra);
    }

    #[test]
    fn completeness_uses_complete_contribution_verbatim() {
        let results = vec![
            symbol_result("scip", SymbolInfo::new("repo::f", "f"), 0.97),
            symbol_result("lsp", SymbolInfo::new("repo::f", "f"), 0.4),
        ];
        let merged = UnionMerger.merge(&results, &policy()).unwrap();
        assert_eq!(merged.completeness.score, 0.97);
    }

    #[test]
    fn completeness_is_mean_without_a_complete_contribution() {
        let results = vec![
            symbol_result("scip", SymbolInfo::new("repo::f", "f"), 0.8),
            symbol_result("lsp", SymbolInfo::new("repo::f", "f"), 0.4),
        ];
        let merged = UnionMerger.merge(&results, &policy()).unwrap();
        assert!((merged.completeness.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn all_failed_is_an_error() {
        let results = vec![BackendResult::failed(
            "scip",
            QueryError::internal("boom"),
            1,
        )];
        let err = UnionMerger.merge(&results, &policy()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BackendUnavailable);
    }

    #[test]
    fn single_result_is_identity() {
        let sym = SymbolInfo {
            kind: "struct".into(),
            ..SymbolInfo::new("repo::S", "S")
        };
        let results = vec![symbol_result("scip", sym.clone(), 0.9)];
        let merged = UnionMerger.merge(&results, &policy()).unwrap();
        let QueryData::Symbol(out) = &merged.data else {
            panic!("expected symbol");
        };
        assert_eq!(out.symbol, sym);
        assert_eq!(merged.completeness.score, 0.9);
        assert!(merged.provenance.supplement_backends.is_empty());
    }
}
