// SPDX-License-Identifier: MIT OR Apache-2.0
//! Field-level merge bookkeeping shared by both mergers.

use std::collections::BTreeMap;
use symq_core::SymbolInfo;

/// Per-field offered values, keyed by field name then backend id.
pub(crate) type OfferedValues = BTreeMap<&'static str, BTreeMap<String, String>>;
/// Which backend supplied the current value of each adopted field.
pub(crate) type FieldSources = BTreeMap<&'static str, String>;

/// Merge one string field: adopt into empty, record a disagreement between
/// non-empty values. Returns `true` when the incoming value was adopted.
pub(crate) fn merge_string_field(
    field: &'static str,
    current: &mut String,
    incoming: &str,
    incoming_owner: &str,
    default_owner: &str,
    sources: &mut FieldSources,
    offered: &mut OfferedValues,
) -> bool {
    if incoming.is_empty() {
        return false;
    }
    if current.is_empty() {
        *current = incoming.to_string();
        sources.insert(field, incoming_owner.to_string());
        return true;
    }
    if current.as_str() != incoming {
        let owner = sources
            .get(field)
            .cloned()
            .unwrap_or_else(|| default_owner.to_string());
        let entry = offered.entry(field).or_default();
        entry.insert(owner, current.clone());
        entry.insert(incoming_owner.to_string(), incoming.to_string());
    }
    false
}

/// Merge `visibility_confidence`: numeric zero counts as empty.
pub(crate) fn merge_confidence_field(
    current: &mut f64,
    incoming: f64,
    incoming_owner: &str,
    default_owner: &str,
    sources: &mut FieldSources,
    offered: &mut OfferedValues,
) -> bool {
    const FIELD: &str = "visibility_confidence";
    if incoming == 0.0 {
        return false;
    }
    if *current == 0.0 {
        *current = incoming;
        sources.insert(FIELD, incoming_owner.to_string());
        return true;
    }
    if *current != incoming {
        let owner = sources
            .get(FIELD)
            .cloned()
            .unwrap_or_else(|| default_owner.to_string());
        let entry = offered.entry(FIELD).or_default();
        entry.insert(owner, current.to_string());
        entry.insert(incoming_owner.to_string(), incoming.to_string());
    }
    false
}

/// The scalar fields prefer-first merging may supplement.
///
/// Applies the supplementable subset: `kind`, `container_name`, `module_id`,
/// `signature_normalized`, `signature_full`, `visibility`,
/// `visibility_confidence`. Returns `true` when at least one field was
/// adopted from `incoming`.
pub(crate) fn supplement_symbol(
    accumulator: &mut SymbolInfo,
    incoming: &SymbolInfo,
    incoming_owner: &str,
    default_owner: &str,
    sources: &mut FieldSources,
    offered: &mut OfferedValues,
) -> bool {
    let mut adopted = false;
    adopted |= merge_string_field(
        "kind",
        &mut accumulator.kind,
        &incoming.kind,
        incoming_owner,
        default_owner,
        sources,
        offered,
    );
    adopted |= merge_string_field(
        "container_name",
        &mut accumulator.container_name,
        &incoming.container_name,
        incoming_owner,
        default_owner,
        sources,
        offered,
    );
    adopted |= merge_string_field(
        "module_id",
        &mut accumulator.module_id,
        &incoming.module_id,
        incoming_owner,
        default_owner,
        sources,
        offered,
    );
    adopted |= merge_string_field(
        "signature_normalized",
        &mut accumulator.signature_normalized,
        &incoming.signature_normalized,
        incoming_owner,
        default_owner,
        sources,
        offered,
    );
    adopted |= merge_string_field(
        "signature_full",
        &mut accumulator.signature_full,
        &incoming.signature_full,
        incoming_owner,
        default_owner,
        sources,
        offered,
    );
    adopted |= merge_string_field(
        "visibility",
        &mut accumulator.visibility,
        &incoming.visibility,
        incoming_owner,
        default_owner,
        sources,
        offered,
    );
    adopted |= merge_confidence_field(
        &mut accumulator.visibility_confidence,
        incoming.visibility_confidence,
        incoming_owner,
        default_owner,
        sources,
        offered,
    );
    adopted
}

/// Full field-by-field union merge of one symbol into the accumulator.
///
/// Beyond the supplementable scalars this also merges `name` and
/// `documentation`, and handles `location` specially: it is adopted into an
/// empty accumulator but never overwritten, with a difference recorded as a
/// disagreement.
pub(crate) fn union_symbol(
    accumulator: &mut SymbolInfo,
    incoming: &SymbolInfo,
    incoming_owner: &str,
    default_owner: &str,
    sources: &mut FieldSources,
    offered: &mut OfferedValues,
) {
    merge_string_field(
        "name",
        &mut accumulator.name,
        &incoming.name,
        incoming_owner,
        default_owner,
        sources,
        offered,
    );
    supplement_symbol(
        accumulator,
        incoming,
        incoming_owner,
        default_owner,
        sources,
        offered,
    );
    merge_string_field(
        "documentation",
        &mut accumulator.documentation,
        &incoming.documentation,
        incoming_owner,
        default_owner,
        sources,
        offered,
    );

    match (&accumulator.location, &incoming.location) {
        (None, Some(loc)) => {
            accumulator.location = Some(loc.clone());
            sources.insert("location", incoming_owner.to_string());
        }
        (Some(current), Some(loc)) if current != loc => {
            let owner = sources
                .get("location")
                .cloned()
                .unwrap_or_else(|| default_owner.to_string());
            let entry = offered.entry("location").or_default();
            entry.insert(owner, format_location(current));
            entry.insert(incoming_owner.to_string(), format_location(loc));
        }
        _ => {}
    }
}

pub(crate) fn format_location(location: &symq_core::Location) -> String {
    format!("{}:{}:{}", location.path, location.line, location.column)
}

/// The current value of a named field, stringified for conflict records.
pub(crate) fn field_value(symbol: &SymbolInfo, field: &str) -> String {
    match field {
        "name" => symbol.name.clone(),
        "kind" => symbol.kind.clone(),
        "container_name" => symbol.container_name.clone(),
        "module_id" => symbol.module_id.clone(),
        "signature_normalized" => symbol.signature_normalized.clone(),
        "signature_full" => symbol.signature_full.clone(),
        "visibility" => symbol.visibility.clone(),
        "visibility_confidence" => symbol.visibility_confidence.to_string(),
        "documentation" => symbol.documentation.clone(),
        "location" => symbol
            .location
            .as_ref()
            .map(format_location)
            .unwrap_or_default(),
        _ => String::new(),
    }
}
