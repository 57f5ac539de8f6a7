// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical JSON serialisation.
//!
//! Round-tripping through [`serde_json::Value`] sorts object keys (the
//! default `Map` is backed by a `BTreeMap`), so the output is byte-stable
//! across runs and processes for the same input value. Fingerprinting
//! depends on this.

use serde::Serialize;

/// Serialise `value` to canonical JSON: sorted object keys, no
/// insignificant whitespace.
///
/// # Errors
///
/// Returns the underlying [`serde_json::Error`] if the value cannot be
/// serialised.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v = serde_json::to_value(value)?;
    serde_json::to_string(&v)
}
