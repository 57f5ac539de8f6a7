// SPDX-License-Identifier: MIT OR Apache-2.0
//! Symbol, location, and reference payloads.

use serde::{Deserialize, Serialize};

/// A position in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Path relative to the workspace root.
    pub path: String,
    /// One-based line number.
    pub line: u32,
    /// One-based column number.
    pub column: u32,
}

impl Location {
    /// Create a location.
    pub fn new(path: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            path: path.into(),
            line,
            column,
        }
    }
}

/// A symbol as reported by a backend.
///
/// The stable identifier is opaque to the core; backends may prefix it with
/// `<repo-name>::` to disambiguate across repositories, but the core treats
/// the whole string as the deduplication key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Stable identifier, opaque to the core.
    pub stable_id: String,
    /// Display name.
    pub name: String,
    /// Symbol kind (e.g. `"function"`, `"struct"`).
    #[serde(default)]
    pub kind: String,
    /// Name of the enclosing container, if any.
    #[serde(default)]
    pub container_name: String,
    /// Identifier of the module the symbol belongs to.
    #[serde(default)]
    pub module_id: String,
    /// Normalised signature suitable for cross-backend comparison.
    #[serde(default)]
    pub signature_normalized: String,
    /// Full signature as written in source.
    #[serde(default)]
    pub signature_full: String,
    /// Visibility (e.g. `"public"`, `"crate"`).
    #[serde(default)]
    pub visibility: String,
    /// Confidence in the reported visibility, 0.0 when unknown.
    #[serde(default)]
    pub visibility_confidence: f64,
    /// Defining location, if the backend knows it.
    #[serde(default)]
    pub location: Option<Location>,
    /// Attached documentation, if any.
    #[serde(default)]
    pub documentation: String,
}

impl SymbolInfo {
    /// Create a symbol with the two mandatory fields set.
    pub fn new(stable_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            stable_id: stable_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A single reference to a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Where the reference occurs.
    pub location: Location,
    /// The source line containing the reference, if available.
    #[serde(default)]
    pub context: String,
    /// Whether this reference is the declaration site itself.
    #[serde(default)]
    pub is_declaration: bool,
}

impl Reference {
    /// Create a reference at the given location.
    pub fn new(location: Location) -> Self {
        Self {
            location,
            context: String::new(),
            is_declaration: false,
        }
    }

    /// The `(path, line, column)` key used for deduplication.
    pub fn dedup_key(&self) -> (&str, u32, u32) {
        (
            self.location.path.as_str(),
            self.location.line,
            self.location.column,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_new_fills_defaults() {
        let sym = SymbolInfo::new("repo::f", "f");
        assert_eq!(sym.stable_id, "repo::f");
        assert_eq!(sym.name, "f");
        assert!(sym.kind.is_empty());
        assert!(sym.location.is_none());
        assert_eq!(sym.visibility_confidence, 0.0);
    }

    #[test]
    fn symbol_serde_roundtrip() {
        let sym = SymbolInfo {
            stable_id: "repo::m::f".into(),
            name: "f".into(),
            kind: "function".into(),
            container_name: "m".into(),
            module_id: "m".into(),
            signature_normalized: "fn f(i32) -> i32".into(),
            signature_full: "pub fn f(x: i32) -> i32".into(),
            visibility: "public".into(),
            visibility_confidence: 0.9,
            location: Some(Location::new("src/m.rs", 10, 4)),
            documentation: "Does f.".into(),
        };
        let json = serde_json::to_string(&sym).unwrap();
        let back: SymbolInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sym);
    }

    #[test]
    fn sparse_symbol_deserializes_with_defaults() {
        let back: SymbolInfo =
            serde_json::from_str(r#"{"stable_id":"s","name":"n"}"#).unwrap();
        assert_eq!(back, SymbolInfo::new("s", "n"));
    }

    #[test]
    fn reference_dedup_key() {
        let r = Reference::new(Location::new("src/a.rs", 3, 7));
        assert_eq!(r.dedup_key(), ("src/a.rs", 3, 7));
    }
}
