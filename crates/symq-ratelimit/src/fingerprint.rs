// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deterministic request fingerprints.
//!
//! The fingerprint keys the coalescing table: two callers issuing the same
//! request to the same backend must hash identically, across runs and
//! across processes. Canonical JSON (sorted keys, no floats anywhere in the
//! request shape) feeds SHA-256.

use serde::Serialize;
use sha2::{Digest, Sha256};
use symq_core::QueryRequest;
use symq_core::canonical::canonical_json;
use symq_error::QueryError;

#[derive(Serialize)]
struct FingerprintInput<'a> {
    backend_id: &'a str,
    request: &'a QueryRequest,
}

/// Hex-encoded SHA-256 of the canonical `(backend, request)` serialisation.
pub fn fingerprint(backend_id: &str, request: &QueryRequest) -> Result<String, QueryError> {
    let canonical = canonical_json(&FingerprintInput {
        backend_id,
        request,
    })
    .map_err(|e| QueryError::internal("failed to serialise request for fingerprinting").with_source(e))?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use symq_core::SearchOptions;

    #[test]
    fn equal_inputs_hash_identically() {
        let a = fingerprint("scip", &QueryRequest::search("spawn")).unwrap();
        let b = fingerprint("scip", &QueryRequest::search("spawn")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = fingerprint("scip", &QueryRequest::symbol("repo::f")).unwrap();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn backend_id_is_part_of_the_key() {
        let req = QueryRequest::symbol("repo::f");
        assert_ne!(
            fingerprint("scip", &req).unwrap(),
            fingerprint("lsp", &req).unwrap()
        );
    }

    #[test]
    fn request_type_is_part_of_the_key() {
        assert_ne!(
            fingerprint("scip", &QueryRequest::symbol("x")).unwrap(),
            fingerprint("scip", &QueryRequest::references("x")).unwrap()
        );
    }

    #[test]
    fn options_are_part_of_the_key() {
        let default = QueryRequest::search("x");
        let scoped = QueryRequest::Search {
            query: "x".into(),
            options: SearchOptions {
                path_prefix: Some("src/".into()),
                ..SearchOptions::default()
            },
        };
        assert_ne!(
            fingerprint("scip", &default).unwrap(),
            fingerprint("scip", &scoped).unwrap()
        );
    }

    #[test]
    fn absent_option_differs_from_empty() {
        let absent = QueryRequest::Search {
            query: "x".into(),
            options: SearchOptions {
                path_prefix: None,
                ..SearchOptions::default()
            },
        };
        let empty = QueryRequest::Search {
            query: "x".into(),
            options: SearchOptions {
                path_prefix: Some(String::new()),
                ..SearchOptions::default()
            },
        };
        assert_ne!(
            fingerprint("scip", &absent).unwrap(),
            fingerprint("scip", &empty).unwrap()
        );
    }

    proptest! {
        #[test]
        fn determinism_over_arbitrary_queries(query in ".*", backend in "[a-z]{1,12}") {
            let req = QueryRequest::search(query);
            let a = fingerprint(&backend, &req).unwrap();
            let b = fingerprint(&backend, &req).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn distinct_symbols_never_collide(a in "[a-z]{1,24}", b in "[A-Z]{1,24}") {
            let fa = fingerprint("scip", &QueryRequest::symbol(a)).unwrap();
            let fb = fingerprint("scip", &QueryRequest::symbol(b)).unwrap();
            prop_assert_ne!(fa, fb);
        }
    }
}
