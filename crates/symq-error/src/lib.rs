//! Error taxonomy for the symquery core.
//!
//! Every error crossing a component boundary is a [`QueryError`]: a stable
//! machine-readable [`ErrorKind`], a human-readable message, an optional
//! cause, and a list of suggested remediations.  The cause is held behind an
//! `Arc` so the whole error is cheap to clone — a coalesced request must be
//! able to hand the originator's failure to every waiter verbatim.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Machine-readable, stable error kind.
///
/// Each variant serialises to a kebab-case string that is guaranteed not to
/// change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// No backend is registered, selected, or every selected backend failed.
    BackendUnavailable,
    /// Admission was denied or lost to the caller's cancellation.
    RateLimited,
    /// A per-backend deadline elapsed, or the caller's context was cancelled.
    Timeout,
    /// The requested symbol does not exist in any consulted backend.
    SymbolNotFound,
    /// A precomputed index the backend relies on is absent.
    IndexMissing,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorKind {
    /// Stable `&'static str` representation of the kind (e.g. `"rate-limited"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackendUnavailable => "backend-unavailable",
            Self::RateLimited => "rate-limited",
            Self::Timeout => "timeout",
            Self::SymbolNotFound => "symbol-not-found",
            Self::IndexMissing => "index-missing",
            Self::Internal => "internal",
        }
    }

    /// Whether a caller may reasonably retry the same request unchanged.
    ///
    /// Admission and deadline failures are transient; the remaining kinds
    /// require a change in the environment or the request first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// QueryError
// ---------------------------------------------------------------------------

/// Unified symquery error.
///
/// Construct with [`QueryError::new`] or one of the per-kind shorthands, then
/// chain [`with_source`](Self::with_source) and
/// [`with_remediation`](Self::with_remediation) as needed.
#[derive(Clone)]
pub struct QueryError {
    /// Machine-readable kind.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause, shared so the error stays clonable.
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    /// Suggested remediations, in descending order of usefulness.
    pub remediations: Vec<String>,
}

impl QueryError {
    /// Create a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            remediations: Vec::new(),
        }
    }

    /// Shorthand for [`ErrorKind::BackendUnavailable`].
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendUnavailable, message)
    }

    /// Shorthand for [`ErrorKind::RateLimited`].
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    /// Shorthand for [`ErrorKind::Timeout`].
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Shorthand for [`ErrorKind::SymbolNotFound`].
    pub fn symbol_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SymbolNotFound, message)
    }

    /// Shorthand for [`ErrorKind::IndexMissing`].
    pub fn index_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IndexMissing, message)
    }

    /// Shorthand for [`ErrorKind::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Append a suggested remediation.
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediations.push(remediation.into());
        self
    }

    /// Returns `true` when a caller may retry the request unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Debug for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("QueryError");
        d.field("kind", &self.kind);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.remediations.is_empty() {
            d.field("remediations", &self.remediations);
        }
        d.finish()
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)?;
        if !self.remediations.is_empty() {
            write!(f, " (try: {})", self.remediations.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Serialization support
// ---------------------------------------------------------------------------

/// Serialisable snapshot of a [`QueryError`] (without the opaque source).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryErrorDto {
    /// Error kind.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Suggested remediations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remediations: Vec<String>,
    /// String representation of the source error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_message: Option<String>,
}

impl From<&QueryError> for QueryErrorDto {
    fn from(err: &QueryError) -> Self {
        Self {
            kind: err.kind,
            message: err.message.clone(),
            remediations: err.remediations.clone(),
            source_message: err.source.as_ref().map(|s| s.to_string()),
        }
    }
}

impl From<QueryErrorDto> for QueryError {
    fn from(dto: QueryErrorDto) -> Self {
        Self {
            kind: dto.kind,
            message: dto.message,
            source: None,
            remediations: dto.remediations,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
