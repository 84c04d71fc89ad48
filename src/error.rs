//! Error types for schemaguard.
//!
//! Engine failures are surfaced to callers verbatim inside
//! [`ReasonerError::Reasoning`]. The coordinator itself only adds the errors
//! it is responsible for: lock timeouts, use after close, disposal failures
//! and rejected caller input.

use std::fmt;

use thiserror::Error;

use crate::axiom::Axiom;

/// The public operation an error (or a log line) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// A read-only query.
    Query,
    /// An axiom delta followed by recomputation.
    Update,
    /// Justification search.
    Explain,
    /// Disposal of both engine handles.
    Close,
    /// A read of facade state such as the tracking flag or a snapshot.
    Inspect,
}

impl OperationKind {
    /// Returns a stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Update => "update",
            Self::Explain => "explain",
            Self::Close => "close",
            Self::Inspect => "inspect",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by a reasoning or explanation engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReasoningError {
    /// The knowledge base is logically inconsistent.
    #[error("Knowledge base is inconsistent: {reason}")]
    Inconsistent {
        /// Engine-provided detail.
        reason: String,
    },

    /// An axiom failed well-formedness checks.
    #[error("Malformed axiom {axiom}: {reason}")]
    MalformedAxiom {
        /// The offending axiom.
        axiom: Axiom,
        /// Why it was rejected.
        reason: String,
    },

    /// The engine failed while computing inferences.
    #[error("Reasoning computation failed: {message}")]
    Computation {
        /// Engine-provided detail.
        message: String,
    },

    /// The engine does not support the requested operation.
    #[error("Unsupported by engine: {operation}")]
    Unsupported {
        /// Description of what was requested.
        operation: String,
    },

    /// The engine handle has already been disposed.
    #[error("Engine has been disposed")]
    Disposed,
}

impl ReasoningError {
    /// Creates a computation error.
    #[must_use]
    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation {
            message: message.into(),
        }
    }
}

/// Caller input rejected before any engine is involved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Explanation limit must be at least 1, got {limit}")]
    InvalidExplanationLimit { limit: usize },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Aggregated failures from disposing both engine handles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Disposal failed (explanation: {}, reasoning: {})", describe(.explanation), describe(.reasoning))]
pub struct DisposalError {
    /// Failure reported by the explanation engine, if any.
    pub explanation: Option<ReasoningError>,
    /// Failure reported by the reasoning engine, if any.
    pub reasoning: Option<ReasoningError>,
}

fn describe(err: &Option<ReasoningError>) -> String {
    err.as_ref().map_or_else(|| "ok".to_string(), ToString::to_string)
}

impl DisposalError {
    /// Builds an error from the two disposal outcomes, or `None` if both succeeded.
    #[must_use]
    pub fn from_outcomes(
        explanation: Result<(), ReasoningError>,
        reasoning: Result<(), ReasoningError>,
    ) -> Option<Self> {
        let explanation = explanation.err();
        let reasoning = reasoning.err();
        if explanation.is_none() && reasoning.is_none() {
            return None;
        }
        Some(Self {
            explanation,
            reasoning,
        })
    }
}

/// Top-level error type for schemaguard.
#[derive(Debug, Error)]
pub enum ReasonerError {
    #[error("Reasoning error: {0}")]
    Reasoning(#[from] ReasoningError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Disposal(#[from] DisposalError),

    #[error("Timed out after {waited_ms}ms waiting for the {operation} lock")]
    LockTimeout {
        operation: OperationKind,
        waited_ms: u64,
    },

    #[error("Reasoner is closed; {operation} rejected")]
    Closed { operation: OperationKind },
}

impl ReasonerError {
    /// Returns true if this error came from an engine.
    #[must_use]
    pub const fn is_reasoning(&self) -> bool {
        matches!(self, Self::Reasoning(_))
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if the facade had already been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Returns true if this is a lock timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// Returns true if this error is retryable.
    ///
    /// Only lock timeouts are: the operation never reached the engine.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.is_timeout()
    }
}

/// Result type alias for schemaguard operations.
pub type ReasonerResult<T> = Result<T, ReasonerError>;
