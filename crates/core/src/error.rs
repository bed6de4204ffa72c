//! Domain error model.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Business-rule failures raised by documents and calculations.
///
/// Storage and transport failures are not represented here; lookups that miss
/// are reported by the store layer. Messages are user-facing and carried to the
/// HTTP response unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input, e.g. `"missing required fields: name, lines"`.
    #[error("{0}")]
    Validation(String),

    /// Well-formed input that the current state does not allow
    /// (insufficient stock, over-payment, returning more than was sold).
    #[error("{0}")]
    InvariantViolation(String),

    #[error("{0}")]
    InvalidId(String),

    /// Duplicate invoice number, stale version, or a transition already made.
    #[error("{0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
