use thiserror::Error;

/// Errors returned by storage adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    /// Version mismatch or unique-key clash.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn version_mismatch(expected: impl core::fmt::Debug, actual: u64) -> Self {
        StoreError::Conflict(format!(
            "document was modified concurrently (expected: {expected:?}, actual: {actual})"
        ))
    }

    pub(crate) fn poisoned() -> Self {
        StoreError::Backend("in-memory store lock poisoned".to_string())
    }
}
