//! Document contract for persisted records.
//!
//! Every record the service stores (invoices, items, parties, ...) is a
//! self-contained document owned by one user. Storage adapters only rely on the
//! small surface defined here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{DomainError, DomainResult};
use crate::id::{DocumentId, UserId};

/// A persisted, owner-scoped record.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Logical collection name (table / key prefix).
    const COLLECTION: &'static str;

    fn document_id(&self) -> DocumentId;

    /// Owning user. Reads and writes are always scoped to it.
    fn owner(&self) -> UserId;

    /// Monotonically increasing version, bumped by the store on every write.
    fn version(&self) -> u64;

    fn set_version(&mut self, version: u64);
}

/// Optimistic concurrency expectation for a document update.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (last write wins).
    Any,
    /// Require the stored document to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// `Exact` when the client sent a version, `Any` otherwise.
    pub fn from_client(version: Option<u64>) -> Self {
        version.map_or(Self::Any, Self::Exact)
    }

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Creation / modification timestamps carried by every document.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
