//! Owner-scoped document storage.
//!
//! Every read and write is keyed by `(owner, id)`, so a user can never load or
//! modify another user's records. Versions are assigned by the store: inserts
//! start at 1 and each successful update bumps the stored version by one.

mod in_memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use billforge_core::{Document, DocumentId, ExpectedVersion, UserId};

use crate::error::StoreError;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

#[async_trait]
pub trait DocumentStore<D: Document>: Send + Sync {
    async fn get(&self, owner: UserId, id: DocumentId) -> Result<Option<D>, StoreError>;

    /// All documents of the owner, oldest first.
    async fn list(&self, owner: UserId) -> Result<Vec<D>, StoreError>;

    /// Store a new document at version 1. An existing id is a conflict.
    async fn insert(&self, document: D) -> Result<D, StoreError>;

    /// Replace a stored document, returning it with its new version.
    async fn update(&self, document: D, expected: ExpectedVersion) -> Result<D, StoreError>;

    /// Replace several documents at once, each expected at its current
    /// `version()`. Either every write lands or none does.
    async fn update_all(&self, documents: Vec<D>) -> Result<Vec<D>, StoreError>;

    async fn delete(&self, owner: UserId, id: DocumentId) -> Result<(), StoreError>;

    /// Fetch a document or fail with `NotFound`.
    async fn require(&self, owner: UserId, id: DocumentId) -> Result<D, StoreError> {
        self.get(owner, id).await?.ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl<D, S> DocumentStore<D> for Arc<S>
where
    D: Document,
    S: DocumentStore<D> + ?Sized,
{
    async fn get(&self, owner: UserId, id: DocumentId) -> Result<Option<D>, StoreError> {
        (**self).get(owner, id).await
    }

    async fn list(&self, owner: UserId) -> Result<Vec<D>, StoreError> {
        (**self).list(owner).await
    }

    async fn insert(&self, document: D) -> Result<D, StoreError> {
        (**self).insert(document).await
    }

    async fn update(&self, document: D, expected: ExpectedVersion) -> Result<D, StoreError> {
        (**self).update(document, expected).await
    }

    async fn update_all(&self, documents: Vec<D>) -> Result<Vec<D>, StoreError> {
        (**self).update_all(documents).await
    }

    async fn delete(&self, owner: UserId, id: DocumentId) -> Result<(), StoreError> {
        (**self).delete(owner, id).await
    }
}
