//! Postgres-backed document store.
//!
//! All collections share the `documents` table: `(collection, owner_id, id)`
//! is the primary key and the record itself is stored as JSONB. The `version`
//! column is authoritative; the copy inside `body` is overwritten on load.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use billforge_core::{Document, DocumentId, ExpectedVersion, UserId};

use super::DocumentStore;
use crate::db::map_sqlx_error;
use crate::error::StoreError;

/// One collection of documents in Postgres.
///
/// Updates run in a transaction that locks the row (`SELECT ... FOR UPDATE`),
/// checks the expected version and writes the new body.
#[derive(Debug)]
pub struct PostgresDocumentStore<D> {
    pool: Arc<PgPool>,
    _document: PhantomData<fn() -> D>,
}

impl<D> Clone for PostgresDocumentStore<D> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            _document: PhantomData,
        }
    }
}

impl<D> PostgresDocumentStore<D> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            _document: PhantomData,
        }
    }
}

fn decode<D: Document>(row: &PgRow) -> Result<D, StoreError> {
    let body: serde_json::Value = row
        .try_get("body")
        .map_err(|e| map_sqlx_error("decode", e))?;
    let version: i64 = row
        .try_get("version")
        .map_err(|e| map_sqlx_error("decode", e))?;
    let mut document: D = serde_json::from_value(body)?;
    document.set_version(version as u64);
    Ok(document)
}

/// Version-checked write of one document inside an open transaction.
async fn write_locked<D: Document>(
    tx: &mut Transaction<'_, Postgres>,
    mut document: D,
    expected: ExpectedVersion,
) -> Result<D, StoreError> {
    let current: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT version FROM documents
        WHERE collection = $1 AND owner_id = $2 AND id = $3
        FOR UPDATE
        "#,
    )
    .bind(D::COLLECTION)
    .bind(document.owner().as_uuid())
    .bind(document.document_id().as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("update", e))?;

    let current = current.ok_or(StoreError::NotFound)? as u64;
    if !expected.matches(current) {
        return Err(StoreError::version_mismatch(expected, current));
    }

    document.set_version(current + 1);
    let body = serde_json::to_value(&document)?;
    sqlx::query(
        r#"
        UPDATE documents
        SET version = $4, body = $5, updated_at = now()
        WHERE collection = $1 AND owner_id = $2 AND id = $3
        "#,
    )
    .bind(D::COLLECTION)
    .bind(document.owner().as_uuid())
    .bind(document.document_id().as_uuid())
    .bind(document.version() as i64)
    .bind(body)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("update", e))?;

    Ok(document)
}

#[async_trait]
impl<D: Document> DocumentStore<D> for PostgresDocumentStore<D> {
    #[instrument(skip(self), fields(collection = D::COLLECTION, owner = %owner), err)]
    async fn get(&self, owner: UserId, id: DocumentId) -> Result<Option<D>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT version, body FROM documents
            WHERE collection = $1 AND owner_id = $2 AND id = $3
            "#,
        )
        .bind(D::COLLECTION)
        .bind(owner.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref().map(decode::<D>).transpose()
    }

    #[instrument(skip(self), fields(collection = D::COLLECTION, owner = %owner), err)]
    async fn list(&self, owner: UserId) -> Result<Vec<D>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT version, body FROM documents
            WHERE collection = $1 AND owner_id = $2
            ORDER BY id ASC
            "#,
        )
        .bind(D::COLLECTION)
        .bind(owner.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(decode::<D>).collect()
    }

    #[instrument(
        skip(self, document),
        fields(collection = D::COLLECTION, id = %document.document_id()),
        err
    )]
    async fn insert(&self, mut document: D) -> Result<D, StoreError> {
        document.set_version(1);
        let body = serde_json::to_value(&document)?;
        sqlx::query(
            r#"
            INSERT INTO documents (collection, owner_id, id, version, body)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(D::COLLECTION)
        .bind(document.owner().as_uuid())
        .bind(document.document_id().as_uuid())
        .bind(1_i64)
        .bind(body)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;

        Ok(document)
    }

    #[instrument(
        skip(self, document),
        fields(collection = D::COLLECTION, id = %document.document_id(), expected = ?expected),
        err
    )]
    async fn update(&self, document: D, expected: ExpectedVersion) -> Result<D, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        let written = write_locked(&mut tx, document, expected).await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(written)
    }

    #[instrument(skip(self, documents), fields(collection = D::COLLECTION, count = documents.len()), err)]
    async fn update_all(&self, documents: Vec<D>) -> Result<Vec<D>, StoreError> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        let mut written = Vec::with_capacity(documents.len());
        for document in documents {
            let expected = ExpectedVersion::Exact(document.version());
            // Dropping `tx` on error rolls the batch back.
            written.push(write_locked(&mut tx, document, expected).await?);
        }
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(written)
    }

    #[instrument(skip(self), fields(collection = D::COLLECTION, owner = %owner), err)]
    async fn delete(&self, owner: UserId, id: DocumentId) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM documents
            WHERE collection = $1 AND owner_id = $2 AND id = $3
            "#,
        )
        .bind(D::COLLECTION)
        .bind(owner.as_uuid())
        .bind(id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
