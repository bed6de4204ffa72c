//! Postgres connection pool, migrations and error mapping.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | `StoreError` |
//! |------------|-----------------|--------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (unique violation on `invoices_number_key`) | `23505` | `Conflict`, "invoice number ... already in use" |
//! | Database (other) | any other | `Backend` |
//! | RowNotFound | n/a | `NotFound` |
//! | PoolClosed / IO / TLS / ... | n/a | `Backend` |

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::StoreError;

/// Partial unique index on `(owner_id, lower(invoice_number))` for invoices.
pub(crate) const INVOICE_NUMBER_KEY: &str = "invoices_number_key";

/// Open a connection pool.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the bundled schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code() {
                Some(code) if code.as_ref() == "23505" => {
                    if db_err.constraint() == Some(INVOICE_NUMBER_KEY) {
                        StoreError::Conflict("invoice number is already in use".to_string())
                    } else {
                        StoreError::Conflict(msg)
                    }
                }
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billforge_core::{Document, Money, UserId};
    use billforge_gst::LineItem;
    use billforge_invoicing::{Invoice, InvoiceContext, InvoiceId, InvoiceInput};
    use chrono::{NaiveDate, Utc};

    const SCHEMA: &str = include_str!("../migrations/20260101000000_init.sql");

    #[test]
    fn schema_keeps_invoice_numbers_unique_per_owner() {
        let index = SCHEMA
            .split(';')
            .find(|stmt| stmt.contains(INVOICE_NUMBER_KEY))
            .expect("invoice number index");
        assert!(index.contains("CREATE UNIQUE INDEX"));
        assert!(index.contains("(owner_id, lower(body->>'invoice_number'))"));
        assert!(index.contains("WHERE collection = 'invoices'"));
    }

    #[test]
    fn indexed_json_key_matches_the_stored_invoice() {
        let input = InvoiceInput {
            customer_name: Some("Walk-in".into()),
            lines: vec![LineItem {
                description: "Consulting".into(),
                item_id: None,
                hsn: None,
                quantity: 1,
                unit: None,
                unit_price: Money::from_rupees(100),
                discount_percent: Default::default(),
                gst_rate: Default::default(),
            }],
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let ctx = InvoiceContext { customer: None, seller_state: None, today, now: Utc::now() };
        let invoice = Invoice::create(UserId::new(), InvoiceId::generate(), "INV-0042".into(), &input, ctx).unwrap();

        let body = serde_json::to_value(&invoice).unwrap();
        assert_eq!(body["invoice_number"], "INV-0042");
        assert_eq!(Invoice::COLLECTION, "invoices");
    }
}
