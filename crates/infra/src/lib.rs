//! Infrastructure layer: document storage, user accounts and database wiring.

pub mod db;
pub mod document_store;
pub mod error;
pub mod repositories;
pub mod users;

pub use db::{create_pool, run_migrations};
pub use document_store::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore};
pub use error::StoreError;
pub use repositories::Repositories;
pub use users::{InMemoryUserDirectory, PostgresUserDirectory, UserDirectory};
