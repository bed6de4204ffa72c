//! Account storage.

mod in_memory;
mod postgres;

use async_trait::async_trait;

use billforge_auth::User;
use billforge_core::UserId;

use crate::error::StoreError;

pub use in_memory::InMemoryUserDirectory;
pub use postgres::PostgresUserDirectory;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Store a new account at version 1. A taken email is a conflict.
    async fn create(&self, user: User) -> Result<User, StoreError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Lookup by (already normalized) email, case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Replace an account expected at `user.version`.
    async fn update(&self, user: User) -> Result<User, StoreError>;
}

pub(crate) fn email_taken() -> StoreError {
    StoreError::Conflict("email is already registered".to_string())
}
