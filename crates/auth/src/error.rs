use thiserror::Error;

use billforge_core::DomainError;

/// Authentication failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("authentication required")]
    MissingToken,

    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("password hashing failed")]
    PasswordHash,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
