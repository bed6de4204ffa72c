//! `billforge-auth`: accounts, password hashing and session tokens.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod error;
pub mod jwt;
pub mod password;
pub mod user;

pub use claims::{JwtClaims, validate_claims};
pub use error::AuthError;
pub use jwt::{Hs256Jwt, IssuedToken, JwtValidator};
pub use password::{MIN_PASSWORD_LEN, hash_password, validate_password, verify_password};
pub use user::{BusinessProfile, Credentials, ProfileUpdate, Registration, User, UserProfile};
