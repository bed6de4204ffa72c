//! `billforge-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, money, the document contract every persisted record follows,
//! and the domain error model.

pub mod document;
pub mod error;
pub mod id;
pub mod money;
pub mod validation;
pub mod value_object;

pub use document::{Document, ExpectedVersion, Timestamps};
pub use error::{DomainError, DomainResult};
pub use id::{DocumentId, UserId};
pub use money::{Money, Percent};
pub use validation::FieldErrors;
pub use value_object::ValueObject;
