//! User accounts and the business profile attached to them.
//!
//! A user is both the login identity and the seller on every document they
//! create: the GSTIN on the profile decides the seller state for
//! place-of-supply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billforge_core::validation::{normalize_email, normalize_optional};
use billforge_core::{DomainError, DomainResult, FieldErrors, Timestamps, UserId};
use billforge_gst::{Gstin, validate_state_code};

use crate::error::AuthError;
use crate::password::{validate_password, verify_password};

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// Stored account record. Never serialized to clients directly (see [`UserProfile`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Lowercased; unique across accounts.
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub business: BusinessProfile,
    pub version: u64,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// Seller details printed on invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub gstin: Option<Gstin>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Explicit state code for unregistered sellers; the GSTIN wins when present.
    #[serde(default)]
    pub state_code: Option<String>,
}

impl BusinessProfile {
    pub fn seller_state(&self) -> Option<&str> {
        self.gstin
            .as_ref()
            .map(Gstin::state_code)
            .or(self.state_code.as_deref())
    }

    /// Name to print on documents: business name, falling back to the account name.
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.business_name.as_deref().unwrap_or(fallback)
    }
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            business: self.business.clone(),
            created_at: self.timestamps.created_at,
        }
    }

    /// Check a login attempt against this account.
    pub fn verify_password(&self, password: &str) -> Result<(), AuthError> {
        verify_password(password, &self.password_hash)
    }

    pub fn apply_update(&mut self, update: ProfileUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        errors.require_text("name", &update.name);
        let business = parse_business(
            &mut errors,
            update.business_name,
            update.gstin,
            update.address,
            update.phone,
            update.state_code,
        );
        errors.finish()?;

        self.name = update.name.trim().to_string();
        self.business = business;
        self.timestamps.touch(now);
        Ok(())
    }
}

/// Client-facing view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(flatten)]
    pub business: BusinessProfile,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration / login / profile forms
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
}

impl Registration {
    /// Validate every field and build the account record around an already
    /// computed password hash.
    pub fn validate(&self) -> DomainResult<()> {
        self.check().map(|_| ())
    }

    pub fn into_user(self, password_hash: String, now: DateTime<Utc>) -> DomainResult<User> {
        let (email, business) = self.check()?;
        Ok(User {
            id: UserId::new(),
            name: self.name.trim().to_string(),
            email,
            password_hash,
            business,
            version: 0,
            timestamps: Timestamps::new(now),
        })
    }

    fn check(&self) -> DomainResult<(String, BusinessProfile)> {
        let mut errors = FieldErrors::new();
        errors
            .require_text("name", &self.name)
            .require_text("email", &self.email)
            .require_text("password", &self.password);

        let email = if self.email.trim().is_empty() {
            None
        } else {
            errors.check("email", normalize_email(&self.email))
        };
        if !self.password.is_empty() {
            errors.check("password", validate_password(&self.password));
        }
        let business = parse_business(
            &mut errors,
            self.business_name.clone(),
            self.gstin.clone(),
            self.address.clone(),
            self.phone.clone(),
            self.state_code.clone(),
        );
        errors.finish()?;

        let email = email.ok_or_else(|| DomainError::validation("missing required fields: email"))?;
        Ok((email, business))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        errors
            .require_text("email", &self.email)
            .require_text("password", &self.password);
        errors.finish()
    }

    /// Lookup key for the account; malformed input simply never matches.
    pub fn lookup_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
}

fn parse_business(
    errors: &mut FieldErrors,
    business_name: Option<String>,
    gstin: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    state_code: Option<String>,
) -> BusinessProfile {
    let gstin = normalize_optional(gstin).and_then(|g| errors.check("gstin", Gstin::parse(&g)));
    let state_code = normalize_optional(state_code)
        .and_then(|s| errors.check("state_code", validate_state_code(&s)));
    BusinessProfile {
        business_name: normalize_optional(business_name),
        gstin,
        address: normalize_optional(address),
        phone: normalize_optional(phone),
        state_code,
    }
}
