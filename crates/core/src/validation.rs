//! Form validation helpers.
//!
//! Request handlers validate a whole form in one pass so the client sees every
//! missing field at once instead of fixing them one round-trip at a time.

use crate::error::{DomainError, DomainResult};

/// Collects field-level problems and turns them into one [`DomainError::Validation`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors {
    missing: Vec<&'static str>,
    invalid: Vec<String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `field` as missing when the text is empty after trimming.
    pub fn require_text(&mut self, field: &'static str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.missing.push(field);
        }
        self
    }

    /// Record `field` as missing when absent.
    pub fn require<T>(&mut self, field: &'static str, value: Option<&T>) -> &mut Self {
        if value.is_none() {
            self.missing.push(field);
        }
        self
    }

    /// Record a field that is present but malformed.
    pub fn invalid(&mut self, field: &'static str, reason: impl core::fmt::Display) -> &mut Self {
        self.invalid.push(format!("{field}: {reason}"));
        self
    }

    /// Run a fallible check and record its validation message against `field`.
    pub fn check<T>(&mut self, field: &'static str, result: DomainResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(DomainError::Validation(msg)) | Err(DomainError::InvalidId(msg)) => {
                self.invalid(field, msg);
                None
            }
            Err(other) => {
                self.invalid(field, other);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }

    pub fn missing_fields(&self) -> &[&'static str] {
        &self.missing
    }

    /// `Ok(())` when nothing was recorded, otherwise one validation error
    /// listing every problem.
    pub fn finish(&self) -> DomainResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::with_capacity(2);
        if !self.missing.is_empty() {
            parts.push(format!("missing required fields: {}", self.missing.join(", ")));
        }
        if !self.invalid.is_empty() {
            parts.push(self.invalid.join("; "));
        }
        Err(DomainError::validation(parts.join("; ")))
    }
}

/// Trimmed copy of an optional text field; blank strings become `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim, lowercase and shape-check an email address.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_missing_field() {
        let mut errors = FieldErrors::new();
        errors
            .require_text("name", "  ")
            .require_text("email", "a@b.in")
            .require::<u32>("quantity", None);

        assert_eq!(errors.missing_fields(), &["name", "quantity"]);
        let err = errors.finish().unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("missing required fields: name, quantity")
        );
    }

    #[test]
    fn invalid_fields_follow_missing_ones() {
        let mut errors = FieldErrors::new();
        errors.require_text("name", "");
        let parsed: Option<u8> = errors.check("rate", Err(DomainError::validation("unsupported GST rate")));
        assert!(parsed.is_none());

        let DomainError::Validation(msg) = errors.finish().unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(msg, "missing required fields: name; rate: unsupported GST rate");
    }

    #[test]
    fn empty_collector_passes() {
        let mut errors = FieldErrors::new();
        errors.require_text("name", "Acme");
        assert!(errors.finish().is_ok());
    }

    #[test]
    fn email_shape() {
        assert_eq!(normalize_email(" A@B.in ").unwrap(), "a@b.in");
        assert!(normalize_email("ab.in").is_err());
        assert!(normalize_email("a@b").is_err());
        assert!(normalize_email("a b@c.in").is_err());
        assert!(normalize_email("a@@c.in").is_err());
    }

    #[test]
    fn normalize_optional_drops_blank_text() {
        assert_eq!(normalize_optional(Some("  ".into())), None);
        assert_eq!(normalize_optional(Some(" x ".into())), Some("x".into()));
        assert_eq!(normalize_optional(None), None);
    }
}
