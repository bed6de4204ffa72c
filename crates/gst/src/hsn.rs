use core::str::FromStr;
use serde::{Deserialize, Serialize};

use billforge_core::{DomainError, DomainResult};

/// HSN (goods) or SAC (services) classification code: 4, 6 or 8 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HsnCode(String);

impl HsnCode {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let value = raw.trim();
        if !matches!(value.len(), 4 | 6 | 8) || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation("HSN/SAC code must be 4, 6 or 8 digits"));
        }
        Ok(Self(value.to_string()))
    }

    /// Services Accounting Codes live under chapter 99.
    pub fn is_sac(&self) -> bool {
        self.0.starts_with("99")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for HsnCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HsnCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HsnCode> for String {
    fn from(value: HsnCode) -> Self {
        value.0
    }
}

impl core::fmt::Display for HsnCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_standard_lengths() {
        for raw in ["8471", "847130", "84713010", "998314"] {
            assert!(HsnCode::parse(raw).is_ok(), "{raw}");
        }
        assert!(HsnCode::parse("998314").unwrap().is_sac());
    }

    #[test]
    fn rejects_other_shapes() {
        for raw in ["847", "84713", "8471A0", ""] {
            assert!(HsnCode::parse(raw).is_err(), "{raw}");
        }
    }
}
