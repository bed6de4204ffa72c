//! GST identification numbers and state codes.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use billforge_core::{DomainError, DomainResult};

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Highest numeric state / union-territory code in use.
const MAX_STATE_CODE: u8 = 38;
/// "Other territory" code for supplies outside any state.
const OTHER_TERRITORY: u8 = 97;

/// A validated 15-character GSTIN, e.g. `27AAPFU0939F1ZV`.
///
/// Layout: 2-digit state code, 10-character PAN, entity number, literal `Z`,
/// mod-36 check character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Gstin(String);

impl Gstin {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let value = raw.trim().to_ascii_uppercase();
        let bytes = value.as_bytes();
        if !value.is_ascii() || bytes.len() != 15 {
            return Err(DomainError::validation("GSTIN must be 15 characters"));
        }

        validate_state_code(&value[..2])?;

        let pan = &bytes[2..12];
        let pan_ok = pan[..5].iter().all(u8::is_ascii_uppercase)
            && pan[5..9].iter().all(u8::is_ascii_digit)
            && pan[9].is_ascii_uppercase();
        if !pan_ok {
            return Err(DomainError::validation("GSTIN has a malformed PAN segment"));
        }
        if !(bytes[12].is_ascii_uppercase() || (b'1'..=b'9').contains(&bytes[12])) {
            return Err(DomainError::validation("GSTIN has a malformed entity number"));
        }
        if bytes[13] != b'Z' {
            return Err(DomainError::validation("GSTIN must have 'Z' at position 14"));
        }

        let expected = check_character(&bytes[..14])
            .ok_or_else(|| DomainError::validation("GSTIN contains invalid characters"))?;
        if bytes[14] != expected {
            return Err(DomainError::validation("GSTIN checksum mismatch"));
        }

        Ok(Self(value))
    }

    /// Two-digit state code (`27` for Maharashtra).
    pub fn state_code(&self) -> &str {
        &self.0[..2]
    }

    /// Embedded PAN of the registered person.
    pub fn pan(&self) -> &str {
        &self.0[2..12]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check_character(body: &[u8]) -> Option<u8> {
    let mut sum: u32 = 0;
    for (i, byte) in body.iter().enumerate() {
        let value = ALPHABET.iter().position(|c| c == byte)? as u32;
        let factor = if i % 2 == 0 { 1 } else { 2 };
        let product = value * factor;
        sum += product / 36 + product % 36;
    }
    let check = (36 - sum % 36) % 36;
    Some(ALPHABET[check as usize])
}

impl FromStr for Gstin {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Gstin {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Gstin> for String {
    fn from(value: Gstin) -> Self {
        value.0
    }
}

impl core::fmt::Display for Gstin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a two-digit GST state code and return it normalized.
pub fn validate_state_code(code: &str) -> DomainResult<String> {
    let code = code.trim();
    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::validation("state code must be two digits"));
    }
    let n: u8 = code
        .parse()
        .map_err(|_| DomainError::validation("state code must be two digits"))?;
    if n == 0 || (n > MAX_STATE_CODE && n != OTHER_TERRITORY) {
        return Err(DomainError::validation(format!("unknown state code {code}")));
    }
    Ok(code.to_string())
}
