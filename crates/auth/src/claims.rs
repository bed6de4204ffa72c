use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use billforge_core::UserId;

use crate::error::AuthError;

/// JWT claims carried by session tokens.
///
/// Times are seconds since the Unix epoch, as registered JWT claims require.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the authenticated user.
    pub sub: UserId,

    pub email: String,

    /// Issued-at.
    pub iat: i64,

    /// Expiration.
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(user_id: UserId, email: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user_id,
            email: email.into(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Validate the claim time window against `now`.
///
/// Signature checks happen in [`crate::jwt`]; this only looks at the claims.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), AuthError> {
    if claims.exp <= claims.iat {
        return Err(AuthError::InvalidToken("expires before it was issued".into()));
    }
    if now.timestamp() >= claims.exp {
        return Err(AuthError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_at(now: DateTime<Utc>, ttl: Duration) -> JwtClaims {
        JwtClaims::new(UserId::new(), "owner@example.in", now, ttl)
    }

    #[test]
    fn fresh_claims_are_valid() {
        let now = Utc::now();
        assert!(validate_claims(&claims_at(now, Duration::hours(1)), now).is_ok());
    }

    #[test]
    fn expired_claims_are_rejected() {
        let issued = Utc::now() - Duration::hours(2);
        let claims = claims_at(issued, Duration::hours(1));
        assert_eq!(validate_claims(&claims, Utc::now()), Err(AuthError::Expired));
    }

    #[test]
    fn inverted_window_is_invalid() {
        let now = Utc::now();
        let mut claims = claims_at(now, Duration::hours(1));
        claims.exp = claims.iat;
        assert!(matches!(validate_claims(&claims, now), Err(AuthError::InvalidToken(_))));
    }

    proptest::proptest! {
        #[test]
        fn claims_are_valid_exactly_until_expiry(ttl_secs in 1i64..1_000_000, elapsed in 0i64..2_000_000) {
            let issued = Utc.timestamp_opt(1_750_000_000, 0).single().unwrap();
            let claims = claims_at(issued, Duration::seconds(ttl_secs));
            let result = validate_claims(&claims, issued + Duration::seconds(elapsed));
            proptest::prop_assert_eq!(result.is_ok(), elapsed < ttl_secs);
        }
    }
}
