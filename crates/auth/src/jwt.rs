//! HS256 token issuing and validation.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};

use billforge_core::UserId;

use crate::claims::{JwtClaims, validate_claims};
use crate::error::AuthError;

/// Validates bearer tokens. Object-safe so the HTTP layer can hold `Arc<dyn JwtValidator>`.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, AuthError>;
}

/// A freshly signed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: JwtClaims,
}

/// HMAC-SHA256 signer/validator sharing one secret.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: UserId, email: &str, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let claims = JwtClaims::new(user_id, email, now, self.ttl);
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        Ok(IssuedToken { token, claims })
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        // `validate_claims` checks expiry against the caller's clock.
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            },
        )?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> Hs256Jwt {
        Hs256Jwt::new(b"test-secret", Duration::hours(1))
    }

    #[test]
    fn issued_token_validates() {
        let jwt = jwt();
        let user = UserId::new();
        let now = Utc::now();
        let issued = jwt.issue(user, "owner@example.in", now).unwrap();

        let claims = jwt.validate(&issued.token, now).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.email, "owner@example.in");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = jwt();
        let issued = jwt.issue(UserId::new(), "a@b.in", Utc::now() - Duration::hours(3)).unwrap();
        assert_eq!(jwt.validate(&issued.token, Utc::now()), Err(AuthError::Expired));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issued = jwt().issue(UserId::new(), "a@b.in", Utc::now()).unwrap();
        let other = Hs256Jwt::new(b"another-secret", Duration::hours(1));
        assert!(matches!(other.validate(&issued.token, Utc::now()), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(matches!(jwt().validate("not.a.jwt", Utc::now()), Err(AuthError::InvalidToken(_))));
    }
}
