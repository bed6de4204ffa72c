use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use billforge_auth::{AuthError, JwtValidator};

use crate::app::errors::ApiError;
use crate::context::UserContext;

/// Name of the session cookie set on login.
pub const SESSION_COOKIE: &str = "token";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Accepts `Authorization: Bearer <jwt>` or the session cookie.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(req.headers())?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected session token");
        ApiError::from(e)
    })?;

    req.extensions_mut()
        .insert(UserContext::new(claims.sub, claims.email));

    Ok(next.run(req).await)
}

fn extract_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    if let Some(header) = headers.get(header::AUTHORIZATION) {
        let header = header.to_str().map_err(|_| AuthError::MissingToken)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingToken)?
            .trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        return Ok(token);
    }

    session_cookie(headers).ok_or(AuthError::MissingToken)
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_header_wins() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer abc.def.ghi"),
            (header::COOKIE, "token=cookie-token"),
        ]);
        assert_eq!(extract_token(&h).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn cookie_is_accepted() {
        let h = headers(&[(header::COOKIE, "theme=dark; token=abc.def.ghi; lang=en")]);
        assert_eq!(extract_token(&h).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let h = headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_token(&h), Err(AuthError::MissingToken));
    }

    #[test]
    fn missing_or_empty_token_is_rejected() {
        assert_eq!(extract_token(&HeaderMap::new()), Err(AuthError::MissingToken));
        let h = headers(&[(header::COOKIE, "token=")]);
        assert_eq!(extract_token(&h), Err(AuthError::MissingToken));
    }
}
