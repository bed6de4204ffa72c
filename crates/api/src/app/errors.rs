//! One error type for every handler, rendered as `{"error": code, "message": text}`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use billforge_auth::AuthError;
use billforge_core::DomainError;
use billforge_export::ExportError;
use billforge_infra::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidId(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Invariant(String),

    #[error("{message}")]
    Internal { code: &'static str, message: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Internal {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Invariant(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::InvalidId(_) => "invalid_id",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Invariant(_) => "invariant_violation",
            ApiError::Internal { code, .. } => code,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        json_error(status, self.code(), self.to_string())
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::InvalidId(msg) => ApiError::InvalidId(msg),
            DomainError::InvariantViolation(msg) => ApiError::Invariant(msg),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("not found".to_string()),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            other @ (StoreError::Backend(_) | StoreError::Serialization(_)) => {
                ApiError::internal("store_error", other.to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::Expired
            | AuthError::InvalidToken(_) => ApiError::Unauthorized(err.to_string()),
            AuthError::PasswordHash | AuthError::Signing(_) => ApiError::internal("internal_error", err.to_string()),
            AuthError::Domain(domain) => domain.into(),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::UnsupportedFormat(_) => ApiError::Validation(err.to_string()),
            ExportError::Domain(domain) => domain.into(),
            other => ApiError::internal("export_error", other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::validation("missing required fields: name"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_id("nope"), StatusCode::BAD_REQUEST),
            (DomainError::invariant("insufficient stock"), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::conflict("stale"), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn validation_message_is_passed_through() {
        let err = ApiError::from(DomainError::validation("missing required fields: name"));
        assert_eq!(err.code(), "validation_error");
        assert_eq!(err.to_string(), "missing required fields: name");
    }

    #[test]
    fn auth_failures_are_unauthorized_but_signing_is_internal() {
        assert_eq!(ApiError::from(AuthError::Expired).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::Signing("bad key".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_map_to_statuses() {
        assert_eq!(ApiError::from(StoreError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(StoreError::Conflict("x".into())).status(),
            StatusCode::CONFLICT
        );
        let backend = ApiError::from(StoreError::Backend("down".into()));
        assert_eq!(backend.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(backend.code(), "store_error");
    }

    #[test]
    fn unsupported_export_format_is_bad_request() {
        let err = ApiError::from(ExportError::UnsupportedFormat("docx".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
