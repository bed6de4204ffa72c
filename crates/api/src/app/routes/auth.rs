use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use billforge_auth::{AuthError, Credentials, ProfileUpdate, Registration, User, hash_password};

use crate::app::dto::{ApiJson, AuthResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::UserContext;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<Registration>,
) -> Result<Response, ApiError> {
    body.validate()?;

    let password = body.password.clone();
    let hash = blocking(move || hash_password(&password)).await?;
    let user = body.into_user(hash, Utc::now())?;
    let user = services.repos.users.create(user).await?;

    tracing::info!(user_id = %user.id, "account registered");
    session_response(&services, StatusCode::CREATED, &user)
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<Credentials>,
) -> Result<Response, ApiError> {
    body.validate()?;

    let user = services
        .repos
        .users
        .find_by_email(&body.lookup_email())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let candidate = user.clone();
    let password = body.password;
    blocking(move || candidate.verify_password(&password)).await?;

    session_response(&services, StatusCode::OK, &user)
}

/// Clears the session cookie. Bearer tokens stay valid until they expire.
pub async fn logout(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, services.expired_session_cookie())],
    )
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
) -> Result<impl IntoResponse, ApiError> {
    let user = services.account(&ctx).await?;
    Ok(Json(user.profile()))
}

pub async fn update_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiJson(body): ApiJson<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let mut user = services.account(&ctx).await?;
    user.apply_update(body, Utc::now())?;
    let user = services.repos.users.update(user).await?;
    Ok(Json(user.profile()))
}

fn session_response(services: &AppServices, status: StatusCode, user: &User) -> Result<Response, ApiError> {
    let issued = services.jwt.issue(user.id, &user.email, Utc::now())?;
    let cookie = services.session_cookie(&issued.token);
    let body = AuthResponse {
        expires_at: issued.claims.expires_at(),
        token: issued.token,
        user: user.profile(),
    };
    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal("internal_error", e.to_string()))?
        .map_err(ApiError::from)
}
