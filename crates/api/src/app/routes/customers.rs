use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;

use billforge_core::{Document, ExpectedVersion};
use billforge_export::customers_table;
use billforge_parties::{Party, PartyId, PartyInput, PartyKind};

use crate::app::dto::{self, ApiJson, ApiQuery, ExportQuery, ListResponse, PartyListQuery};
use crate::app::errors::ApiError;
use crate::app::services::{AppServices, load, remove};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_parties).post(create_party))
        .route("/export", get(export_parties))
        .route("/:id", get(get_party).put(update_party).delete(delete_party))
        .route("/:id/suspend", post(suspend_party))
}

async fn filtered(services: &AppServices, ctx: &UserContext, query: &PartyListQuery) -> Result<Vec<Party>, ApiError> {
    let kind: Option<PartyKind> = dto::parse_opt(query.kind.as_deref())?;
    let needle = query.q.as_deref().unwrap_or_default();
    let parties = services.repos.parties.list(ctx.user_id()).await?;
    Ok(parties
        .into_iter()
        .filter(|p| kind.is_none_or(|k| p.kind() == k))
        .filter(|p| p.matches_query(needle))
        .collect())
}

pub async fn list_parties(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiQuery(query): ApiQuery<PartyListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let parties = filtered(&services, &ctx, &query).await?;
    Ok(Json(ListResponse::new(parties)))
}

pub async fn export_parties(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = query.format()?;
    let parties = filtered(&services, &ctx, &PartyListQuery::default()).await?;
    let body = format.render(&customers_table(&parties))?;
    Ok(dto::export(format, "customers", body))
}

pub async fn create_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiJson(body): ApiJson<PartyInput>,
) -> Result<impl IntoResponse, ApiError> {
    let party = Party::register(ctx.user_id(), PartyId::generate(), &body, Utc::now())?;
    let party = services.repos.parties.insert(party).await?;
    tracing::info!(party_id = %party.id_typed(), kind = party.kind().as_str(), "party created");
    Ok((StatusCode::CREATED, Json(party)))
}

pub async fn get_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: PartyId = dto::parse(&id)?;
    let party = load(&services.repos.parties, ctx.user_id(), id.document_id(), "party").await?;
    Ok(Json(party))
}

pub async fn update_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PartyInput>,
) -> Result<impl IntoResponse, ApiError> {
    let id: PartyId = dto::parse(&id)?;
    let mut party = load(&services.repos.parties, ctx.user_id(), id.document_id(), "party").await?;
    let expected = ExpectedVersion::Exact(party.version());
    party.update(&body, Utc::now())?;
    let party = services.repos.parties.update(party, expected).await?;
    Ok(Json(party))
}

pub async fn suspend_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: PartyId = dto::parse(&id)?;
    let mut party = load(&services.repos.parties, ctx.user_id(), id.document_id(), "party").await?;
    let expected = ExpectedVersion::Exact(party.version());
    party.suspend(Utc::now())?;
    let party = services.repos.parties.update(party, expected).await?;
    Ok(Json(party))
}

/// Documents keep a snapshot of the party, so deleting it leaves them intact.
pub async fn delete_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: PartyId = dto::parse(&id)?;
    remove(&services.repos.parties, ctx.user_id(), id.document_id(), "party").await?;
    Ok(StatusCode::NO_CONTENT)
}
