use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use chrono::Utc;

use billforge_core::{Document, ExpectedVersion, UserId};
use billforge_export::purchases_table;
use billforge_inventory::{inbound, outbound, replace_inbound};
use billforge_parties::PartyKind;
use billforge_purchasing::{
    Purchase, PurchaseContext, PurchaseId, PurchaseInput, PurchaseReturn, PurchaseReturnId, PurchaseReturnInput,
    PurchaseReturnStatus, ensure_no_open_returns,
};

use crate::app::dto::{self, ApiJson, ApiQuery, ExportQuery, ListResponse, StatusUpdateRequest};
use crate::app::errors::ApiError;
use crate::app::services::{AppServices, load, today};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_purchases).post(create_purchase))
        .route("/export", get(export_purchases))
        .route("/returns", get(list_returns).post(create_return))
        .route("/returns/:id", get(get_return))
        .route("/returns/:id/status", put(update_return_status))
        .route("/:id", get(get_purchase).put(update_purchase).delete(delete_purchase))
}

// -------------------------
// Purchases
// -------------------------

pub async fn list_purchases(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
) -> Result<impl IntoResponse, ApiError> {
    let purchases = services.repos.purchases.list(ctx.user_id()).await?;
    Ok(Json(ListResponse::new(purchases)))
}

pub async fn export_purchases(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = query.format()?;
    let purchases = services.repos.purchases.list(ctx.user_id()).await?;
    let body = format.render(&purchases_table(&purchases))?;
    Ok(dto::export(format, "purchases", body))
}

pub async fn create_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiJson(body): ApiJson<PurchaseInput>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = ctx.user_id();
    let buyer = services.account(&ctx).await?;
    let supplier = services
        .referenced_party(owner, body.supplier_id, PartyKind::Supplier)
        .await?;

    let now = Utc::now();
    let purchase = Purchase::create(
        owner,
        PurchaseId::generate(),
        &body,
        PurchaseContext {
            supplier: supplier.as_ref(),
            buyer_state: buyer.business.seller_state(),
            today: today(),
            now,
        },
    )?;
    let moves = inbound(purchase.lines());
    let purchase = services
        .with_stock(owner, &moves, now, services.repos.purchases.insert(purchase))
        .await?;
    tracing::info!(purchase_id = %purchase.id_typed(), total = %purchase.totals().total, "purchase recorded");
    Ok((StatusCode::CREATED, Json(purchase)))
}

pub async fn get_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let purchase = find_purchase(&services, ctx.user_id(), &id).await?;
    Ok(Json(purchase))
}

pub async fn update_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PurchaseInput>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = ctx.user_id();
    let mut purchase = find_purchase(&services, owner, &id).await?;
    ExpectedVersion::from_client(body.version).check(purchase.version())?;
    let returns = services.repos.purchase_returns.list(owner).await?;
    ensure_no_open_returns(purchase.id_typed(), &returns)?;

    let buyer = services.account(&ctx).await?;
    let supplier = services
        .referenced_party(owner, body.supplier_id, PartyKind::Supplier)
        .await?;

    let now = Utc::now();
    let expected = ExpectedVersion::Exact(purchase.version());
    let old_lines = purchase.lines().to_vec();
    purchase.update(
        &body,
        PurchaseContext {
            supplier: supplier.as_ref(),
            buyer_state: buyer.business.seller_state(),
            today: today(),
            now,
        },
    )?;
    let moves = replace_inbound(&old_lines, purchase.lines());
    let purchase = services
        .with_stock(owner, &moves, now, services.repos.purchases.update(purchase, expected))
        .await?;
    Ok(Json(purchase))
}

/// Deleting a purchase takes its stock back out, which fails if it was sold.
pub async fn delete_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let owner = ctx.user_id();
    let purchase = find_purchase(&services, owner, &id).await?;
    let returns = services.repos.purchase_returns.list(owner).await?;
    ensure_no_open_returns(purchase.id_typed(), &returns)?;

    let moves = outbound(purchase.lines());
    services
        .with_stock(
            owner,
            &moves,
            Utc::now(),
            services.repos.purchases.delete(owner, purchase.document_id()),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_purchase(services: &AppServices, owner: UserId, raw_id: &str) -> Result<Purchase, ApiError> {
    let id: PurchaseId = dto::parse(raw_id)?;
    load(&services.repos.purchases, owner, id.document_id(), "purchase").await
}

// -------------------------
// Purchase returns
// -------------------------

pub async fn list_returns(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
) -> Result<impl IntoResponse, ApiError> {
    let returns = services.repos.purchase_returns.list(ctx.user_id()).await?;
    Ok(Json(ListResponse::new(returns)))
}

/// Goods leave as soon as the return is recorded.
pub async fn create_return(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiJson(body): ApiJson<PurchaseReturnInput>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = ctx.user_id();
    let purchase_id = body
        .purchase_id
        .ok_or_else(|| ApiError::validation("missing required fields: purchase_id"))?;
    let purchase = services
        .repos
        .purchases
        .get(owner, purchase_id.document_id())
        .await?
        .ok_or_else(|| ApiError::validation(format!("unknown purchase {purchase_id}")))?;
    let existing = services.repos.purchase_returns.list(owner).await?;

    let now = Utc::now();
    let purchase_return = PurchaseReturn::create(
        owner,
        PurchaseReturnId::generate(),
        &body,
        &purchase,
        &existing,
        today(),
        now,
    )?;
    let moves = outbound(purchase_return.returned_lines());
    let purchase_return = services
        .with_stock(owner, &moves, now, services.repos.purchase_returns.insert(purchase_return))
        .await?;
    tracing::info!(return_id = %purchase_return.id_typed(), %purchase_id, "purchase return recorded");
    Ok((StatusCode::CREATED, Json(purchase_return)))
}

pub async fn get_return(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: PurchaseReturnId = dto::parse(&id)?;
    let purchase_return = load(
        &services.repos.purchase_returns,
        ctx.user_id(),
        id.document_id(),
        "purchase return",
    )
    .await?;
    Ok(Json(purchase_return))
}

/// Cancelling a return brings its goods back into stock.
pub async fn update_return_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let to: PurchaseReturnStatus = body.parse()?;
    let owner = ctx.user_id();
    let id: PurchaseReturnId = dto::parse(&id)?;
    let mut purchase_return = load(&services.repos.purchase_returns, owner, id.document_id(), "purchase return").await?;

    let now = Utc::now();
    let expected = ExpectedVersion::Exact(purchase_return.version());
    purchase_return.set_status(to, now)?;

    let moves = if purchase_return.counts() {
        Vec::new()
    } else {
        inbound(purchase_return.returned_lines())
    };
    let purchase_return = services
        .with_stock(
            owner,
            &moves,
            now,
            services.repos.purchase_returns.update(purchase_return, expected),
        )
        .await?;
    Ok(Json(purchase_return))
}
