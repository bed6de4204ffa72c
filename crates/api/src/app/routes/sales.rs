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
use billforge_export::sales_table;
use billforge_inventory::{inbound, outbound, replace_outbound};
use billforge_parties::PartyKind;
use billforge_sales::{
    Sale, SaleContext, SaleId, SaleInput, SalesReturn, SalesReturnId, SalesReturnInput, SalesReturnStatus,
    ensure_no_open_returns,
};

use crate::app::dto::{self, ApiJson, ApiQuery, ExportQuery, ListResponse, StatusUpdateRequest};
use crate::app::errors::ApiError;
use crate::app::services::{AppServices, load, today};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/export", get(export_sales))
        .route("/returns", get(list_returns).post(create_return))
        .route("/returns/:id", get(get_return))
        .route("/returns/:id/status", put(update_return_status))
        .route("/:id", get(get_sale).put(update_sale).delete(delete_sale))
}

// -------------------------
// Sales
// -------------------------

pub async fn list_sales(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
) -> Result<impl IntoResponse, ApiError> {
    let sales = services.repos.sales.list(ctx.user_id()).await?;
    Ok(Json(ListResponse::new(sales)))
}

pub async fn export_sales(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = query.format()?;
    let sales = services.repos.sales.list(ctx.user_id()).await?;
    let body = format.render(&sales_table(&sales))?;
    Ok(dto::export(format, "sales", body))
}

/// The invoice a sale is billed on must exist.
async fn check_invoice(services: &AppServices, owner: UserId, input: &SaleInput) -> Result<(), ApiError> {
    if let Some(invoice_id) = input.invoice_id {
        if services
            .repos
            .invoices
            .get(owner, invoice_id.document_id())
            .await?
            .is_none()
        {
            return Err(ApiError::validation(format!("unknown invoice {invoice_id}")));
        }
    }
    Ok(())
}

pub async fn create_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiJson(body): ApiJson<SaleInput>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = ctx.user_id();
    let seller = services.account(&ctx).await?;
    let customer = services
        .referenced_party(owner, body.customer_id, PartyKind::Customer)
        .await?;
    check_invoice(&services, owner, &body).await?;

    let now = Utc::now();
    let sale = Sale::create(
        owner,
        SaleId::generate(),
        &body,
        SaleContext {
            customer: customer.as_ref(),
            seller_state: seller.business.seller_state(),
            today: today(),
            now,
        },
    )?;
    let moves = outbound(sale.lines());
    let sale = services
        .with_stock(owner, &moves, now, services.repos.sales.insert(sale))
        .await?;
    tracing::info!(sale_id = %sale.id_typed(), total = %sale.totals().total, "sale recorded");
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let sale = find_sale(&services, ctx.user_id(), &id).await?;
    Ok(Json(sale))
}

pub async fn update_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SaleInput>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = ctx.user_id();
    let mut sale = find_sale(&services, owner, &id).await?;
    ExpectedVersion::from_client(body.version).check(sale.version())?;
    let returns = services.repos.sales_returns.list(owner).await?;
    ensure_no_open_returns(sale.id_typed(), &returns)?;

    let seller = services.account(&ctx).await?;
    let customer = services
        .referenced_party(owner, body.customer_id, PartyKind::Customer)
        .await?;
    check_invoice(&services, owner, &body).await?;

    let now = Utc::now();
    let expected = ExpectedVersion::Exact(sale.version());
    let old_lines = sale.lines().to_vec();
    sale.update(
        &body,
        SaleContext {
            customer: customer.as_ref(),
            seller_state: seller.business.seller_state(),
            today: today(),
            now,
        },
    )?;
    let moves = replace_outbound(&old_lines, sale.lines());
    let sale = services
        .with_stock(owner, &moves, now, services.repos.sales.update(sale, expected))
        .await?;
    Ok(Json(sale))
}

/// Deleting a sale puts its stock back.
pub async fn delete_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let owner = ctx.user_id();
    let sale = find_sale(&services, owner, &id).await?;
    let returns = services.repos.sales_returns.list(owner).await?;
    ensure_no_open_returns(sale.id_typed(), &returns)?;

    let moves = inbound(sale.lines());
    services
        .with_stock(
            owner,
            &moves,
            Utc::now(),
            services.repos.sales.delete(owner, sale.document_id()),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_sale(services: &AppServices, owner: UserId, raw_id: &str) -> Result<Sale, ApiError> {
    let id: SaleId = dto::parse(raw_id)?;
    load(&services.repos.sales, owner, id.document_id(), "sale").await
}

// -------------------------
// Sales returns
// -------------------------

pub async fn list_returns(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
) -> Result<impl IntoResponse, ApiError> {
    let returns = services.repos.sales_returns.list(ctx.user_id()).await?;
    Ok(Json(ListResponse::new(returns)))
}

/// New returns start `pending`; stock comes back on approval.
pub async fn create_return(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiJson(body): ApiJson<SalesReturnInput>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = ctx.user_id();
    let sale_id = body
        .sale_id
        .ok_or_else(|| ApiError::validation("missing required fields: sale_id"))?;
    let sale = services
        .repos
        .sales
        .get(owner, sale_id.document_id())
        .await?
        .ok_or_else(|| ApiError::validation(format!("unknown sale {sale_id}")))?;
    let existing = services.repos.sales_returns.list(owner).await?;

    let sales_return = SalesReturn::create(
        owner,
        SalesReturnId::generate(),
        &body,
        &sale,
        &existing,
        today(),
        Utc::now(),
    )?;
    let sales_return = services.repos.sales_returns.insert(sales_return).await?;
    tracing::info!(return_id = %sales_return.id_typed(), %sale_id, "sales return recorded");
    Ok((StatusCode::CREATED, Json(sales_return)))
}

pub async fn get_return(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: SalesReturnId = dto::parse(&id)?;
    let sales_return = load(&services.repos.sales_returns, ctx.user_id(), id.document_id(), "sales return").await?;
    Ok(Json(sales_return))
}

pub async fn update_return_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let to: SalesReturnStatus = body.parse()?;
    let owner = ctx.user_id();
    let id: SalesReturnId = dto::parse(&id)?;
    let mut sales_return = load(&services.repos.sales_returns, owner, id.document_id(), "sales return").await?;

    let now = Utc::now();
    let expected = ExpectedVersion::Exact(sales_return.version());
    let restock = !sales_return.status().is_accepted() && to.is_accepted();
    sales_return.set_status(to, now)?;

    let moves = if restock {
        inbound(sales_return.refund_lines())
    } else {
        Vec::new()
    };
    let sales_return = services
        .with_stock(
            owner,
            &moves,
            now,
            services.repos.sales_returns.update(sales_return, expected),
        )
        .await?;
    Ok(Json(sales_return))
}
