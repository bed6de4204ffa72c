use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;

use billforge_core::{Document, DocumentId, ExpectedVersion};
use billforge_export::inventory_table;
use billforge_gst::LineItem;
use billforge_inventory::{InventoryItem, InventoryItemId, ItemInput, StockReport};

use crate::app::dto::{self, AdjustStockRequest, ApiJson, ApiQuery, ExportQuery, ItemView, ListResponse};
use crate::app::errors::ApiError;
use crate::app::services::{AppServices, load, remove};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/status", get(stock_status))
        .route("/export", get(export_items))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/:id/adjust", post(adjust_stock))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
) -> Result<impl IntoResponse, ApiError> {
    let items = services.repos.items.list(ctx.user_id()).await?;
    let views = items.iter().map(ItemView::from).collect();
    Ok(Json(ListResponse::new(views)).into_response())
}

pub async fn stock_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
) -> Result<impl IntoResponse, ApiError> {
    let items = services.repos.items.list(ctx.user_id()).await?;
    Ok(Json(StockReport::build(&items)))
}

pub async fn export_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = query.format()?;
    let items = services.repos.items.list(ctx.user_id()).await?;
    let body = format.render(&inventory_table(&items))?;
    Ok(dto::export(format, "inventory", body))
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiJson(body): ApiJson<ItemInput>,
) -> Result<Response, ApiError> {
    let item = InventoryItem::create(ctx.user_id(), InventoryItemId::generate(), &body, Utc::now())?;
    let item = services.repos.items.insert(item).await?;
    Ok((StatusCode::CREATED, Json(ItemView::from(&item))).into_response())
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: InventoryItemId = dto::parse(&id)?;
    let item = load(&services.repos.items, ctx.user_id(), id.document_id(), "inventory item").await?;
    Ok(Json(ItemView::from(&item)).into_response())
}

/// Quantity is not editable here; stock changes go through `adjust`.
pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ItemInput>,
) -> Result<Response, ApiError> {
    let id: InventoryItemId = dto::parse(&id)?;
    let mut item = load(&services.repos.items, ctx.user_id(), id.document_id(), "inventory item").await?;
    let expected = ExpectedVersion::Exact(item.version());
    item.update(&body, Utc::now())?;
    let item = services.repos.items.update(item, expected).await?;
    Ok(Json(ItemView::from(&item)).into_response())
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AdjustStockRequest>,
) -> Result<Response, ApiError> {
    let id: InventoryItemId = dto::parse(&id)?;
    let delta = body
        .delta
        .ok_or_else(|| ApiError::validation("missing required fields: delta"))?;
    let mut item = load(&services.repos.items, ctx.user_id(), id.document_id(), "inventory item").await?;
    let expected = ExpectedVersion::Exact(item.version());
    item.adjust_stock(delta, Utc::now())?;
    let item = services.repos.items.update(item, expected).await?;
    tracing::info!(item_id = %id, delta, quantity = item.quantity(), "stock adjusted");
    Ok(Json(ItemView::from(&item)).into_response())
}

/// Items still listed on a sale, purchase or return stay, so those documents
/// can always move their stock back.
pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: InventoryItemId = dto::parse(&id)?;
    let owner = ctx.user_id();
    load(&services.repos.items, owner, id.document_id(), "inventory item").await?;

    let books = services.books(owner).await?;
    let uses = books
        .sales
        .iter()
        .flat_map(|s| s.lines())
        .chain(books.purchases.iter().flat_map(|p| p.lines()))
        .chain(books.sales_returns.iter().flat_map(|r| r.refund_lines()))
        .chain(books.purchase_returns.iter().flat_map(|r| r.returned_lines()))
        .filter(|line| references(line, id.document_id()))
        .count();
    if uses > 0 {
        return Err(ApiError::Invariant(format!(
            "inventory item is used on {uses} document line(s)"
        )));
    }

    remove(&services.repos.items, owner, id.document_id(), "inventory item").await?;
    Ok(StatusCode::NO_CONTENT)
}

fn references(line: &LineItem, item: DocumentId) -> bool {
    line.item_id == Some(item)
}
