use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Utc;

use billforge_auth::User;
use billforge_core::{Document, ExpectedVersion, UserId};
use billforge_export::{ExportFormat, SellerDetails, invoices_table, render_invoice};
use billforge_invoicing::{
    Invoice, InvoiceContext, InvoiceFilter, InvoiceId, InvoiceInput, InvoiceStatus, PaymentInput,
    next_invoice_number, normalize_invoice_number,
};
use billforge_parties::PartyKind;

use crate::app::dto::{self, ApiJson, ApiQuery, ExportQuery, InvoiceListQuery, InvoiceView, ListResponse, StatusUpdateRequest};
use crate::app::errors::ApiError;
use crate::app::services::{AppServices, load, remove, today};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route("/export", get(export_invoices))
        .route("/:id", get(get_invoice).put(update_invoice).delete(delete_invoice))
        .route("/:id/status", put(update_status))
        .route("/:id/payments", post(record_payment))
        .route("/:id/pdf", get(invoice_pdf))
}

fn view(invoice: &Invoice) -> Response {
    Json(InvoiceView::new(invoice, today())).into_response()
}

/// Client-supplied numbers must be unique per account; otherwise the next
/// `INV-nnnn` is assigned.
fn choose_number(requested: Option<&str>, existing: &[Invoice], current: Option<InvoiceId>) -> Result<String, ApiError> {
    let others: Vec<&Invoice> = existing
        .iter()
        .filter(|inv| Some(inv.id_typed()) != current)
        .collect();
    match requested.filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => {
            let number = normalize_invoice_number(raw)?;
            if others
                .iter()
                .any(|inv| inv.invoice_number().eq_ignore_ascii_case(&number))
            {
                return Err(ApiError::Conflict(format!("invoice number {number} is already in use")));
            }
            Ok(number)
        }
        None => next_invoice_number(others.iter().map(|inv| inv.invoice_number())).map_err(ApiError::from),
    }
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiQuery(query): ApiQuery<InvoiceListQuery>,
) -> Result<Response, ApiError> {
    let filter = InvoiceFilter {
        status: dto::parse_opt(query.status.as_deref())?,
        customer_id: dto::parse_opt(query.customer_id.as_deref())?,
    };
    let today = today();
    let invoices = services.repos.invoices.list(ctx.user_id()).await?;
    let views = invoices
        .iter()
        .filter(|inv| filter.matches(inv, today))
        .map(|inv| InvoiceView::new(inv, today))
        .collect();
    Ok(Json(ListResponse::new(views)).into_response())
}

pub async fn export_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = query.format()?;
    let invoices = services.repos.invoices.list(ctx.user_id()).await?;
    let body = format.render(&invoices_table(&invoices, today()))?;
    Ok(dto::export(format, "invoices", body))
}

pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiJson(body): ApiJson<InvoiceInput>,
) -> Result<Response, ApiError> {
    let owner = ctx.user_id();
    let seller = services.account(&ctx).await?;
    let customer = services
        .referenced_party(owner, body.customer_id, PartyKind::Customer)
        .await?;
    let existing = services.repos.invoices.list(owner).await?;
    let number = choose_number(body.invoice_number.as_deref(), &existing, None)?;

    let now = Utc::now();
    let invoice = Invoice::create(
        owner,
        InvoiceId::generate(),
        number,
        &body,
        InvoiceContext {
            customer: customer.as_ref(),
            seller_state: seller.business.seller_state(),
            today: today(),
            now,
        },
    )?;
    let invoice = services.repos.invoices.insert(invoice).await?;
    tracing::info!(invoice_id = %invoice.id_typed(), number = invoice.invoice_number(), "invoice created");

    let mut response = view(&invoice);
    *response.status_mut() = StatusCode::CREATED;
    Ok(response)
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let invoice = find(&services, ctx.user_id(), &id).await?;
    Ok(view(&invoice))
}

pub async fn update_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<InvoiceInput>,
) -> Result<Response, ApiError> {
    let owner = ctx.user_id();
    let mut invoice = find(&services, owner, &id).await?;
    ExpectedVersion::from_client(body.version).check(invoice.version())?;

    let seller = services.account(&ctx).await?;
    let customer = services
        .referenced_party(owner, body.customer_id, PartyKind::Customer)
        .await?;
    let number = match body.invoice_number.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            let existing = services.repos.invoices.list(owner).await?;
            choose_number(body.invoice_number.as_deref(), &existing, Some(invoice.id_typed()))?
        }
        _ => invoice.invoice_number().to_string(),
    };

    let expected = ExpectedVersion::Exact(invoice.version());
    invoice.update(
        number,
        &body,
        InvoiceContext {
            customer: customer.as_ref(),
            seller_state: seller.business.seller_state(),
            today: today(),
            now: Utc::now(),
        },
    )?;
    let invoice = services.repos.invoices.update(invoice, expected).await?;
    Ok(view(&invoice))
}

/// Only drafts and cancelled invoices can be deleted, and only when no sale
/// is billed on them.
pub async fn delete_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let owner = ctx.user_id();
    let invoice = find(&services, owner, &id).await?;
    invoice.ensure_deletable()?;

    let linked = services
        .repos
        .sales
        .list(owner)
        .await?
        .iter()
        .filter(|sale| sale.invoice_id() == Some(invoice.id_typed()))
        .count();
    if linked > 0 {
        return Err(ApiError::Invariant(format!("invoice is linked to {linked} sale(s)")));
    }

    remove(&services.repos.invoices, owner, invoice.document_id(), "invoice").await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdateRequest>,
) -> Result<Response, ApiError> {
    let to: InvoiceStatus = body.parse()?;
    let mut invoice = find(&services, ctx.user_id(), &id).await?;
    let expected = ExpectedVersion::Exact(invoice.version());
    let from = invoice.status();
    invoice.set_status(to, today(), Utc::now())?;
    let invoice = services.repos.invoices.update(invoice, expected).await?;
    tracing::info!(invoice_id = %invoice.id_typed(), %from, %to, "invoice status changed");
    Ok(view(&invoice))
}

pub async fn record_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PaymentInput>,
) -> Result<Response, ApiError> {
    let mut invoice = find(&services, ctx.user_id(), &id).await?;
    let expected = ExpectedVersion::Exact(invoice.version());
    invoice.record_payment(&body, today(), Utc::now())?;
    let invoice = services.repos.invoices.update(invoice, expected).await?;

    let mut response = view(&invoice);
    *response.status_mut() = StatusCode::CREATED;
    Ok(response)
}

pub async fn invoice_pdf(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let invoice = find(&services, ctx.user_id(), &id).await?;
    let seller = services.account(&ctx).await?;
    let body = render_invoice(&seller_details(&seller), &invoice, today())?;
    let stem = format!("invoice-{}", invoice.invoice_number().replace('/', "-"));
    Ok(dto::export(ExportFormat::Pdf, &stem, body))
}

fn seller_details(user: &User) -> SellerDetails {
    let business = &user.business;
    SellerDetails {
        name: business.display_name(&user.name).to_string(),
        gstin: business.gstin.as_ref().map(|g| g.as_str().to_string()),
        address: business.address.clone(),
        phone: business.phone.clone(),
        email: Some(user.email.clone()),
    }
}

async fn find(services: &AppServices, owner: UserId, raw_id: &str) -> Result<Invoice, ApiError> {
    let id: InvoiceId = dto::parse(raw_id)?;
    load(&services.repos.invoices, owner, id.document_id(), "invoice").await
}
