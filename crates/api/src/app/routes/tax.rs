use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    response::{IntoResponse, Response},
    routing::get,
};

use billforge_export::{tax_summary_table, tax_timeseries_table};
use billforge_reports::{TaxSummary, TaxTimeseries};

use crate::app::dto::{self, ApiQuery, ReportQuery};
use crate::app::errors::ApiError;
use crate::app::services::{AppServices, today};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/summary", get(summary))
        .route("/timeseries", get(timeseries))
        .route("/export", get(export))
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let range = query.range(today())?;
    let loaded = services.books(ctx.user_id()).await?;
    Ok(Json(TaxSummary::build(&loaded.books(), range)?))
}

pub async fn timeseries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let range = query.range(today())?;
    let granularity = query.granularity()?.unwrap_or_default();
    let loaded = services.books(ctx.user_id()).await?;
    Ok(Json(TaxTimeseries::build(&loaded.books(), range, granularity)?))
}

/// The timeseries when `granularity` is given, the summary otherwise.
pub async fn export(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<Response, ApiError> {
    let format = query.format()?;
    let range = query.range(today())?;
    let granularity = query.granularity()?;
    let loaded = services.books(ctx.user_id()).await?;
    let books = loaded.books();

    let (table, stem) = match granularity {
        Some(granularity) => (
            tax_timeseries_table(&TaxTimeseries::build(&books, range, granularity)?),
            format!("tax-{}-{}-{}", granularity.as_str(), range.from, range.to),
        ),
        None => (
            tax_summary_table(&TaxSummary::build(&books, range)?),
            format!("tax-summary-{}-{}", range.from, range.to),
        ),
    };
    let body = format.render(&table)?;
    Ok(dto::export(format, &stem, body))
}
