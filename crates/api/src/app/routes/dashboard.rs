use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};

use billforge_reports::Dashboard;

use crate::app::dto::{ApiQuery, ReportQuery};
use crate::app::errors::ApiError;
use crate::app::services::{AppServices, today};
use crate::context::UserContext;

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<UserContext>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let today = today();
    let range = query.range(today)?;
    let loaded = services.books(ctx.user_id()).await?;
    Ok(Json(Dashboard::build(&loaded.books(), range, today)?))
}
