//! Request extractors, query parameters and response views.

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use billforge_auth::UserProfile;
use billforge_core::{DomainError, Money};
use billforge_export::ExportFormat;
use billforge_inventory::{InventoryItem, StockStatus};
use billforge_invoicing::{Invoice, InvoiceStatus};
use billforge_reports::{DateRange, Granularity};

use crate::app::errors::ApiError;

// -------------------------
// Extractors
// -------------------------

/// JSON body whose rejections render as `validation_error`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Parse a path or query value; domain parse errors keep their status.
pub fn parse<T>(raw: &str) -> Result<T, ApiError>
where
    T: core::str::FromStr,
    T::Err: Into<ApiError>,
{
    raw.parse().map_err(Into::into)
}

/// Parse an optional query value, treating blanks as absent.
pub fn parse_opt<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: core::str::FromStr,
    T::Err: Into<ApiError>,
{
    raw.map(str::trim).filter(|v| !v.is_empty()).map(parse::<T>).transpose()
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .map_err(|_| ApiError::validation(format!("{field}: invalid date '{v}'; expected YYYY-MM-DD")))
        })
        .transpose()
}

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PartyListQuery {
    pub q: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub status: Option<String>,
    pub customer_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

impl ExportQuery {
    /// CSV unless another format is asked for.
    pub fn format(&self) -> Result<ExportFormat, ApiError> {
        Ok(parse_opt(self.format.as_deref())?.unwrap_or_default())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub granularity: Option<String>,
    pub format: Option<String>,
}

impl ReportQuery {
    /// Defaults to the first of the current month through `today`.
    pub fn range(&self, today: NaiveDate) -> Result<DateRange, ApiError> {
        let to = parse_date("to", self.to.as_deref())?.unwrap_or(today);
        let from = parse_date("from", self.from.as_deref())?.unwrap_or_else(|| month_start(to));
        Ok(DateRange::new(from, to)?)
    }

    pub fn granularity(&self) -> Result<Option<Granularity>, ApiError> {
        parse_opt(self.granularity.as_deref())
    }

    pub fn format(&self) -> Result<ExportFormat, ApiError> {
        Ok(parse_opt(self.format.as_deref())?.unwrap_or_default())
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

// -------------------------
// Request bodies
// -------------------------

/// Status change. The value is parsed by the handler so unknown statuses get
/// the enumerated-values message.
#[derive(Debug, Default, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub status: Option<String>,
}

impl StatusUpdateRequest {
    pub fn parse<T>(&self) -> Result<T, ApiError>
    where
        T: core::str::FromStr<Err = DomainError>,
    {
        let raw = self
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ApiError::validation("missing required fields: status"))?;
        parse(raw)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AdjustStockRequest {
    #[serde(default)]
    pub delta: Option<i64>,
}

// -------------------------
// Response views
// -------------------------

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct ItemView<'a> {
    #[serde(flatten)]
    pub item: &'a InventoryItem,
    pub stock_status: StockStatus,
}

impl<'a> From<&'a InventoryItem> for ItemView<'a> {
    fn from(item: &'a InventoryItem) -> Self {
        Self {
            item,
            stock_status: item.stock_status(),
        }
    }
}

/// Invoice with the status as of today and what is still owed.
#[derive(Debug, Serialize)]
pub struct InvoiceView<'a> {
    #[serde(flatten)]
    pub invoice: &'a Invoice,
    pub effective_status: InvoiceStatus,
    pub outstanding: Money,
}

impl<'a> InvoiceView<'a> {
    pub fn new(invoice: &'a Invoice, today: NaiveDate) -> Self {
        Self {
            invoice,
            effective_status: invoice.effective_status(today),
            outstanding: invoice.outstanding(),
        }
    }
}

/// List envelope: `{"items": [...]}`.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

/// Downloadable file response.
pub fn attachment(content_type: &'static str, file_name: &str, body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        body,
    )
        .into_response()
}

pub fn export(format: ExportFormat, stem: &str, body: Vec<u8>) -> Response {
    attachment(format.content_type(), &format.file_name(stem), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn report_range_defaults_to_month_to_date() {
        let range = ReportQuery::default().range(date(2026, 3, 17)).unwrap();
        assert_eq!(range.from, date(2026, 3, 1));
        assert_eq!(range.to, date(2026, 3, 17));
    }

    #[test]
    fn report_range_rejects_bad_dates() {
        let query = ReportQuery {
            from: Some("17/03/2026".into()),
            ..Default::default()
        };
        assert!(matches!(query.range(date(2026, 3, 17)), Err(ApiError::Validation(_))));

        let inverted = ReportQuery {
            from: Some("2026-03-10".into()),
            to: Some("2026-03-01".into()),
            ..Default::default()
        };
        assert!(matches!(inverted.range(date(2026, 3, 17)), Err(ApiError::Validation(_))));
    }

    #[test]
    fn export_format_defaults_to_csv() {
        assert_eq!(ExportQuery::default().format().unwrap(), ExportFormat::Csv);
        let xlsx = ExportQuery {
            format: Some("XLSX".into()),
        };
        assert_eq!(xlsx.format().unwrap(), ExportFormat::Xlsx);
        let bad = ExportQuery {
            format: Some("docx".into()),
        };
        assert!(matches!(bad.format(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn status_update_only_accepts_enumerated_values() {
        let ok = StatusUpdateRequest {
            status: Some("paid".into()),
        };
        assert_eq!(ok.parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);

        let bad = StatusUpdateRequest {
            status: Some("settled".into()),
        };
        let err = bad.parse::<InvoiceStatus>().unwrap_err();
        assert!(matches!(err, ApiError::Validation(msg) if msg.starts_with("invalid status 'settled'")));

        let missing = StatusUpdateRequest::default();
        assert!(matches!(missing.parse::<InvoiceStatus>(), Err(ApiError::Validation(_))));
    }
}
