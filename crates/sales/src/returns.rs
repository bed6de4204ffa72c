//! Sales returns.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use billforge_core::validation::normalize_optional;
use billforge_core::{Document, DocumentId, DomainError, DomainResult, FieldErrors, Timestamps, UserId};
use billforge_gst::{DocumentTotals, LineItem, ReturnLine, SupplyType, resolve_return_lines, returned_quantities};

use crate::sale::{Sale, SaleId};

billforge_core::document_id!(
    /// Sales return identifier.
    SalesReturnId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesReturnStatus {
    Pending,
    Approved,
    Rejected,
    Refunded,
}

impl SalesReturnStatus {
    pub const ALL: [SalesReturnStatus; 4] = [
        SalesReturnStatus::Pending,
        SalesReturnStatus::Approved,
        SalesReturnStatus::Rejected,
        SalesReturnStatus::Refunded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SalesReturnStatus::Pending => "pending",
            SalesReturnStatus::Approved => "approved",
            SalesReturnStatus::Rejected => "rejected",
            SalesReturnStatus::Refunded => "refunded",
        }
    }

    pub fn can_transition_to(self, to: SalesReturnStatus) -> bool {
        use SalesReturnStatus::*;
        matches!((self, to), (Pending, Approved | Rejected) | (Approved, Refunded))
    }

    /// Approved and refunded returns reduce output tax.
    pub fn is_accepted(self) -> bool {
        matches!(self, SalesReturnStatus::Approved | SalesReturnStatus::Refunded)
    }
}

impl core::fmt::Display for SalesReturnStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for SalesReturnStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SalesReturnStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "invalid status '{s}'; expected one of pending, approved, rejected, refunded"
                ))
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReturnInput {
    #[serde(default)]
    pub sale_id: Option<SaleId>,
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
    #[serde(default)]
    pub lines: Vec<ReturnLine>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Document: SalesReturn.
///
/// `refund_lines` are the sale's lines at the returned quantities; `totals`
/// is the refund owed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReturn {
    id: SalesReturnId,
    owner: UserId,
    sale_id: SaleId,
    return_date: NaiveDate,
    lines: Vec<ReturnLine>,
    refund_lines: Vec<LineItem>,
    supply_type: SupplyType,
    reason: Option<String>,
    status: SalesReturnStatus,
    totals: DocumentTotals,
    version: u64,
    #[serde(flatten)]
    timestamps: Timestamps,
}

impl SalesReturn {
    /// `existing` is every return recorded so far; only those of the same sale
    /// that were not rejected count against the sold quantity.
    pub fn create(
        owner: UserId,
        id: SalesReturnId,
        input: &SalesReturnInput,
        sale: &Sale,
        existing: &[SalesReturn],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();
        errors.require("sale_id", input.sale_id.as_ref());
        if input.lines.is_empty() {
            errors.require::<ReturnLine>("lines", None);
        }
        let return_date = input.return_date.unwrap_or(today);
        if return_date < sale.sale_date() {
            errors.invalid("return_date", "must not be before the sale date");
        }
        errors.finish()?;
        if input.sale_id != Some(sale.id_typed()) {
            return Err(DomainError::validation("sale_id does not match the referenced sale"));
        }

        let already = returned_quantities(
            existing
                .iter()
                .filter(|r| r.sale_id == sale.id_typed() && r.status != SalesReturnStatus::Rejected)
                .flat_map(|r| r.lines.iter()),
        );
        let refund_lines = resolve_return_lines(sale.lines(), &already, &input.lines)?;
        let totals = DocumentTotals::compute(&refund_lines, sale.supply_type(), false)?;

        Ok(Self {
            id,
            owner,
            sale_id: sale.id_typed(),
            return_date,
            lines: input.lines.clone(),
            refund_lines,
            supply_type: sale.supply_type(),
            reason: normalize_optional(input.reason.clone()),
            status: SalesReturnStatus::Pending,
            totals,
            version: 0,
            timestamps: Timestamps::new(now),
        })
    }

    pub fn set_status(&mut self, to: SalesReturnStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if to == self.status {
            return Err(DomainError::conflict(format!("return is already {to}")));
        }
        if !self.status.can_transition_to(to) {
            return Err(DomainError::invariant(format!(
                "cannot change return status from {} to {to}",
                self.status
            )));
        }
        self.status = to;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn id_typed(&self) -> SalesReturnId {
        self.id
    }

    pub fn sale_id(&self) -> SaleId {
        self.sale_id
    }

    pub fn return_date(&self) -> NaiveDate {
        self.return_date
    }

    pub fn lines(&self) -> &[ReturnLine] {
        &self.lines
    }

    pub fn refund_lines(&self) -> &[LineItem] {
        &self.refund_lines
    }

    pub fn supply_type(&self) -> SupplyType {
        self.supply_type
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn status(&self) -> SalesReturnStatus {
        self.status
    }

    pub fn totals(&self) -> &DocumentTotals {
        &self.totals
    }

    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
}

impl Document for SalesReturn {
    const COLLECTION: &'static str = "sales_returns";

    fn document_id(&self) -> DocumentId {
        self.id.0
    }

    fn owner(&self) -> UserId {
        self.owner
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// A sale with live returns cannot be edited or deleted.
pub fn ensure_no_open_returns(sale: SaleId, returns: &[SalesReturn]) -> DomainResult<()> {
    let open = returns
        .iter()
        .filter(|r| r.sale_id == sale && r.status != SalesReturnStatus::Rejected)
        .count();
    if open == 0 {
        Ok(())
    } else {
        Err(DomainError::invariant(format!("sale has {open} return(s) recorded against it")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::{SaleContext, SaleInput};
    use billforge_core::Money;
    use billforge_gst::GstRate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn sale() -> Sale {
        let line = LineItem {
            description: "Kettle".into(),
            item_id: None,
            hsn: None,
            quantity: 3,
            unit: None,
            unit_price: Money::from_rupees(1_000),
            discount_percent: billforge_core::Percent::from_basis_points(1_000),
            gst_rate: GstRate::from_percent(18.0).unwrap(),
        };
        let ctx = SaleContext { customer: None, seller_state: None, today: today(), now: Utc::now() };
        Sale::create(UserId::new(), SaleId::generate(), &SaleInput { lines: vec![line], ..Default::default() }, ctx)
            .unwrap()
    }

    fn request(sale: &Sale, quantity: i64) -> SalesReturnInput {
        SalesReturnInput {
            sale_id: Some(sale.id_typed()),
            lines: vec![ReturnLine { line_no: 1, quantity }],
            reason: Some("damaged".into()),
            ..Default::default()
        }
    }

    fn create(sale: &Sale, quantity: i64, existing: &[SalesReturn]) -> DomainResult<SalesReturn> {
        SalesReturn::create(UserId::new(), SalesReturnId::generate(), &request(sale, quantity), sale, existing, today(), Utc::now())
    }

    #[test]
    fn refund_uses_original_price_discount_and_rate() {
        let sale = sale();
        let ret = create(&sale, 1, &[]).unwrap();
        assert_eq!(ret.status(), SalesReturnStatus::Pending);
        assert_eq!(ret.totals().subtotal, Money::from_rupees(900));
        assert_eq!(ret.totals().total, Money::from_rupees(1_062));
    }

    #[test]
    fn rejected_returns_free_their_quantity() {
        let sale = sale();
        let mut first = create(&sale, 2, &[]).unwrap();
        assert!(create(&sale, 2, std::slice::from_ref(&first)).is_err());

        first.set_status(SalesReturnStatus::Rejected, Utc::now()).unwrap();
        assert!(create(&sale, 3, &[first]).is_ok());
    }

    #[test]
    fn status_flow() {
        let sale = sale();
        let mut ret = create(&sale, 1, &[]).unwrap();
        assert!(ret.set_status(SalesReturnStatus::Refunded, Utc::now()).is_err());
        ret.set_status(SalesReturnStatus::Approved, Utc::now()).unwrap();
        ret.set_status(SalesReturnStatus::Refunded, Utc::now()).unwrap();
        assert!(matches!(
            ret.set_status(SalesReturnStatus::Refunded, Utc::now()),
            Err(DomainError::Conflict(_))
        ));
        assert!("shipped".parse::<SalesReturnStatus>().is_err());
    }

    #[test]
    fn open_returns_lock_the_sale() {
        let sale = sale();
        let ret = create(&sale, 1, &[]).unwrap();
        assert!(ensure_no_open_returns(sale.id_typed(), &[ret]).is_err());
        assert!(ensure_no_open_returns(sale.id_typed(), &[]).is_ok());
    }

    #[test]
    fn missing_sale_and_lines() {
        let sale = sale();
        let err = SalesReturn::create(
            UserId::new(),
            SalesReturnId::generate(),
            &SalesReturnInput::default(),
            &sale,
            &[],
            today(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::validation("missing required fields: sale_id, lines"));
    }
}
