//! Returns to suppliers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use billforge_core::validation::normalize_optional;
use billforge_core::{Document, DocumentId, DomainError, DomainResult, FieldErrors, Timestamps, UserId};
use billforge_gst::{DocumentTotals, LineItem, ReturnLine, SupplyType, resolve_return_lines, returned_quantities};

use crate::purchase::{Purchase, PurchaseId};

billforge_core::document_id!(
    /// Purchase return identifier.
    PurchaseReturnId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseReturnStatus {
    Pending,
    Completed,
    Cancelled,
}

impl PurchaseReturnStatus {
    pub const ALL: [PurchaseReturnStatus; 3] = [
        PurchaseReturnStatus::Pending,
        PurchaseReturnStatus::Completed,
        PurchaseReturnStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseReturnStatus::Pending => "pending",
            PurchaseReturnStatus::Completed => "completed",
            PurchaseReturnStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(self, to: PurchaseReturnStatus) -> bool {
        self == PurchaseReturnStatus::Pending && to != PurchaseReturnStatus::Pending
    }
}

impl core::fmt::Display for PurchaseReturnStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PurchaseReturnStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PurchaseReturnStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "invalid status '{s}'; expected one of pending, completed, cancelled"
                ))
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReturnInput {
    #[serde(default)]
    pub purchase_id: Option<PurchaseId>,
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
    #[serde(default)]
    pub lines: Vec<ReturnLine>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Document: PurchaseReturn. Stock leaves when the return is created and
/// comes back if it is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReturn {
    id: PurchaseReturnId,
    owner: UserId,
    purchase_id: PurchaseId,
    return_date: NaiveDate,
    lines: Vec<ReturnLine>,
    returned_lines: Vec<LineItem>,
    supply_type: SupplyType,
    reason: Option<String>,
    status: PurchaseReturnStatus,
    totals: DocumentTotals,
    version: u64,
    #[serde(flatten)]
    timestamps: Timestamps,
}

impl PurchaseReturn {
    pub fn create(
        owner: UserId,
        id: PurchaseReturnId,
        input: &PurchaseReturnInput,
        purchase: &Purchase,
        existing: &[PurchaseReturn],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();
        errors.require("purchase_id", input.purchase_id.as_ref());
        if input.lines.is_empty() {
            errors.require::<ReturnLine>("lines", None);
        }
        let return_date = input.return_date.unwrap_or(today);
        if return_date < purchase.bill_date() {
            errors.invalid("return_date", "must not be before the bill date");
        }
        errors.finish()?;
        if input.purchase_id != Some(purchase.id_typed()) {
            return Err(DomainError::validation("purchase_id does not match the referenced purchase"));
        }

        let already = returned_quantities(
            existing
                .iter()
                .filter(|r| r.purchase_id == purchase.id_typed() && r.counts())
                .flat_map(|r| r.lines.iter()),
        );
        let returned_lines = resolve_return_lines(purchase.lines(), &already, &input.lines)?;
        let totals = DocumentTotals::compute(&returned_lines, purchase.supply_type(), false)?;

        Ok(Self {
            id,
            owner,
            purchase_id: purchase.id_typed(),
            return_date,
            lines: input.lines.clone(),
            returned_lines,
            supply_type: purchase.supply_type(),
            reason: normalize_optional(input.reason.clone()),
            status: PurchaseReturnStatus::Pending,
            totals,
            version: 0,
            timestamps: Timestamps::new(now),
        })
    }

    pub fn set_status(&mut self, to: PurchaseReturnStatus, now: DateTime<Utc>) -> DomainResult<()> {
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

    /// Non-cancelled returns count against the purchased quantity and input tax.
    pub fn counts(&self) -> bool {
        self.status != PurchaseReturnStatus::Cancelled
    }

    pub fn id_typed(&self) -> PurchaseReturnId {
        self.id
    }

    pub fn purchase_id(&self) -> PurchaseId {
        self.purchase_id
    }

    pub fn return_date(&self) -> NaiveDate {
        self.return_date
    }

    pub fn lines(&self) -> &[ReturnLine] {
        &self.lines
    }

    pub fn returned_lines(&self) -> &[LineItem] {
        &self.returned_lines
    }

    pub fn supply_type(&self) -> SupplyType {
        self.supply_type
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn status(&self) -> PurchaseReturnStatus {
        self.status
    }

    pub fn totals(&self) -> &DocumentTotals {
        &self.totals
    }

    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
}

impl Document for PurchaseReturn {
    const COLLECTION: &'static str = "purchase_returns";

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

/// A purchase with live returns cannot be edited or deleted.
pub fn ensure_no_open_returns(purchase: PurchaseId, returns: &[PurchaseReturn]) -> DomainResult<()> {
    let open = returns.iter().filter(|r| r.purchase_id == purchase && r.counts()).count();
    if open == 0 {
        Ok(())
    } else {
        Err(DomainError::invariant(format!(
            "purchase has {open} return(s) recorded against it"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purchase::{PurchaseContext, PurchaseInput};
    use billforge_core::Money;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 5).unwrap()
    }

    fn purchase() -> Purchase {
        let input = PurchaseInput {
            supplier_name: Some("Metro".into()),
            bill_date: Some(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()),
            lines: vec![LineItem {
                description: "Toner".into(),
                item_id: None,
                hsn: None,
                quantity: 4,
                unit: None,
                unit_price: Money::from_rupees(2_000),
                discount_percent: Default::default(),
                gst_rate: billforge_gst::GstRate::from_percent(28.0).unwrap(),
            }],
            ..Default::default()
        };
        let ctx = PurchaseContext { supplier: None, buyer_state: None, today: today(), now: Utc::now() };
        Purchase::create(UserId::new(), PurchaseId::generate(), &input, ctx).unwrap()
    }

    fn create(purchase: &Purchase, quantity: i64, existing: &[PurchaseReturn]) -> DomainResult<PurchaseReturn> {
        let input = PurchaseReturnInput {
            purchase_id: Some(purchase.id_typed()),
            lines: vec![ReturnLine { line_no: 1, quantity }],
            ..Default::default()
        };
        PurchaseReturn::create(UserId::new(), PurchaseReturnId::generate(), &input, purchase, existing, today(), Utc::now())
    }

    #[test]
    fn totals_follow_the_purchase_line() {
        let purchase = purchase();
        let ret = create(&purchase, 1, &[]).unwrap();
        assert_eq!(ret.totals().subtotal, Money::from_rupees(2_000));
        assert_eq!(ret.totals().total_tax, Money::from_rupees(560));
    }

    #[test]
    fn cannot_return_more_than_purchased() {
        let purchase = purchase();
        let mut first = create(&purchase, 3, &[]).unwrap();
        let err = create(&purchase, 2, std::slice::from_ref(&first)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        first.set_status(PurchaseReturnStatus::Cancelled, Utc::now()).unwrap();
        assert!(create(&purchase, 4, &[first]).is_ok());
    }

    #[test]
    fn completed_and_cancelled_are_terminal() {
        let purchase = purchase();
        let mut ret = create(&purchase, 1, &[]).unwrap();
        ret.set_status(PurchaseReturnStatus::Completed, Utc::now()).unwrap();
        assert!(ret.set_status(PurchaseReturnStatus::Cancelled, Utc::now()).is_err());
        assert!(ret.set_status(PurchaseReturnStatus::Pending, Utc::now()).is_err());
        assert!("refunded".parse::<PurchaseReturnStatus>().is_err());
    }

    #[test]
    fn return_date_cannot_precede_the_bill() {
        let purchase = purchase();
        let input = PurchaseReturnInput {
            purchase_id: Some(purchase.id_typed()),
            return_date: NaiveDate::from_ymd_opt(2024, 6, 30),
            lines: vec![ReturnLine { line_no: 1, quantity: 1 }],
            ..Default::default()
        };
        let err = PurchaseReturn::create(UserId::new(), PurchaseReturnId::generate(), &input, &purchase, &[], today(), Utc::now())
            .unwrap_err();
        assert_eq!(err, DomainError::validation("return_date: must not be before the bill date"));
    }
}
