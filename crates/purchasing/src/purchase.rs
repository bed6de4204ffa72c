use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use billforge_core::validation::normalize_optional;
use billforge_core::{Document, DocumentId, DomainError, DomainResult, FieldErrors, Timestamps, UserId};
use billforge_gst::{DocumentTotals, LineItem, SupplyType};
use billforge_parties::{AdHocParty, Party, PartyId, PartyKind, PartySnapshot};

billforge_core::document_id!(
    /// Purchase identifier.
    PurchaseId
);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchasePaymentStatus {
    Paid,
    #[default]
    Unpaid,
    PartiallyPaid,
}

impl PurchasePaymentStatus {
    pub const ALL: [PurchasePaymentStatus; 3] = [
        PurchasePaymentStatus::Paid,
        PurchasePaymentStatus::Unpaid,
        PurchasePaymentStatus::PartiallyPaid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PurchasePaymentStatus::Paid => "paid",
            PurchasePaymentStatus::Unpaid => "unpaid",
            PurchasePaymentStatus::PartiallyPaid => "partially_paid",
        }
    }
}

impl core::str::FromStr for PurchasePaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PurchasePaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "invalid payment status '{s}'; expected one of paid, unpaid, partially_paid"
                ))
            })
    }
}

/// Create/update form for a supplier bill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseInput {
    #[serde(default)]
    pub supplier_id: Option<PartyId>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub supplier_gstin: Option<String>,
    #[serde(default)]
    pub supplier_state: Option<String>,
    #[serde(default)]
    pub bill_number: Option<String>,
    #[serde(default)]
    pub bill_date: Option<NaiveDate>,
    #[serde(default)]
    pub lines: Vec<LineItem>,
    #[serde(default)]
    pub supply_type: Option<SupplyType>,
    #[serde(default)]
    pub payment_status: Option<PurchasePaymentStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub version: Option<u64>,
}

/// Buyer (the account holder) and supplier context for a purchase.
#[derive(Debug, Clone, Copy)]
pub struct PurchaseContext<'a> {
    pub supplier: Option<&'a Party>,
    pub buyer_state: Option<&'a str>,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

/// Document: Purchase (a supplier bill).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    id: PurchaseId,
    owner: UserId,
    supplier: PartySnapshot,
    bill_number: Option<String>,
    bill_date: NaiveDate,
    lines: Vec<LineItem>,
    supply_type: SupplyType,
    payment_status: PurchasePaymentStatus,
    notes: Option<String>,
    totals: DocumentTotals,
    version: u64,
    #[serde(flatten)]
    timestamps: Timestamps,
}

struct Prepared {
    supplier: PartySnapshot,
    supply_type: SupplyType,
    totals: DocumentTotals,
}

impl PurchaseInput {
    fn prepare(&self, ctx: &PurchaseContext<'_>) -> DomainResult<Prepared> {
        let mut errors = FieldErrors::new();
        let supplier = PartySnapshot::resolve(
            PartyKind::Supplier,
            ctx.supplier,
            AdHocParty {
                name: self.supplier_name.clone(),
                gstin: self.supplier_gstin.clone(),
                state_code: self.supplier_state.clone(),
                ..Default::default()
            },
            &mut errors,
        )?;
        if self.lines.is_empty() {
            errors.require::<LineItem>("lines", None);
        }
        errors.finish()?;

        let supply_type = self
            .supply_type
            .unwrap_or_else(|| SupplyType::determine(supplier.state(), ctx.buyer_state));
        let totals = DocumentTotals::compute(&self.lines, supply_type, false)?;
        Ok(Prepared {
            supplier,
            supply_type,
            totals,
        })
    }
}

impl Purchase {
    pub fn create(owner: UserId, id: PurchaseId, input: &PurchaseInput, ctx: PurchaseContext<'_>) -> DomainResult<Self> {
        let prepared = input.prepare(&ctx)?;
        Ok(Self {
            id,
            owner,
            supplier: prepared.supplier,
            bill_number: normalize_optional(input.bill_number.clone()),
            bill_date: input.bill_date.unwrap_or(ctx.today),
            lines: input.lines.clone(),
            supply_type: prepared.supply_type,
            payment_status: input.payment_status.unwrap_or_default(),
            notes: normalize_optional(input.notes.clone()),
            totals: prepared.totals,
            version: 0,
            timestamps: Timestamps::new(ctx.now),
        })
    }

    /// Replace the editable fields.
    ///
    /// `bill_date` and `payment_status` keep their recorded values when the
    /// input omits them; they are only defaulted on create. Returns already
    /// dated against the bill stay valid across an edit that leaves the date
    /// out.
    pub fn update(&mut self, input: &PurchaseInput, ctx: PurchaseContext<'_>) -> DomainResult<()> {
        let prepared = input.prepare(&ctx)?;
        self.supplier = prepared.supplier;
        self.bill_number = normalize_optional(input.bill_number.clone());
        self.bill_date = input.bill_date.unwrap_or(self.bill_date);
        self.lines = input.lines.clone();
        self.supply_type = prepared.supply_type;
        self.payment_status = input.payment_status.unwrap_or(self.payment_status);
        self.notes = normalize_optional(input.notes.clone());
        self.totals = prepared.totals;
        self.timestamps.touch(ctx.now);
        Ok(())
    }

    pub fn id_typed(&self) -> PurchaseId {
        self.id
    }

    pub fn supplier(&self) -> &PartySnapshot {
        &self.supplier
    }

    pub fn bill_number(&self) -> Option<&str> {
        self.bill_number.as_deref()
    }

    pub fn bill_date(&self) -> NaiveDate {
        self.bill_date
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn supply_type(&self) -> SupplyType {
        self.supply_type
    }

    pub fn payment_status(&self) -> PurchasePaymentStatus {
        self.payment_status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn totals(&self) -> &DocumentTotals {
        &self.totals
    }

    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
}

impl Document for Purchase {
    const COLLECTION: &'static str = "purchases";

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

#[cfg(test)]
mod tests {
    use super::*;
    use billforge_core::Money;
    use billforge_gst::GstRate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    fn ctx<'a>(buyer_state: Option<&'a str>) -> PurchaseContext<'a> {
        PurchaseContext { supplier: None, buyer_state, today: today(), now: Utc::now() }
    }

    fn input() -> PurchaseInput {
        PurchaseInput {
            supplier_name: Some("Metro Wholesale".into()),
            supplier_gstin: Some("07AAACR5055K1Z9".into()),
            bill_number: Some("MW/2024/118".into()),
            lines: vec![LineItem {
                description: "Paper ream".into(),
                item_id: None,
                hsn: None,
                quantity: 10,
                unit: None,
                unit_price: Money::from_rupees(250),
                discount_percent: Default::default(),
                gst_rate: GstRate::from_percent(12.0).unwrap(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn supplier_state_from_gstin_drives_igst() {
        let purchase = Purchase::create(UserId::new(), PurchaseId::generate(), &input(), ctx(Some("27"))).unwrap();
        assert_eq!(purchase.supplier().state(), Some("07"));
        assert_eq!(purchase.supply_type(), SupplyType::InterState);
        assert_eq!(purchase.totals().igst, Money::from_rupees(300));
        assert_eq!(purchase.payment_status(), PurchasePaymentStatus::Unpaid);
        assert_eq!(purchase.bill_date(), today());
    }

    #[test]
    fn supplier_and_lines_are_required() {
        let err = Purchase::create(UserId::new(), PurchaseId::generate(), &PurchaseInput::default(), ctx(None))
            .unwrap_err();
        assert_eq!(err, DomainError::validation("missing required fields: supplier_name, lines"));
    }

    #[test]
    fn payment_status_parsing() {
        assert_eq!("partially_paid".parse::<PurchasePaymentStatus>().unwrap(), PurchasePaymentStatus::PartiallyPaid);
        assert!("settled".parse::<PurchasePaymentStatus>().is_err());
    }

    #[test]
    fn update_keeps_payment_status_when_omitted() {
        let mut purchase = Purchase::create(
            UserId::new(),
            PurchaseId::generate(),
            &PurchaseInput { payment_status: Some(PurchasePaymentStatus::Paid), ..input() },
            ctx(None),
        )
        .unwrap();
        purchase.update(&input(), ctx(None)).unwrap();
        assert_eq!(purchase.payment_status(), PurchasePaymentStatus::Paid);
    }

    #[test]
    fn update_keeps_bill_date_when_omitted_and_replaces_it_when_given() {
        let billed = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let mut purchase = Purchase::create(
            UserId::new(),
            PurchaseId::generate(),
            &PurchaseInput { bill_date: Some(billed), ..input() },
            ctx(None),
        )
        .unwrap();

        let later = PurchaseContext { today: NaiveDate::from_ymd_opt(2024, 8, 30).unwrap(), ..ctx(None) };
        purchase.update(&input(), later).unwrap();
        assert_eq!(purchase.bill_date(), billed);

        let corrected = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        purchase
            .update(&PurchaseInput { bill_date: Some(corrected), ..input() }, ctx(None))
            .unwrap();
        assert_eq!(purchase.bill_date(), corrected);
    }
}
