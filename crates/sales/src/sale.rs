use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use billforge_core::validation::normalize_optional;
use billforge_core::{Document, DocumentId, DomainResult, FieldErrors, Timestamps, UserId};
use billforge_gst::{DocumentTotals, LineItem, SupplyType};
use billforge_invoicing::{InvoiceId, PaymentMode};
use billforge_parties::{AdHocParty, Party, PartyId, PartyKind, PartySnapshot};

billforge_core::document_id!(
    /// Sale identifier.
    SaleId
);

/// Create/update form for a direct sale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleInput {
    #[serde(default)]
    pub customer_id: Option<PartyId>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_state: Option<String>,
    #[serde(default)]
    pub sale_date: Option<NaiveDate>,
    /// Defaults to cash.
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
    #[serde(default)]
    pub lines: Vec<LineItem>,
    #[serde(default)]
    pub supply_type: Option<SupplyType>,
    /// Invoice this sale was billed on, if any.
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub version: Option<u64>,
}

/// Seller and buyer context needed to build a sale from its form.
#[derive(Debug, Clone, Copy)]
pub struct SaleContext<'a> {
    pub customer: Option<&'a Party>,
    pub seller_state: Option<&'a str>,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

/// Document: Sale.
///
/// Walk-in sales carry no customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    owner: UserId,
    customer: Option<PartySnapshot>,
    sale_date: NaiveDate,
    payment_mode: PaymentMode,
    lines: Vec<LineItem>,
    supply_type: SupplyType,
    invoice_id: Option<InvoiceId>,
    notes: Option<String>,
    totals: DocumentTotals,
    version: u64,
    #[serde(flatten)]
    timestamps: Timestamps,
}

struct Prepared {
    customer: Option<PartySnapshot>,
    sale_date: NaiveDate,
    supply_type: SupplyType,
    totals: DocumentTotals,
}

impl SaleInput {
    fn prepare(&self, ctx: &SaleContext<'_>) -> DomainResult<Prepared> {
        let mut errors = FieldErrors::new();
        let named = normalize_optional(self.customer_name.clone()).is_some();
        let customer = if ctx.customer.is_some() || named {
            Some(PartySnapshot::resolve(
                PartyKind::Customer,
                ctx.customer,
                AdHocParty {
                    name: self.customer_name.clone(),
                    state_code: self.customer_state.clone(),
                    ..Default::default()
                },
                &mut errors,
            )?)
        } else {
            None
        };
        if self.lines.is_empty() {
            errors.require::<LineItem>("lines", None);
        }
        errors.finish()?;

        let buyer_state = customer.as_ref().and_then(PartySnapshot::state);
        let supply_type = self
            .supply_type
            .unwrap_or_else(|| SupplyType::determine(ctx.seller_state, buyer_state));
        let totals = DocumentTotals::compute(&self.lines, supply_type, false)?;
        Ok(Prepared {
            customer,
            sale_date: self.sale_date.unwrap_or(ctx.today),
            supply_type,
            totals,
        })
    }
}

impl Sale {
    pub fn create(owner: UserId, id: SaleId, input: &SaleInput, ctx: SaleContext<'_>) -> DomainResult<Self> {
        let prepared = input.prepare(&ctx)?;
        Ok(Self {
            id,
            owner,
            customer: prepared.customer,
            sale_date: prepared.sale_date,
            payment_mode: input.payment_mode.unwrap_or(PaymentMode::Cash),
            lines: input.lines.clone(),
            supply_type: prepared.supply_type,
            invoice_id: input.invoice_id,
            notes: normalize_optional(input.notes.clone()),
            totals: prepared.totals,
            version: 0,
            timestamps: Timestamps::new(ctx.now),
        })
    }

    /// Full replacement of the editable fields.
    pub fn update(&mut self, input: &SaleInput, ctx: SaleContext<'_>) -> DomainResult<()> {
        let prepared = input.prepare(&ctx)?;
        self.customer = prepared.customer;
        self.sale_date = prepared.sale_date;
        self.payment_mode = input.payment_mode.unwrap_or(PaymentMode::Cash);
        self.lines = input.lines.clone();
        self.supply_type = prepared.supply_type;
        self.invoice_id = input.invoice_id;
        self.notes = normalize_optional(input.notes.clone());
        self.totals = prepared.totals;
        self.timestamps.touch(ctx.now);
        Ok(())
    }

    pub fn id_typed(&self) -> SaleId {
        self.id
    }

    pub fn customer(&self) -> Option<&PartySnapshot> {
        self.customer.as_ref()
    }

    /// Display name: the customer's, or "Walk-in".
    pub fn customer_name(&self) -> &str {
        self.customer.as_ref().map_or("Walk-in", |c| c.name.as_str())
    }

    pub fn sale_date(&self) -> NaiveDate {
        self.sale_date
    }

    pub fn payment_mode(&self) -> PaymentMode {
        self.payment_mode
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn supply_type(&self) -> SupplyType {
        self.supply_type
    }

    pub fn invoice_id(&self) -> Option<InvoiceId> {
        self.invoice_id
    }

    /// Sales billed on an invoice are already counted through the invoice.
    pub fn is_invoiced(&self) -> bool {
        self.invoice_id.is_some()
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

impl Document for Sale {
    const COLLECTION: &'static str = "sales";

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
    use billforge_core::{DomainError, Money};
    use billforge_gst::GstRate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn ctx<'a>(seller_state: Option<&'a str>) -> SaleContext<'a> {
        SaleContext {
            customer: None,
            seller_state,
            today: today(),
            now: Utc::now(),
        }
    }

    fn line(quantity: i64) -> LineItem {
        LineItem {
            description: "Notebook".into(),
            item_id: None,
            hsn: None,
            quantity,
            unit: Some("pcs".into()),
            unit_price: Money::from_rupees(50),
            discount_percent: Default::default(),
            gst_rate: GstRate::from_percent(12.0).unwrap(),
        }
    }

    #[test]
    fn walk_in_sale_defaults() {
        let input = SaleInput { lines: vec![line(4)], ..Default::default() };
        let sale = Sale::create(UserId::new(), SaleId::generate(), &input, ctx(Some("27"))).unwrap();
        assert!(sale.customer().is_none());
        assert_eq!(sale.customer_name(), "Walk-in");
        assert_eq!(sale.payment_mode(), PaymentMode::Cash);
        assert_eq!(sale.sale_date(), today());
        assert_eq!(sale.totals().subtotal, Money::from_rupees(200));
        assert_eq!(sale.totals().total, Money::from_rupees(224));
    }

    #[test]
    fn named_customer_in_other_state_is_inter_state() {
        let input = SaleInput {
            customer_name: Some("Ravi".into()),
            customer_state: Some("29".into()),
            payment_mode: Some(PaymentMode::Upi),
            lines: vec![line(1)],
            ..Default::default()
        };
        let sale = Sale::create(UserId::new(), SaleId::generate(), &input, ctx(Some("27"))).unwrap();
        assert_eq!(sale.supply_type(), SupplyType::InterState);
        assert_eq!(sale.totals().igst, Money::from_rupees(6));
    }

    #[test]
    fn lines_are_required() {
        let err = Sale::create(UserId::new(), SaleId::generate(), &SaleInput::default(), ctx(None)).unwrap_err();
        assert_eq!(err, DomainError::validation("missing required fields: lines"));
    }

    #[test]
    fn update_replaces_lines() {
        let mut sale = Sale::create(
            UserId::new(),
            SaleId::generate(),
            &SaleInput { lines: vec![line(1)], ..Default::default() },
            ctx(None),
        )
        .unwrap();
        sale.update(&SaleInput { lines: vec![line(2), line(3)], ..Default::default() }, ctx(None))
            .unwrap();
        assert_eq!(sale.lines().len(), 2);
        assert_eq!(sale.totals().subtotal, Money::from_rupees(250));
    }
}
