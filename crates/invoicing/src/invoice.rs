use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use billforge_core::validation::normalize_optional;
use billforge_core::{Document, DocumentId, DomainError, DomainResult, FieldErrors, Money, Timestamps, UserId};
use billforge_gst::{DocumentTotals, LineItem, SupplyType};
use billforge_parties::{AdHocParty, Party, PartyId, PartyKind, PartySnapshot};

use crate::payment::{Payment, PaymentInput};

billforge_core::document_id!(
    /// Invoice identifier.
    InvoiceId
);

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Unpaid,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 6] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Unpaid,
        InvoiceStatus::PartiallyPaid,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Whether a manual status change from `self` to `to` is allowed.
    ///
    /// `partially_paid` is never a manual target; it is reached by payments.
    pub fn can_transition_to(self, to: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, to),
            (Draft, Unpaid | Cancelled)
                | (Unpaid, Paid | Overdue | Cancelled)
                | (PartiallyPaid, Paid | Overdue | Cancelled)
                | (Overdue, Paid | Cancelled)
        )
    }

    /// Statuses that count towards revenue and tax.
    pub fn is_issued(self) -> bool {
        !matches!(self, InvoiceStatus::Draft | InvoiceStatus::Cancelled)
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "invalid status '{s}'; expected one of draft, unpaid, partially_paid, paid, overdue, cancelled"
                ))
            })
    }
}

/// Create/update form for an invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceInput {
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub customer_id: Option<PartyId>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_gstin: Option<String>,
    #[serde(default)]
    pub customer_address: Option<String>,
    #[serde(default)]
    pub customer_state: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub lines: Vec<LineItem>,
    /// Explicit place of supply; derived from seller and buyer states otherwise.
    #[serde(default)]
    pub supply_type: Option<SupplyType>,
    #[serde(default)]
    pub round_off: bool,
    #[serde(default)]
    pub notes: Option<String>,
    /// Initial status (`draft` or `unpaid`); ignored on update.
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    /// Expected version for optimistic updates.
    #[serde(default)]
    pub version: Option<u64>,
}

/// Seller and buyer context needed to build an invoice from its form.
#[derive(Debug, Clone, Copy)]
pub struct InvoiceContext<'a> {
    pub customer: Option<&'a Party>,
    pub seller_state: Option<&'a str>,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

struct Prepared {
    customer: PartySnapshot,
    issue_date: NaiveDate,
    due_date: Option<NaiveDate>,
    supply_type: SupplyType,
    totals: DocumentTotals,
    notes: Option<String>,
}

impl InvoiceInput {
    fn prepare(&self, ctx: &InvoiceContext<'_>) -> DomainResult<Prepared> {
        let mut errors = FieldErrors::new();
        let customer = PartySnapshot::resolve(
            PartyKind::Customer,
            ctx.customer,
            AdHocParty {
                name: self.customer_name.clone(),
                gstin: self.customer_gstin.clone(),
                address: self.customer_address.clone(),
                state_code: self.customer_state.clone(),
            },
            &mut errors,
        )?;
        if self.lines.is_empty() {
            errors.require::<LineItem>("lines", None);
        }
        let issue_date = self.issue_date.unwrap_or(ctx.today);
        if self.due_date.is_some_and(|due| due < issue_date) {
            errors.invalid("due_date", "must not be before issue_date");
        }
        errors.finish()?;

        let supply_type = self
            .supply_type
            .unwrap_or_else(|| SupplyType::determine(ctx.seller_state, customer.state()));
        let totals = DocumentTotals::compute(&self.lines, supply_type, self.round_off)?;

        Ok(Prepared {
            customer,
            issue_date,
            due_date: self.due_date,
            supply_type,
            totals,
            notes: normalize_optional(self.notes.clone()),
        })
    }
}

/// Document: Invoice.
///
/// # Invariants
/// - `totals.total == totals.subtotal + totals.total_tax + totals.round_off`
/// - `0 <= amount_paid <= totals.total`
/// - `amount_paid` equals the sum of `payments`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    owner: UserId,
    invoice_number: String,
    customer: PartySnapshot,
    issue_date: NaiveDate,
    due_date: Option<NaiveDate>,
    lines: Vec<LineItem>,
    supply_type: SupplyType,
    round_off: bool,
    notes: Option<String>,
    status: InvoiceStatus,
    amount_paid: Money,
    #[serde(default)]
    payments: Vec<Payment>,
    totals: DocumentTotals,
    version: u64,
    #[serde(flatten)]
    timestamps: Timestamps,
}

impl Invoice {
    pub fn create(
        owner: UserId,
        id: InvoiceId,
        invoice_number: String,
        input: &InvoiceInput,
        ctx: InvoiceContext<'_>,
    ) -> DomainResult<Self> {
        let status = match input.status {
            None => InvoiceStatus::Unpaid,
            Some(s @ (InvoiceStatus::Draft | InvoiceStatus::Unpaid)) => s,
            Some(other) => {
                return Err(DomainError::validation(format!(
                    "new invoices must be draft or unpaid, not {other}"
                )));
            }
        };
        let prepared = input.prepare(&ctx)?;

        Ok(Self {
            id,
            owner,
            invoice_number,
            customer: prepared.customer,
            issue_date: prepared.issue_date,
            due_date: prepared.due_date,
            lines: input.lines.clone(),
            supply_type: prepared.supply_type,
            round_off: input.round_off,
            notes: prepared.notes,
            status,
            amount_paid: Money::ZERO,
            payments: Vec::new(),
            totals: prepared.totals,
            version: 0,
            timestamps: Timestamps::new(ctx.now),
        })
    }

    /// Replace the editable fields. Status and payments are untouched.
    pub fn update(&mut self, invoice_number: String, input: &InvoiceInput, ctx: InvoiceContext<'_>) -> DomainResult<()> {
        if matches!(self.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
            return Err(DomainError::invariant(format!(
                "cannot edit a {} invoice",
                self.status
            )));
        }
        let prepared = input.prepare(&ctx)?;
        if prepared.totals.total < self.amount_paid {
            return Err(DomainError::invariant(
                "invoice total cannot be less than the amount already paid",
            ));
        }

        self.invoice_number = invoice_number;
        self.customer = prepared.customer;
        self.issue_date = prepared.issue_date;
        self.due_date = prepared.due_date;
        self.lines = input.lines.clone();
        self.supply_type = prepared.supply_type;
        self.round_off = input.round_off;
        self.notes = prepared.notes;
        self.totals = prepared.totals;
        if self.amount_paid > Money::ZERO && self.amount_paid == self.totals.total {
            self.status = InvoiceStatus::Paid;
        }
        self.timestamps.touch(ctx.now);
        Ok(())
    }

    /// Manual status change. Setting `paid` records the outstanding balance as a payment.
    pub fn set_status(&mut self, to: InvoiceStatus, today: NaiveDate, now: DateTime<Utc>) -> DomainResult<()> {
        if to == self.status {
            return Err(DomainError::conflict(format!("invoice is already {to}")));
        }
        if to == InvoiceStatus::PartiallyPaid {
            return Err(DomainError::invariant(
                "partially_paid is set by recording a payment",
            ));
        }
        if !self.status.can_transition_to(to) {
            return Err(DomainError::invariant(format!(
                "cannot change invoice status from {} to {to}",
                self.status
            )));
        }

        if to == InvoiceStatus::Paid {
            let outstanding = self.outstanding();
            if outstanding > Money::ZERO {
                self.payments.push(Payment {
                    amount: outstanding,
                    date: today,
                    mode: None,
                    reference: Some("marked as paid".to_string()),
                });
            }
            self.amount_paid = self.totals.total;
        }
        self.status = to;
        self.timestamps.touch(now);
        Ok(())
    }

    pub fn record_payment(&mut self, input: &PaymentInput, today: NaiveDate, now: DateTime<Utc>) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        errors.require("amount", input.amount.as_ref());
        errors.finish()?;
        let amount = input.amount.unwrap_or_default();

        if amount <= Money::ZERO {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        match self.status {
            InvoiceStatus::Draft | InvoiceStatus::Cancelled => {
                return Err(DomainError::invariant(format!(
                    "cannot record a payment on a {} invoice",
                    self.status
                )));
            }
            InvoiceStatus::Paid => {
                return Err(DomainError::invariant("invoice is already fully paid"));
            }
            _ => {}
        }

        let new_paid = self
            .amount_paid
            .checked_add(amount)
            .ok_or_else(|| DomainError::invariant("payment total overflow"))?;
        if new_paid > self.totals.total {
            return Err(DomainError::invariant(format!(
                "payment of {} exceeds the outstanding amount of {}",
                amount.format_inr(),
                self.outstanding().format_inr()
            )));
        }

        self.payments.push(Payment {
            amount,
            date: input.date.unwrap_or(today),
            mode: input.mode,
            reference: normalize_optional(input.reference.clone()),
        });
        self.amount_paid = new_paid;
        self.status = if new_paid == self.totals.total {
            InvoiceStatus::Paid
        } else if self.status == InvoiceStatus::Overdue {
            InvoiceStatus::Overdue
        } else {
            InvoiceStatus::PartiallyPaid
        };
        self.timestamps.touch(now);
        Ok(())
    }

    /// Status as of `today`: open invoices past their due date read as overdue.
    pub fn effective_status(&self, today: NaiveDate) -> InvoiceStatus {
        match self.status {
            InvoiceStatus::Unpaid | InvoiceStatus::PartiallyPaid
                if self.due_date.is_some_and(|due| due < today) =>
            {
                InvoiceStatus::Overdue
            }
            status => status,
        }
    }

    pub fn can_delete(&self) -> bool {
        matches!(self.status, InvoiceStatus::Draft | InvoiceStatus::Cancelled)
    }

    pub fn ensure_deletable(&self) -> DomainResult<()> {
        if self.can_delete() {
            Ok(())
        } else {
            Err(DomainError::invariant(format!(
                "only draft or cancelled invoices can be deleted (status: {})",
                self.status
            )))
        }
    }

    pub fn outstanding(&self) -> Money {
        self.totals.total - self.amount_paid
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn customer(&self) -> &PartySnapshot {
        &self.customer
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn supply_type(&self) -> SupplyType {
        self.supply_type
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn amount_paid(&self) -> Money {
        self.amount_paid
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn totals(&self) -> &DocumentTotals {
        &self.totals
    }

    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
}

impl Document for Invoice {
    const COLLECTION: &'static str = "invoices";

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

/// List filter for invoices. Status is compared against the effective status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<PartyId>,
}

impl InvoiceFilter {
    pub fn matches(&self, invoice: &Invoice, today: NaiveDate) -> bool {
        self.status.is_none_or(|s| invoice.effective_status(today) == s)
            && self
                .customer_id
                .is_none_or(|c| invoice.customer().party_id == Some(c))
    }
}
