use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use billforge_core::{DomainError, Money};

/// How money changed hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    Card,
    Upi,
    BankTransfer,
    Credit,
}

impl PaymentMode {
    pub const ALL: [PaymentMode; 5] = [
        PaymentMode::Cash,
        PaymentMode::Card,
        PaymentMode::Upi,
        PaymentMode::BankTransfer,
        PaymentMode::Credit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::Card => "card",
            PaymentMode::Upi => "upi",
            PaymentMode::BankTransfer => "bank_transfer",
            PaymentMode::Credit => "credit",
        }
    }
}

impl core::str::FromStr for PaymentMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "invalid payment mode '{s}'; expected one of cash, card, upi, bank_transfer, credit"
                ))
            })
    }
}

/// A payment recorded against an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub mode: Option<PaymentMode>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Payment registration form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInput {
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub mode: Option<PaymentMode>,
    #[serde(default)]
    pub reference: Option<String>,
}
