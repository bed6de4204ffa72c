//! Money and percentages.
//!
//! Amounts are integer paise (1/100 rupee). Percentages are basis points so
//! that tax and discount arithmetic stays exact until the final rounding step.

use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Amount in paise. Negative values are allowed (refunds, credit balances).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_paise(paise: i64) -> Self {
        Self(paise)
    }

    pub const fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    pub const fn paise(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn try_add(self, other: Money) -> DomainResult<Money> {
        self.checked_add(other)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    pub fn try_sub(self, other: Money) -> DomainResult<Money> {
        self.checked_sub(other)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    /// Unit price times quantity.
    pub fn checked_mul(self, quantity: i64) -> DomainResult<Money> {
        self.0
            .checked_mul(quantity)
            .map(Money)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    /// `self × percent`, rounded half away from zero to the nearest paisa.
    pub fn percent(self, percent: Percent) -> Money {
        self.scale(i64::from(percent.basis_points()), 10_000)
    }

    /// `self × numerator / denominator`, rounded half away from zero.
    ///
    /// `denominator` must be positive.
    pub fn scale(self, numerator: i64, denominator: i64) -> Money {
        let scaled = i128::from(self.0) * i128::from(numerator);
        Money(div_round_half_up(scaled, i128::from(denominator.max(1))) as i64)
    }

    /// Round to the nearest whole rupee (half away from zero).
    pub fn round_to_rupee(self) -> Money {
        Money((div_round_half_up(i128::from(self.0), 100) * 100) as i64)
    }

    /// Value in rupees, for spreadsheet cells and charts only.
    pub fn as_rupees_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Plain decimal representation: `-1234.50`.
    pub fn to_decimal_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }

    /// Indian-grouped currency string: `₹1,23,456.78`.
    pub fn format_inr(self) -> String {
        self.format_grouped("₹")
    }

    /// Indian grouping with an arbitrary currency prefix (`Rs. ` for fonts without `₹`).
    pub fn format_grouped(self, symbol: &str) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!(
            "{sign}{symbol}{}.{:02}",
            group_indian(&(abs / 100).to_string()),
            abs % 100
        )
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

// Operators saturate at the i64 bounds. Totals that must reject overflow use
// `try_add` / `try_sub` instead.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        -((-numerator + half) / denominator)
    }
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, last3) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (h, t) = rest.split_at(rest.len() - 2);
        groups.push(t);
        rest = h;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();
    format!("{},{}", groups.join(","), last3)
}

/// Percentage in basis points (`1800` = 18%).
///
/// Serialized as a decimal percent number (`18`, `0.25`) with at most two
/// decimal places.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percent(u32);

impl ValueObject for Percent {}

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const HUNDRED: Percent = Percent(10_000);

    pub const fn from_basis_points(bps: u32) -> Self {
        Self(bps)
    }

    pub const fn basis_points(self) -> u32 {
        self.0
    }

    /// Parse a decimal percent (`12.5`).
    pub fn from_percent(value: f64) -> DomainResult<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(DomainError::validation(
                "percentage must be a non-negative number",
            ));
        }
        let scaled = value * 100.0;
        let rounded = scaled.round();
        if (scaled - rounded).abs() > 1e-6 {
            return Err(DomainError::validation(
                "percentage supports at most two decimal places",
            ));
        }
        if rounded > f64::from(u32::MAX) {
            return Err(DomainError::validation("percentage out of range"));
        }
        Ok(Self(rounded as u32))
    }

    pub fn as_percent_f64(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl core::fmt::Display for Percent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{whole}%")
        } else if frac % 10 == 0 {
            write!(f, "{whole}.{}%", frac / 10)
        } else {
            write!(f, "{whole}.{frac:02}%")
        }
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_u32(self.0 / 100)
        } else {
            serializer.serialize_f64(self.as_percent_f64())
        }
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Percent::from_percent(value).map_err(serde::de::Error::custom)
    }
}
