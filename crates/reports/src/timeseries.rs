//! Tax per day, ISO week or month.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use billforge_core::{DomainError, DomainResult, Money};

use crate::books::{Books, DateRange, Side};

/// Upper bound on buckets in one series.
pub const MAX_BUCKETS: usize = 3_700;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    #[default]
    Month,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }

    /// First day of the bucket containing `date`. Weeks start on Monday.
    pub fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => date - Days::new(u64::from(date.weekday().num_days_from_monday())),
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }

    fn next_start(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Day => start.checked_add_days(Days::new(1)),
            Granularity::Week => start.checked_add_days(Days::new(7)),
            Granularity::Month => start.checked_add_months(Months::new(1)),
        }
    }

    pub fn label(self, start: NaiveDate) -> String {
        match self {
            Granularity::Day => start.format("%Y-%m-%d").to_string(),
            Granularity::Week => {
                let week = start.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Granularity::Month => start.format("%Y-%m").to_string(),
        }
    }
}

impl core::str::FromStr for Granularity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            other => Err(DomainError::validation(format!(
                "invalid granularity '{other}'; expected one of day, week, month"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBucket {
    pub label: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub output_tax: Money,
    pub input_tax: Money,
    pub net: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTimeseries {
    pub granularity: Granularity,
    pub range: DateRange,
    pub buckets: Vec<TaxBucket>,
}

impl TaxTimeseries {
    /// Contiguous buckets covering `range`, zero-filled where nothing happened.
    ///
    /// The first and last buckets span whole periods; only documents dated
    /// inside `range` are counted.
    pub fn build(books: &Books<'_>, range: DateRange, granularity: Granularity) -> DomainResult<Self> {
        let mut buckets = Vec::new();
        let mut index = BTreeMap::new();
        let mut start = granularity.bucket_start(range.from);
        while start <= range.to {
            if buckets.len() == MAX_BUCKETS {
                return Err(DomainError::validation(format!(
                    "range too large for {} buckets",
                    granularity.as_str()
                )));
            }
            let next = granularity
                .next_start(start)
                .ok_or_else(|| DomainError::validation("date range out of bounds"))?;
            index.insert(start, buckets.len());
            buckets.push(TaxBucket {
                label: granularity.label(start),
                period_start: start,
                period_end: next.pred_opt().unwrap_or(start),
                output_tax: Money::ZERO,
                input_tax: Money::ZERO,
                net: Money::ZERO,
            });
            start = next;
        }

        for entry in books.tax_entries(range) {
            let Some(&i) = index.get(&granularity.bucket_start(entry.date)) else {
                continue;
            };
            let bucket = &mut buckets[i];
            let tax = entry.tax().total_tax();
            match entry.side {
                Side::Output => bucket.output_tax = bucket.output_tax.try_add(tax)?,
                Side::Input => bucket.input_tax = bucket.input_tax.try_add(tax)?,
            }
        }
        for bucket in &mut buckets {
            bucket.net = bucket.output_tax.try_sub(bucket.input_tax)?;
        }

        Ok(Self {
            granularity,
            range,
            buckets,
        })
    }
}
