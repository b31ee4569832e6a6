//! Calendar arithmetic for predicting the next billing date

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::Frequency;

/// How to advance a billing date whose day-of-month doesn't exist in the
/// target month (e.g. the 31st into February)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCalendar {
    /// Clamp to the last day of the target month: Jan 31 + 1 month = Feb 28/29
    #[default]
    Clamp,
    /// Roll the surplus days into the following month: Jan 31 2023 + 1 month = Mar 3
    Overflow,
}

impl BillingCalendar {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clamp => "clamp",
            Self::Overflow => "overflow",
        }
    }

    /// Advance `date` by `months` calendar months.
    ///
    /// Returns `None` only when the result falls outside chrono's date range.
    pub fn advance(&self, date: NaiveDate, months: u32) -> Option<NaiveDate> {
        match self {
            Self::Clamp => date.checked_add_months(Months::new(months)),
            Self::Overflow => {
                let first = date.with_day(1)?.checked_add_months(Months::new(months))?;
                first.checked_add_days(Days::new(u64::from(date.day() - 1)))
            }
        }
    }
}

impl fmt::Display for BillingCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingCalendar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "overflow" => Ok(Self::Overflow),
            other => Err(format!("Unknown billing calendar: {}", other)),
        }
    }
}

/// Next expected charge after `last`, one billing period later
pub fn next_billing_date(
    last: NaiveDate,
    frequency: Frequency,
    calendar: BillingCalendar,
) -> Option<NaiveDate> {
    calendar.advance(last, frequency.months())
}
