//! Accounting windows for provider budgets.

use std::time::Duration;

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};

use crate::{Result, TollgateError};

/// Length of a budget accounting window. Calendar windows are UTC-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetPeriod {
    /// Midnight to midnight.
    Daily,
    /// Monday 00:00 to the next Monday 00:00.
    Weekly,
    /// First of the month to the first of the next month.
    Monthly,
    /// Fixed-length windows aligned to the Unix epoch.
    Fixed(Duration),
}

impl BudgetPeriod {
    /// Parse a config name (`daily`, `weekly`, `monthly`), or build a fixed
    /// window when `fixed_secs` is given.
    pub fn from_config(name: Option<&str>, fixed_secs: Option<u64>) -> Result<Self> {
        let default_name = if fixed_secs.is_some() { "fixed" } else { "daily" };
        match name.unwrap_or(default_name) {
            "daily" => Ok(BudgetPeriod::Daily),
            "weekly" => Ok(BudgetPeriod::Weekly),
            "monthly" => Ok(BudgetPeriod::Monthly),
            "fixed" => match fixed_secs {
                Some(secs) if secs > 0 => Ok(BudgetPeriod::Fixed(Duration::from_secs(secs))),
                _ => Err(TollgateError::Configuration(
                    "fixed budget period requires a positive period_secs".to_string(),
                )),
            },
            other => Err(TollgateError::Configuration(format!(
                "unknown budget period '{other}' (expected daily, weekly, monthly or fixed)"
            ))),
        }
    }

    /// The window `[start, end)` containing `now`.
    pub fn window_containing(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            BudgetPeriod::Daily => {
                let start = midnight(now.date_naive());
                (start, start + chrono::Duration::days(1))
            }
            BudgetPeriod::Weekly => {
                let offset = i64::from(now.weekday().num_days_from_monday());
                let start = midnight(now.date_naive() - chrono::Duration::days(offset));
                (start, start + chrono::Duration::weeks(1))
            }
            BudgetPeriod::Monthly => {
                let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
                    .unwrap_or_else(|| now.date_naive());
                let start = midnight(first);
                let end = start
                    .checked_add_months(Months::new(1))
                    .unwrap_or(start + chrono::Duration::days(31));
                (start, end)
            }
            BudgetPeriod::Fixed(length) => {
                let secs = length.as_secs().max(1) as i64;
                let aligned = now.timestamp().div_euclid(secs) * secs;
                let start = Utc.timestamp_opt(aligned, 0).single().unwrap_or(now);
                (start, start + chrono::Duration::seconds(secs))
            }
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
