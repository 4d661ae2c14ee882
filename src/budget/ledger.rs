//! Per-provider spend tracking with atomic reservations.
//!
//! # Reservation protocol
//!
//! ```text
//! try_reserve(provider, estimate) ──► lock(provider) ─► roll over? ─► spent + estimate <= cap?
//!                                                                     │ yes: spent += estimate
//!                                                                     ▼
//!                                                      Some(Reservation)   / None
//! upstream call ...
//! commit(reservation, actual)     ──► lock(provider) ─► spent += actual - estimate
//! ```
//!
//! The check and the increment happen under one per-provider mutex, so two
//! concurrent reservations can never both pass a check that together would
//! exceed the cap. Providers never contend with each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::period::BudgetPeriod;
use crate::clock::Clock;
use crate::telemetry;
use crate::{Result, TollgateError};

/// Spend cap for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetConfig {
    /// Maximum spend per period, in the provider's currency.
    pub cap: Decimal,
    pub period: BudgetPeriod,
}

impl BudgetConfig {
    pub fn new(cap: Decimal, period: BudgetPeriod) -> Self {
        Self { cap, period }
    }

    /// A cap of `cap` per UTC day.
    pub fn daily(cap: Decimal) -> Self {
        Self::new(cap, BudgetPeriod::Daily)
    }

    /// A cap of `cap` per UTC calendar month.
    pub fn monthly(cap: Decimal) -> Self {
        Self::new(cap, BudgetPeriod::Monthly)
    }
}

/// A granted, not yet settled, provisional deduction.
///
/// Settle it with [`BudgetLedger::commit`] (actual cost) or
/// [`BudgetLedger::release`] (nothing was delivered).
#[derive(Debug)]
#[must_use = "a reservation holds budget until it is committed or released"]
pub struct Reservation {
    provider: String,
    amount: Decimal,
    period_start: DateTime<Utc>,
}

impl Reservation {
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// The estimated cost deducted at reservation time.
    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Snapshot of one provider's budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub provider: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub cap_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub spent_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining: Decimal,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug)]
struct Account {
    cap: Decimal,
    period: BudgetPeriod,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    spent: Decimal,
}

impl Account {
    fn new(config: &BudgetConfig, now: DateTime<Utc>) -> Self {
        let (period_start, period_end) = config.period.window_containing(now);
        Self {
            cap: config.cap,
            period: config.period,
            period_start,
            period_end,
            spent: Decimal::ZERO,
        }
    }

    /// Reset spend and advance the window if `now` is past the current one.
    fn roll_over(&mut self, provider: &str, now: DateTime<Utc>) {
        if now < self.period_end {
            return;
        }
        let (start, end) = self.period.window_containing(now);
        info!(
            provider,
            previous_spent = %self.spent,
            period_start = %start,
            period_end = %end,
            "budget period rolled over"
        );
        self.period_start = start;
        self.period_end = end;
        self.spent = Decimal::ZERO;
    }

    fn status(&self, provider: &str) -> BudgetStatus {
        BudgetStatus {
            provider: provider.to_string(),
            cap_amount: self.cap,
            spent_amount: self.spent,
            remaining: (self.cap - self.spent).max(Decimal::ZERO),
            period_start: self.period_start,
            period_end: self.period_end,
        }
    }
}

/// Spend ledger for all configured providers.
///
/// Providers are registered up front; each account sits behind its own
/// mutex.
pub struct BudgetLedger {
    accounts: HashMap<String, Mutex<Account>>,
    clock: Arc<dyn Clock>,
}

impl BudgetLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts: HashMap::new(),
            clock,
        }
    }

    /// Add a provider account. Duplicate names and negative caps are rejected.
    pub fn register(&mut self, provider: impl Into<String>, config: BudgetConfig) -> Result<()> {
        let provider = provider.into();
        if config.cap.is_sign_negative() {
            return Err(TollgateError::Configuration(format!(
                "budget cap for '{provider}' must not be negative"
            )));
        }
        if self.accounts.contains_key(&provider) {
            return Err(TollgateError::Configuration(format!(
                "budget for '{provider}' registered twice"
            )));
        }
        let account = Account::new(&config, self.clock.now());
        self.accounts.insert(provider, Mutex::new(account));
        Ok(())
    }

    /// Whether `provider` has an account.
    pub fn contains(&self, provider: &str) -> bool {
        self.accounts.contains_key(provider)
    }

    /// Atomically check and deduct `estimated_cost`.
    ///
    /// Returns `Ok(None)` when the deduction would push spend past the cap;
    /// the caller must not contact the provider in that case.
    pub fn try_reserve(&self, provider: &str, estimated_cost: Decimal) -> Result<Option<Reservation>> {
        if estimated_cost.is_sign_negative() {
            return Err(TollgateError::InvalidInput(format!(
                "negative cost estimate {estimated_cost} for '{provider}'"
            )));
        }
        let now = self.clock.now();
        let mut account = self.lock(provider)?;
        account.roll_over(provider, now);

        let projected = account
            .spent
            .checked_add(estimated_cost)
            .filter(|projected| *projected <= account.cap);
        let Some(projected) = projected else {
            warn!(
                provider,
                spent = %account.spent,
                cap = %account.cap,
                estimated_cost = %estimated_cost,
                "budget reservation denied"
            );
            metrics::counter!(telemetry::BUDGET_DENIALS_TOTAL, "provider" => provider.to_owned())
                .increment(1);
            return Ok(None);
        };

        account.spent = projected;
        debug!(provider, spent = %account.spent, cap = %account.cap, "budget reserved");
        record_spent(provider, account.spent);
        Ok(Some(Reservation {
            provider: provider.to_string(),
            amount: estimated_cost,
            period_start: account.period_start,
        }))
    }

    /// Settle a reservation at its actual cost.
    ///
    /// The running total moves by `actual - estimated`. It never drops below
    /// zero and never rises above the cap; an overrun past the cap is clamped
    /// and logged. Reservations from a window that has since rolled over are
    /// dropped, since that window's spend was already reset.
    pub fn commit(&self, reservation: Reservation, actual_cost: Decimal) -> Result<()> {
        let provider = reservation.provider.as_str();
        let actual_cost = actual_cost.max(Decimal::ZERO);
        let now = self.clock.now();
        let mut account = self.lock(provider)?;
        account.roll_over(provider, now);

        if account.period_start != reservation.period_start {
            debug!(provider, "reservation outlived its budget period, nothing to settle");
            return Ok(());
        }

        // An overflowing total is an overrun like any other.
        let mut adjusted = (account.spent - reservation.amount)
            .checked_add(actual_cost)
            .unwrap_or(Decimal::MAX)
            .max(Decimal::ZERO);
        if adjusted > account.cap {
            warn!(
                provider,
                estimated = %reservation.amount,
                actual = %actual_cost,
                cap = %account.cap,
                "actual cost overran the budget cap, clamping"
            );
            adjusted = account.cap;
        }
        account.spent = adjusted;
        record_spent(provider, account.spent);
        Ok(())
    }

    /// Give a reservation back in full (the upstream call delivered nothing).
    pub fn release(&self, reservation: Reservation) -> Result<()> {
        self.commit(reservation, Decimal::ZERO)
    }

    /// Current budget state for one provider, after applying any rollover.
    pub fn status(&self, provider: &str) -> Result<BudgetStatus> {
        let now = self.clock.now();
        let mut account = self.lock(provider)?;
        account.roll_over(provider, now);
        Ok(account.status(provider))
    }

    /// Status of every provider, sorted by name.
    pub fn statuses(&self) -> Result<Vec<BudgetStatus>> {
        let mut names: Vec<&String> = self.accounts.keys().collect();
        names.sort();
        names.into_iter().map(|name| self.status(name)).collect()
    }

    fn lock(&self, provider: &str) -> Result<MutexGuard<'_, Account>> {
        self.accounts
            .get(provider)
            .ok_or_else(|| TollgateError::UnknownProvider(provider.to_string()))?
            .lock()
            .map_err(|e| TollgateError::Internal(format!("budget lock poisoned for '{provider}': {e}")))
    }
}

fn record_spent(provider: &str, spent: Decimal) {
    metrics::gauge!(telemetry::BUDGET_SPENT, "provider" => provider.to_owned())
        .set(spent.to_f64().unwrap_or_default());
}
