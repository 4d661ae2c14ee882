//! Provider spend budgets.
//!
//! [`BudgetLedger`] answers "can we afford one more paid call" per provider
//! and accounting window ([`BudgetPeriod`]). See [`ledger`] module docs for
//! the reservation protocol.

pub mod ledger;
pub mod period;

pub use ledger::{BudgetConfig, BudgetLedger, BudgetStatus, Reservation};
pub use period::BudgetPeriod;
