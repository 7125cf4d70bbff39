//! Salary ledger: totals over person records and the two writes that touch
//! the `salaries` map.

pub mod aggregate;
pub mod editor;
pub mod money;
pub mod reset;
pub mod roster;

use derive_more::{Display, From};

use crate::store::StoreError;

pub use aggregate::{LedgerRollup, grand_total, partition, rollup, total_for_month, total_for_person};
pub use editor::{SalaryEdit, set_salary_entry};
pub use reset::{reset_batch, reset_year};
pub use roster::{LiveRoster, Roster, RosterReader};

#[derive(Debug, Clone, PartialEq, Display, From)]
pub enum LedgerError {
    #[display(fmt = "amount must be a finite number between 0 and {} (got {})", money::MAX_SALARY_AMOUNT, _0)]
    #[from(ignore)]
    InvalidAmount(f64),
    #[display(fmt = "{}", _0)]
    Store(StoreError),
}

impl std::error::Error for LedgerError {}
