//! Money arithmetic for the salary ledger.
//!
//! Amounts are stored and served as `f64`, but every sum is computed in
//! `Decimal` on cent-rounded values, so the order in which totals are
//! accumulated never changes the result.

use rust_decimal::prelude::*;

/// Salaries are kept to the cent.
const DECIMAL_PLACES: u32 = 2;

/// Largest amount accepted for one salary cell.
pub const MAX_SALARY_AMOUNT: f64 = 1_000_000.0;

/// Converts a stored amount to a cent-rounded `Decimal`.
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or_default()
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts a computed total back to `f64` for serialization.
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Amount as it will be stored: rounded to the cent.
pub fn normalize(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

/// Sums amounts exactly; use this instead of `Iterator::sum` on `f64` totals.
pub fn sum_amounts(amounts: impl IntoIterator<Item = f64>) -> f64 {
    to_f64(amounts.into_iter().map(to_decimal).sum())
}
