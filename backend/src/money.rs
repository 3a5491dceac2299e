//! Money helpers.
//!
//! All monetary amounts in the engine are `rust_decimal::Decimal` with two
//! fractional digits. Never `f64`. Rounding is bankers' rounding
//! (half-to-even) so repeated settlement arithmetic does not drift.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to two fractional digits using bankers' rounding.
///
/// # Example
///
/// ```
/// use lendvault_core_rs::money::round2;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(round2(dec!(2.345)), dec!(2.34));
/// assert_eq!(round2(dec!(2.355)), dec!(2.36));
/// assert_eq!(round2(dec!(725.0)), dec!(725.00));
/// ```
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// `max(0, value)`, used to floor loan balances.
pub fn floor_zero(value: Decimal) -> Decimal {
    if value < Decimal::ZERO {
        Decimal::ZERO
    } else {
        value
    }
}
