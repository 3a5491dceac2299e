//! Installment generation.
//!
//! Pure arithmetic: given the disbursement date, the term, and the derived
//! per-installment amount, produce the dated installment specs. Flat interest
//! is amortized uniformly, so every installment carries `payment_amount`
//! except the last, which absorbs the rounding residual so that the specs sum
//! to the loan's `total_amount` exactly.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::models::loan::LoanTerm;

/// One installment to be materialized as a `PaymentSchedule` row plus its
/// mirrored `PaymentCollection` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentSpec {
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

/// Generate the installment specs for a loan.
///
/// Due dates are `disbursement + i * step` for i in 1..=n, stepping one day
/// for daily terms and seven for weekly ones. `n * payment_amount` may differ
/// from `total_amount` by a sub-cent-per-installment residual; the final
/// installment absorbs it.
pub fn generate_installments(
    disbursement: NaiveDate,
    term: LoanTerm,
    payment_amount: Decimal,
    total_amount: Decimal,
) -> Vec<InstallmentSpec> {
    let n = term.length();
    let step = term.step_days();
    let mut specs = Vec::with_capacity(n as usize);
    for i in 1..=n {
        let amount = if i == n {
            // Residual lands here so the specs sum to total_amount exactly.
            total_amount - payment_amount * Decimal::from(n - 1)
        } else {
            payment_amount
        };
        specs.push(InstallmentSpec {
            installment_number: i,
            due_date: disbursement + Duration::days(i as i64 * step),
            amount,
        });
    }
    specs
}
