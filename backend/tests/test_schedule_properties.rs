//! Property tests for the installment arithmetic.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use lendvault_core_rs::engine::generate_installments;
use lendvault_core_rs::models::LoanTerm;
use lendvault_core_rs::money::round2;

/// Principal in cents between K1,000.00 and K100,000.00.
fn principal_cents() -> impl Strategy<Value = i64> {
    100_000i64..=10_000_000
}

/// Flat rate in whole percent.
fn rate_percent() -> impl Strategy<Value = i64> {
    0i64..=100
}

fn derive(principal_cents: i64, rate: i64, n: u32) -> (Decimal, Decimal) {
    let principal = Decimal::new(principal_cents, 2);
    let total = round2(principal * (Decimal::ONE + Decimal::from(rate) / dec!(100)));
    let payment = round2(total / Decimal::from(n));
    (total, payment)
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 7).unwrap()
}

proptest! {
    /// The generated rows always sum to the loan total exactly, whatever the
    /// rounding residual of total / n.
    #[test]
    fn prop_installments_sum_to_total(
        cents in principal_cents(),
        rate in rate_percent(),
        weeks in 4u32..=24,
    ) {
        let (total, payment) = derive(cents, rate, weeks);
        let specs = generate_installments(start(), LoanTerm::Weeks(weeks), payment, total);

        prop_assert_eq!(specs.len(), weeks as usize);
        let sum: Decimal = specs.iter().map(|s| s.amount).sum();
        prop_assert_eq!(sum, total);
    }

    /// Every row except the last carries the uniform installment; the last
    /// deviates by strictly less than one cent per installment.
    #[test]
    fn prop_residual_is_bounded(
        cents in principal_cents(),
        rate in rate_percent(),
        days in 30u32..=365,
    ) {
        let (total, payment) = derive(cents, rate, days);
        let specs = generate_installments(start(), LoanTerm::Days(days), payment, total);

        for spec in &specs[..specs.len() - 1] {
            prop_assert_eq!(spec.amount, payment);
        }
        let last = specs.last().unwrap().amount;
        let residual = (last - payment).abs();
        prop_assert!(residual < dec!(0.01) * Decimal::from(days),
            "residual {residual} for {days} installments");
    }

    /// Due dates step uniformly from the day after disbursement.
    #[test]
    fn prop_due_dates_step_by_cadence(
        cents in principal_cents(),
        weeks in 4u32..=24,
    ) {
        let (total, payment) = derive(cents, 45, weeks);
        let specs = generate_installments(start(), LoanTerm::Weeks(weeks), payment, total);

        for (i, spec) in specs.iter().enumerate() {
            let expected = start() + chrono::Duration::days(7 * (i as i64 + 1));
            prop_assert_eq!(spec.due_date, expected);
            prop_assert_eq!(spec.installment_number, i as u32 + 1);
        }
    }

    /// Installment amounts never go negative, even at the extremes of the
    /// product range.
    #[test]
    fn prop_amounts_stay_positive(
        cents in principal_cents(),
        rate in rate_percent(),
        weeks in 4u32..=24,
    ) {
        let (total, payment) = derive(cents, rate, weeks);
        let specs = generate_installments(start(), LoanTerm::Weeks(weeks), payment, total);
        prop_assert!(specs.iter().all(|s| s.amount > Decimal::ZERO));
    }
}
