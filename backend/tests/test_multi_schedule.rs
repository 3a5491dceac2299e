//! Multi-schedule settlement: one money movement over several installments.

mod common;

use common::Fixture;
use lendvault_core_rs::models::{MultiPaymentStatus, PaymentMethod};
use lendvault_core_rs::{EngineError, LoanStatus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn active_loan(f: &mut Fixture) -> u64 {
    let loan = f.apply(dec!(5000), 10);
    f.activate(loan);
    loan
}

#[test]
fn test_settles_selected_installments() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let picked: Vec<u64> = f.schedule_ids(loan)[..4].to_vec();

    let mp = f
        .engine
        .submit_multi_payment(&f.borrower.clone(), loan, &picked, dec!(2900.00), PaymentMethod::MobileMoney, None)
        .unwrap();
    // Submission alone moves no money.
    assert_eq!(f.engine.state().loan(loan).unwrap().amount_paid(), Decimal::ZERO);

    let outcome = f.engine.approve_multi_payment(&f.admin.clone(), mp).unwrap();
    assert_eq!(outcome.schedules_settled, 4);
    assert_eq!(outcome.overpayment, Decimal::ZERO);
    assert_eq!(outcome.balance_remaining, dec!(4350.00));
    assert!(!outcome.loan_completed);
    for schedule in &picked {
        assert!(f.engine.state().schedule(*schedule).unwrap().is_paid());
    }
    assert_eq!(f.engine.state().loan(loan).unwrap().amount_paid(), dec!(2900.00));
}

#[test]
fn test_double_approve_affects_balance_once() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let picked: Vec<u64> = f.schedule_ids(loan)[..2].to_vec();
    let mp = f
        .engine
        .submit_multi_payment(&f.borrower.clone(), loan, &picked, dec!(1450.00), PaymentMethod::Cash, None)
        .unwrap();
    f.engine.approve_multi_payment(&f.admin.clone(), mp).unwrap();
    let audit_rows = f.engine.audit().len();

    let outcome = f.engine.approve_multi_payment(&f.admin.clone(), mp).unwrap();
    assert_eq!(outcome.balance_remaining, dec!(5800.00));
    assert_eq!(f.engine.state().loan(loan).unwrap().amount_paid(), dec!(1450.00));
    assert_eq!(f.engine.audit().len(), audit_rows);
}

#[test]
fn test_settling_the_remainder_completes_the_loan() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let all: Vec<u64> = f.schedule_ids(loan);

    let mp = f
        .engine
        .submit_multi_payment(&f.borrower.clone(), loan, &all, dec!(7250.00), PaymentMethod::BankTransfer, None)
        .unwrap();
    let outcome = f.engine.approve_multi_payment(&f.admin.clone(), mp).unwrap();
    assert!(outcome.loan_completed);
    assert_eq!(f.engine.state().loan(loan).unwrap().status(), LoanStatus::Completed);
}

#[test]
fn test_amount_must_cover_selection() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let picked: Vec<u64> = f.schedule_ids(loan)[..4].to_vec();

    let err = f
        .engine
        .submit_multi_payment(&f.borrower.clone(), loan, &picked, dec!(2899.99), PaymentMethod::Cash, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "amount"));
}

#[test]
fn test_overpayment_recorded_never_reallocated() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let picked: Vec<u64> = f.schedule_ids(loan)[..2].to_vec();

    let mp = f
        .engine
        .submit_multi_payment(&f.borrower.clone(), loan, &picked, dec!(2000.00), PaymentMethod::Cash, None)
        .unwrap();
    let outcome = f.engine.approve_multi_payment(&f.admin.clone(), mp).unwrap();
    assert_eq!(outcome.overpayment, dec!(550.00));
    assert_eq!(outcome.schedules_settled, 2);
    // The excess stays on this payment; the third installment is untouched.
    let third = f.schedule_ids(loan)[2];
    assert!(!f.engine.state().schedule(third).unwrap().is_paid());
    // But the whole movement lands on the loan.
    assert_eq!(f.engine.state().loan(loan).unwrap().amount_paid(), dec!(2000.00));
}

#[test]
fn test_selection_validation() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let first = f.schedule_ids(loan)[0];

    // Empty selection.
    let err = f
        .engine
        .submit_multi_payment(&f.borrower.clone(), loan, &[], dec!(725.00), PaymentMethod::Cash, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));

    // Duplicate selection.
    let err = f
        .engine
        .submit_multi_payment(&f.borrower.clone(), loan, &[first, first], dec!(1450.00), PaymentMethod::Cash, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));

    // Installment of a different loan.
    let other_borrower = f.register_verified_borrower("chipo", "Chipo Mulenga");
    let other_ctx = lendvault_core_rs::ActorContext::new(other_borrower);
    let other_loan = f
        .engine
        .submit_application(
            &other_ctx,
            f.product,
            dec!(2000),
            lendvault_core_rs::LoanTerm::Weeks(8),
        )
        .unwrap();
    f.activate(other_loan);
    let foreign = f.schedule_ids(other_loan)[0];
    let err = f
        .engine
        .submit_multi_payment(&f.borrower.clone(), loan, &[foreign], dec!(725.00), PaymentMethod::Cash, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));

    // Already-paid installment.
    f.engine.clock_mut().advance_days(7);
    f.pay_installment(loan, first, dec!(725.00));
    let err = f
        .engine
        .submit_multi_payment(&f.borrower.clone(), loan, &[first], dec!(725.00), PaymentMethod::Cash, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));
}

#[test]
fn test_reject_multi_payment_changes_nothing() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let picked: Vec<u64> = f.schedule_ids(loan)[..2].to_vec();
    let mp = f
        .engine
        .submit_multi_payment(&f.borrower.clone(), loan, &picked, dec!(1450.00), PaymentMethod::Cash, None)
        .unwrap();

    f.engine
        .reject_multi_payment(&f.admin.clone(), mp, "cash count short")
        .unwrap();
    assert_eq!(
        f.engine.state().multi_payment(mp).unwrap().status(),
        MultiPaymentStatus::Rejected
    );
    assert_eq!(f.engine.state().loan(loan).unwrap().amount_paid(), Decimal::ZERO);
    assert!(!f.engine.state().schedule(picked[0]).unwrap().is_paid());

    // A rejected payment cannot be approved afterwards.
    let err = f.engine.approve_multi_payment(&f.admin.clone(), mp).unwrap_err();
    assert!(matches!(err, EngineError::Precondition(_)));
}
