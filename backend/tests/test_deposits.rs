//! Security-deposit submission, verification, and rejection.

mod common;

use common::Fixture;
use lendvault_core_rs::models::PaymentMethod;
use lendvault_core_rs::{ActorContext, EngineError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[test]
fn test_deposit_is_ten_percent_of_principal() {
    let mut f = Fixture::new();
    let loan = f.apply(dec!(5000), 10);
    f.engine.approve_loan(&f.officer.clone(), loan).unwrap();

    let deposit = f.engine.state().deposit(loan).unwrap();
    assert_eq!(deposit.required_amount(), dec!(500.00));
    // The requirement is fixed at creation and mirrored on the loan.
    assert_eq!(f.engine.state().loan(loan).unwrap().deposit_required(), dec!(500.00));
}

#[test]
fn test_only_the_borrower_may_submit() {
    let mut f = Fixture::new();
    let loan = f.apply(dec!(5000), 10);
    f.engine.approve_loan(&f.officer.clone(), loan).unwrap();

    let err = f
        .engine
        .submit_deposit(&f.officer.clone(), loan, dec!(500.00), PaymentMethod::Cash, None)
        .unwrap_err();
    assert!(err.is_authorization());

    let stranger = f.register_verified_borrower("eve", "Eve Sichone");
    let err = f
        .engine
        .submit_deposit(&ActorContext::new(stranger), loan, dec!(500.00), PaymentMethod::Cash, None)
        .unwrap_err();
    assert!(err.is_authorization());
}

#[test]
fn test_submission_before_approval_is_refused() {
    let mut f = Fixture::new();
    let loan = f.apply(dec!(5000), 10);
    let err = f
        .engine
        .submit_deposit(&f.borrower.clone(), loan, dec!(500.00), PaymentMethod::Cash, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Precondition(_)));
}

#[test]
fn test_partial_deposit_cannot_be_verified() {
    let mut f = Fixture::new();
    let loan = f.apply(dec!(5000), 10);
    f.engine.approve_loan(&f.officer.clone(), loan).unwrap();
    f.engine
        .submit_deposit(&f.borrower.clone(), loan, dec!(300.00), PaymentMethod::MobileMoney, None)
        .unwrap();

    let err = f.engine.verify_deposit(&f.manager.clone(), loan).unwrap_err();
    match err {
        EngineError::Precondition(message) => assert!(message.contains("300"), "{message}"),
        other => panic!("expected Precondition, got {other:?}"),
    }
}

#[test]
fn test_rejection_wipes_payment_and_requires_resubmission() {
    let mut f = Fixture::new();
    let loan = f.apply(dec!(5000), 10);
    f.engine.approve_loan(&f.officer.clone(), loan).unwrap();
    f.engine
        .submit_deposit(&f.borrower.clone(), loan, dec!(500.00), PaymentMethod::Check, Some("CHQ-88".into()))
        .unwrap();

    f.engine
        .reject_deposit(&f.manager.clone(), loan, "check bounced")
        .unwrap();
    let deposit = f.engine.state().deposit(loan).unwrap();
    assert_eq!(deposit.paid_amount(), Decimal::ZERO);
    assert!(!deposit.is_verified());
    assert_eq!(f.engine.state().loan(loan).unwrap().deposit_paid(), Decimal::ZERO);

    // Resubmission replaces the record and verification then succeeds.
    f.engine
        .submit_deposit(&f.borrower.clone(), loan, dec!(500.00), PaymentMethod::Cash, None)
        .unwrap();
    f.engine.verify_deposit(&f.manager.clone(), loan).unwrap();
    assert!(f.engine.state().deposit(loan).unwrap().is_verified());
}

#[test]
fn test_verify_is_idempotent() {
    let mut f = Fixture::new();
    let loan = f.apply(dec!(5000), 10);
    f.engine.approve_loan(&f.officer.clone(), loan).unwrap();
    f.pay_and_verify_deposit(loan);
    let audit_rows = f.engine.audit().len();

    f.engine.verify_deposit(&f.manager.clone(), loan).unwrap();
    assert_eq!(f.engine.audit().len(), audit_rows);
}

#[test]
fn test_verification_never_activates_the_loan() {
    let mut f = Fixture::new();
    let loan = f.apply(dec!(5000), 10);
    f.engine.approve_loan(&f.officer.clone(), loan).unwrap();
    f.pay_and_verify_deposit(loan);

    // Activation happens only through disbursement.
    assert_eq!(
        f.engine.state().loan(loan).unwrap().status(),
        lendvault_core_rs::LoanStatus::Approved
    );
    assert!(f.engine.state().schedules_for_loan(loan).is_empty());
}

#[test]
fn test_receipt_numbers_are_unique() {
    let mut f = Fixture::new();
    let loan = f.apply(dec!(5000), 10);
    f.engine.approve_loan(&f.officer.clone(), loan).unwrap();

    let first = f
        .engine
        .submit_deposit(&f.borrower.clone(), loan, dec!(500.00), PaymentMethod::Cash, None)
        .unwrap();
    let second = f
        .engine
        .submit_deposit(&f.borrower.clone(), loan, dec!(500.00), PaymentMethod::Cash, None)
        .unwrap();
    assert_ne!(first, second);
    assert!(first.starts_with("RCP-"));
}
