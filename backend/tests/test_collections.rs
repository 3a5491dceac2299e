//! Field collection recording and bulk approval.

mod common;

use common::Fixture;
use lendvault_core_rs::models::CollectionStatus;
use lendvault_core_rs::{CollectionScope, EngineError, LoanStatus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn active_loan(f: &mut Fixture) -> u64 {
    let loan = f.apply(dec!(5000), 10);
    f.activate(loan);
    loan
}

#[test]
fn test_bulk_approval_completes_covered_rows() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let first = f.schedule_ids(loan)[0];
    let due = f.engine.state().schedule(first).unwrap().due_date();

    f.engine.clock_mut().advance_days(7);
    f.engine
        .record_collection(&f.officer.clone(), loan, due, dec!(725.00))
        .unwrap();
    let outcome = f
        .engine
        .bulk_approve_collections(&f.officer.clone(), CollectionScope::Single { loan, date: due })
        .unwrap();
    assert_eq!(outcome.approved, 1);
    assert_eq!(outcome.skipped, 0);

    let row = f.engine.state().collection_for(loan, due).unwrap();
    assert_eq!(row.status(), CollectionStatus::Completed);
    assert_eq!(row.approved_by(), Some(f.officer.user));
    assert!(f.engine.state().schedule(first).unwrap().is_paid());
}

#[test]
fn test_partial_collection_is_skipped() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let first = f.schedule_ids(loan)[0];
    let due = f.engine.state().schedule(first).unwrap().due_date();

    f.engine.clock_mut().advance_days(7);
    f.engine
        .record_collection(&f.officer.clone(), loan, due, dec!(500.00))
        .unwrap();
    let audit_rows = f.engine.audit().len();
    let outcome = f
        .engine
        .bulk_approve_collections(&f.officer.clone(), CollectionScope::Single { loan, date: due })
        .unwrap();
    assert_eq!(outcome.approved, 0);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.loans_completed, 0);

    // Nothing was approved: no audit row, installment unpaid, loan unchanged.
    assert_eq!(f.engine.audit().len(), audit_rows);
    let row = f.engine.state().collection_for(loan, due).unwrap();
    assert_eq!(row.status(), CollectionStatus::InProgress);
    assert!(row.is_partial());
    assert!(!f.engine.state().schedule(first).unwrap().is_paid());
    assert_eq!(f.engine.state().loan(loan).unwrap().status(), LoanStatus::Active);

    // Topping up makes the next run approve it.
    f.engine
        .record_collection(&f.officer.clone(), loan, due, dec!(225.00))
        .unwrap();
    let outcome = f
        .engine
        .bulk_approve_collections(&f.officer.clone(), CollectionScope::Single { loan, date: due })
        .unwrap();
    assert_eq!(outcome.approved, 1);
    assert!(f.engine.state().schedule(first).unwrap().is_paid());
}

#[test]
fn test_all_for_date_covers_every_visible_loan() {
    let mut f = Fixture::new();
    let loan_a = active_loan(&mut f);
    let other = f.register_verified_borrower("chipo", "Chipo Mulenga");
    let other_ctx = lendvault_core_rs::ActorContext::new(other);
    let loan_b = f
        .engine
        .submit_application(&other_ctx, f.product, dec!(5000), lendvault_core_rs::LoanTerm::Weeks(10))
        .unwrap();
    f.activate(loan_b);

    // Both loans disbursed the same day share due dates.
    let due = f.engine.state().schedules_for_loan(loan_a)[0].due_date();
    f.engine.clock_mut().advance_days(7);
    f.engine
        .record_collection(&f.admin.clone(), loan_a, due, dec!(725.00))
        .unwrap();
    f.engine
        .record_collection(&f.admin.clone(), loan_b, due, dec!(725.00))
        .unwrap();

    let outcome = f
        .engine
        .bulk_approve_collections(&f.admin.clone(), CollectionScope::AllForDate { date: due })
        .unwrap();
    assert_eq!(outcome.approved, 2);
    assert!(f.engine.state().schedules_for_loan(loan_a)[0].is_paid());
    assert!(f.engine.state().schedules_for_loan(loan_b)[0].is_paid());
}

#[test]
fn test_bulk_approval_completes_fully_settled_loan() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let schedules = f.schedule_ids(loan);

    // Settle the first nine through the payment engine.
    for schedule in &schedules[..9] {
        f.engine.clock_mut().advance_days(7);
        f.pay_installment(loan, *schedule, dec!(725.00));
    }
    assert_eq!(f.engine.state().loan(loan).unwrap().status(), LoanStatus::Active);

    // The last arrives as field cash.
    let last = schedules[9];
    let due = f.engine.state().schedule(last).unwrap().due_date();
    f.engine.clock_mut().advance_days(7);
    f.engine
        .record_collection(&f.officer.clone(), loan, due, dec!(725.00))
        .unwrap();
    let outcome = f
        .engine
        .bulk_approve_collections(&f.officer.clone(), CollectionScope::Single { loan, date: due })
        .unwrap();
    assert_eq!(outcome.approved, 1);
    assert_eq!(outcome.loans_completed, 1);
    assert_eq!(f.engine.state().loan(loan).unwrap().status(), LoanStatus::Completed);
}

#[test]
fn test_record_against_missing_row_is_refused() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let off_calendar = Fixture::start_date();
    let err = f
        .engine
        .record_collection(&f.officer.clone(), loan, off_calendar, dec!(100.00))
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[test]
fn test_late_flag_set_when_recorded_past_due() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let first = f.schedule_ids(loan)[0];
    let due = f.engine.state().schedule(first).unwrap().due_date();

    f.engine.clock_mut().advance_days(9);
    f.engine
        .record_collection(&f.officer.clone(), loan, due, dec!(725.00))
        .unwrap();
    let row = f.engine.state().collection_for(loan, due).unwrap();
    assert!(row.is_late());
}

#[test]
fn test_borrower_cannot_record_collections() {
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let due = f.engine.state().schedules_for_loan(loan)[0].due_date();
    let err = f
        .engine
        .record_collection(&f.borrower.clone(), loan, due, dec!(725.00))
        .unwrap_err();
    assert!(err.is_authorization());

    let err = f
        .engine
        .bulk_approve_collections(&f.borrower.clone(), CollectionScope::AllForDate { date: due })
        .unwrap_err();
    assert!(err.is_authorization());
}

#[test]
fn test_collected_cash_is_not_repayment_until_confirmed() {
    // The collection ledger tracks field cash; the loan's repayment figures
    // move only through payment confirmation.
    let mut f = Fixture::new();
    let loan = active_loan(&mut f);
    let due = f.engine.state().schedules_for_loan(loan)[0].due_date();

    f.engine.clock_mut().advance_days(7);
    f.engine
        .record_collection(&f.officer.clone(), loan, due, dec!(725.00))
        .unwrap();
    f.engine
        .bulk_approve_collections(&f.officer.clone(), CollectionScope::Single { loan, date: due })
        .unwrap();
    assert_eq!(f.engine.state().loan(loan).unwrap().amount_paid(), Decimal::ZERO);
    assert!(f.engine.state().schedules_for_loan(loan)[0].is_paid());
}
