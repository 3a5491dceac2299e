//! Role-scoped visibility: the same ledger read through four pairs of eyes.

mod common;

use common::Fixture;
use lendvault_core_rs::authz::{
    visible_borrowers, visible_collections, visible_groups, visible_loans,
};
use lendvault_core_rs::models::Role;
use lendvault_core_rs::ActorContext;
use rust_decimal_macros::dec;

/// Two branches, an officer and an active loan in each, plus the standing
/// cast of the fixture (whose officer and borrower live in branch one).
struct TwoBranches {
    f: Fixture,
    other_manager: u64,
    other_officer: u64,
    other_borrower: u64,
    loan_one: u64,
    loan_two: u64,
}

fn two_branches() -> TwoBranches {
    let mut f = Fixture::new();

    // Branch one: the fixture's cast. Put the standing borrower in one of
    // the officer's groups so officer-scoped reads can see them.
    let group = f
        .engine
        .state()
        .groups()
        .find(|g| g.assigned_officer() == Some(f.officer.user))
        .unwrap()
        .id();
    f.engine
        .add_group_member(&f.officer.clone(), group, f.borrower.user)
        .unwrap();
    f.engine
        .assign_client_to_officer(&f.admin.clone(), f.borrower.user, f.officer.user)
        .unwrap();
    let loan_one = f.apply(dec!(5000), 10);
    f.activate(loan_one);

    // Branch two: its own manager, officer, group, and borrower.
    let admin = f.admin.clone();
    let other_manager = f
        .engine
        .register_user("manager2", "Second Manager", Role::Manager)
        .unwrap();
    let other_officer = f
        .engine
        .register_user("officer2", "Second Officer", Role::LoanOfficer)
        .unwrap();
    let branch_two = f.engine.create_branch(&admin, "Ndola", "NDL").unwrap();
    f.engine.set_branch_manager(&admin, branch_two, other_manager).unwrap();
    f.engine
        .create_officer_profile(&admin, other_officer, branch_two, 40, 500)
        .unwrap();
    let group_two = f
        .engine
        .create_group(&admin, "Ndola Traders", branch_two, "Friday", None)
        .unwrap();
    f.engine
        .assign_officer_to_group(&admin, group_two, other_officer)
        .unwrap();

    let other_borrower = f.register_verified_borrower("joseph", "Joseph Daka");
    f.engine
        .add_group_member(&admin, group_two, other_borrower)
        .unwrap();
    f.engine
        .assign_client_to_officer(&admin, other_borrower, other_officer)
        .unwrap();
    let loan_two = f
        .engine
        .submit_application(
            &ActorContext::new(other_borrower),
            f.product,
            dec!(2000),
            lendvault_core_rs::LoanTerm::Weeks(8),
        )
        .unwrap();
    // The application inherits joseph's assigned officer, so the loan is
    // owned by branch two.
    f.engine.approve_loan(&f.manager.clone(), loan_two).unwrap();
    f.pay_and_verify_deposit(loan_two);
    f.engine.disburse_loan(&f.manager.clone(), loan_two).unwrap();

    TwoBranches {
        f,
        other_manager,
        other_officer,
        other_borrower,
        loan_one,
        loan_two,
    }
}

fn user(f: &Fixture, id: u64) -> lendvault_core_rs::User {
    f.engine.state().user(id).unwrap().clone()
}

#[test]
fn test_admin_sees_everything() {
    let t = two_branches();
    let admin = user(&t.f, t.f.admin.user);
    let state = t.f.engine.state();

    let loans = visible_loans(state, &admin);
    assert_eq!(loans.len(), 2);
    assert_eq!(visible_borrowers(state, &admin).len(), 2);
    assert!(!visible_groups(state, &admin).is_empty());
    assert_eq!(visible_collections(state, &admin).len(), 10 + 8);
}

#[test]
fn test_manager_is_scoped_to_their_branch() {
    let t = two_branches();
    let state = t.f.engine.state();

    let manager_one = user(&t.f, t.f.manager.user);
    let loans: Vec<u64> = visible_loans(state, &manager_one).iter().map(|l| l.id()).collect();
    assert_eq!(loans, vec![t.loan_one]);
    let borrowers: Vec<u64> = visible_borrowers(state, &manager_one)
        .iter()
        .map(|b| b.id())
        .collect();
    assert_eq!(borrowers, vec![t.f.borrower.user]);

    let manager_two = user(&t.f, t.other_manager);
    let loans: Vec<u64> = visible_loans(state, &manager_two).iter().map(|l| l.id()).collect();
    assert_eq!(loans, vec![t.loan_two]);
    let groups = visible_groups(state, &manager_two);
    assert!(groups.iter().all(|g| g.name() == "Ndola Traders"));
}

#[test]
fn test_officer_sees_own_book_only() {
    let t = two_branches();
    let state = t.f.engine.state();

    let officer_one = user(&t.f, t.f.officer.user);
    let loans: Vec<u64> = visible_loans(state, &officer_one).iter().map(|l| l.id()).collect();
    assert_eq!(loans, vec![t.loan_one]);
    let borrowers: Vec<u64> = visible_borrowers(state, &officer_one)
        .iter()
        .map(|b| b.id())
        .collect();
    assert_eq!(borrowers, vec![t.f.borrower.user]);

    let officer_two = user(&t.f, t.other_officer);
    let loans: Vec<u64> = visible_loans(state, &officer_two).iter().map(|l| l.id()).collect();
    assert_eq!(loans, vec![t.loan_two]);
    let collections = visible_collections(state, &officer_two);
    assert!(collections.iter().all(|c| c.loan() == t.loan_two));
}

#[test]
fn test_borrower_sees_self_only() {
    let t = two_branches();
    let state = t.f.engine.state();

    let borrower = user(&t.f, t.other_borrower);
    let loans: Vec<u64> = visible_loans(state, &borrower).iter().map(|l| l.id()).collect();
    assert_eq!(loans, vec![t.loan_two]);
    let borrowers: Vec<u64> = visible_borrowers(state, &borrower)
        .iter()
        .map(|b| b.id())
        .collect();
    assert_eq!(borrowers, vec![t.other_borrower]);
    assert!(visible_groups(state, &borrower).is_empty());
    let collections = visible_collections(state, &borrower);
    assert!(!collections.is_empty());
    assert!(collections.iter().all(|c| c.loan() == t.loan_two));
}

#[test]
fn test_reports_follow_the_same_scope() {
    let t = two_branches();
    let state = t.f.engine.state();

    let admin = user(&t.f, t.f.admin.user);
    let manager_two = user(&t.f, t.other_manager);
    let all = lendvault_core_rs::portfolio_summary(state, &admin);
    let scoped = lendvault_core_rs::portfolio_summary(state, &manager_two);
    assert_eq!(all.total_loans, 2);
    assert_eq!(scoped.total_loans, 1);
    assert_eq!(scoped.total_outstanding, dec!(2900.00));

    let due = state.schedules_for_loan(t.loan_two)[0].due_date();
    let sheet = lendvault_core_rs::collection_day_sheet(state, &manager_two, due);
    assert_eq!(sheet.rows.len(), 1);
    assert_eq!(sheet.total_expected, dec!(362.50));
}
