//! Role-scoped visibility filters.
//!
//! Every read path narrows through these predicates rather than filtering
//! after the fetch, so paginated views built on top stay correct:
//!
//! | Role         | Loans                      | Borrowers            | Groups           | Collections      |
//! |--------------|----------------------------|----------------------|------------------|------------------|
//! | admin        | all                        | all                  | all              | all              |
//! | manager      | same branch                | same branch          | same branch      | same branch      |
//! | loan_officer | own loans or group members | members of own groups| own groups       | loans in scope   |
//! | borrower     | own                        | self                 | none             | own loan         |
//!
//! "Same branch" compares the branch of the entity's responsible officer
//! (via `OfficerAssignment`) with the branch the manager manages.

use crate::models::{
    BorrowerGroup, BranchId, LedgerState, Loan, PaymentCollection, Role, User, UserId,
};

/// The officer answerable for a loan: the assigned loan officer, falling
/// back to the borrower's assigned officer.
fn responsible_officer(state: &LedgerState, loan: &Loan) -> Option<UserId> {
    loan.loan_officer()
        .or_else(|| state.user(loan.borrower()).and_then(|b| b.assigned_officer()))
}

fn officer_branch(state: &LedgerState, officer: UserId) -> Option<BranchId> {
    state.officer_profile(officer).and_then(|p| p.branch())
}

fn managed_branch_id(state: &LedgerState, manager: UserId) -> Option<BranchId> {
    state.managed_branch(manager).map(|b| b.id())
}

fn loan_branch(state: &LedgerState, loan: &Loan) -> Option<BranchId> {
    responsible_officer(state, loan).and_then(|o| officer_branch(state, o))
}

fn borrower_branch(state: &LedgerState, borrower: &User) -> Option<BranchId> {
    borrower
        .assigned_officer()
        .and_then(|o| officer_branch(state, o))
}

/// Whether `actor` may read `loan`.
pub fn can_view_loan(state: &LedgerState, actor: &User, loan: &Loan) -> bool {
    match actor.role() {
        Role::Admin => true,
        Role::Manager => match (managed_branch_id(state, actor.id()), loan_branch(state, loan)) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => false,
        },
        Role::LoanOfficer => {
            loan.loan_officer() == Some(actor.id())
                || state.borrower_in_officer_groups(actor.id(), loan.borrower())
        }
        Role::Borrower => loan.borrower() == actor.id(),
    }
}

/// Loans readable by `actor`, in id order.
pub fn visible_loans<'a>(state: &'a LedgerState, actor: &User) -> Vec<&'a Loan> {
    state
        .loans()
        .filter(|loan| can_view_loan(state, actor, loan))
        .collect()
}

/// Borrowers readable by `actor`.
pub fn visible_borrowers<'a>(state: &'a LedgerState, actor: &User) -> Vec<&'a User> {
    let borrowers = state.users().filter(|u| u.role() == Role::Borrower);
    match actor.role() {
        Role::Admin => borrowers.collect(),
        Role::Manager => {
            let mine = managed_branch_id(state, actor.id());
            borrowers
                .filter(|b| mine.is_some() && borrower_branch(state, b) == mine)
                .collect()
        }
        Role::LoanOfficer => borrowers
            .filter(|b| state.borrower_in_officer_groups(actor.id(), b.id()))
            .collect(),
        Role::Borrower => borrowers.filter(|b| b.id() == actor.id()).collect(),
    }
}

/// Groups readable by `actor`. Borrowers see none.
pub fn visible_groups<'a>(state: &'a LedgerState, actor: &User) -> Vec<&'a BorrowerGroup> {
    match actor.role() {
        Role::Admin => state.groups().collect(),
        Role::Manager => {
            let mine = managed_branch_id(state, actor.id());
            state
                .groups()
                .filter(|g| mine.is_some() && g.branch() == mine)
                .collect()
        }
        Role::LoanOfficer => state
            .groups()
            .filter(|g| g.assigned_officer() == Some(actor.id()))
            .collect(),
        Role::Borrower => Vec::new(),
    }
}

/// Collection rows readable by `actor`: exactly the rows of loans the actor
/// may read.
pub fn visible_collections<'a>(state: &'a LedgerState, actor: &User) -> Vec<&'a PaymentCollection> {
    state
        .collections()
        .filter(|c| {
            state
                .loan(c.loan())
                .map(|loan| can_view_loan(state, actor, loan))
                .unwrap_or(false)
        })
        .collect()
}
