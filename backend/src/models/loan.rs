//! Loan products and loan accounts.
//!
//! A `Loan` owns its amortization arithmetic: the derived fields
//! (`total_amount`, `payment_amount`, `deposit_required`,
//! `balance_remaining`) are recomputed whenever one of their inputs changes,
//! so they can never drift from principal, rate, and term. Status moves only
//! through the guarded transition methods; each returns `LoanError` on an
//! illegal move and leaves the loan untouched.
//!
//! Status graph:
//!
//! ```text
//! pending -> approved | rejected
//! approved -> disbursed | rejected
//! disbursed -> active
//! active -> completed | defaulted
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{LoanId, LoanTypeId, UserId};
use crate::money::{floor_zero, round2};

/// Installment cadence of a loan product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentFrequency {
    Daily,
    Weekly,
}

/// Loan term, tagged by cadence.
///
/// Exactly one of days/weeks exists by construction, and the repayment
/// frequency is derived from the variant, so term and frequency cannot
/// disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanTerm {
    Days(u32),
    Weeks(u32),
}

impl LoanTerm {
    /// Number of installments.
    pub fn length(&self) -> u32 {
        match self {
            LoanTerm::Days(n) | LoanTerm::Weeks(n) => *n,
        }
    }

    pub fn frequency(&self) -> RepaymentFrequency {
        match self {
            LoanTerm::Days(_) => RepaymentFrequency::Daily,
            LoanTerm::Weeks(_) => RepaymentFrequency::Weekly,
        }
    }

    /// Calendar days between consecutive installments.
    pub fn step_days(&self) -> i64 {
        match self {
            LoanTerm::Days(_) => 1,
            LoanTerm::Weeks(_) => 7,
        }
    }

    /// Total calendar span from disbursement to maturity.
    pub fn span_days(&self) -> i64 {
        self.length() as i64 * self.step_days()
    }

    pub fn days(&self) -> Option<u32> {
        match self {
            LoanTerm::Days(n) => Some(*n),
            LoanTerm::Weeks(_) => None,
        }
    }

    pub fn weeks(&self) -> Option<u32> {
        match self {
            LoanTerm::Weeks(n) => Some(*n),
            LoanTerm::Days(_) => None,
        }
    }
}

/// Lifecycle status of a loan account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Disbursed,
    Active,
    Completed,
    Defaulted,
}

impl LoanStatus {
    /// A borrower with a loan in any of these states may not apply again.
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self,
            LoanStatus::Pending | LoanStatus::Approved | LoanStatus::Disbursed | LoanStatus::Active
        )
    }
}

/// Errors from illegal loan transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoanError {
    #[error("cannot move loan from {from:?} to {to:?}")]
    InvalidTransition { from: LoanStatus, to: LoanStatus },
}

/// A loan product definition.
///
/// `interest_rate` is a flat percentage over the whole term. Term bounds are
/// in days for daily products and weeks for weekly products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanType {
    id: LoanTypeId,
    name: String,
    interest_rate: Decimal,
    min_amount: Decimal,
    max_amount: Decimal,
    frequency: RepaymentFrequency,
    min_term: u32,
    max_term: u32,
    is_active: bool,
}

impl LoanType {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LoanTypeId,
        name: String,
        interest_rate: Decimal,
        min_amount: Decimal,
        max_amount: Decimal,
        frequency: RepaymentFrequency,
        min_term: u32,
        max_term: u32,
    ) -> Self {
        Self {
            id,
            name,
            interest_rate,
            min_amount,
            max_amount,
            frequency,
            min_term,
            max_term,
            is_active: true,
        }
    }

    pub fn id(&self) -> LoanTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interest_rate(&self) -> Decimal {
        self.interest_rate
    }

    pub fn min_amount(&self) -> Decimal {
        self.min_amount
    }

    pub fn max_amount(&self) -> Decimal {
        self.max_amount
    }

    pub fn frequency(&self) -> RepaymentFrequency {
        self.frequency
    }

    pub fn min_term(&self) -> u32 {
        self.min_term
    }

    pub fn max_term(&self) -> u32 {
        self.max_term
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

/// A loan account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    id: LoanId,
    /// `LV-` plus a six-digit sequence, unique and monotonic.
    application_number: String,
    borrower: UserId,
    loan_type: LoanTypeId,
    loan_officer: Option<UserId>,

    principal: Decimal,
    /// Denormalized from the loan type at creation.
    interest_rate: Decimal,
    term: LoanTerm,

    payment_amount: Decimal,
    total_amount: Decimal,
    amount_paid: Decimal,
    balance_remaining: Decimal,

    /// 10% of principal, fixed at creation.
    deposit_required: Decimal,
    deposit_paid: Decimal,
    deposit_verified: bool,

    /// True for high-value loans that need an admin escalation decision.
    manager_approval_required: bool,

    status: LoanStatus,
    applied_at: DateTime<Utc>,
    approved_by: Option<UserId>,
    approved_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    disbursement_date: Option<NaiveDate>,
    maturity_date: Option<NaiveDate>,
    completed_at: Option<DateTime<Utc>>,
    defaulted_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// Create a pending application with all derived fields computed.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LoanId,
        application_number: String,
        borrower: UserId,
        loan_type: &LoanType,
        principal: Decimal,
        term: LoanTerm,
        deposit_rate: Decimal,
        manager_approval_required: bool,
        applied_at: DateTime<Utc>,
    ) -> Self {
        let mut loan = Self {
            id,
            application_number,
            borrower,
            loan_type: loan_type.id(),
            loan_officer: None,
            principal,
            interest_rate: loan_type.interest_rate(),
            term,
            payment_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            amount_paid: Decimal::ZERO,
            balance_remaining: Decimal::ZERO,
            deposit_required: Decimal::ZERO,
            deposit_paid: Decimal::ZERO,
            deposit_verified: false,
            manager_approval_required,
            status: LoanStatus::Pending,
            applied_at,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            disbursement_date: None,
            maturity_date: None,
            completed_at: None,
            defaulted_at: None,
        };
        loan.recompute_derived(deposit_rate);
        loan
    }

    pub fn id(&self) -> LoanId {
        self.id
    }

    pub fn application_number(&self) -> &str {
        &self.application_number
    }

    pub fn borrower(&self) -> UserId {
        self.borrower
    }

    pub fn loan_type(&self) -> LoanTypeId {
        self.loan_type
    }

    pub fn loan_officer(&self) -> Option<UserId> {
        self.loan_officer
    }

    pub fn principal(&self) -> Decimal {
        self.principal
    }

    pub fn interest_rate(&self) -> Decimal {
        self.interest_rate
    }

    pub fn term(&self) -> LoanTerm {
        self.term
    }

    pub fn frequency(&self) -> RepaymentFrequency {
        self.term.frequency()
    }

    pub fn term_days(&self) -> Option<u32> {
        self.term.days()
    }

    pub fn term_weeks(&self) -> Option<u32> {
        self.term.weeks()
    }

    pub fn payment_amount(&self) -> Decimal {
        self.payment_amount
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn amount_paid(&self) -> Decimal {
        self.amount_paid
    }

    pub fn balance_remaining(&self) -> Decimal {
        self.balance_remaining
    }

    pub fn deposit_required(&self) -> Decimal {
        self.deposit_required
    }

    pub fn deposit_paid(&self) -> Decimal {
        self.deposit_paid
    }

    pub fn deposit_verified(&self) -> bool {
        self.deposit_verified
    }

    pub fn manager_approval_required(&self) -> bool {
        self.manager_approval_required
    }

    pub fn status(&self) -> LoanStatus {
        self.status
    }

    pub fn applied_at(&self) -> DateTime<Utc> {
        self.applied_at
    }

    pub fn approved_by(&self) -> Option<UserId> {
        self.approved_by
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn disbursement_date(&self) -> Option<NaiveDate> {
        self.disbursement_date
    }

    pub fn maturity_date(&self) -> Option<NaiveDate> {
        self.maturity_date
    }

    pub fn set_loan_officer(&mut self, officer: Option<UserId>) {
        self.loan_officer = officer;
    }

    /// Reprice the application. Only legal while still pending; derived
    /// fields are recomputed from the new inputs.
    pub fn reprice(
        &mut self,
        principal: Decimal,
        interest_rate: Decimal,
        term: LoanTerm,
        deposit_rate: Decimal,
    ) -> Result<(), LoanError> {
        if self.status != LoanStatus::Pending {
            return Err(LoanError::InvalidTransition {
                from: self.status,
                to: LoanStatus::Pending,
            });
        }
        self.principal = principal;
        self.interest_rate = interest_rate;
        self.term = term;
        self.recompute_derived(deposit_rate);
        Ok(())
    }

    fn recompute_derived(&mut self, deposit_rate: Decimal) {
        self.deposit_required = round2(self.principal * deposit_rate);
        self.total_amount = round2(self.principal * (Decimal::ONE + self.interest_rate / dec!(100)));
        let installments = Decimal::from(self.term.length().max(1));
        self.payment_amount = round2(self.total_amount / installments);
        self.balance_remaining = floor_zero(self.total_amount - self.amount_paid);
    }

    pub fn approve(&mut self, by: UserId, at: DateTime<Utc>) -> Result<(), LoanError> {
        self.transition(LoanStatus::Pending, LoanStatus::Approved)?;
        self.approved_by = Some(by);
        self.approved_at = Some(at);
        Ok(())
    }

    pub fn reject(&mut self, reason: String) -> Result<(), LoanError> {
        if !matches!(self.status, LoanStatus::Pending | LoanStatus::Approved) {
            return Err(LoanError::InvalidTransition {
                from: self.status,
                to: LoanStatus::Rejected,
            });
        }
        self.status = LoanStatus::Rejected;
        self.rejection_reason = Some(reason);
        Ok(())
    }

    /// Record disbursement and derive the maturity date from the term.
    pub fn mark_disbursed(&mut self, on: NaiveDate) -> Result<(), LoanError> {
        self.transition(LoanStatus::Approved, LoanStatus::Disbursed)?;
        self.disbursement_date = Some(on);
        self.maturity_date = Some(on + Duration::days(self.term.span_days()));
        Ok(())
    }

    /// Activation follows schedule generation immediately.
    pub fn activate(&mut self) -> Result<(), LoanError> {
        self.transition(LoanStatus::Disbursed, LoanStatus::Active)
    }

    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), LoanError> {
        self.transition(LoanStatus::Active, LoanStatus::Completed)?;
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn mark_defaulted(&mut self, at: DateTime<Utc>) -> Result<(), LoanError> {
        self.transition(LoanStatus::Active, LoanStatus::Defaulted)?;
        self.defaulted_at = Some(at);
        Ok(())
    }

    fn transition(&mut self, from: LoanStatus, to: LoanStatus) -> Result<(), LoanError> {
        if self.status != from {
            return Err(LoanError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Mirror of the security-deposit record, kept for read paths that only
    /// load the loan.
    pub fn record_deposit_payment(&mut self, amount: Decimal) {
        self.deposit_paid = amount;
        self.deposit_verified = false;
    }

    pub fn set_deposit_verified(&mut self, verified: bool) {
        self.deposit_verified = verified;
        if !verified {
            self.deposit_paid = Decimal::ZERO;
        }
    }

    /// Apply a confirmed repayment. The deposit is tracked separately and
    /// never flows through here; the balance floors at zero.
    pub fn apply_payment(&mut self, amount: Decimal) {
        self.amount_paid += amount;
        self.balance_remaining = floor_zero(self.total_amount - self.amount_paid);
    }

    pub fn is_repaid(&self) -> bool {
        self.balance_remaining <= Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn weekly_type() -> LoanType {
        LoanType::new(
            1,
            "Weekly 45".into(),
            dec!(45),
            dec!(1000),
            dec!(100000),
            RepaymentFrequency::Weekly,
            4,
            24,
        )
    }

    fn sample_loan(principal: Decimal, weeks: u32) -> Loan {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        Loan::new(
            10,
            "LV-000001".into(),
            2,
            &weekly_type(),
            principal,
            LoanTerm::Weeks(weeks),
            dec!(0.10),
            false,
            at,
        )
    }

    #[test]
    fn test_derived_amounts() {
        let loan = sample_loan(dec!(5000), 10);
        assert_eq!(loan.total_amount(), dec!(7250.00));
        assert_eq!(loan.payment_amount(), dec!(725.00));
        assert_eq!(loan.deposit_required(), dec!(500.00));
        assert_eq!(loan.balance_remaining(), dec!(7250.00));
        assert_eq!(loan.term_weeks(), Some(10));
        assert_eq!(loan.term_days(), None);
        assert_eq!(loan.frequency(), RepaymentFrequency::Weekly);
    }

    #[test]
    fn test_reprice_recomputes() {
        let mut loan = sample_loan(dec!(5000), 10);
        loan.reprice(dec!(8000), dec!(45), LoanTerm::Weeks(16), dec!(0.10))
            .unwrap();
        assert_eq!(loan.total_amount(), dec!(11600.00));
        assert_eq!(loan.payment_amount(), dec!(725.00));
        assert_eq!(loan.deposit_required(), dec!(800.00));
    }

    #[test]
    fn test_reprice_refused_after_approval() {
        let at = Utc.with_ymd_and_hms(2026, 1, 6, 9, 0, 0).unwrap();
        let mut loan = sample_loan(dec!(5000), 10);
        loan.approve(99, at).unwrap();
        let err = loan
            .reprice(dec!(6000), dec!(45), LoanTerm::Weeks(10), dec!(0.10))
            .unwrap_err();
        assert_eq!(
            err,
            LoanError::InvalidTransition {
                from: LoanStatus::Approved,
                to: LoanStatus::Pending,
            }
        );
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let at = Utc.with_ymd_and_hms(2026, 1, 6, 9, 0, 0).unwrap();
        let mut loan = sample_loan(dec!(5000), 10);
        loan.approve(99, at).unwrap();
        loan.mark_disbursed(NaiveDate::from_ymd_opt(2026, 1, 7).unwrap())
            .unwrap();
        assert_eq!(
            loan.maturity_date(),
            Some(NaiveDate::from_ymd_opt(2026, 3, 18).unwrap())
        );
        loan.activate().unwrap();
        loan.complete(at).unwrap();
        assert_eq!(loan.status(), LoanStatus::Completed);
    }

    #[test]
    fn test_double_approve_refused() {
        let at = Utc.with_ymd_and_hms(2026, 1, 6, 9, 0, 0).unwrap();
        let mut loan = sample_loan(dec!(5000), 10);
        loan.approve(99, at).unwrap();
        assert!(loan.approve(99, at).is_err());
    }

    #[test]
    fn test_apply_payment_floors_balance() {
        let mut loan = sample_loan(dec!(5000), 10);
        loan.apply_payment(dec!(7000.00));
        assert_eq!(loan.balance_remaining(), dec!(250.00));
        loan.apply_payment(dec!(500.00));
        assert_eq!(loan.balance_remaining(), Decimal::ZERO);
        assert_eq!(loan.amount_paid(), dec!(7500.00));
        assert!(loan.is_repaid());
    }

    #[test]
    fn test_deposit_mirror_reset_on_reject() {
        let mut loan = sample_loan(dec!(5000), 10);
        loan.record_deposit_payment(dec!(500.00));
        assert_eq!(loan.deposit_paid(), dec!(500.00));
        loan.set_deposit_verified(false);
        assert_eq!(loan.deposit_paid(), Decimal::ZERO);
    }
}
