//! Repayment records.
//!
//! `Payment` is a single money movement against a loan, optionally bound to
//! one installment. `MultiSchedulePayment` settles several installments with
//! one movement; it owns its per-installment allocations, which are fixed to
//! the installment totals at submission. Any excess over the allocated sum
//! stays recorded on `total_amount` and is never auto-applied to further
//! installments.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{LoanId, MultiPaymentId, PaymentId, ScheduleId, UserId};

/// How money arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    MobileMoney,
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("payment already completed")]
    AlreadyCompleted,

    #[error("payment is not pending (status {status:?})")]
    NotPending { status: PaymentStatus },
}

/// A single repayment submitted by a borrower and confirmed by staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    /// `PAY-` plus a six-digit sequence, unique and monotonic.
    payment_number: String,
    loan: LoanId,
    schedule: Option<ScheduleId>,
    amount: Decimal,
    method: PaymentMethod,
    status: PaymentStatus,
    payment_date: Option<DateTime<Utc>>,
    reference: Option<String>,
    notes: String,
    submitted_by: UserId,
    processed_by: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl Payment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: PaymentId,
        payment_number: String,
        loan: LoanId,
        schedule: Option<ScheduleId>,
        amount: Decimal,
        method: PaymentMethod,
        reference: Option<String>,
        submitted_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            payment_number,
            loan,
            schedule,
            amount,
            method,
            status: PaymentStatus::Pending,
            payment_date: None,
            reference,
            notes: String::new(),
            submitted_by,
            processed_by: None,
            created_at,
        }
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn payment_number(&self) -> &str {
        &self.payment_number
    }

    pub fn loan(&self) -> LoanId {
        self.loan
    }

    pub fn schedule(&self) -> Option<ScheduleId> {
        self.schedule
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn payment_date(&self) -> Option<DateTime<Utc>> {
        self.payment_date
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn submitted_by(&self) -> UserId {
        self.submitted_by
    }

    pub fn processed_by(&self) -> Option<UserId> {
        self.processed_by
    }

    /// Confirm the payment. Sets the payment date if the submitter did not
    /// supply one.
    pub fn complete(&mut self, by: UserId, at: DateTime<Utc>) -> Result<(), PaymentError> {
        match self.status {
            PaymentStatus::Pending => {
                self.status = PaymentStatus::Completed;
                self.processed_by = Some(by);
                if self.payment_date.is_none() {
                    self.payment_date = Some(at);
                }
                Ok(())
            }
            PaymentStatus::Completed => Err(PaymentError::AlreadyCompleted),
            status => Err(PaymentError::NotPending { status }),
        }
    }

    pub fn fail(&mut self, by: UserId, reason: &str) -> Result<(), PaymentError> {
        match self.status {
            PaymentStatus::Pending => {
                self.status = PaymentStatus::Failed;
                self.processed_by = Some(by);
                if !self.notes.is_empty() {
                    self.notes.push('\n');
                }
                self.notes.push_str(&format!("REJECTED: {reason}"));
                Ok(())
            }
            status => Err(PaymentError::NotPending { status }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiPaymentStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultiPaymentError {
    #[error("multi-schedule payment already decided: {status:?}")]
    AlreadyDecided { status: MultiPaymentStatus },
}

/// Amount applied to one installment by a multi-schedule payment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleAllocation {
    pub schedule: ScheduleId,
    pub amount_applied: Decimal,
}

/// One money movement settling several installments of a loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiSchedulePayment {
    id: MultiPaymentId,
    loan: LoanId,
    total_amount: Decimal,
    status: MultiPaymentStatus,
    payment_date: DateTime<Utc>,
    method: PaymentMethod,
    reference: Option<String>,
    allocations: Vec<ScheduleAllocation>,
    submitted_by: UserId,
    processed_by: Option<UserId>,
    processed_at: Option<DateTime<Utc>>,
    notes: String,
}

impl MultiSchedulePayment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: MultiPaymentId,
        loan: LoanId,
        total_amount: Decimal,
        payment_date: DateTime<Utc>,
        method: PaymentMethod,
        reference: Option<String>,
        allocations: Vec<ScheduleAllocation>,
        submitted_by: UserId,
    ) -> Self {
        Self {
            id,
            loan,
            total_amount,
            status: MultiPaymentStatus::Pending,
            payment_date,
            method,
            reference,
            allocations,
            submitted_by,
            processed_by: None,
            processed_at: None,
            notes: String::new(),
        }
    }

    pub fn id(&self) -> MultiPaymentId {
        self.id
    }

    pub fn loan(&self) -> LoanId {
        self.loan
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn status(&self) -> MultiPaymentStatus {
        self.status
    }

    pub fn payment_date(&self) -> DateTime<Utc> {
        self.payment_date
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn allocations(&self) -> &[ScheduleAllocation] {
        &self.allocations
    }

    pub fn submitted_by(&self) -> UserId {
        self.submitted_by
    }

    pub fn processed_by(&self) -> Option<UserId> {
        self.processed_by
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Sum of the per-installment allocations. At most `total_amount`; any
    /// difference is recorded overpayment.
    pub fn allocated_total(&self) -> Decimal {
        self.allocations.iter().map(|a| a.amount_applied).sum()
    }

    pub fn overpayment(&self) -> Decimal {
        self.total_amount - self.allocated_total()
    }

    pub fn approve(&mut self, by: UserId, at: DateTime<Utc>) -> Result<(), MultiPaymentError> {
        self.decide(MultiPaymentStatus::Approved, by, at)
    }

    pub fn reject(
        &mut self,
        by: UserId,
        at: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), MultiPaymentError> {
        self.decide(MultiPaymentStatus::Rejected, by, at)?;
        self.notes.push_str(&format!("REJECTED: {reason}"));
        Ok(())
    }

    fn decide(
        &mut self,
        status: MultiPaymentStatus,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), MultiPaymentError> {
        if self.status != MultiPaymentStatus::Pending {
            return Err(MultiPaymentError::AlreadyDecided {
                status: self.status,
            });
        }
        self.status = status;
        self.processed_by = Some(by);
        self.processed_at = Some(at);
        Ok(())
    }
}
