//! Installment schedule rows.
//!
//! One row per installment, ordered by `installment_number` within a loan.
//! Flat interest is amortized uniformly, so each row carries the whole
//! installment in `principal_amount` and zero `interest_amount`; rounding
//! residuals are absorbed by the final installment at generation time so the
//! rows sum exactly to the loan's `total_amount`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{LoanId, ScheduleId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("installment already paid")]
    AlreadyPaid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSchedule {
    id: ScheduleId,
    loan: LoanId,
    installment_number: u32,
    due_date: NaiveDate,
    principal_amount: Decimal,
    interest_amount: Decimal,
    total_amount: Decimal,
    is_paid: bool,
    paid_date: Option<NaiveDate>,
    penalty_amount: Decimal,
}

impl PaymentSchedule {
    pub fn new(
        id: ScheduleId,
        loan: LoanId,
        installment_number: u32,
        due_date: NaiveDate,
        total_amount: Decimal,
    ) -> Self {
        Self {
            id,
            loan,
            installment_number,
            due_date,
            principal_amount: total_amount,
            interest_amount: Decimal::ZERO,
            total_amount,
            is_paid: false,
            paid_date: None,
            penalty_amount: Decimal::ZERO,
        }
    }

    pub fn id(&self) -> ScheduleId {
        self.id
    }

    pub fn loan(&self) -> LoanId {
        self.loan
    }

    pub fn installment_number(&self) -> u32 {
        self.installment_number
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn principal_amount(&self) -> Decimal {
        self.principal_amount
    }

    pub fn interest_amount(&self) -> Decimal {
        self.interest_amount
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn paid_date(&self) -> Option<NaiveDate> {
        self.paid_date
    }

    pub fn penalty_amount(&self) -> Decimal {
        self.penalty_amount
    }

    pub fn mark_paid(&mut self, on: NaiveDate) -> Result<(), ScheduleError> {
        if self.is_paid {
            return Err(ScheduleError::AlreadyPaid);
        }
        self.is_paid = true;
        self.paid_date = Some(on);
        Ok(())
    }

    pub fn add_penalty(&mut self, amount: Decimal) {
        self.penalty_amount += amount;
    }

    /// Unpaid and past due relative to `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_paid && self.due_date < today
    }
}
