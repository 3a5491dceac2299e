//! Collection ledger rows.
//!
//! A `PaymentCollection` is the calendar view of expected intake: one row per
//! (loan, date), seeded alongside the installment schedule at disbursement
//! and kept in 1:1 correspondence with it. Cash recorded in the field accrues
//! on `collected_amount`; bulk approval completes rows whose collected amount
//! covers the expectation and skips partials.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CollectionId, LoanId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectionError {
    #[error("collection is not open (status {status:?})")]
    NotOpen { status: CollectionStatus },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCollection {
    id: CollectionId,
    loan: LoanId,
    collection_date: NaiveDate,
    expected_amount: Decimal,
    collected_amount: Decimal,
    status: CollectionStatus,
    is_partial: bool,
    is_default: bool,
    is_late: bool,
    collected_by: Option<UserId>,
    approved_by: Option<UserId>,
    approved_date: Option<NaiveDate>,
    actual_collection_date: Option<DateTime<Utc>>,
}

impl PaymentCollection {
    pub fn new(
        id: CollectionId,
        loan: LoanId,
        collection_date: NaiveDate,
        expected_amount: Decimal,
    ) -> Self {
        Self {
            id,
            loan,
            collection_date,
            expected_amount,
            collected_amount: Decimal::ZERO,
            status: CollectionStatus::Scheduled,
            is_partial: false,
            is_default: false,
            is_late: false,
            collected_by: None,
            approved_by: None,
            approved_date: None,
            actual_collection_date: None,
        }
    }

    pub fn id(&self) -> CollectionId {
        self.id
    }

    pub fn loan(&self) -> LoanId {
        self.loan
    }

    pub fn collection_date(&self) -> NaiveDate {
        self.collection_date
    }

    pub fn expected_amount(&self) -> Decimal {
        self.expected_amount
    }

    pub fn collected_amount(&self) -> Decimal {
        self.collected_amount
    }

    pub fn status(&self) -> CollectionStatus {
        self.status
    }

    pub fn is_partial(&self) -> bool {
        self.is_partial
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn is_late(&self) -> bool {
        self.is_late
    }

    pub fn collected_by(&self) -> Option<UserId> {
        self.collected_by
    }

    pub fn approved_by(&self) -> Option<UserId> {
        self.approved_by
    }

    pub fn approved_date(&self) -> Option<NaiveDate> {
        self.approved_date
    }

    pub fn actual_collection_date(&self) -> Option<DateTime<Utc>> {
        self.actual_collection_date
    }

    /// Still awaiting approval (scheduled or with cash recorded).
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            CollectionStatus::Scheduled | CollectionStatus::InProgress
        )
    }

    pub fn is_fully_collected(&self) -> bool {
        self.collected_amount >= self.expected_amount
    }

    /// Accrue field-recorded cash onto the row.
    pub fn record(
        &mut self,
        amount: Decimal,
        by: UserId,
        at: DateTime<Utc>,
        late: bool,
    ) -> Result<(), CollectionError> {
        if !self.is_open() {
            return Err(CollectionError::NotOpen {
                status: self.status,
            });
        }
        self.collected_amount += amount;
        self.collected_by = Some(by);
        self.actual_collection_date = Some(at);
        self.is_late = late;
        self.is_partial = self.collected_amount < self.expected_amount;
        self.status = CollectionStatus::InProgress;
        Ok(())
    }

    /// Overwrite the collected amount from a confirmed payment mirror.
    pub fn set_collected(&mut self, amount: Decimal, by: UserId, at: DateTime<Utc>) {
        self.collected_amount = amount;
        self.collected_by = Some(by);
        self.actual_collection_date = Some(at);
        self.is_partial = amount < self.expected_amount;
    }

    pub fn approve(&mut self, by: UserId, on: NaiveDate) -> Result<(), CollectionError> {
        if !self.is_open() {
            return Err(CollectionError::NotOpen {
                status: self.status,
            });
        }
        self.status = CollectionStatus::Completed;
        self.approved_by = Some(by);
        self.approved_date = Some(on);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), CollectionError> {
        if !self.is_open() {
            return Err(CollectionError::NotOpen {
                status: self.status,
            });
        }
        self.status = CollectionStatus::Cancelled;
        Ok(())
    }

    /// Flag set by the default scan on the rows that breached the threshold.
    pub fn mark_default(&mut self) {
        self.is_default = true;
    }
}
