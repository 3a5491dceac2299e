//! Role-scoped read models.
//!
//! Covers:
//! 1. **Portfolio summary** -- loan counts by status, disbursed principal,
//!    outstanding balance, collected repayments.
//! 2. **Collection day sheet** -- expected vs collected intake for one date,
//!    with per-loan rows.
//!
//! Both are computed over exactly the rows the actor may see (the same
//! predicates as every other read path), so a manager's summary is their
//! branch and a borrower's is their own loan.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::authz::{visible_collections, visible_loans};
use crate::models::collection::CollectionStatus;
use crate::models::loan::LoanStatus;
use crate::models::{LedgerState, LoanId, User};

/// Aggregate view of the loans an actor can see.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_loans: usize,
    pub by_status: BTreeMap<String, usize>,
    pub principal_disbursed: Decimal,
    pub total_outstanding: Decimal,
    pub total_collected: Decimal,
}

/// One loan's line on a collection day sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySheetRow {
    pub loan: LoanId,
    pub application_number: String,
    pub expected_amount: Decimal,
    pub collected_amount: Decimal,
    pub status: CollectionStatus,
    pub is_partial: bool,
}

/// Expected vs collected intake for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDaySheet {
    pub date: NaiveDate,
    pub rows: Vec<DaySheetRow>,
    pub total_expected: Decimal,
    pub total_collected: Decimal,
    pub open_rows: usize,
}

fn status_key(status: LoanStatus) -> String {
    format!("{status:?}").to_ascii_lowercase()
}

/// Summarize the loans visible to `actor`.
pub fn portfolio_summary(state: &LedgerState, actor: &User) -> PortfolioSummary {
    let mut summary = PortfolioSummary::default();
    for loan in visible_loans(state, actor) {
        summary.total_loans += 1;
        *summary.by_status.entry(status_key(loan.status())).or_insert(0) += 1;
        if loan.disbursement_date().is_some() {
            summary.principal_disbursed += loan.principal();
        }
        summary.total_outstanding += loan.balance_remaining();
        summary.total_collected += loan.amount_paid();
    }
    summary
}

/// The collection calendar for `date`, restricted to the rows visible to
/// `actor`.
pub fn collection_day_sheet(state: &LedgerState, actor: &User, date: NaiveDate) -> CollectionDaySheet {
    let mut rows = Vec::new();
    let mut total_expected = Decimal::ZERO;
    let mut total_collected = Decimal::ZERO;
    let mut open_rows = 0;
    for collection in visible_collections(state, actor) {
        if collection.collection_date() != date {
            continue;
        }
        let application_number = state
            .loan(collection.loan())
            .map(|l| l.application_number().to_string())
            .unwrap_or_default();
        total_expected += collection.expected_amount();
        total_collected += collection.collected_amount();
        if collection.is_open() {
            open_rows += 1;
        }
        rows.push(DaySheetRow {
            loan: collection.loan(),
            application_number,
            expected_amount: collection.expected_amount(),
            collected_amount: collection.collected_amount(),
            status: collection.status(),
            is_partial: collection.is_partial(),
        });
    }
    rows.sort_by_key(|r| r.loan);
    CollectionDaySheet {
        date,
        rows,
        total_expected,
        total_collected,
        open_rows,
    }
}
