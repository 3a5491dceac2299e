//! Field collection recording and bulk approval.
//!
//! Officers record cash against the collection calendar during the day;
//! bulk approval then completes every row whose collected amount covers the
//! expectation, marks the matching installments paid, and advances
//! fully-settled loans. Partial rows are tallied as skipped, never silently
//! approved.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;

use crate::authz::can_view_loan;
use crate::engine::{ActorContext, LoanEngine};
use crate::error::{EngineError, EngineResult};
use crate::models::audit::{AuditAction, AuditStream};
use crate::models::loan::LoanStatus;
use crate::models::{CollectionId, LoanId};

/// What a bulk approval run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionScope {
    /// The single collection row of one loan on one date.
    Single { loan: LoanId, date: NaiveDate },
    /// Every collection row on one date that the actor may see.
    AllForDate { date: NaiveDate },
}

/// Tally of a bulk approval run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkApprovalOutcome {
    pub approved: usize,
    /// Rows left open because the collected amount fell short.
    pub skipped: usize,
    pub loans_completed: usize,
}

impl LoanEngine {
    /// Record cash collected in the field against a loan's collection row
    /// for a date. Accrues onto any amount already recorded.
    pub fn record_collection(
        &mut self,
        ctx: &ActorContext,
        loan: LoanId,
        date: NaiveDate,
        amount: Decimal,
    ) -> EngineResult<()> {
        let collector = self.require_staff(ctx, "recording a collection")?.id();
        if amount <= Decimal::ZERO {
            return Err(EngineError::validation("amount", "must be positive"));
        }
        self.require_loan(loan)?;
        let collection_id = self
            .state
            .collection_id_for(loan, date)
            .ok_or_else(|| EngineError::not_found("collection row", format!("{loan}@{date}")))?;

        let at = self.now();
        let late = self.clock.today() > date;
        let row = self
            .state
            .collection_mut(collection_id)
            .expect("row looked up above");
        row.record(amount, collector, at, late)
            .map_err(|e| EngineError::Precondition(e.to_string()))?;
        let collected = row.collected_amount();
        let expected = row.expected_amount();

        let entry = self
            .entry(AuditStream::Collection, AuditAction::CollectionRecorded, ctx)
            .loan(loan)
            .after(json!({
                "date": date,
                "collected_amount": collected,
                "expected_amount": expected,
            }));
        self.record(entry);
        tracing::debug!(loan, %date, %amount, %collected, "collection recorded");
        Ok(())
    }

    /// Approve every fully-collected open row in scope.
    ///
    /// For each: complete the row, mark the installments due that day paid,
    /// and advance the loan if its schedule is now fully settled. Rows with
    /// `collected < expected` are counted as skipped and left open.
    pub fn bulk_approve_collections(
        &mut self,
        ctx: &ActorContext,
        scope: CollectionScope,
    ) -> EngineResult<BulkApprovalOutcome> {
        let approver = self.require_staff(ctx, "bulk-approving collections")?.clone();

        let candidates: Vec<CollectionId> = match scope {
            CollectionScope::Single { loan, date } => {
                self.require_loan(loan)?;
                self.state
                    .collection_id_for(loan, date)
                    .into_iter()
                    .collect()
            }
            CollectionScope::AllForDate { date } => self
                .state
                .collections()
                .filter(|c| c.collection_date() == date && c.is_open())
                .filter(|c| {
                    self.state
                        .loan(c.loan())
                        .map(|l| can_view_loan(&self.state, &approver, l))
                        .unwrap_or(false)
                })
                .map(|c| c.id())
                .collect(),
        };

        let today = self.clock.today();
        let mut outcome = BulkApprovalOutcome::default();
        for collection_id in candidates {
            let row = self
                .state
                .collection(collection_id)
                .expect("candidate ids come from the state");
            if !row.is_open() {
                continue;
            }
            if !row.is_fully_collected() {
                outcome.skipped += 1;
                continue;
            }
            let loan = row.loan();
            let date = row.collection_date();
            let collected = row.collected_amount();

            self.state
                .collection_mut(collection_id)
                .expect("row checked above")
                .approve(approver.id(), today)
                .map_err(|e| EngineError::Precondition(e.to_string()))?;

            let due_ids: Vec<_> = self
                .state
                .schedules_for_loan(loan)
                .iter()
                .filter(|s| s.due_date() == date && !s.is_paid())
                .map(|s| s.id())
                .collect();
            for schedule_id in due_ids {
                self.state
                    .schedule_mut(schedule_id)
                    .expect("id from the loan's schedule set")
                    .mark_paid(today)
                    .map_err(|e| EngineError::Precondition(e.to_string()))?;
            }

            let entry = self
                .entry(AuditStream::Collection, AuditAction::CollectionApproved, ctx)
                .loan(loan)
                .after(json!({ "date": date, "collected_amount": collected }));
            self.record(entry);

            outcome.approved += 1;
            let was_active = self
                .state
                .loan(loan)
                .map(|l| l.status() == LoanStatus::Active)
                .unwrap_or(false);
            if self.finalize_if_complete(loan, Some(ctx)) && was_active {
                outcome.loans_completed += 1;
            }
        }

        tracing::info!(
            approved = outcome.approved,
            skipped = outcome.skipped,
            loans_completed = outcome.loans_completed,
            "bulk collection approval finished"
        );
        Ok(outcome)
    }
}
