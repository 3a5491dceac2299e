//! Multi-schedule settlement.
//!
//! One money movement that settles several unpaid installments of a loan.
//! Allocations are fixed to the installment totals at submission; any excess
//! over the allocated sum stays recorded on the payment and is never
//! auto-applied to further installments.

use rust_decimal::Decimal;
use serde_json::json;

use crate::engine::{ActorContext, LoanEngine};
use crate::error::{EngineError, EngineResult};
use crate::models::audit::{AuditAction, AuditStream};
use crate::models::loan::LoanStatus;
use crate::models::notification::{Audience, NotificationKind};
use crate::models::payment::{
    MultiPaymentStatus, MultiSchedulePayment, PaymentMethod, ScheduleAllocation,
};
use crate::models::{LoanId, MultiPaymentId, ScheduleId};

/// Ledger effect of an approved multi-schedule payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiPaymentOutcome {
    pub payment: MultiPaymentId,
    pub loan: LoanId,
    pub schedules_settled: usize,
    pub overpayment: Decimal,
    pub balance_remaining: Decimal,
    pub loan_completed: bool,
}

impl LoanEngine {
    /// Submit one payment covering several unpaid installments.
    ///
    /// The amount must cover the sum of the selected installments; each
    /// selected installment must belong to the loan, be unpaid, and appear
    /// once.
    pub fn submit_multi_payment(
        &mut self,
        ctx: &ActorContext,
        loan: LoanId,
        schedules: &[ScheduleId],
        amount: Decimal,
        method: PaymentMethod,
        reference: Option<String>,
    ) -> EngineResult<MultiPaymentId> {
        let actor = self.require_actor(ctx)?;
        let actor_id = actor.id();
        let actor_is_staff = actor.role().is_staff();
        let l = self.require_loan(loan)?;
        if l.borrower() != actor_id && !actor_is_staff {
            return Err(EngineError::Authorization(
                "only the borrower or staff may submit a payment on this loan".into(),
            ));
        }
        if l.status() != LoanStatus::Active {
            return Err(EngineError::Precondition(format!(
                "loan {} is {:?}; payments apply to active loans",
                l.application_number(),
                l.status()
            )));
        }
        if schedules.is_empty() {
            return Err(EngineError::validation(
                "schedules",
                "select at least one installment",
            ));
        }
        let application_number = l.application_number().to_string();

        let mut allocations = Vec::with_capacity(schedules.len());
        let mut required = Decimal::ZERO;
        for &schedule_id in schedules {
            if allocations
                .iter()
                .any(|a: &ScheduleAllocation| a.schedule == schedule_id)
            {
                return Err(EngineError::validation(
                    "schedules",
                    format!("installment {schedule_id} selected twice"),
                ));
            }
            let s = self
                .state
                .schedule(schedule_id)
                .ok_or_else(|| EngineError::not_found("schedule", schedule_id))?;
            if s.loan() != loan {
                return Err(EngineError::validation(
                    "schedules",
                    format!("installment {schedule_id} belongs to a different loan"),
                ));
            }
            if s.is_paid() {
                return Err(EngineError::validation(
                    "schedules",
                    format!("installment {} is already paid", s.installment_number()),
                ));
            }
            required += s.total_amount();
            allocations.push(ScheduleAllocation {
                schedule: schedule_id,
                amount_applied: s.total_amount(),
            });
        }
        if amount < required {
            return Err(EngineError::validation(
                "amount",
                format!("{amount} does not cover the selected installments ({required})"),
            ));
        }

        let at = self.now();
        let id = self.state.next_id();
        self.state.insert_multi_payment(MultiSchedulePayment::new(
            id,
            loan,
            amount,
            at,
            method,
            reference,
            allocations,
            actor_id,
        ));

        let entry = self
            .entry(AuditStream::Collection, AuditAction::MultiPaymentSubmitted, ctx)
            .loan(loan)
            .after(json!({
                "amount": amount,
                "installments": schedules.len(),
            }));
        self.record(entry);
        self.notify(
            NotificationKind::MultiPaymentSubmitted,
            Audience::Staff,
            Some(loan),
            format!(
                "multi-installment payment of {amount} over {} installments awaits approval \
                 on {application_number}",
                schedules.len()
            ),
        );
        tracing::info!(loan, payment = id, %amount, installments = schedules.len(),
            "multi-schedule payment submitted");
        Ok(id)
    }

    /// Approve a pending multi-schedule payment and settle its installments.
    ///
    /// Approving an already-approved payment is a no-op that affects the
    /// loan's balance exactly once.
    pub fn approve_multi_payment(
        &mut self,
        ctx: &ActorContext,
        payment: MultiPaymentId,
    ) -> EngineResult<MultiPaymentOutcome> {
        let approver = self
            .require_staff(ctx, "approving a multi-schedule payment")?
            .id();
        let mp = self
            .state
            .multi_payment(payment)
            .ok_or_else(|| EngineError::not_found("multi-schedule payment", payment))?;
        let loan = mp.loan();
        match mp.status() {
            MultiPaymentStatus::Approved => {
                let l = self.require_loan(loan)?;
                return Ok(MultiPaymentOutcome {
                    payment,
                    loan,
                    schedules_settled: mp.allocations().len(),
                    overpayment: mp.overpayment(),
                    balance_remaining: l.balance_remaining(),
                    loan_completed: l.status() == LoanStatus::Completed,
                });
            }
            MultiPaymentStatus::Pending => {}
            status => {
                return Err(EngineError::Precondition(format!(
                    "multi-schedule payment is {status:?}, not pending"
                )))
            }
        }
        let amount = mp.total_amount();
        let overpayment = mp.overpayment();
        let paid_on = mp.payment_date().date_naive();
        let allocations: Vec<ScheduleAllocation> = mp.allocations().to_vec();
        let l = self.require_loan(loan)?;
        let borrower = l.borrower();
        let application_number = l.application_number().to_string();

        let at = self.now();
        self.state
            .multi_payment_mut(payment)
            .expect("payment checked above")
            .approve(approver, at)
            .map_err(|e| EngineError::Precondition(e.to_string()))?;

        let mut settled = 0;
        for allocation in &allocations {
            if let Some(s) = self.state.schedule_mut(allocation.schedule) {
                if !s.is_paid() {
                    s.mark_paid(paid_on)
                        .map_err(|e| EngineError::Precondition(e.to_string()))?;
                    settled += 1;
                }
            }
        }

        let l = self.state.loan_mut(loan).expect("loan checked above");
        l.apply_payment(amount);
        let balance_remaining = l.balance_remaining();

        let entry = self
            .entry(AuditStream::Collection, AuditAction::MultiPaymentApproved, ctx)
            .loan(loan)
            .after(json!({
                "amount": amount,
                "schedules_settled": settled,
                "overpayment": overpayment,
            }));
        self.record(entry);
        self.notify(
            NotificationKind::MultiPaymentDecided,
            Audience::User(borrower),
            Some(loan),
            format!(
                "multi-installment payment of {amount} approved on {application_number}; \
                 {settled} installments settled"
            ),
        );

        let loan_completed = self.finalize_if_complete(loan, Some(ctx));
        tracing::info!(loan, payment, settled, %balance_remaining, "multi-schedule payment approved");
        Ok(MultiPaymentOutcome {
            payment,
            loan,
            schedules_settled: settled,
            overpayment,
            balance_remaining,
            loan_completed,
        })
    }

    /// Reject a pending multi-schedule payment. No ledger changes.
    pub fn reject_multi_payment(
        &mut self,
        ctx: &ActorContext,
        payment: MultiPaymentId,
        reason: impl Into<String>,
    ) -> EngineResult<()> {
        let rejecter = self
            .require_staff(ctx, "rejecting a multi-schedule payment")?
            .id();
        let reason = reason.into();
        let mp = self
            .state
            .multi_payment(payment)
            .ok_or_else(|| EngineError::not_found("multi-schedule payment", payment))?;
        if mp.status() == MultiPaymentStatus::Rejected {
            return Ok(());
        }
        let loan = mp.loan();
        let borrower = self.require_loan(loan)?.borrower();

        let at = self.now();
        self.state
            .multi_payment_mut(payment)
            .expect("payment checked above")
            .reject(rejecter, at, &reason)
            .map_err(|e| EngineError::Precondition(e.to_string()))?;

        let entry = self
            .entry(AuditStream::Collection, AuditAction::MultiPaymentRejected, ctx)
            .loan(loan)
            .reason(reason.clone());
        self.record(entry);
        self.notify(
            NotificationKind::MultiPaymentDecided,
            Audience::User(borrower),
            Some(loan),
            format!("multi-installment payment rejected: {reason}"),
        );
        tracing::info!(loan, payment, %reason, "multi-schedule payment rejected");
        Ok(())
    }
}
