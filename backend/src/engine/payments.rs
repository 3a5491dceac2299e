//! Single-payment lifecycle and completion detection.
//!
//! A payment is submitted in `pending`, then confirmed or rejected by staff.
//! Confirmation is the only path that moves the repayment ledger: it marks
//! the bound installment paid, applies the amount to the loan, mirrors the
//! cash into the collection calendar, and re-evaluates completion. Rejection
//! records the reason and touches no ledger.

use rust_decimal::Decimal;
use serde_json::json;

use crate::engine::{ActorContext, LoanEngine};
use crate::error::{EngineError, EngineResult};
use crate::models::audit::{AuditAction, AuditStream};
use crate::models::collection::PaymentCollection;
use crate::models::loan::LoanStatus;
use crate::models::notification::{Audience, NotificationKind};
use crate::models::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::models::{LoanId, PaymentId, ScheduleId};

/// Ledger effect of a confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub payment: PaymentId,
    pub loan: LoanId,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub balance_remaining: Decimal,
    pub loan_completed: bool,
}

impl LoanEngine {
    /// Submit a repayment against an active loan, optionally bound to one
    /// installment. The borrower submits their own payments; staff may
    /// record one on a borrower's behalf.
    pub fn submit_payment(
        &mut self,
        ctx: &ActorContext,
        loan: LoanId,
        schedule: Option<ScheduleId>,
        amount: Decimal,
        method: PaymentMethod,
        reference: Option<String>,
    ) -> EngineResult<PaymentId> {
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
        if amount <= Decimal::ZERO {
            return Err(EngineError::validation("amount", "must be positive"));
        }
        if let Some(schedule_id) = schedule {
            let s = self
                .state
                .schedule(schedule_id)
                .ok_or_else(|| EngineError::not_found("schedule", schedule_id))?;
            if s.loan() != loan {
                return Err(EngineError::validation(
                    "schedule",
                    "installment belongs to a different loan",
                ));
            }
            if s.is_paid() {
                return Err(EngineError::validation("schedule", "installment is already paid"));
            }
        }
        let application_number = l.application_number().to_string();

        let at = self.now();
        let id = self.state.next_id();
        let payment_number = self.state.next_payment_number();
        self.state.insert_payment(Payment::new(
            id,
            payment_number.clone(),
            loan,
            schedule,
            amount,
            method,
            reference,
            actor_id,
            at,
        ));

        let entry = self
            .entry(AuditStream::Collection, AuditAction::PaymentSubmitted, ctx)
            .loan(loan)
            .after(json!({
                "payment_number": payment_number,
                "amount": amount,
                "schedule": schedule,
            }));
        self.record(entry);
        self.notify(
            NotificationKind::PaymentSubmitted,
            Audience::Staff,
            Some(loan),
            format!("payment {payment_number} of {amount} awaits confirmation on {application_number}"),
        );
        tracing::info!(loan, payment = id, %amount, "payment submitted");
        Ok(id)
    }

    /// Confirm a pending payment and apply it to the ledgers.
    ///
    /// Confirming an already-completed payment is a no-op: the current
    /// receipt is returned and no audit row is emitted.
    pub fn confirm_payment(
        &mut self,
        ctx: &ActorContext,
        payment: PaymentId,
    ) -> EngineResult<PaymentReceipt> {
        let confirmer = self.require_staff(ctx, "confirming a payment")?.id();
        let p = self
            .state
            .payment(payment)
            .ok_or_else(|| EngineError::not_found("payment", payment))?;
        let loan = p.loan();
        let amount = p.amount();
        let schedule = p.schedule();
        match p.status() {
            PaymentStatus::Completed => {
                let l = self.require_loan(loan)?;
                return Ok(PaymentReceipt {
                    payment,
                    loan,
                    amount,
                    amount_paid: l.amount_paid(),
                    balance_remaining: l.balance_remaining(),
                    loan_completed: l.status() == LoanStatus::Completed,
                });
            }
            PaymentStatus::Pending => {}
            status => {
                return Err(EngineError::Precondition(format!(
                    "payment {} is {status:?}, not pending",
                    p.payment_number()
                )))
            }
        }
        let payment_number = p.payment_number().to_string();
        let l = self.require_loan(loan)?;
        let borrower = l.borrower();
        let application_number = l.application_number().to_string();

        let at = self.now();
        self.state
            .payment_mut(payment)
            .expect("payment checked above")
            .complete(confirmer, at)
            .map_err(|e| EngineError::Precondition(e.to_string()))?;
        let paid_on = self
            .state
            .payment(payment)
            .expect("payment checked above")
            .payment_date()
            .expect("set by complete")
            .date_naive();

        if let Some(schedule_id) = schedule {
            if let Some(s) = self.state.schedule_mut(schedule_id) {
                if !s.is_paid() {
                    s.mark_paid(paid_on)
                        .map_err(|e| EngineError::Precondition(e.to_string()))?;
                }
            }
        }

        let l = self.state.loan_mut(loan).expect("loan checked above");
        l.apply_payment(amount);
        let amount_paid = l.amount_paid();
        let balance_remaining = l.balance_remaining();

        // Mirror the cash into the collection calendar for the payment date.
        match self.state.collection_id_for(loan, paid_on) {
            Some(collection_id) => {
                let row = self
                    .state
                    .collection_mut(collection_id)
                    .expect("row looked up above");
                row.set_collected(amount, confirmer, at);
                if row.is_open() {
                    row.approve(confirmer, paid_on)
                        .map_err(|e| EngineError::Precondition(e.to_string()))?;
                }
            }
            None => {
                // Off-calendar payment date: open an ad-hoc row expecting
                // exactly what arrived.
                let collection_id = self.state.next_id();
                let mut row = PaymentCollection::new(collection_id, loan, paid_on, amount);
                row.set_collected(amount, confirmer, at);
                row.approve(confirmer, paid_on)
                    .map_err(|e| EngineError::Precondition(e.to_string()))?;
                self.state.insert_collection(row);
            }
        }

        let entry = self
            .entry(AuditStream::Collection, AuditAction::PaymentConfirmed, ctx)
            .loan(loan)
            .after(json!({
                "payment_number": payment_number,
                "amount": amount,
                "balance_remaining": balance_remaining,
            }));
        self.record(entry);
        self.notify(
            NotificationKind::PaymentConfirmed,
            Audience::User(borrower),
            Some(loan),
            format!("payment {payment_number} of {amount} confirmed on {application_number}"),
        );

        let loan_completed = self.finalize_if_complete(loan, Some(ctx));
        tracing::info!(
            loan,
            payment,
            %amount,
            %balance_remaining,
            loan_completed,
            "payment confirmed"
        );
        Ok(PaymentReceipt {
            payment,
            loan,
            amount,
            amount_paid,
            balance_remaining,
            loan_completed,
        })
    }

    /// Reject a pending payment. No ledger changes; the reason is appended to
    /// the payment's notes. Rejecting an already-failed payment is a no-op.
    pub fn reject_payment(
        &mut self,
        ctx: &ActorContext,
        payment: PaymentId,
        reason: impl Into<String>,
    ) -> EngineResult<()> {
        let rejecter = self.require_staff(ctx, "rejecting a payment")?.id();
        let reason = reason.into();
        let p = self
            .state
            .payment(payment)
            .ok_or_else(|| EngineError::not_found("payment", payment))?;
        if p.status() == PaymentStatus::Failed {
            return Ok(());
        }
        let loan = p.loan();
        let payment_number = p.payment_number().to_string();
        let borrower = self.require_loan(loan)?.borrower();

        self.state
            .payment_mut(payment)
            .expect("payment checked above")
            .fail(rejecter, &reason)
            .map_err(|e| EngineError::Precondition(e.to_string()))?;

        let entry = self
            .entry(AuditStream::Collection, AuditAction::PaymentRejected, ctx)
            .loan(loan)
            .reason(reason.clone());
        self.record(entry);
        self.notify(
            NotificationKind::PaymentRejected,
            Audience::User(borrower),
            Some(loan),
            format!("payment {payment_number} rejected: {reason}"),
        );
        tracing::info!(loan, payment, %reason, "payment rejected");
        Ok(())
    }

    /// Completion detection: flip an active, fully-settled loan to
    /// `completed`, audit it, and notify the borrower. Returns whether the
    /// loan is completed after the check.
    ///
    /// Runs after every successful payment application and inside the batch
    /// scans; `ctx` is absent for system-triggered checks.
    pub(crate) fn finalize_if_complete(
        &mut self,
        loan: LoanId,
        ctx: Option<&ActorContext>,
    ) -> bool {
        let l = match self.state.loan(loan) {
            Some(l) => l,
            None => return false,
        };
        match l.status() {
            LoanStatus::Completed => return true,
            LoanStatus::Active => {}
            _ => return false,
        }
        if !l.is_repaid() && !self.state.all_schedules_paid(loan) {
            return false;
        }
        let borrower = l.borrower();
        let application_number = l.application_number().to_string();

        let at = self.now();
        self.state
            .loan_mut(loan)
            .expect("loan checked above")
            .complete(at)
            .expect("status checked above");

        let entry = match ctx {
            Some(ctx) => self.entry(AuditStream::Collection, AuditAction::LoanCompleted, ctx),
            None => self.system_entry(AuditStream::Collection, AuditAction::LoanCompleted),
        };
        self.record(entry.loan(loan).user(borrower));
        self.notify(
            NotificationKind::LoanCompleted,
            Audience::User(borrower),
            Some(loan),
            format!("loan {application_number} fully repaid"),
        );
        tracing::info!(loan, "loan completed");
        true
    }
}
