//! Loan approval, rejection, and admin escalation decisions.

use serde_json::json;

use crate::engine::{ActorContext, LoanEngine};
use crate::error::{EngineError, EngineResult};
use crate::models::approval::EscalationStatus;
use crate::models::audit::{AuditAction, AuditStream};
use crate::models::deposit::SecurityDeposit;
use crate::models::loan::LoanStatus;
use crate::models::notification::{Audience, NotificationKind};
use crate::models::{LoanId, Role};

impl LoanEngine {
    /// Approve a pending loan and open its security-deposit record.
    ///
    /// Admins and managers may always approve; loan officers must pass the
    /// minimum-groups gate. Approving an already-approved loan is a no-op
    /// that emits no audit row.
    pub fn approve_loan(&mut self, ctx: &ActorContext, loan: LoanId) -> EngineResult<()> {
        let approver = self.require_staff(ctx, "approving a loan")?;
        let approver_id = approver.id();
        let approver_is_officer = approver.role() == Role::LoanOfficer;
        self.ensure_can_approve(approver_id)?;

        let l = self.require_loan(loan)?;
        match l.status() {
            LoanStatus::Approved => return Ok(()),
            LoanStatus::Pending => {}
            status => {
                return Err(EngineError::Precondition(format!(
                    "loan {} is {status:?}, not pending",
                    l.application_number()
                )))
            }
        }
        let borrower = l.borrower();
        let application_number = l.application_number().to_string();
        let deposit_required = l.deposit_required();
        let take_officer = approver_is_officer && l.loan_officer().is_none();

        let at = self.now();
        let l = self.state.loan_mut(loan).expect("loan checked above");
        l.approve(approver_id, at)
            .map_err(|e| EngineError::Precondition(e.to_string()))?;
        if take_officer {
            l.set_loan_officer(Some(approver_id));
        }
        self.state
            .insert_deposit(SecurityDeposit::new(loan, deposit_required));

        let entry = self
            .entry(AuditStream::Approval, AuditAction::LoanApproved, ctx)
            .loan(loan)
            .user(borrower)
            .after(json!({ "status": LoanStatus::Approved, "deposit_required": deposit_required }));
        self.record(entry);
        self.notify(
            NotificationKind::LoanApproved,
            Audience::User(borrower),
            Some(loan),
            format!(
                "loan {application_number} approved; pay the {deposit_required} security deposit"
            ),
        );
        tracing::info!(loan, approver = approver_id, "loan approved");
        Ok(())
    }

    /// Reject a loan, recording the reason. Legal from `pending` or
    /// `approved`; rejecting an already-rejected loan is a no-op.
    pub fn reject_loan(
        &mut self,
        ctx: &ActorContext,
        loan: LoanId,
        reason: impl Into<String>,
    ) -> EngineResult<()> {
        self.require_role(ctx, &[Role::Admin, Role::LoanOfficer], "rejecting a loan")?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(EngineError::validation("reason", "must not be empty"));
        }

        let l = self.require_loan(loan)?;
        if l.status() == LoanStatus::Rejected {
            return Ok(());
        }
        let borrower = l.borrower();
        let application_number = l.application_number().to_string();
        let old_status = l.status();

        self.state
            .loan_mut(loan)
            .expect("loan checked above")
            .reject(reason.clone())
            .map_err(|e| EngineError::Precondition(e.to_string()))?;

        let entry = self
            .entry(AuditStream::Approval, AuditAction::LoanRejected, ctx)
            .loan(loan)
            .user(borrower)
            .reason(reason.clone())
            .before(json!({ "status": old_status }))
            .after(json!({ "status": LoanStatus::Rejected }));
        self.record(entry);
        self.notify(
            NotificationKind::LoanRejected,
            Audience::User(borrower),
            Some(loan),
            format!("loan {application_number} rejected: {reason}"),
        );
        tracing::info!(loan, %reason, "loan rejected");
        Ok(())
    }

    /// Admin decision on a high-value loan's escalation request.
    ///
    /// Approval unblocks disbursement. Rejection leaves the loan itself in
    /// `approved`; the borrower may appeal. Re-issuing the same decision is a
    /// no-op; reversing a decided request is refused.
    pub fn decide_escalation(
        &mut self,
        ctx: &ActorContext,
        loan: LoanId,
        approve: bool,
        notes: Option<String>,
    ) -> EngineResult<()> {
        let admin = self
            .require_role(ctx, &[Role::Admin], "deciding an escalation request")?
            .id();
        let l = self.require_loan(loan)?;
        let borrower = l.borrower();
        let application_number = l.application_number().to_string();
        let request = self
            .state
            .escalation(loan)
            .ok_or_else(|| EngineError::not_found("escalation request", loan))?;
        let target = if approve {
            EscalationStatus::Approved
        } else {
            EscalationStatus::Rejected
        };
        if request.status() == target {
            return Ok(());
        }

        let at = self.now();
        let request = self.state.escalation_mut(loan).expect("request checked above");
        let decision = if approve {
            request.approve(admin, at, notes.clone())
        } else {
            request.reject(admin, at, notes.clone())
        };
        decision.map_err(|e| EngineError::Precondition(e.to_string()))?;

        let action = if approve {
            AuditAction::EscalationApproved
        } else {
            AuditAction::EscalationRejected
        };
        let mut entry = self
            .entry(AuditStream::Approval, action, ctx)
            .loan(loan)
            .user(borrower)
            .after(json!({ "status": target }));
        if let Some(notes) = &notes {
            entry = entry.reason(notes.clone());
        }
        self.record(entry);
        self.notify(
            NotificationKind::EscalationDecided,
            Audience::User(borrower),
            Some(loan),
            format!(
                "admin {} the high-value review of loan {application_number}",
                if approve { "approved" } else { "rejected" }
            ),
        );
        tracing::info!(loan, approve, "escalation request decided");
        Ok(())
    }
}
